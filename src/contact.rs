//! Contact sampling between a susceptible agent and the groups.

use crate::error::ModelError;
use crate::model::{Agent, Group, Model};
use crate::rng::RandomSource;

/// Global contact parameters seen by every group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub contact_rate: f64,
    pub contact_rate_reduction: f64,
    pub n_groups: usize,
}

impl Contact {
    /// Contact rate of a group.
    ///
    /// Groups with restricted contact keep the full rate; the others are
    /// scaled by `contact_rate_reduction`.
    pub fn effective_rate(&self, restricted_contact: bool) -> f64 {
        let factor = if restricted_contact {
            1.0
        } else {
            self.contact_rate_reduction
        };
        self.contact_rate * factor
    }

    /// Probability that one infected member produces an effective contact,
    /// clamped to `[0, 1]`.
    pub fn per_contact_prob(&self, restricted_contact: bool, n_infected: usize) -> f64 {
        let rate = self.effective_rate(restricted_contact);
        (rate / n_infected as f64 / self.n_groups as f64).clamp(0.0, 1.0)
    }

    /// Infectious contacts contributed by a group with `n_infected` infected
    /// members. Takes no draw when the group has no infected members.
    pub fn sample_contacts<R: RandomSource>(
        &self,
        restricted_contact: bool,
        n_infected: usize,
        rng: &mut R,
    ) -> Result<u64, ModelError> {
        if n_infected == 0 {
            return Ok(0);
        }
        let prob = self.per_contact_prob(restricted_contact, n_infected);
        rng.binomial_draw(n_infected as u64, prob)
    }
}

impl Group {
    /// Sample the infectious contacts this group contributes this step.
    pub fn sample_infected<R: RandomSource>(
        &self,
        agents: &[Agent],
        contact: &Contact,
        rng: &mut R,
    ) -> Result<u64, ModelError> {
        contact.sample_contacts(self.restricted_contact(), self.n_infected(agents), rng)
    }
}

impl<R: RandomSource> Model<R> {
    pub fn contact(&self) -> Contact {
        Contact {
            contact_rate: self.params.contact_rate,
            contact_rate_reduction: self.params.contact_rate_reduction,
            n_groups: self.groups.len(),
        }
    }
}
