//! Population model: agents, contact groups and the global parameters.

use crate::curve::EpidemicCurve;
use crate::error::ModelError;
use crate::rng::{RandomSource, SeededRng};
use serde::{Deserialize, Serialize};
use std::{fmt, ops::RangeInclusive};

/// Disease state of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Health {
    Susceptible,
    Infected,
    Recovered,
}

impl Health {
    /// All states, in epidemic curve column order.
    pub const ALL: [Health; 3] = [Health::Susceptible, Health::Infected, Health::Recovered];

    /// Column of this state in the epidemic curve.
    pub fn column(self) -> usize {
        match self {
            Health::Susceptible => 0,
            Health::Infected => 1,
            Health::Recovered => 2,
        }
    }
}

/// Agent of the simulation.
///
/// `state_next` is the staging slot of the synchronous update; outside of a
/// step it always equals `state`.
#[derive(Debug, Clone)]
pub struct Agent {
    state: Health,
    state_next: Health,
    group: usize,
}

impl Agent {
    fn new(group: usize) -> Self {
        Self {
            state: Health::Susceptible,
            state_next: Health::Susceptible,
            group,
        }
    }

    /// Current state of the agent.
    pub fn state(&self) -> Health {
        self.state
    }

    /// Index of the group the agent belongs to.
    pub fn group(&self) -> usize {
        self.group
    }

    pub(crate) fn stage(&mut self, next: Health) {
        self.state_next = next;
    }

    pub(crate) fn commit(&mut self) {
        self.state = self.state_next;
    }

    fn force(&mut self, state: Health) {
        self.state = state;
        self.state_next = state;
    }
}

/// Contact group: a fixed set of agents sharing a contact context.
#[derive(Debug, Clone)]
pub struct Group {
    members: Vec<usize>,
    restricted_contact: bool,
}

impl Group {
    /// Indices of the member agents, in insertion order.
    #[cfg(test)]
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    /// Whether the group keeps the full contact rate.
    pub fn restricted_contact(&self) -> bool {
        self.restricted_contact
    }

    /// Number of members currently infected.
    pub fn n_infected(&self, agents: &[Agent]) -> usize {
        self.members
            .iter()
            .filter(|&&i_agt| agents[i_agt].state == Health::Infected)
            .count()
    }
}

/// Model parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Params {
    /// Number of agents.
    pub n_agents: usize,
    /// Number of contact groups.
    pub n_groups: usize,

    /// Infection probability per infectious contact.
    pub prob_infection: f64,
    /// Recovery probability per step.
    pub prob_recovery: f64,

    /// Contact events per step, spread across all groups.
    pub contact_rate: f64,
    /// Contact rate factor applied to groups without restricted contact.
    pub contact_rate_reduction: f64,
    /// Indices of the groups with restricted contact.
    pub restricted_groups: Vec<usize>,

    /// Number of steps of a run.
    pub n_steps: usize,
    /// Seed of the random stream.
    pub seed: u64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            n_agents: 1000,
            n_groups: 10,
            prob_infection: 0.1,
            prob_recovery: 0.05,
            contact_rate: 10.0,
            contact_rate_reduction: 0.5,
            restricted_groups: Vec::new(),
            n_steps: 100,
            seed: 42,
        }
    }
}

impl Params {
    /// Check every parameter against its admissible range.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.n_agents == 0 {
            return Err(ModelError::invalid("n_agents", "must be at least 1"));
        }
        if !(1..=self.n_agents).contains(&self.n_groups) {
            return Err(ModelError::invalid(
                "n_groups",
                format!("must be in 1..={}, but is {}", self.n_agents, self.n_groups),
            ));
        }
        if self.n_agents % self.n_groups != 0 {
            return Err(ModelError::UnevenGroups {
                n_agents: self.n_agents,
                n_groups: self.n_groups,
            });
        }

        check_range("prob_infection", self.prob_infection, 0.0..=1.0)?;
        check_range("prob_recovery", self.prob_recovery, 0.0..=1.0)?;
        check_range("contact_rate", self.contact_rate, 0.0..=f64::MAX)?;
        check_range(
            "contact_rate_reduction",
            self.contact_rate_reduction,
            0.0..=1.0,
        )?;

        if let Some(&i_grp) = self.restricted_groups.iter().find(|&&i| i >= self.n_groups) {
            return Err(ModelError::invalid(
                "restricted_groups",
                format!("group {i_grp} does not exist (n_groups = {})", self.n_groups),
            ));
        }

        Ok(())
    }
}

fn check_range(
    name: &'static str,
    val: f64,
    range: RangeInclusive<f64>,
) -> Result<(), ModelError> {
    if !range.contains(&val) {
        return Err(ModelError::invalid(
            name,
            format!("must be in the range {range:?}, but is {val}"),
        ));
    }
    Ok(())
}

/// Population model.
///
/// Owns the agents, the groups, the random stream and the epidemic curve.
/// Groups and agents refer to each other through indices only.
#[derive(Debug)]
pub struct Model<R = SeededRng> {
    pub(crate) params: Params,
    pub(crate) agents: Vec<Agent>,
    pub(crate) groups: Vec<Group>,
    pub(crate) rng: R,
    pub(crate) curve: EpidemicCurve,
    pub(crate) i_step: usize,
    pub(crate) verbose: bool,
    pub(crate) log_step: usize,
}

impl Model<SeededRng> {
    /// Create a model whose random stream is seeded with `params.seed`.
    pub fn new(params: Params) -> Result<Self, ModelError> {
        let rng = SeededRng::new(params.seed);
        Self::with_rng(params, rng)
    }
}

impl<R: RandomSource> Model<R> {
    /// Create a model drawing from the given random source.
    ///
    /// Agents are assigned to groups in contiguous blocks of equal size and
    /// agent 0 starts infected.
    pub fn with_rng(params: Params, rng: R) -> Result<Self, ModelError> {
        params.validate()?;

        let n_per_group = params.n_agents / params.n_groups;

        let mut agents = Vec::with_capacity(params.n_agents);
        let mut groups = Vec::with_capacity(params.n_groups);
        for i_grp in 0..params.n_groups {
            let mut members = Vec::with_capacity(n_per_group);
            for _ in 0..n_per_group {
                members.push(agents.len());
                agents.push(Agent::new(i_grp));
            }
            groups.push(Group {
                members,
                restricted_contact: params.restricted_groups.contains(&i_grp),
            });
        }

        agents[0].force(Health::Infected);

        let curve = EpidemicCurve::new(params.n_steps);

        Ok(Self {
            params,
            agents,
            groups,
            rng,
            curve,
            i_step: 0,
            verbose: true,
            log_step: 0,
        })
    }
}

impl<R> Model<R> {
    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn n_agents(&self) -> usize {
        self.agents.len()
    }

    pub fn n_groups(&self) -> usize {
        self.groups.len()
    }

    #[cfg(test)]
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    #[cfg(test)]
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// State of agent `i_agt`, if it exists.
    #[cfg(test)]
    pub fn agent_state(&self, i_agt: usize) -> Option<Health> {
        self.agents.get(i_agt).map(Agent::state)
    }

    /// Infected count of every group, evaluated now.
    pub fn n_infected_per_group(&self) -> Vec<usize> {
        let mut n_infected = vec![0; self.groups.len()];
        for agt in &self.agents {
            if agt.state == Health::Infected {
                n_infected[agt.group()] += 1;
            }
        }
        n_infected
    }

    /// Curve recorded so far; rows of steps not yet run are zero.
    pub fn epidemic_curve(&self) -> &EpidemicCurve {
        &self.curve
    }

    /// Number of steps already performed.
    pub fn n_steps_done(&self) -> usize {
        self.i_step
    }

    pub fn rng(&self) -> &R {
        &self.rng
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Switch the event log on or off. Does not affect the trajectory.
    pub fn toggle_verbose(&mut self) {
        self.verbose = !self.verbose;
    }

    /// Print a one-line summary of the population to stdout.
    pub fn print(&self) {
        println!("{self}");
    }

    /// Diagnostic utility `sum_g exp(-infected_g / 100)` shown in the event log.
    pub fn calc_utility(&self) -> f64 {
        self.n_infected_per_group()
            .into_iter()
            .map(|n_inf| (-(n_inf as f64) / 100.0).exp())
            .sum()
    }
}

impl<R> fmt::Display for Model<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ABM with {} agents and {} groups.",
            self.n_agents(),
            self.n_groups()
        )
    }
}
