//! Transition engine and simulation driver.
//!
//! A step decides the next state of every agent from the states at the start
//! of the step, commits all of them at once, then records the S, I, R counts.

use crate::curve::StateCounts;
use crate::error::ModelError;
use crate::model::{Health, Model};
use crate::rng::RandomSource;
use std::fmt;

/// Probability of at least one infection out of `n_contacts` independent
/// contacts, each infecting with probability `prob_infection`.
pub fn infection_probability(prob_infection: f64, n_contacts: u64) -> f64 {
    if n_contacts == 0 {
        return 0.0;
    }
    1.0 - (1.0 - prob_infection).powf(n_contacts as f64)
}

impl<R: RandomSource> Model<R> {
    /// Perform the remaining steps of the run.
    ///
    /// On a fresh model this is exactly `n_steps` steps; on a finished one it
    /// does nothing.
    pub fn run(&mut self) -> Result<(), ModelError> {
        while self.i_step < self.params.n_steps {
            self.step()?;
        }
        Ok(())
    }

    /// Advance the whole population by one step and record its counts.
    pub fn step(&mut self) -> Result<(), ModelError> {
        let i_step = self.i_step;
        let len = self.curve.n_rows();
        if i_step >= len {
            return Err(ModelError::IndexOutOfBounds { index: i_step, len });
        }

        self.log(format_args!("Step {i_step} started."));

        for i_agt in 0..self.agents.len() {
            let next = match self.agents[i_agt].state() {
                Health::Susceptible => self.update_susceptible(i_agt)?,
                Health::Infected => self.update_infected(i_agt)?,
                Health::Recovered => continue,
            };
            self.agents[i_agt].stage(next);
        }

        for agt in &mut self.agents {
            agt.commit();
        }

        let counts = StateCounts::tally(&self.agents);
        self.curve.record(i_step, counts)?;
        self.i_step += 1;

        let StateCounts {
            susceptible,
            infected,
            recovered,
        } = counts;
        self.log(format_args!(
            "Step {i_step} ended. {{S, I, R}}: {{{susceptible}, {infected}, {recovered}}}"
        ));

        Ok(())
    }

    fn update_susceptible(&mut self, i_agt: usize) -> Result<Health, ModelError> {
        let contact = self.contact();

        let mut n_contacts_infected = 0;
        for grp in &self.groups {
            n_contacts_infected += grp.sample_infected(&self.agents, &contact, &mut self.rng)?;
        }

        let p_infection = infection_probability(self.params.prob_infection, n_contacts_infected);

        if p_infection > self.rng.unit_draw()? {
            self.log(format_args!(
                "Agent {i_agt} got infected. (p_infection = {p_infection:.6}) \
                 (n_contacts_infected = {n_contacts_infected})"
            ));
            Ok(Health::Infected)
        } else {
            Ok(Health::Susceptible)
        }
    }

    fn update_infected(&mut self, i_agt: usize) -> Result<Health, ModelError> {
        let prob_recovery = self.params.prob_recovery;

        if prob_recovery > self.rng.unit_draw()? {
            self.log(format_args!(
                "Agent {i_agt} recovered. (p_recovery = {prob_recovery:.6})"
            ));
            Ok(Health::Recovered)
        } else {
            Ok(Health::Infected)
        }
    }

    fn log(&mut self, msg: fmt::Arguments<'_>) {
        if !self.verbose {
            return;
        }
        let line = log_line(self.log_step, self.calc_utility(), msg);
        log::info!("{line}");
        self.log_step += 1;
    }
}

/// Event log line: `[log NNNN; utility = U.UU] msg`.
///
/// The utility is cut after two decimals of its six-decimal rendering, not
/// rounded.
pub fn log_line(log_step: usize, utility: f64, msg: fmt::Arguments<'_>) -> String {
    let utility = format!("{utility:.6}");
    let utility = match utility.find('.') {
        Some(i_dot) => &utility[..(i_dot + 3).min(utility.len())],
        None => &utility[..],
    };
    format!("[log {log_step:04}; utility = {utility}] {msg}")
}
