//! Epidemic curve: per-step counts of each disease state.

use crate::error::ModelError;
use crate::model::{Agent, Health};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of agents in each state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateCounts {
    pub susceptible: usize,
    pub infected: usize,
    pub recovered: usize,
}

impl StateCounts {
    /// Count the current states of `agents`.
    pub fn tally(agents: &[Agent]) -> Self {
        let mut counts = Self::default();
        for agt in agents {
            match agt.state() {
                Health::Susceptible => counts.susceptible += 1,
                Health::Infected => counts.infected += 1,
                Health::Recovered => counts.recovered += 1,
            }
        }
        counts
    }

    pub fn get(&self, health: Health) -> usize {
        match health {
            Health::Susceptible => self.susceptible,
            Health::Infected => self.infected,
            Health::Recovered => self.recovered,
        }
    }

    pub fn total(&self) -> usize {
        self.susceptible + self.infected + self.recovered
    }
}

/// Table with one row per step and the columns S, I, R.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpidemicCurve {
    rows: Vec<StateCounts>,
}

impl EpidemicCurve {
    /// Allocate a zeroed curve of `n_steps` rows.
    pub fn new(n_steps: usize) -> Self {
        Self {
            rows: vec![StateCounts::default(); n_steps],
        }
    }

    /// Write the row of step `i_step`.
    pub fn record(&mut self, i_step: usize, counts: StateCounts) -> Result<(), ModelError> {
        let len = self.rows.len();
        let row = self
            .rows
            .get_mut(i_step)
            .ok_or(ModelError::IndexOutOfBounds { index: i_step, len })?;
        *row = counts;
        Ok(())
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    #[cfg(test)]
    pub fn n_cols(&self) -> usize {
        Health::ALL.len()
    }

    #[cfg(test)]
    pub fn row(&self, i_step: usize) -> Option<&StateCounts> {
        self.rows.get(i_step)
    }

    pub fn rows(&self) -> &[StateCounts] {
        &self.rows
    }

    /// Column of `health` over all steps.
    pub fn column(&self, health: Health) -> impl Iterator<Item = usize> + '_ {
        self.rows.iter().map(move |row| row.get(health))
    }
}

impl fmt::Display for EpidemicCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.rows {
            writeln!(f, "{} {} {}", row.susceptible, row.infected, row.recovered)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(s: usize, i: usize, r: usize) -> StateCounts {
        StateCounts {
            susceptible: s,
            infected: i,
            recovered: r,
        }
    }

    #[test]
    fn record_writes_rows() {
        let mut curve = EpidemicCurve::new(3);
        assert_eq!(curve.n_rows(), 3);
        assert_eq!(curve.n_cols(), 3);

        curve.record(0, counts(9, 1, 0)).unwrap();
        curve.record(1, counts(7, 2, 1)).unwrap();

        assert_eq!(curve.row(1), Some(&counts(7, 2, 1)));
        assert_eq!(curve.row(2), Some(&StateCounts::default()));
        assert_eq!(curve.row(3), None);
        assert_eq!(
            curve.column(Health::Infected).collect::<Vec<_>>(),
            vec![1, 2, 0]
        );
        assert_eq!(curve.rows()[0].total(), 10);
    }

    #[test]
    fn record_out_of_range_fails() {
        let mut curve = EpidemicCurve::new(2);
        assert!(matches!(
            curve.record(2, counts(1, 0, 0)),
            Err(ModelError::IndexOutOfBounds { index: 2, len: 2 })
        ));
    }

    #[test]
    fn renders_whitespace_separated_rows() {
        let mut curve = EpidemicCurve::new(2);
        curve.record(0, counts(9, 1, 0)).unwrap();
        curve.record(1, counts(8, 1, 1)).unwrap();
        assert_eq!(curve.to_string(), "9 1 0\n8 1 1\n");
    }
}
