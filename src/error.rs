//! Error kinds of the simulation core.

/// Errors produced while building or advancing a [`Model`](crate::model::Model).
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// A model parameter is outside its admissible range.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// The agents cannot be split evenly across the groups.
    #[error("{n_agents} agents cannot be split evenly into {n_groups} groups")]
    UnevenGroups {
        /// Number of agents.
        n_agents: usize,
        /// Number of groups.
        n_groups: usize,
    },

    /// A step index past the end of the epidemic curve.
    #[error("step index {index} is out of bounds for a curve of {len} rows")]
    IndexOutOfBounds {
        /// Offending step index.
        index: usize,
        /// Number of rows in the curve.
        len: usize,
    },

    /// The binomial distribution rejected its parameters.
    #[error("invalid binomial distribution")]
    Binomial(#[from] rand_distr::BinomialError),

    /// The uniform distribution rejected its bounds.
    #[error("invalid uniform distribution")]
    Uniform(#[from] rand::distr::uniform::Error),
}

impl ModelError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
