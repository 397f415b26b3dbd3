use crate::model::Params;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Simulation configuration.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Epidemic model parameters.
    pub model: ModelConfig,
    /// Run parameters.
    pub run: RunConfig,
}

/// Epidemic model parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    /// Number of agents.
    pub n_agents: usize,
    /// Number of contact groups.
    pub n_groups: usize,

    /// Infection probability per infectious contact.
    pub prob_infection: f64,
    /// Recovery probability per step.
    pub prob_recovery: f64,

    /// Contact rate. Mutually exclusive with `r0`.
    pub contact_rate: Option<f64>,
    /// Basic reproduction number the contact rate is derived from.
    pub r0: Option<f64>,
    /// Contact rate factor for groups without restricted contact.
    pub contact_rate_reduction: f64,
    /// Indices of the groups with restricted contact.
    pub restricted_groups: Vec<usize>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        let params = Params::default();
        Self {
            n_agents: params.n_agents,
            n_groups: params.n_groups,
            prob_infection: params.prob_infection,
            prob_recovery: params.prob_recovery,
            contact_rate: None,
            r0: None,
            contact_rate_reduction: params.contact_rate_reduction,
            restricted_groups: params.restricted_groups,
        }
    }
}

/// Run parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Number of steps per run.
    pub n_steps: usize,
    /// Base seed; run `k` uses `seed + k`.
    pub seed: u64,
    /// Emit the per-event log.
    pub verbose: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        let params = Params::default();
        Self {
            n_steps: params.n_steps,
            seed: params.seed,
            verbose: false,
        }
    }
}

impl Config {
    /// Load a [`Config`] from a TOML file.
    ///
    /// Missing fields take their default values.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;
        Self::from_toml(&contents)
    }

    /// Parse and validate a [`Config`] from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let model = &self.model;

        check_num(model.n_agents, 1..=10_000_000).context("invalid number of agents")?;
        check_num(model.n_groups, 1..=model.n_agents).context("invalid number of groups")?;
        check_num(self.run.n_steps, 1..=1_000_000).context("invalid number of steps")?;

        if model.contact_rate.is_some() && model.r0.is_some() {
            bail!("contact_rate and r0 are mutually exclusive");
        }
        if let Some(r0) = model.r0 {
            check_num(r0, 0.0..=f64::MAX).context("invalid basic reproduction number")?;
            if model.prob_infection <= 0.0 {
                bail!("r0 requires a positive infection probability");
            }
        }

        self.params(0)
            .validate()
            .context("invalid model parameters")?;

        Ok(())
    }

    /// Contact rate, either given or derived as `r0 * prob_recovery / prob_infection`.
    pub fn contact_rate(&self) -> f64 {
        let model = &self.model;
        match (model.contact_rate, model.r0) {
            (Some(contact_rate), _) => contact_rate,
            (None, Some(r0)) => r0 * model.prob_recovery / model.prob_infection,
            (None, None) => Params::default().contact_rate,
        }
    }

    /// Model parameters of run `run_idx`.
    pub fn params(&self, run_idx: usize) -> Params {
        let model = &self.model;
        Params {
            n_agents: model.n_agents,
            n_groups: model.n_groups,
            prob_infection: model.prob_infection,
            prob_recovery: model.prob_recovery,
            contact_rate: self.contact_rate(),
            contact_rate_reduction: model.contact_rate_reduction,
            restricted_groups: model.restricted_groups.clone(),
            n_steps: self.run.n_steps,
            seed: self.run.seed.wrapping_add(run_idx as u64),
        }
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}
