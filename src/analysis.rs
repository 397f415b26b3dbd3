use crate::curve::EpidemicCurve;
use crate::model::Health;
use crate::stats::Accumulator;
use anyhow::{Context, Result, bail};
use rmp_serde::decode;
use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

/// Observable accumulated over the epidemic curves of several runs.
pub trait Obs {
    fn update(&mut self, curve: &EpidemicCurve) -> Result<()>;
    fn report(&self) -> serde_json::Value;
}

/// Height and timing of the infection peak.
pub struct Peak {
    size: Accumulator,
    step: Accumulator,
}

impl Peak {
    pub fn new() -> Self {
        Self {
            size: Accumulator::new(),
            step: Accumulator::new(),
        }
    }
}

impl Obs for Peak {
    fn update(&mut self, curve: &EpidemicCurve) -> Result<()> {
        // First step reaching the maximum.
        let (i_step, n_inf) = curve
            .column(Health::Infected)
            .enumerate()
            .fold(None, |best: Option<(usize, usize)>, (i, n)| match best {
                Some((_, m)) if m >= n => best,
                _ => Some((i, n)),
            })
            .context("curve has no rows")?;
        self.size.add(n_inf as f64);
        self.step.add(i_step as f64);
        Ok(())
    }

    fn report(&self) -> serde_json::Value {
        serde_json::json!({
            "peak_infected": self.size.report(),
            "peak_step": self.step.report(),
        })
    }
}

/// Fraction of the population ever infected by the end of the run.
pub struct AttackRate {
    acc: Accumulator,
}

impl AttackRate {
    pub fn new() -> Self {
        Self {
            acc: Accumulator::new(),
        }
    }
}

impl Obs for AttackRate {
    fn update(&mut self, curve: &EpidemicCurve) -> Result<()> {
        let last = curve.rows().last().context("curve has no rows")?;
        let n_agents = last.total();
        if n_agents == 0 {
            bail!("curve has an empty population");
        }
        let rate = (n_agents - last.susceptible) as f64 / n_agents as f64;
        self.acc.add(rate);
        Ok(())
    }

    fn report(&self) -> serde_json::Value {
        serde_json::json!({ "attack_rate": self.acc.report() })
    }
}

/// Per-step mean and spread of every state count.
pub struct MeanCurve {
    acc_vec: Vec<[Accumulator; 3]>,
}

impl MeanCurve {
    pub fn new(n_steps: usize) -> Self {
        let mut acc_vec = Vec::new();
        acc_vec.resize_with(n_steps, Default::default);
        Self { acc_vec }
    }
}

impl Obs for MeanCurve {
    fn update(&mut self, curve: &EpidemicCurve) -> Result<()> {
        let n_rows = curve.n_rows();
        let exp_n_rows = self.acc_vec.len();
        if n_rows != exp_n_rows {
            bail!("curve must have {exp_n_rows} rows, but has {n_rows}");
        }
        for (accs, row) in self.acc_vec.iter_mut().zip(curve.rows()) {
            for health in Health::ALL {
                accs[health.column()].add(row.get(health) as f64);
            }
        }
        Ok(())
    }

    fn report(&self) -> serde_json::Value {
        let reports: Vec<_> = self
            .acc_vec
            .iter()
            .map(|accs| accs.each_ref().map(Accumulator::report))
            .collect();
        serde_json::json!({ "mean_curve": reports })
    }
}

/// Aggregates observables over the curves of all runs.
pub struct Analyzer {
    obs_ptr_vec: Vec<Box<dyn Obs>>,
    n_runs: usize,
}

impl Analyzer {
    pub fn new(n_steps: usize) -> Self {
        let obs_ptr_vec: Vec<Box<dyn Obs>> = vec![
            Box::new(Peak::new()),
            Box::new(AttackRate::new()),
            Box::new(MeanCurve::new(n_steps)),
        ];
        Self {
            obs_ptr_vec,
            n_runs: 0,
        }
    }

    pub fn add_curve(&mut self, curve: &EpidemicCurve) -> Result<()> {
        for obs in &mut self.obs_ptr_vec {
            obs.update(curve).context("failed to update observable")?;
        }
        self.n_runs += 1;
        Ok(())
    }

    pub fn add_file<P: AsRef<Path>>(&mut self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);
        let curve: EpidemicCurve =
            decode::from_read(&mut reader).context("failed to deserialize curve")?;
        self.add_curve(&curve)
    }

    pub fn save_results<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let writer = BufWriter::new(file);

        let reports: Vec<_> = self.obs_ptr_vec.iter().map(|obs| obs.report()).collect();
        let results = serde_json::json!({ "n_runs": self.n_runs, "observables": reports });
        serde_json::to_writer_pretty(writer, &results).context("failed to serialize results")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::StateCounts;

    fn curve(rows: &[(usize, usize, usize)]) -> EpidemicCurve {
        let mut curve = EpidemicCurve::new(rows.len());
        for (i_step, &(s, i, r)) in rows.iter().enumerate() {
            let counts = StateCounts {
                susceptible: s,
                infected: i,
                recovered: r,
            };
            curve.record(i_step, counts).unwrap();
        }
        curve
    }

    #[test]
    fn peak_takes_first_maximum() {
        let mut peak = Peak::new();
        peak.update(&curve(&[(8, 2, 0), (5, 4, 1), (3, 4, 3), (3, 1, 6)]))
            .unwrap();
        let report = peak.report();
        assert_eq!(report["peak_infected"]["mean"], 4.0);
        assert_eq!(report["peak_step"]["mean"], 1.0);
    }

    #[test]
    fn attack_rate_counts_everyone_not_susceptible() {
        let mut rate = AttackRate::new();
        rate.update(&curve(&[(9, 1, 0), (6, 2, 2)])).unwrap();
        rate.update(&curve(&[(9, 1, 0), (8, 0, 2)])).unwrap();
        let report = rate.report();
        assert!((report["attack_rate"]["mean"].as_f64().unwrap() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn mean_curve_rejects_mismatched_lengths() {
        let mut mean_curve = MeanCurve::new(2);
        mean_curve.update(&curve(&[(9, 1, 0), (8, 1, 1)])).unwrap();
        assert!(mean_curve.update(&curve(&[(9, 1, 0)])).is_err());
    }

    #[test]
    fn empty_curve_is_an_error() {
        let mut analyzer = Analyzer::new(0);
        assert!(analyzer.add_curve(&EpidemicCurve::new(0)).is_err());
    }
}
