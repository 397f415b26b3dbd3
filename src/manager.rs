use crate::analysis::Analyzer;
use crate::config::Config;
use crate::curve::EpidemicCurve;
use crate::model::Model;
use crate::rng::RandomSource;
use anyhow::{Context, Result};
use glob::glob;
use rmp_serde::{decode, encode};
use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

/// Owns a simulation directory: its config file, run directories and
/// analysis results.
pub struct Manager {
    sim_dir: PathBuf,
    cfg: Config,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(sim_dir: P) -> Result<Self> {
        let sim_dir = sim_dir.as_ref().to_path_buf();

        let cfg =
            Config::from_file(sim_dir.join("config.toml")).context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        Ok(Self { sim_dir, cfg })
    }

    /// Run a new simulation and save its epidemic curve.
    pub fn create_run(&self) -> Result<()> {
        let run_idx = self.count_run_dirs().context("failed to count run dirs")?;

        let run_dir = self.run_dir(run_idx);
        fs::create_dir_all(&run_dir).with_context(|| format!("failed to create {run_dir:?}"))?;
        log::info!("created {run_dir:?}");

        let mut model =
            Model::new(self.cfg.params(run_idx)).context("failed to construct model")?;
        let params = model.params();
        log::info!("seed {} contact rate {}", params.seed, params.contact_rate);
        if model.is_verbose() != self.cfg.run.verbose {
            model.toggle_verbose();
        }
        model.print();

        model.run().context("failed to run model")?;

        let curve = model.epidemic_curve();
        save_curve(curve, self.curve_file(run_idx)).context("failed to save curve")?;
        save_table(curve, self.table_file(run_idx)).context("failed to save table")?;

        if let Some(last) = curve.rows().last() {
            log::info!(
                "finished run {run_idx} after {} steps and {} draws: {{S, I, R}} = {{{}, {}, {}}}",
                model.n_steps_done(),
                model.rng().n_draws(),
                last.susceptible,
                last.infected,
                last.recovered
            );
        }

        Ok(())
    }

    /// Print the epidemic curve of a run to stdout.
    pub fn print_run(&self, run_idx: usize) -> Result<()> {
        let curve_file = self.curve_file(run_idx);
        let curve =
            load_curve(&curve_file).with_context(|| format!("failed to load {curve_file:?}"))?;

        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "Epidemic curve (columns: S, I, R):")?;
        write!(stdout, "{curve}")?;
        stdout.flush()?;

        Ok(())
    }

    /// Aggregate the observables of every run.
    pub fn analyze_sim(&self) -> Result<()> {
        let mut analyzer = Analyzer::new(self.cfg.run.n_steps);

        let n_runs = self.count_run_dirs().context("failed to count run dirs")?;
        for run_idx in 0..n_runs {
            analyzer
                .add_file(self.curve_file(run_idx))
                .with_context(|| format!("failed to add run {run_idx}"))?;
        }

        let results_file = self.results_file();
        analyzer
            .save_results(&results_file)
            .context("failed to save results")?;
        log::info!("analyzed {n_runs} runs into {results_file:?}");

        Ok(())
    }

    /// Remove every run directory and the analysis results.
    pub fn clean_sim(&self) -> Result<()> {
        let n_runs = self.count_run_dirs().context("failed to count run dirs")?;
        for run_idx in 0..n_runs {
            let run_dir = self.run_dir(run_idx);
            fs::remove_dir_all(&run_dir)
                .with_context(|| format!("failed to remove {run_dir:?}"))?;
            log::info!("removed {run_dir:?}");
        }

        let results_file = self.results_file();
        if results_file.exists() {
            fs::remove_file(&results_file)
                .with_context(|| format!("failed to remove {results_file:?}"))?;
            log::info!("removed {results_file:?}");
        }

        Ok(())
    }

    fn count_run_dirs(&self) -> Result<usize> {
        let pattern = self.sim_dir.join("run-*");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let count = glob(pattern)
            .context("failed to glob run dirs")?
            .filter_map(Result::ok)
            .filter(|p| p.is_dir())
            .count();
        Ok(count)
    }

    fn run_dir(&self, run_idx: usize) -> PathBuf {
        self.sim_dir.join(format!("run-{run_idx:04}"))
    }

    fn curve_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("curve.msgpack")
    }

    fn table_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("curve.txt")
    }

    fn results_file(&self) -> PathBuf {
        self.sim_dir.join("analysis.json")
    }
}

fn save_curve<P: AsRef<Path>>(curve: &EpidemicCurve, file: P) -> Result<()> {
    let file = file.as_ref();
    let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
    let mut writer = BufWriter::new(file);
    encode::write(&mut writer, curve).context("failed to serialize curve")?;
    writer.flush().context("failed to flush writer stream")?;
    Ok(())
}

fn load_curve<P: AsRef<Path>>(file: P) -> Result<EpidemicCurve> {
    let file = file.as_ref();
    let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
    let mut reader = BufReader::new(file);
    let curve = decode::from_read(&mut reader).context("failed to deserialize curve")?;
    Ok(curve)
}

fn save_table<P: AsRef<Path>>(curve: &EpidemicCurve, file: P) -> Result<()> {
    let file = file.as_ref();
    let contents = curve.to_string();
    fs::write(file, contents).with_context(|| format!("failed to write {file:?}"))?;
    Ok(())
}
