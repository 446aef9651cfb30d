use crate::environment::Params;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Simulation configuration.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Config {
    pub model: ModelConfig,
    pub init: InitConfig,
    pub output: OutputConfig,
}

/// Grid and disease parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Grid width.
    pub width: usize,
    /// Grid height.
    pub height: usize,

    /// Probability of infecting a susceptible cellmate per tick.
    pub transmissibility: f64,
    /// Probability of attempting a move per tick.
    pub mobility: f64,
    /// Mean disease duration in ticks.
    pub mean_disease_duration: f64,
}

/// Initial condition parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct InitConfig {
    /// Number of agents.
    pub n_agents: usize,
    /// Threshold of the initial infection draw.
    pub prob_infection: f64,
    /// Seed of the random number generator (drawn from the OS if absent).
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Output parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Number of steps per trajectory file.
    pub steps_per_file: usize,
    /// Number of steps between saved frames.
    pub steps_per_save: usize,
}

impl Config {
    /// Load a [`Config`] from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        let config: Config = toml::from_str(&contents).context("failed to parse config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    /// Environment parameters described by this configuration.
    pub fn params(&self) -> Params {
        Params {
            n_agents: self.init.n_agents,
            width: self.model.width,
            height: self.model.height,
            prob_infection: self.init.prob_infection,
            transmissibility: self.model.transmissibility,
            mobility: self.model.mobility,
            mean_disease_duration: self.model.mean_disease_duration,
        }
    }

    pub fn saves_per_file(&self) -> usize {
        self.output.steps_per_file / self.output.steps_per_save
    }

    fn validate(&self) -> Result<()> {
        check_num(self.model.width, 1..=10_000).context("invalid grid width")?;
        check_num(self.model.height, 1..=10_000).context("invalid grid height")?;
        check_num(self.model.transmissibility, 0.0..=1.0).context("invalid transmissibility")?;
        check_num(self.model.mobility, 0.0..=1.0).context("invalid mobility")?;
        check_positive(self.model.mean_disease_duration, 10_000.0)
            .context("invalid mean disease duration")?;

        check_num(self.init.n_agents, 1..=1_000_000).context("invalid number of agents")?;
        check_num(self.init.prob_infection, 0.0..=1.0)
            .context("invalid initial infection probability")?;

        check_num(self.output.steps_per_save, 1..=1_000_000)
            .context("invalid number of steps per save")?;
        check_num(self.output.steps_per_file, 1..=1_000_000_000)
            .context("invalid number of steps per file")?;
        if self.output.steps_per_file % self.output.steps_per_save != 0 {
            bail!("steps_per_file must be a multiple of steps_per_save");
        }

        Ok(())
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

fn check_positive(num: f64, max: f64) -> Result<()> {
    if !(num > 0.0 && num <= max) {
        bail!("number must be positive and at most {max:?}, but is {num:?}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
[model]
width = 10
height = 10
transmissibility = 0.2
mobility = 0.5
mean_disease_duration = 10.0

[init]
n_agents = 20
prob_infection = 0.3
seed = 7

[output]
steps_per_file = 256
steps_per_save = 16
"#;

    fn parse(contents: &str) -> Result<Config> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    #[test]
    fn parses_valid_config() {
        let config = parse(CONFIG).unwrap();
        assert_eq!(config.init.seed, Some(7));
        assert_eq!(config.saves_per_file(), 16);

        let par = config.params();
        assert_eq!(par.n_agents, 20);
        assert_eq!((par.width, par.height), (10, 10));
        assert_eq!(par.prob_infection, 0.3);
    }

    #[test]
    fn seed_is_optional() {
        let config = parse(&CONFIG.replace("seed = 7\n", "")).unwrap();
        assert_eq!(config.init.seed, None);
    }

    #[test]
    fn rejects_out_of_range_probability() {
        let contents = CONFIG.replace("mobility = 0.5", "mobility = 1.5");
        assert!(parse(&contents).is_err());
    }

    #[test]
    fn rejects_non_positive_duration() {
        let contents = CONFIG.replace("mean_disease_duration = 10.0", "mean_disease_duration = 0.0");
        assert!(parse(&contents).is_err());
    }

    #[test]
    fn rejects_empty_grid() {
        let contents = CONFIG.replace("width = 10", "width = 0");
        assert!(parse(&contents).is_err());
    }

    #[test]
    fn rejects_uneven_save_interval() {
        let contents = CONFIG.replace("steps_per_save = 16", "steps_per_save = 15");
        assert!(parse(&contents).is_err());
    }
}
