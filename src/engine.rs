use crate::config::Config;
use crate::environment::Environment;
use anyhow::{Context, Result};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rmp_serde::{decode, encode};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

/// Simulation engine.
///
/// Holds the configuration and the environment being simulated,
/// and provides methods to initialize, run, save, and load simulations.
#[derive(Serialize, Deserialize)]
pub struct Engine {
    cfg: Config,
    env: Environment,
}

impl Engine {
    /// Create a new `Engine` with the given configuration and a random initial state.
    pub fn generate_initial_condition(cfg: Config) -> Result<Self> {
        let rng = match cfg.init.seed {
            Some(seed) => ChaCha12Rng::seed_from_u64(seed),
            None => ChaCha12Rng::try_from_os_rng()?,
        };

        let env = Environment::new(&cfg.params(), rng).context("failed to construct env")?;
        log::info!(
            "placed {} agents, {} infected",
            env.agents().len(),
            env.n_infected()
        );

        Ok(Self { cfg, env })
    }

    pub fn cfg(&self) -> &Config {
        &self.cfg
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Perform the simulation and save the resulting frames to a binary file.
    pub fn perform_simulation<P: AsRef<Path>>(&mut self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);

        let saves_per_file = self.cfg.saves_per_file();
        for i_save in 0..saves_per_file {
            for _ in 0..self.cfg.output.steps_per_save {
                if !self.env.running() {
                    break;
                }
                self.env.step().context("failed to perform step")?;
            }

            let frame = self.env.snapshot().context("failed to take snapshot")?;
            encode::write(&mut writer, &frame).context("failed to serialize frame")?;

            let progress = 100.0 * (i_save + 1) as f64 / saves_per_file as f64;
            log::info!(
                "completed {progress:06.2}% (tick {}, {} infected)",
                frame.tick,
                frame.n_infected()
            );
        }

        writer.flush().context("failed to flush writer stream")?;

        Ok(())
    }

    /// Save a checkpoint of the entire engine state.
    ///
    /// Can be used to resume the simulation later.
    pub fn save_checkpoint<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);
        encode::write(&mut writer, &self).context("failed to serialize engine")?;
        writer.flush().context("failed to flush writer stream")?;
        Ok(())
    }

    /// Load a previously saved engine checkpoint.
    pub fn load_checkpoint<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);
        let engine = decode::from_read(&mut reader).context("failed to deserialize engine")?;
        Ok(engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{InitConfig, ModelConfig, OutputConfig};
    use crate::model::Frame;
    use std::{env, fs, path::PathBuf};

    fn config(seed: Option<u64>) -> Config {
        Config {
            model: ModelConfig {
                width: 6,
                height: 6,
                transmissibility: 0.3,
                mobility: 0.6,
                mean_disease_duration: 8.0,
            },
            init: InitConfig {
                n_agents: 25,
                prob_infection: 0.7,
                seed,
            },
            output: OutputConfig {
                steps_per_file: 40,
                steps_per_save: 10,
            },
        }
    }

    fn test_dir(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!("epigrid-engine-{name}"));
        fs::remove_dir_all(&dir).ok();
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn read_frames(file: &Path, n_frames: usize) -> Vec<Frame> {
        let mut reader = BufReader::new(File::open(file).unwrap());
        (0..n_frames)
            .map(|_| decode::from_read(&mut reader).unwrap())
            .collect()
    }

    #[test]
    fn writes_one_frame_per_save() {
        let dir = test_dir("frames");
        let mut engine = Engine::generate_initial_condition(config(Some(1))).unwrap();
        let file = dir.join("trajectory.msgpack");
        engine.perform_simulation(&file).unwrap();

        let frames = read_frames(&file, 4);
        let ticks: Vec<_> = frames.iter().map(|frame| frame.tick).collect();
        assert_eq!(ticks, vec![10, 20, 30, 40]);
        assert!(frames.iter().all(|frame| frame.agents.len() == 25));
        assert!(frames.iter().all(|frame| frame.dim == (6, 6)));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn resumed_checkpoint_matches_uninterrupted_run() {
        let dir = test_dir("checkpoint");

        let mut straight = Engine::generate_initial_condition(config(Some(9))).unwrap();
        straight.perform_simulation(dir.join("a0.msgpack")).unwrap();
        straight.perform_simulation(dir.join("a1.msgpack")).unwrap();

        let mut first = Engine::generate_initial_condition(config(Some(9))).unwrap();
        first.perform_simulation(dir.join("b0.msgpack")).unwrap();
        first.save_checkpoint(dir.join("checkpoint.msgpack")).unwrap();
        drop(first);

        let mut resumed = Engine::load_checkpoint(dir.join("checkpoint.msgpack")).unwrap();
        assert_eq!(resumed.cfg(), &config(Some(9)));
        resumed.perform_simulation(dir.join("b1.msgpack")).unwrap();

        assert_eq!(
            read_frames(&dir.join("a1.msgpack"), 4),
            read_frames(&dir.join("b1.msgpack"), 4)
        );
        assert_eq!(resumed.env().tick(), 80);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn unseeded_engine_starts() {
        let engine = Engine::generate_initial_condition(config(None)).unwrap();
        assert_eq!(engine.env().agents().len(), 25);
    }
}
