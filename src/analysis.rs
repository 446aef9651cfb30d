use crate::config::Config;
use crate::grid::Pos;
use crate::model::Frame;
use crate::stats::{RunningStats, Series};
use anyhow::{Context, Result};
use rmp_serde::{decode, encode};
use serde::Serialize;
use serde_value::Value;
use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

/// Quantity measured on every recorded frame.
pub trait Obs {
    fn update(&mut self, frame: &Frame) -> Result<()>;
    fn report(&self) -> Result<Value>;
}

fn named_report<T: Serialize>(name: &str, report: T) -> Result<Value> {
    let mut map = BTreeMap::new();
    map.insert(Value::String(name.to_string()), serde_value::to_value(report)?);
    Ok(Value::Map(map))
}

/// Agents per occupied cell, keyed by cell.
fn occupancy(frame: &Frame) -> BTreeMap<(usize, usize), (usize, usize)> {
    let mut cells = BTreeMap::new();
    for agt in &frame.agents {
        let Pos { x, y } = agt.pos;
        let (n_agents, n_infected) = cells.entry((x, y)).or_insert((0, 0));
        *n_agents += 1;
        if agt.infected {
            *n_infected += 1;
        }
    }
    cells
}

/// Fraction of the population that is infected.
#[derive(Default)]
pub struct Prevalence {
    series: Series,
}

impl Obs for Prevalence {
    fn update(&mut self, frame: &Frame) -> Result<()> {
        if frame.agents.is_empty() {
            return Ok(());
        }
        let frac = frame.n_infected() as f64 / frame.agents.len() as f64;
        self.series.push(frac);
        Ok(())
    }

    fn report(&self) -> Result<Value> {
        named_report("prevalence", self.series.report())
    }
}

/// Mean number of agents sharing an occupied cell.
#[derive(Default)]
pub struct Crowding {
    stats: RunningStats,
}

impl Obs for Crowding {
    fn update(&mut self, frame: &Frame) -> Result<()> {
        let cells = occupancy(frame);
        if cells.is_empty() {
            return Ok(());
        }
        self.stats.add(frame.agents.len() as f64 / cells.len() as f64);
        Ok(())
    }

    fn report(&self) -> Result<Value> {
        named_report("crowding", self.stats.report())
    }
}

/// Fraction of occupied cells hosting at least one infected agent.
#[derive(Default)]
pub struct InfectedCells {
    stats: RunningStats,
}

impl Obs for InfectedCells {
    fn update(&mut self, frame: &Frame) -> Result<()> {
        let cells = occupancy(frame);
        if cells.is_empty() {
            return Ok(());
        }
        let n_infected_cells = cells.values().filter(|&&(_, n_inf)| n_inf > 0).count();
        self.stats.add(n_infected_cells as f64 / cells.len() as f64);
        Ok(())
    }

    fn report(&self) -> Result<Value> {
        named_report("cells_with_infection", self.stats.report())
    }
}

pub struct Analyzer {
    cfg: Config,
    obs_ptr_vec: Vec<Box<dyn Obs>>,
}

impl Analyzer {
    pub fn new(cfg: Config) -> Self {
        let obs_ptr_vec: Vec<Box<dyn Obs>> = vec![
            Box::new(Prevalence::default()),
            Box::new(Crowding::default()),
            Box::new(InfectedCells::default()),
        ];
        Self { cfg, obs_ptr_vec }
    }

    pub fn add_frame(&mut self, frame: &Frame) -> Result<()> {
        for obs in &mut self.obs_ptr_vec {
            obs.update(frame).context("failed to update observable")?;
        }
        Ok(())
    }

    pub fn add_file<P: AsRef<Path>>(&mut self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);

        for _ in 0..self.cfg.saves_per_file() {
            let frame: Frame = decode::from_read(&mut reader).context("failed to read frame")?;
            self.add_frame(&frame)?;
        }
        Ok(())
    }

    pub fn reports(&self) -> Result<Vec<Value>> {
        self.obs_ptr_vec.iter().map(|obs| obs.report()).collect()
    }

    pub fn save_results<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);

        let reports = self.reports().context("failed to build reports")?;
        encode::write_named(&mut writer, &reports).context("failed to serialize results")?;
        writer.flush().context("failed to flush writer stream")?;
        Ok(())
    }
}
