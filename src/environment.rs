use crate::grid::{Grid, GridError};
use crate::model::{AgentView, Frame, Person};
use anyhow::{Context, Result};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};

/// Fixed parameters of an environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Params {
    /// Number of agents.
    pub n_agents: usize,
    /// Grid width.
    pub width: usize,
    /// Grid height.
    pub height: usize,

    /// Threshold of the initial infection draw.
    pub prob_infection: f64,
    /// Probability of infecting a susceptible cellmate per tick.
    pub transmissibility: f64,
    /// Probability of attempting a move per tick.
    pub mobility: f64,
    /// Mean of the exponentially distributed disease duration.
    pub mean_disease_duration: f64,
}

/// Simulation model: the grid, the population living on it, and the random
/// source driving everything.
#[derive(Serialize, Deserialize)]
pub struct Environment {
    grid: Grid,
    people: Vec<Person>,
    rng: ChaCha12Rng,
    running: bool,
    tick: usize,
}

impl Environment {
    /// Create the population and scatter it over the grid.
    ///
    /// Agents are put on empty cells while there are any; once the grid is
    /// saturated the remaining agents go to random cells.
    pub fn new(par: &Params, mut rng: ChaCha12Rng) -> Result<Self> {
        let mut grid = Grid::new(par.width, par.height);
        let mut people = Vec::with_capacity(par.n_agents);

        for id in 0..par.n_agents {
            let mut person = Person::new(
                id,
                par.prob_infection,
                par.transmissibility,
                par.mobility,
                par.mean_disease_duration,
                &mut rng,
            )
            .with_context(|| format!("failed to create agent {id}"))?;

            let pos = match grid.find_empty_cell(&mut rng) {
                Ok(pos) => pos,
                Err(GridError::NoEmptyCell) => {
                    let pos = grid.random_cell(&mut rng);
                    log::debug!("grid is full, placing agent {id} at {pos:?}");
                    pos
                }
                Err(error) => return Err(error.into()),
            };
            grid.place_agent(&mut person, pos)
                .with_context(|| format!("failed to place agent {id}"))?;

            people.push(person);
        }

        Ok(Self {
            grid,
            people,
            rng,
            running: true,
            tick: 0,
        })
    }

    /// Advance the simulation by one tick.
    ///
    /// Every agent acts once, in an order reshuffled at each tick. Changes
    /// made by an agent are seen by the agents acting after it.
    pub fn step(&mut self) -> Result<()> {
        let mut order: Vec<usize> = (0..self.people.len()).collect();
        order.shuffle(&mut self.rng);

        for i_agt in order {
            self.step_agent(i_agt)
                .with_context(|| format!("failed to step agent {i_agt}"))?;
        }

        self.tick += 1;
        log::debug!("tick {}: {} infected", self.tick, self.n_infected());

        Ok(())
    }

    fn step_agent(&mut self, i_agt: usize) -> Result<()> {
        let person = &mut self.people[i_agt];

        if person.wants_to_move(&mut self.rng) {
            let pos = person.pos().ok_or(GridError::Unplaced { id: i_agt })?;
            let &new_pos = self
                .grid
                .neighborhood(pos, false)
                .choose(&mut self.rng)
                .context("failed to choose a neighboring cell")?;
            self.grid.move_agent(person, new_pos)?;
        }

        if !person.infected() {
            return Ok(());
        }

        let pos = person.pos().ok_or(GridError::Unplaced { id: i_agt })?;
        let cellmates = self.grid.cell_contents(pos).to_vec();
        for i_mate in cellmates {
            if i_mate == i_agt || self.people[i_mate].infected() {
                continue;
            }
            if self.people[i_agt].transmits(&mut self.rng) {
                self.people[i_mate]
                    .infect(&mut self.rng)
                    .with_context(|| format!("failed to infect agent {i_mate}"))?;
            }
        }

        self.people[i_agt].progress_disease();

        Ok(())
    }

    pub fn running(&self) -> bool {
        self.running
    }

    /// Ask the caller's loop to stop stepping.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Number of completed ticks.
    pub fn tick(&self) -> usize {
        self.tick
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn agents(&self) -> &[Person] {
        &self.people
    }

    pub fn n_infected(&self) -> usize {
        self.people.iter().filter(|agt| agt.infected()).count()
    }

    /// Current position and infection state of every agent.
    pub fn snapshot(&self) -> Result<Frame> {
        let agents = self
            .people
            .iter()
            .map(|agt| {
                let pos = agt.pos().ok_or(GridError::Unplaced { id: agt.id() })?;
                Ok(AgentView {
                    id: agt.id(),
                    pos,
                    infected: agt.infected(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Frame {
            tick: self.tick,
            dim: (self.grid.width(), self.grid.height()),
            agents,
        })
    }
}
