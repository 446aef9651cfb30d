use crate::grid::Pos;
use anyhow::Result;
use rand::prelude::*;
use rand_distr::Exp;
use serde::{Deserialize, Serialize};

/// Individual of the population.
///
/// Disease parameters are fixed at creation. The position is only ever
/// changed by the [`Grid`](crate::grid::Grid) and the infection state by the
/// person itself (recovery) or by an infected cellmate (transmission).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    id: usize,
    pos: Option<Pos>,

    transmissibility: f64,
    mobility: f64,
    mean_disease_duration: f64,

    infected: bool,
    remaining_duration: u32,
}

impl Person {
    /// Create a person whose initial infection is decided by `prob_infection`.
    ///
    /// The person starts infected when the uniform draw lands *above*
    /// `prob_infection`.
    pub fn new<R: Rng>(
        id: usize,
        prob_infection: f64,
        transmissibility: f64,
        mobility: f64,
        mean_disease_duration: f64,
        rng: &mut R,
    ) -> Result<Self> {
        let mut person = Self::susceptible(id, transmissibility, mobility, mean_disease_duration);
        if rng.random::<f64>() > prob_infection {
            person.infect(rng)?;
        }
        Ok(person)
    }

    pub fn susceptible(
        id: usize,
        transmissibility: f64,
        mobility: f64,
        mean_disease_duration: f64,
    ) -> Self {
        Self {
            id,
            pos: None,
            transmissibility,
            mobility,
            mean_disease_duration,
            infected: false,
            remaining_duration: 0,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn pos(&self) -> Option<Pos> {
        self.pos
    }

    pub(crate) fn set_pos(&mut self, pos: Pos) {
        self.pos = Some(pos);
    }

    pub fn transmissibility(&self) -> f64 {
        self.transmissibility
    }

    pub fn mobility(&self) -> f64 {
        self.mobility
    }

    pub fn infected(&self) -> bool {
        self.infected
    }

    pub fn remaining_duration(&self) -> u32 {
        self.remaining_duration
    }

    /// Decide whether the person tries to move this tick.
    pub fn wants_to_move<R: Rng>(&self, rng: &mut R) -> bool {
        rng.random::<f64>() < self.mobility
    }

    /// Decide whether this person passes the disease to a susceptible cellmate.
    pub fn transmits<R: Rng>(&self, rng: &mut R) -> bool {
        rng.random::<f64>() < self.transmissibility
    }

    /// Become infected and draw the length of the illness.
    pub fn infect<R: Rng>(&mut self, rng: &mut R) -> Result<()> {
        let duration_dist = Exp::new(1.0 / self.mean_disease_duration)?;
        self.remaining_duration = duration_dist.sample(rng).round() as u32;
        self.infected = true;
        Ok(())
    }

    /// Count down one tick of illness, recovering when nothing is left.
    pub fn progress_disease(&mut self) {
        if !self.infected {
            return;
        }
        self.remaining_duration = self.remaining_duration.saturating_sub(1);
        if self.remaining_duration == 0 {
            self.infected = false;
        }
    }

    #[cfg(test)]
    pub(crate) fn infect_for(&mut self, duration: u32) {
        self.infected = true;
        self.remaining_duration = duration;
    }
}

/// What a renderer needs to know about an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentView {
    pub id: usize,
    pub pos: Pos,
    pub infected: bool,
}

/// Snapshot of the whole population at a given tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Number of completed ticks.
    pub tick: usize,

    /// Grid dimensions as `(width, height)`.
    pub dim: (usize, usize),

    pub agents: Vec<AgentView>,
}

impl Frame {
    pub fn n_infected(&self) -> usize {
        self.agents.iter().filter(|agt| agt.infected).count()
    }
}
