//! Toroidal lattice holding the position of every agent.

use crate::model::Person;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coordinate of a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pos {
    pub x: usize,
    pub y: usize,
}

impl Pos {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum GridError {
    #[error("position {pos:?} is outside the {width}x{height} grid")]
    InvalidPosition {
        pos: Pos,
        width: usize,
        height: usize,
    },

    #[error("every cell of the grid is occupied")]
    NoEmptyCell,

    #[error("agent {id} has not been placed on the grid")]
    Unplaced { id: usize },
}

/// Multi-occupancy grid whose edges wrap around on both axes.
///
/// Each cell stores the ids of the agents standing on it, in arrival order.
/// Empty cells are additionally indexed so that a random one can be drawn
/// without scanning the grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Vec<usize>>,

    /// Indices of the cells with no occupants, in no particular order.
    empty: Vec<usize>,
    /// Slot of each cell in `empty`, or `OCCUPIED`.
    empty_slot: Vec<usize>,
}

const OCCUPIED: usize = usize::MAX;

impl Grid {
    pub fn new(width: usize, height: usize) -> Self {
        let n_cells = width * height;
        let mut cells = Vec::new();
        cells.resize_with(n_cells, Vec::new);
        Self {
            width,
            height,
            cells,
            empty: (0..n_cells).collect(),
            empty_slot: (0..n_cells).collect(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Map signed coordinates onto the torus.
    pub fn wrap(&self, x: i64, y: i64) -> Pos {
        Pos {
            x: x.rem_euclid(self.width as i64) as usize,
            y: y.rem_euclid(self.height as i64) as usize,
        }
    }

    /// Moore neighborhood of `pos`, wrapped around the edges.
    ///
    /// Coordinates are unique. On grids narrower than three cells the wrapped
    /// neighbors can coincide with `pos` itself even if `include_center` is false.
    pub fn neighborhood(&self, pos: Pos, include_center: bool) -> Vec<Pos> {
        let mut coords = Vec::with_capacity(9);
        for dy in -1..=1_i64 {
            for dx in -1..=1_i64 {
                if dx == 0 && dy == 0 && !include_center {
                    continue;
                }
                let coord = self.wrap(pos.x as i64 + dx, pos.y as i64 + dy);
                if !coords.contains(&coord) {
                    coords.push(coord);
                }
            }
        }
        coords
    }

    pub fn cell_contents(&self, pos: Pos) -> &[usize] {
        &self.cells[self.index(pos)]
    }

    pub fn n_empty(&self) -> usize {
        self.empty.len()
    }

    /// Iterate over every cell together with its occupants.
    pub fn cells(&self) -> impl Iterator<Item = (Pos, &[usize])> {
        self.cells
            .iter()
            .enumerate()
            .map(|(i_cell, ids)| (self.pos(i_cell), ids.as_slice()))
    }

    pub fn place_agent(&mut self, agent: &mut Person, pos: Pos) -> Result<(), GridError> {
        self.check_bounds(pos)?;
        let i_cell = self.index(pos);
        self.add_to_cell(i_cell, agent.id());
        agent.set_pos(pos);
        Ok(())
    }

    pub fn move_agent(&mut self, agent: &mut Person, new_pos: Pos) -> Result<(), GridError> {
        self.check_bounds(new_pos)?;
        let id = agent.id();
        let old_pos = agent.pos().ok_or(GridError::Unplaced { id })?;

        let i_old = self.index(old_pos);
        let old_cell = &mut self.cells[i_old];
        let i_slot = old_cell
            .iter()
            .position(|&other| other == id)
            .ok_or(GridError::Unplaced { id })?;
        old_cell.remove(i_slot);
        if old_cell.is_empty() {
            self.empty_slot[i_old] = self.empty.len();
            self.empty.push(i_old);
        }

        let i_cell = self.index(new_pos);
        self.add_to_cell(i_cell, id);
        agent.set_pos(new_pos);
        Ok(())
    }

    /// Pick a uniformly random cell with no occupants.
    pub fn find_empty_cell<R: Rng>(&self, rng: &mut R) -> Result<Pos, GridError> {
        let &i_cell = self.empty.choose(rng).ok_or(GridError::NoEmptyCell)?;
        Ok(self.pos(i_cell))
    }

    /// Pick a uniformly random cell regardless of occupancy.
    pub fn random_cell<R: Rng>(&self, rng: &mut R) -> Pos {
        Pos {
            x: rng.random_range(0..self.width),
            y: rng.random_range(0..self.height),
        }
    }

    fn check_bounds(&self, pos: Pos) -> Result<(), GridError> {
        if pos.x >= self.width || pos.y >= self.height {
            return Err(GridError::InvalidPosition {
                pos,
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    fn add_to_cell(&mut self, i_cell: usize, id: usize) {
        if self.cells[i_cell].is_empty() {
            let i_slot = self.empty_slot[i_cell];
            self.empty.swap_remove(i_slot);
            if let Some(&i_moved) = self.empty.get(i_slot) {
                self.empty_slot[i_moved] = i_slot;
            }
            self.empty_slot[i_cell] = OCCUPIED;
        }
        self.cells[i_cell].push(id);
    }

    fn index(&self, pos: Pos) -> usize {
        pos.y * self.width + pos.x
    }

    fn pos(&self, i_cell: usize) -> Pos {
        Pos::new(i_cell % self.width, i_cell / self.width)
    }
}
