//! Stochastic agent-based model of disease spread on a toroidal grid.
//!
//! The [`environment::Environment`] owns a [`grid::Grid`] and a population of
//! [`model::Person`]s. Each call to [`environment::Environment::step`] lets
//! every person move, infect susceptible cellmates and count down its own
//! illness, in a random order drawn anew at every tick.

pub mod analysis;
pub mod config;
pub mod engine;
pub mod environment;
pub mod grid;
pub mod manager;
pub mod model;
pub mod stats;
