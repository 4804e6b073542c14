//! Headless training environment for agent evolution
//!
//! This module provides infrastructure for evolving foraging agents offline:
//! - A foraging arena producing observations and episode outcomes
//! - The generational training loop with dumps, logs and checkpoints

mod arena;
mod training_env;

pub use arena::{Agent, ArenaConfig, Direction, ForagingArena, DIRECTIONS, OBSERVATION_SIZE};
pub use training_env::{load_genome, replay_checkpoint, save_genome, TrainingEnv};
