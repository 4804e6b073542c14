//! # Forage - NEAT-trained foraging agents
//!
//! Headless host that evolves controllers for a top-down foraging game with
//! the `forage_neat` engine.

pub mod config;
pub mod headless;

pub use config::ForageConfig;
pub use headless::TrainingEnv;
