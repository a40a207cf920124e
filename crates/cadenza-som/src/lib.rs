//! Self-organizing map for cadenza.
//!
//! Projects high-dimensional feature vectors onto a 2-D grid of neurons so
//! that similar vectors land on the same or neighbouring cells.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod cancel;
pub mod error;
pub mod matrix;
pub mod network;
pub mod normalizer;

pub use cancel::CancellationToken;
pub use error::{SomError, SomResult};
pub use matrix::{Coordinate, Matrix, Position};
pub use network::{LearningSchedule, Network, NetworkTrainer, Progress, TrainOutcome};
pub use normalizer::DataNormalizer;

/// A single sample, or a neuron's reference vector.
pub type InputVector = Vec<f64>;
