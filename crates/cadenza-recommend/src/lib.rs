//! Feature-based similarity engine for cadenza.
//!
//! Trains a self-organizing map over per-track audio features, indexes
//! tracks, releases and artists by the grid cells their tracks landed on,
//! and answers "similar to" queries from that index.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod memory;
pub mod model;
pub mod settings;
pub mod vector;

pub use cache::ModelCache;
pub use config::Config;
pub use engine::{grid_size, FeaturesEngine, LoadOutcome, ModelStatus};
pub use error::{CacheError, EngineError, EngineResult};
pub use index::{EntityPositions, PositionIndex};
pub use memory::MemoryCatalog;
pub use model::{TrackPositions, TrainedModel};
pub use settings::{FeatureSettings, FeatureSettingsMap, TrainSettings};
pub use vector::{DimensionMismatch, FeatureLayout};
