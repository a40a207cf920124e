//! Core catalog model for cadenza.
//!
//! This crate defines the opaque catalog identifiers, artist link types,
//! the registry of analysis features, the collaborator traits the
//! recommendation engine consumes, and a SQLite-backed catalog that
//! implements them.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod catalog;
pub mod error;
pub mod features;
pub mod ids;
pub mod link;
pub mod schema;

pub use catalog::{Catalog, FeatureSource};
pub use error::{Error, Result};
pub use features::{FeatureDef, FeatureName, FeatureValuesMap};
pub use ids::{ArtistId, ReleaseId, TrackId, TrackListId};
pub use link::ArtistLinkType;
