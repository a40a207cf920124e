//! Conversion of named feature values into fixed-length input vectors.

use cadenza_core::{FeatureDef, FeatureName, FeatureValuesMap};
use cadenza_som::InputVector;
use std::collections::BTreeSet;
use thiserror::Error;

use crate::error::EngineResult;
use crate::settings::FeatureSettingsMap;

/// A track's stored values for a feature do not match its definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("dimension mismatch for feature '{feature}': expected {expected}, got {actual}")]
pub struct DimensionMismatch {
    pub feature: FeatureName,
    pub expected: usize,
    pub actual: usize,
}

/// Resolved definitions of a feature set, in ascending name order.
///
/// Vectors and weights produced from the same layout line up dimension
/// by dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureLayout {
    features: Vec<(FeatureName, FeatureDef)>,
}

impl FeatureLayout {
    /// Fails on any unknown feature name.
    pub fn new(feature_names: &BTreeSet<FeatureName>) -> EngineResult<Self> {
        let features = feature_names
            .iter()
            .map(|name| Ok((name.clone(), FeatureDef::of(name.as_str())?)))
            .collect::<EngineResult<Vec<_>>>()?;
        Ok(Self { features })
    }

    pub fn feature_names(&self) -> BTreeSet<FeatureName> {
        self.features.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Sum of the declared dimensions of every feature.
    pub fn total_dimensions(&self) -> usize {
        self.features.iter().map(|(_, def)| def.nb_dimensions).sum()
    }

    /// Concatenate each feature's values into one vector.
    ///
    /// A feature missing from `values` counts as having zero values.
    pub fn build_input_vector(
        &self,
        values: &FeatureValuesMap,
    ) -> Result<InputVector, DimensionMismatch> {
        let mut vector = InputVector::with_capacity(self.total_dimensions());

        for (name, def) in &self.features {
            let feature_values = values.get(name).map_or(&[][..], Vec::as_slice);
            if feature_values.len() != def.nb_dimensions {
                return Err(DimensionMismatch {
                    feature: name.clone(),
                    expected: def.nb_dimensions,
                    actual: feature_values.len(),
                });
            }
            vector.extend_from_slice(feature_values);
        }

        Ok(vector)
    }

    /// Per-dimension weights: each of a feature's dimensions gets
    /// `weight / nb_dimensions`, so a feature's overall influence depends
    /// on its weight and not on how many dimensions it has. Features
    /// absent from `settings` weigh 1.
    pub fn data_weights(&self, settings: &FeatureSettingsMap) -> InputVector {
        let mut weights = InputVector::with_capacity(self.total_dimensions());

        for (name, def) in &self.features {
            let weight = settings.get(name).map_or(1.0, |s| s.weight);
            let per_dimension = weight / def.nb_dimensions as f64;
            weights.extend(std::iter::repeat(per_dimension).take(def.nb_dimensions));
        }

        weights
    }
}
