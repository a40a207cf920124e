use cadenza_core::{FeatureDef, FeatureName};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{EngineError, EngineResult};

/// How much one feature counts in distance computations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureSettings {
    pub weight: f64,
}

/// Features taking part in training, keyed (and therefore ordered) by name.
pub type FeatureSettingsMap = BTreeMap<FeatureName, FeatureSettings>;

/// Parameters of one training run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainSettings {
    pub feature_settings: FeatureSettingsMap,
    pub iteration_count: usize,
    pub sample_count_per_neuron: f64,
    /// Fixed seed for reproducible runs; random when `None`.
    pub seed: Option<u64>,
}

impl Default for TrainSettings {
    fn default() -> Self {
        Self {
            feature_settings: default_feature_settings(),
            iteration_count: 10,
            sample_count_per_neuron: 4.0,
            seed: None,
        }
    }
}

impl TrainSettings {
    pub fn validate(&self) -> EngineResult<()> {
        if self.feature_settings.is_empty() {
            return Err(EngineError::InvalidSettings("no features selected".into()));
        }
        for (name, settings) in &self.feature_settings {
            FeatureDef::of(name.as_str())?;
            if !(settings.weight.is_finite() && settings.weight > 0.0) {
                return Err(EngineError::InvalidSettings(format!(
                    "weight of '{}' must be positive, got {}",
                    name, settings.weight
                )));
            }
        }
        if self.iteration_count == 0 {
            return Err(EngineError::InvalidSettings(
                "iteration count must be positive".into(),
            ));
        }
        if !(self.sample_count_per_neuron.is_finite() && self.sample_count_per_neuron > 0.0) {
            return Err(EngineError::InvalidSettings(format!(
                "sample count per neuron must be positive, got {}",
                self.sample_count_per_neuron
            )));
        }
        Ok(())
    }
}

/// The feature set used when nothing else is configured.
pub fn default_feature_settings() -> FeatureSettingsMap {
    [
        "lowlevel.spectral_energyband_high.mean",
        "lowlevel.spectral_rolloff.median",
        "lowlevel.spectral_contrast_valleys.var",
        "lowlevel.erbbands.mean",
        "lowlevel.gfcc.mean",
    ]
    .into_iter()
    .map(|name| (FeatureName::from(name), FeatureSettings { weight: 1.0 }))
    .collect()
}
