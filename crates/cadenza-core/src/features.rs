//! Analysis feature definitions.
//!
//! Features are named by their dotted path in the per-track analysis
//! document (e.g. `lowlevel.spectral_rolloff.median`). Each known feature
//! has a fixed number of dimensions.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{Error, Result};

/// Identifier of one analysis feature.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureName(String);

impl FeatureName {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FeatureName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl Borrow<str> for FeatureName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeatureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Values of several features for one track, keyed by feature name.
pub type FeatureValuesMap = BTreeMap<FeatureName, Vec<f64>>;

/// Static description of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureDef {
    pub nb_dimensions: usize,
}

impl FeatureDef {
    /// Look up the definition of a known feature.
    pub fn of(name: &str) -> Result<Self> {
        FEATURE_DEFS
            .iter()
            .find(|(known, _)| *known == name)
            .map(|&(_, nb_dimensions)| Self { nb_dimensions })
            .ok_or_else(|| Error::UnknownFeature(name.to_string()))
    }
}

const FEATURE_DEFS: &[(&str, usize)] = &[
    ("lowlevel.average_loudness", 1),
    ("lowlevel.barkbands.mean", 27),
    ("lowlevel.barkbands_crest.mean", 1),
    ("lowlevel.barkbands_flatness_db.mean", 1),
    ("lowlevel.dissonance.mean", 1),
    ("lowlevel.dynamic_complexity", 1),
    ("lowlevel.erbbands.mean", 40),
    ("lowlevel.erbbands_crest.mean", 1),
    ("lowlevel.gfcc.mean", 13),
    ("lowlevel.hfc.mean", 1),
    ("lowlevel.melbands.mean", 40),
    ("lowlevel.mfcc.mean", 13),
    ("lowlevel.pitch_salience.mean", 1),
    ("lowlevel.spectral_centroid.mean", 1),
    ("lowlevel.spectral_complexity.mean", 1),
    ("lowlevel.spectral_contrast_coeffs.median", 6),
    ("lowlevel.spectral_contrast_valleys.median", 6),
    ("lowlevel.spectral_contrast_valleys.var", 6),
    ("lowlevel.spectral_energy.mean", 1),
    ("lowlevel.spectral_energyband_high.mean", 1),
    ("lowlevel.spectral_energyband_low.mean", 1),
    ("lowlevel.spectral_energyband_middle_high.mean", 1),
    ("lowlevel.spectral_energyband_middle_low.mean", 1),
    ("lowlevel.spectral_entropy.mean", 1),
    ("lowlevel.spectral_flux.mean", 1),
    ("lowlevel.spectral_rolloff.median", 1),
    ("lowlevel.zerocrossingrate.mean", 1),
    ("rhythm.beats_loudness.mean", 1),
    ("rhythm.bpm", 1),
    ("rhythm.danceability", 1),
    ("rhythm.onset_rate", 1),
    ("tonal.chords_histogram", 24),
    ("tonal.hpcp.mean", 36),
    ("tonal.hpcp_entropy.mean", 1),
    ("tonal.tuning_frequency", 1),
];

/// Extract the requested features from an analysis document.
///
/// Each name is resolved as a dotted path into the document. A number
/// yields one value and (nested) arrays are flattened in order. Names that
/// do not resolve to numeric data are left out of the result.
pub fn extract_feature_values(
    analysis: &serde_json::Value,
    names: &BTreeSet<FeatureName>,
) -> FeatureValuesMap {
    let mut values_map = FeatureValuesMap::new();

    for name in names {
        let node = name
            .as_str()
            .split('.')
            .try_fold(analysis, |node, key| node.get(key));

        let Some(node) = node else {
            log::debug!("Feature '{}' not present in analysis", name);
            continue;
        };

        let mut values = Vec::new();
        if flatten_numbers(node, &mut values) && !values.is_empty() {
            values_map.insert(name.clone(), values);
        }
    }

    values_map
}

fn flatten_numbers(node: &serde_json::Value, out: &mut Vec<f64>) -> bool {
    match node {
        serde_json::Value::Number(n) => match n.as_f64() {
            Some(v) => {
                out.push(v);
                true
            }
            None => false,
        },
        serde_json::Value::Array(items) => items.iter().all(|item| flatten_numbers(item, out)),
        _ => false,
    }
}
