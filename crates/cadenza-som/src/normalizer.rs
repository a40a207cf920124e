use crate::InputVector;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Factor {
    min: f64,
    delta: f64,
}

/// Per-dimension min-max scaling computed from a whole sample corpus.
///
/// The factors only exist once computed, so a sample can never be
/// normalized against a partial corpus.
#[derive(Debug, Clone, PartialEq)]
pub struct DataNormalizer {
    factors: Vec<Factor>,
}

impl DataNormalizer {
    /// Single pass over every sample to find each dimension's range.
    ///
    /// # Panics
    ///
    /// Panics if a sample does not have `dimensions` values.
    pub fn compute_normalization_factors(dimensions: usize, samples: &[InputVector]) -> Self {
        let mut min = vec![f64::INFINITY; dimensions];
        let mut max = vec![f64::NEG_INFINITY; dimensions];

        for sample in samples {
            assert_eq!(sample.len(), dimensions, "sample dimension mismatch");
            for (i, &value) in sample.iter().enumerate() {
                min[i] = min[i].min(value);
                max[i] = max[i].max(value);
            }
        }

        let factors = min
            .into_iter()
            .zip(max)
            .map(|(min, max)| {
                if min.is_finite() && max.is_finite() {
                    Factor {
                        min,
                        delta: max - min,
                    }
                } else {
                    Factor { min: 0.0, delta: 0.0 }
                }
            })
            .collect();

        Self { factors }
    }

    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.factors.len()
    }

    /// Rescale a sample into `[0, 1]` per dimension. Dimensions that never
    /// varied across the corpus map to `0.0`.
    ///
    /// # Panics
    ///
    /// Panics if the sample does not have the normalizer's dimensionality.
    pub fn normalize(&self, sample: &[f64]) -> InputVector {
        assert_eq!(sample.len(), self.factors.len(), "sample dimension mismatch");

        sample
            .iter()
            .zip(&self.factors)
            .map(|(&value, factor)| {
                if factor.delta > 0.0 {
                    (value - factor.min) / factor.delta
                } else {
                    0.0
                }
            })
            .collect()
    }
}
