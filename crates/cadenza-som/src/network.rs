//! Kohonen network training and lookup.
//!
//! A [`NetworkTrainer`] is an untrained grid. [`NetworkTrainer::train`]
//! consumes it and either yields a trained, immutable [`Network`] or
//! reports that training was aborted, in which case nothing usable is
//! left behind.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeSet;

use crate::cancel::CancellationToken;
use crate::error::{SomError, SomResult};
use crate::matrix::{Coordinate, Matrix, Position};
use crate::InputVector;

/// Influence below which a neuron is left untouched by an update.
const MIN_INFLUENCE: f64 = 1e-6;

/// Training progress snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub current_iteration: usize,
    pub total_iterations: usize,
}

/// Decay of the learning rate and neighbourhood radius over iterations.
///
/// `learning_rate(k) = initial_learning_rate * exp(-k / n)` and
/// `radius(k) = r0 * exp(-k / tau)` where `r0` defaults to half the
/// largest grid side and `tau = n / ln(r0)` (or `n` when `r0 <= 1`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LearningSchedule {
    pub initial_learning_rate: f64,
    pub initial_radius: Option<f64>,
}

impl Default for LearningSchedule {
    fn default() -> Self {
        Self {
            initial_learning_rate: 0.5,
            initial_radius: None,
        }
    }
}

impl LearningSchedule {
    fn learning_rate(&self, iteration: usize, iteration_count: usize) -> f64 {
        self.initial_learning_rate * (-(iteration as f64) / iteration_count as f64).exp()
    }

    fn radius(&self, iteration: usize, iteration_count: usize, width: Coordinate, height: Coordinate) -> f64 {
        let initial = self
            .initial_radius
            .unwrap_or_else(|| f64::from(width.max(height)) / 2.0);
        let time_constant = if initial > 1.0 {
            iteration_count as f64 / initial.ln()
        } else {
            iteration_count as f64
        };
        initial * (-(iteration as f64) / time_constant).exp()
    }
}

/// Result of a training run.
#[derive(Debug)]
pub enum TrainOutcome {
    Trained(Network),
    /// Cancellation was observed before `completed_iterations` + 1.
    Aborted { completed_iterations: usize },
}

/// A grid of reference vectors that has not been trained yet.
#[derive(Debug)]
pub struct NetworkTrainer {
    ref_vectors: Matrix<InputVector>,
    dimensions: usize,
    data_weights: InputVector,
    schedule: LearningSchedule,
    rng: StdRng,
}

impl NetworkTrainer {
    /// Create a `width * height` grid whose reference vectors are drawn
    /// uniformly from `[0, 1)`, the range of normalized samples.
    ///
    /// # Panics
    ///
    /// Panics on an empty grid or zero dimensions.
    pub fn new(width: Coordinate, height: Coordinate, dimensions: usize, mut rng: StdRng) -> Self {
        assert!(width > 0 && height > 0, "empty grid");
        assert!(dimensions > 0, "zero dimensions");

        let ref_vectors = Matrix::from_fn(width, height, |_| {
            (0..dimensions).map(|_| rng.gen::<f64>()).collect()
        });

        Self {
            ref_vectors,
            dimensions,
            data_weights: vec![1.0; dimensions],
            schedule: LearningSchedule::default(),
            rng,
        }
    }

    #[must_use]
    pub fn with_schedule(mut self, schedule: LearningSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Set the per-dimension multipliers used by every distance computation.
    ///
    /// # Panics
    ///
    /// Panics if `weights` does not have the network's dimensionality.
    pub fn set_data_weights(&mut self, weights: InputVector) {
        assert_eq!(
            weights.len(),
            self.dimensions,
            "data weights dimension mismatch"
        );
        self.data_weights = weights;
    }

    /// Train on `samples` for `iteration_count` passes.
    ///
    /// Each iteration checks `cancel` first, reports progress, then visits
    /// every sample once in a fresh random order, pulling the best matching
    /// unit and its grid neighbourhood toward the sample.
    ///
    /// # Panics
    ///
    /// Panics if a sample does not have the network's dimensionality.
    pub fn train(
        mut self,
        samples: &[InputVector],
        iteration_count: usize,
        on_progress: Option<&dyn Fn(Progress)>,
        cancel: &CancellationToken,
    ) -> TrainOutcome {
        for sample in samples {
            assert_eq!(sample.len(), self.dimensions, "sample dimension mismatch");
        }

        let width = self.ref_vectors.width();
        let height = self.ref_vectors.height();
        let mut order: Vec<usize> = (0..samples.len()).collect();

        for iteration in 0..iteration_count {
            if cancel.is_cancelled() {
                log::debug!("Training cancelled at iteration {}", iteration);
                return TrainOutcome::Aborted {
                    completed_iterations: iteration,
                };
            }

            if let Some(on_progress) = on_progress {
                on_progress(Progress {
                    current_iteration: iteration,
                    total_iterations: iteration_count,
                });
            }

            let learning_rate = self.schedule.learning_rate(iteration, iteration_count);
            let radius = self.schedule.radius(iteration, iteration_count, width, height);

            order.shuffle(&mut self.rng);
            for &index in &order {
                let sample = &samples[index];
                let bmu = closest(&self.ref_vectors, &self.data_weights, sample);
                self.update_ref_vectors(bmu, sample, learning_rate, radius);
            }
        }

        TrainOutcome::Trained(Network {
            ref_vectors: self.ref_vectors,
            dimensions: self.dimensions,
            data_weights: self.data_weights,
        })
    }

    fn update_ref_vectors(&mut self, bmu: Position, sample: &[f64], learning_rate: f64, radius: f64) {
        let two_sigma_squared = 2.0 * radius * radius;
        let positions: Vec<Position> = self.ref_vectors.positions().collect();

        for position in positions {
            let influence = learning_rate
                * (-position.grid_distance_squared(bmu) / two_sigma_squared).exp();
            if influence < MIN_INFLUENCE {
                continue;
            }

            for (value, &target) in self.ref_vectors[position].iter_mut().zip(sample) {
                *value += influence * (target - *value);
            }
        }
    }
}

/// A trained network. Immutable.
#[derive(Debug, Clone, PartialEq)]
pub struct Network {
    ref_vectors: Matrix<InputVector>,
    dimensions: usize,
    data_weights: InputVector,
}

impl Network {
    /// Reassemble a trained network, checking every dimensional invariant.
    ///
    /// `ref_vectors` are given in row-major order.
    pub fn from_parts(
        width: Coordinate,
        height: Coordinate,
        dimensions: usize,
        ref_vectors: Vec<InputVector>,
        data_weights: InputVector,
    ) -> SomResult<Self> {
        let cells = ref_vectors.len();
        if width == 0 || height == 0 || dimensions == 0 {
            return Err(SomError::InvalidGrid {
                width,
                height,
                cells,
            });
        }
        if data_weights.len() != dimensions {
            return Err(SomError::DimensionMismatch {
                expected: dimensions,
                actual: data_weights.len(),
            });
        }
        if let Some(bad) = ref_vectors.iter().find(|v| v.len() != dimensions) {
            return Err(SomError::DimensionMismatch {
                expected: dimensions,
                actual: bad.len(),
            });
        }
        if !data_weights.iter().all(|v| v.is_finite()) {
            return Err(SomError::NonFinite("data weights"));
        }
        if !ref_vectors.iter().flatten().all(|v| v.is_finite()) {
            return Err(SomError::NonFinite("reference vectors"));
        }

        let ref_vectors = Matrix::from_cells(width, height, ref_vectors).ok_or(
            SomError::InvalidGrid {
                width,
                height,
                cells,
            },
        )?;

        Ok(Self {
            ref_vectors,
            dimensions,
            data_weights,
        })
    }

    #[must_use]
    pub const fn width(&self) -> Coordinate {
        self.ref_vectors.width()
    }

    #[must_use]
    pub const fn height(&self) -> Coordinate {
        self.ref_vectors.height()
    }

    #[must_use]
    pub const fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn data_weights(&self) -> &[f64] {
        &self.data_weights
    }

    /// Reference vectors in row-major order.
    pub fn ref_vectors(&self) -> &[InputVector] {
        self.ref_vectors.cells()
    }

    /// Best matching unit for `vector`: the neuron at minimum weighted
    /// distance, the first one in row-major order on ties.
    ///
    /// # Panics
    ///
    /// Panics if `vector` does not have the network's dimensionality.
    pub fn closest_position(&self, vector: &[f64]) -> Position {
        assert_eq!(vector.len(), self.dimensions, "vector dimension mismatch");
        closest(&self.ref_vectors, &self.data_weights, vector)
    }

    /// Weighted distance between the reference vectors of two cells.
    pub fn ref_vectors_distance(&self, a: Position, b: Position) -> f64 {
        weighted_distance(&self.ref_vectors[a], &self.ref_vectors[b], &self.data_weights)
    }

    /// Median of the weighted distances between every pair of
    /// edge-adjacent neurons. `0.0` for a single-cell grid.
    pub fn median_neighbor_distance(&self) -> f64 {
        let grid = &self.ref_vectors;
        let mut distances: Vec<f64> = grid
            .positions()
            .flat_map(move |position| {
                [
                    Position::new(position.x + 1, position.y),
                    Position::new(position.x, position.y + 1),
                ]
                .into_iter()
                .filter(move |neighbor| grid.contains(*neighbor))
                .map(move |neighbor| (position, neighbor))
            })
            .map(|(a, b)| self.ref_vectors_distance(a, b))
            .collect();

        if distances.is_empty() {
            return 0.0;
        }

        distances.sort_by(f64::total_cmp);
        let middle = distances.len() / 2;
        if distances.len() % 2 == 0 {
            (distances[middle - 1] + distances[middle]) / 2.0
        } else {
            distances[middle]
        }
    }

    /// Among cells adjacent to `searched` but not in it, the one whose
    /// reference vector is closest to that of a searched cell.
    ///
    /// Used to grow a search area outward from a set of starting cells.
    pub fn closest_unsearched_neighbor(&self, searched: &BTreeSet<Position>) -> Option<Position> {
        let mut best: Option<(Position, f64)> = None;

        for &position in searched {
            for neighbor in self.ref_vectors.neighbors(position) {
                if searched.contains(&neighbor) {
                    continue;
                }
                let distance = self.ref_vectors_distance(position, neighbor);
                if best.map_or(true, |(_, best_distance)| distance < best_distance) {
                    best = Some((neighbor, distance));
                }
            }
        }

        best.map(|(position, _)| position)
    }
}

fn weighted_distance(a: &[f64], b: &[f64], weights: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .zip(weights)
        .map(|((a, b), w)| {
            let d = a - b;
            d * d * w
        })
        .sum::<f64>()
        .sqrt()
}

fn closest(ref_vectors: &Matrix<InputVector>, weights: &[f64], vector: &[f64]) -> Position {
    let mut best = Position::new(0, 0);
    let mut best_distance = f64::INFINITY;

    for (position, ref_vector) in ref_vectors.iter() {
        let distance = weighted_distance(ref_vector, vector, weights);
        if distance < best_distance {
            best = position;
            best_distance = distance;
        }
    }

    best
}
