//! Training orchestration and similarity queries.

use cadenza_core::{
    ArtistId, ArtistLinkType, Catalog, FeatureSource, ReleaseId, TrackId, TrackListId,
};
use cadenza_som::{
    CancellationToken, Coordinate, DataNormalizer, InputVector, NetworkTrainer, Progress,
    TrainOutcome,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::cache::ModelCache;
use crate::error::{CacheError, EngineResult};
use crate::index::PositionIndex;
use crate::model::{TrackPositions, TrainedModel};
use crate::settings::TrainSettings;
use crate::vector::FeatureLayout;

/// Smallest grid side ever trained.
const MIN_GRID_SIZE: Coordinate = 2;

/// Side of the square grid for a corpus: `floor(sqrt(samples / per_neuron))`,
/// never below 2 and never wider than `sqrt(samples)`.
pub fn grid_size(sample_count: usize, sample_count_per_neuron: f64) -> Coordinate {
    let size = (sample_count as f64 / sample_count_per_neuron).sqrt().floor();
    let max_size = (sample_count as f64)
        .sqrt()
        .floor()
        .max(f64::from(MIN_GRID_SIZE));
    if size > max_size {
        log::warn!(
            "{} samples per neuron would give more neurons than the {} samples, grid size clamped to {}",
            sample_count_per_neuron,
            sample_count,
            max_size
        );
        return max_size as Coordinate;
    }
    if size < f64::from(MIN_GRID_SIZE) {
        log::warn!(
            "{} samples at {} per neuron is too few, grid size clamped to {}",
            sample_count,
            sample_count_per_neuron,
            MIN_GRID_SIZE
        );
        return MIN_GRID_SIZE;
    }
    size as Coordinate
}

/// How a load ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A cached model was adopted without training.
    FromCache,
    /// A freshly trained model was published.
    Trained,
    /// Cancellation was observed; the previous model (if any) is kept.
    Cancelled,
    /// No track yielded a usable sample; the previous model (if any) is kept.
    NoTrainableData,
}

/// Summary of the loaded model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelStatus {
    pub width: Coordinate,
    pub height: Coordinate,
    pub dimensions: usize,
    pub track_count: usize,
    pub median_neighbor_distance: f64,
}

#[derive(Debug)]
struct LoadedModel {
    model: TrainedModel,
    index: PositionIndex,
}

/// Trains, caches and queries the feature-based similarity model.
///
/// A load builds the new model and its index entirely on the side and
/// publishes both in one swap, so queries running concurrently see either
/// the previous model or the new one. Only one load runs at a time.
pub struct FeaturesEngine<C, F> {
    catalog: C,
    features: F,
    cache: Option<ModelCache>,
    train_settings: TrainSettings,
    cancel: CancellationToken,
    loaded: RwLock<Option<Arc<LoadedModel>>>,
    load_lock: Mutex<()>,
}

impl<C, F> fmt::Debug for FeaturesEngine<C, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeaturesEngine")
            .field("cache", &self.cache)
            .field("train_settings", &self.train_settings)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl<C: Catalog, F: FeatureSource> FeaturesEngine<C, F> {
    /// An engine with no cache and the default training settings.
    pub fn new(catalog: C, features: F) -> Self {
        Self {
            catalog,
            features,
            cache: None,
            train_settings: TrainSettings::default(),
            cancel: CancellationToken::new(),
            loaded: RwLock::new(None),
            load_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: ModelCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Settings used when [`load`](Self::load) has to train.
    #[must_use]
    pub fn with_train_settings(mut self, settings: TrainSettings) -> Self {
        self.train_settings = settings;
        self
    }

    /// Share a cancellation flag created elsewhere, e.g. by a signal
    /// handler set up before the engine exists.
    #[must_use]
    pub fn with_cancellation_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Ask any running or future load to stop at its next checkpoint.
    /// A model already published stays in place.
    pub fn request_cancel(&self) {
        log::debug!("Cancellation requested");
        self.cancel.cancel();
    }

    /// Make a model available, reusing the cache unless `force_reload`.
    ///
    /// With `force_reload` the cache is deleted first. Otherwise a valid
    /// cached model is adopted directly; a missing, unreadable or
    /// mismatching cache falls back to training with the engine's train
    /// settings. A freshly trained model is written to the cache.
    pub fn load(
        &self,
        force_reload: bool,
        on_progress: Option<&dyn Fn(Progress)>,
    ) -> EngineResult<LoadOutcome> {
        let _guard = self.load_lock.lock().unwrap_or_else(PoisonError::into_inner);

        if self.cancel.is_cancelled() {
            return Ok(LoadOutcome::Cancelled);
        }

        if let Some(cache) = &self.cache {
            if force_reload {
                log::info!("Forced reload, discarding cached model");
                if let Err(e) = cache.invalidate() {
                    log::warn!("Cannot remove cached model: {}", e);
                }
            } else if let Some(model) = self.read_cache(cache)? {
                return self.adopt(model);
            }
        }

        self.train(&self.train_settings, on_progress)
    }

    /// Train with `settings`, ignoring any cached model.
    pub fn load_from_training(
        &self,
        settings: &TrainSettings,
        on_progress: Option<&dyn Fn(Progress)>,
    ) -> EngineResult<LoadOutcome> {
        let _guard = self.load_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.train(settings, on_progress)
    }

    /// Adopt an already trained model, rebuilding the index from it.
    pub fn load_from_cache(&self, model: TrainedModel) -> EngineResult<LoadOutcome> {
        let _guard = self.load_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.adopt(model)
    }

    /// The loaded model, exactly as it would be cached.
    pub fn to_cache(&self) -> Option<TrainedModel> {
        self.current().map(|loaded| loaded.model.clone())
    }

    pub fn status(&self) -> Option<ModelStatus> {
        self.current().map(|loaded| {
            let network = loaded.model.network();
            ModelStatus {
                width: network.width(),
                height: network.height(),
                dimensions: network.dimensions(),
                track_count: loaded.model.track_positions().len(),
                median_neighbor_distance: network.median_neighbor_distance(),
            }
        })
    }

    pub fn get_similar_tracks(
        &self,
        tracks: &[TrackId],
        max_count: usize,
    ) -> EngineResult<Vec<TrackId>> {
        let Some(loaded) = self.current() else {
            return Ok(Vec::new());
        };

        let found = loaded.index.tracks().similar(
            loaded.model.network(),
            tracks,
            max_count,
            |track| self.catalog.track_exists(track),
        )?;
        Ok(found)
    }

    pub fn get_similar_tracks_from_track_list(
        &self,
        list: TrackListId,
        max_count: usize,
    ) -> EngineResult<Vec<TrackId>> {
        let tracks = self.catalog.track_list_tracks(list)?;
        self.get_similar_tracks(&tracks, max_count)
    }

    pub fn get_similar_releases(
        &self,
        release: ReleaseId,
        max_count: usize,
    ) -> EngineResult<Vec<ReleaseId>> {
        let Some(loaded) = self.current() else {
            return Ok(Vec::new());
        };

        let found = loaded.index.releases().similar(
            loaded.model.network(),
            &[release],
            max_count,
            |release| self.catalog.release_exists(release),
        )?;
        Ok(found)
    }

    /// Artists similar through any of `link_types`.
    ///
    /// The search starts from every cell the artist covers, whatever its
    /// role, and each link type is searched on its own. When the union of
    /// the results exceeds `max_count`, random entries are dropped until it
    /// fits; the result is not ranked.
    pub fn get_similar_artists(
        &self,
        artist: ArtistId,
        link_types: &[ArtistLinkType],
        max_count: usize,
    ) -> EngineResult<Vec<ArtistId>> {
        let Some(loaded) = self.current() else {
            return Ok(Vec::new());
        };

        let cells = loaded.index.artist_cells(artist);
        let link_types: BTreeSet<ArtistLinkType> = link_types.iter().copied().collect();
        let mut found = BTreeSet::new();
        for link_type in link_types {
            found.extend(loaded.index.artists(link_type).similar_near(
                loaded.model.network(),
                cells.clone(),
                &[artist],
                max_count,
                |artist| self.catalog.artist_exists(artist),
            )?);
        }

        let mut found: Vec<ArtistId> = found.into_iter().collect();
        let mut rng = rand::thread_rng();
        while found.len() > max_count {
            let evicted = rng.gen_range(0..found.len());
            found.remove(evicted);
        }
        Ok(found)
    }

    fn current(&self) -> Option<Arc<LoadedModel>> {
        self.loaded
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn publish(&self, model: TrainedModel, index: PositionIndex) {
        let loaded = Arc::new(LoadedModel { model, index });
        *self.loaded.write().unwrap_or_else(PoisonError::into_inner) = Some(loaded);
    }

    /// `None` when the cache cannot be used and training should happen.
    fn read_cache(&self, cache: &ModelCache) -> EngineResult<Option<TrainedModel>> {
        let model = match cache.read() {
            Ok(model) => model,
            Err(CacheError::Missing(path)) => {
                log::info!("No cached model at {}", path.display());
                return Ok(None);
            }
            Err(e) => {
                log::warn!("Cannot use cached model: {}", e);
                return Ok(None);
            }
        };

        let names = self.train_settings.feature_settings.keys().cloned().collect();
        let expected = FeatureLayout::new(&names)?.total_dimensions();
        if model.network().dimensions() != expected {
            log::warn!(
                "Cached model has {} dimensions, current features need {}",
                model.network().dimensions(),
                expected
            );
            return Ok(None);
        }

        Ok(Some(model))
    }

    fn adopt(&self, model: TrainedModel) -> EngineResult<LoadOutcome> {
        let Some(index) = PositionIndex::build(&model, &self.catalog, &self.cancel)? else {
            return Ok(LoadOutcome::Cancelled);
        };
        self.publish(model, index);
        log::info!("Classifier successfully loaded from cache!");
        Ok(LoadOutcome::FromCache)
    }

    fn train(
        &self,
        settings: &TrainSettings,
        on_progress: Option<&dyn Fn(Progress)>,
    ) -> EngineResult<LoadOutcome> {
        settings.validate()?;
        if self.cancel.is_cancelled() {
            return Ok(LoadOutcome::Cancelled);
        }

        log::info!("Constructing features classifier...");
        let names = settings.feature_settings.keys().cloned().collect();
        let layout = FeatureLayout::new(&names)?;

        let Some((tracks, vectors)) = self.fetch_samples(&layout)? else {
            log::info!("Feature fetching cancelled");
            return Ok(LoadOutcome::Cancelled);
        };
        if vectors.is_empty() {
            log::warn!("Nothing to classify!");
            return Ok(LoadOutcome::NoTrainableData);
        }

        let normalizer =
            DataNormalizer::compute_normalization_factors(layout.total_dimensions(), &vectors);
        let samples: Vec<InputVector> = vectors.iter().map(|v| normalizer.normalize(v)).collect();

        let size = grid_size(samples.len(), settings.sample_count_per_neuron);
        let rng = settings
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        let mut trainer = NetworkTrainer::new(size, size, layout.total_dimensions(), rng);
        trainer.set_data_weights(layout.data_weights(&settings.feature_settings));

        log::info!(
            "Training {}x{} network on {} samples ({} dimensions, {} iterations)",
            size,
            size,
            samples.len(),
            layout.total_dimensions(),
            settings.iteration_count
        );
        let network = match trainer.train(&samples, settings.iteration_count, on_progress, &self.cancel)
        {
            TrainOutcome::Trained(network) => network,
            TrainOutcome::Aborted {
                completed_iterations,
            } => {
                log::info!(
                    "Training cancelled after {} of {} iterations",
                    completed_iterations,
                    settings.iteration_count
                );
                return Ok(LoadOutcome::Cancelled);
            }
        };

        log::info!("Classifying tracks...");
        let mut track_positions = TrackPositions::new();
        for (&track, sample) in tracks.iter().zip(&samples) {
            if self.cancel.is_cancelled() {
                log::info!("Classification cancelled");
                return Ok(LoadOutcome::Cancelled);
            }
            track_positions
                .entry(track)
                .or_default()
                .insert(network.closest_position(sample));
        }

        let model = TrainedModel::new(network, track_positions);
        let Some(index) = PositionIndex::build(&model, &self.catalog, &self.cancel)? else {
            return Ok(LoadOutcome::Cancelled);
        };

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.write(&model) {
                log::error!("Cannot write model cache {}: {}", cache.path().display(), e);
            }
        }

        self.publish(model, index);
        log::info!("Classifier successfully loaded!");
        Ok(LoadOutcome::Trained)
    }

    /// Raw vectors of every track with usable features, or `None` on
    /// cancellation. Unusable tracks are logged and skipped.
    fn fetch_samples(
        &self,
        layout: &FeatureLayout,
    ) -> EngineResult<Option<(Vec<TrackId>, Vec<InputVector>)>> {
        let names = layout.feature_names();
        let track_ids = self.catalog.track_ids_with_features()?;
        log::info!("Fetching features of {} tracks...", track_ids.len());

        let mut tracks = Vec::with_capacity(track_ids.len());
        let mut vectors = Vec::with_capacity(track_ids.len());

        for track in track_ids {
            if self.cancel.is_cancelled() {
                return Ok(None);
            }

            let values = match self.features.fetch_features(track, &names) {
                Ok(Some(values)) => values,
                Ok(None) => {
                    log::debug!("Skipping track {}: no usable features", track);
                    continue;
                }
                Err(e) => {
                    log::warn!("Skipping track {}: {}", track, e);
                    continue;
                }
            };

            match layout.build_input_vector(&values) {
                Ok(vector) if vector.iter().all(|v| v.is_finite()) => {
                    tracks.push(track);
                    vectors.push(vector);
                }
                Ok(_) => log::warn!("Skipping track {}: non-finite feature value", track),
                Err(e) => log::warn!("Skipping track {}: {}", track, e),
            }
        }

        log::info!("Got {} usable samples", vectors.len());
        Ok(Some((tracks, vectors)))
    }
}
