//! Mappings between grid cells and catalog entities.
//!
//! Everything here is derived from a [`TrainedModel`] plus catalog
//! relationships and is rebuilt from scratch on every load.

use cadenza_core::{ArtistId, ArtistLinkType, Catalog, ReleaseId, TrackId};
use cadenza_som::{CancellationToken, Coordinate, Matrix, Network, Position};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::EngineResult;
use crate::model::TrainedModel;

/// Positions of one kind of entity, and the inverse cell → entities
/// matrix. Both sides are only ever updated together.
#[derive(Debug, Clone)]
pub struct EntityPositions<Id> {
    positions: BTreeMap<Id, BTreeSet<Position>>,
    matrix: Matrix<BTreeSet<Id>>,
}

impl<Id: Ord + Copy> EntityPositions<Id> {
    pub fn new(width: Coordinate, height: Coordinate) -> Self {
        Self {
            positions: BTreeMap::new(),
            matrix: Matrix::new(width, height),
        }
    }

    /// Record that `id` occupies `position`. Inserting twice is a no-op.
    ///
    /// # Panics
    ///
    /// Panics if `position` is outside the grid.
    pub fn insert(&mut self, id: Id, position: Position) {
        self.matrix[position].insert(id);
        self.positions.entry(id).or_default().insert(position);
    }

    pub fn positions_of(&self, id: Id) -> Option<&BTreeSet<Position>> {
        self.positions.get(&id)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Up to `max_count` entities found near the cells occupied by
    /// `query`.
    ///
    /// Query entities are never returned. Each candidate is passed once to
    /// `accept`; rejected candidates do not count toward `max_count`.
    pub fn similar<E>(
        &self,
        network: &Network,
        query: &[Id],
        max_count: usize,
        accept: impl FnMut(Id) -> Result<bool, E>,
    ) -> Result<Vec<Id>, E> {
        let cells: BTreeSet<Position> = query
            .iter()
            .filter_map(|id| self.positions.get(id))
            .flatten()
            .copied()
            .collect();
        self.similar_near(network, cells, query, max_count, accept)
    }

    /// Up to `max_count` entities found near `cells`, skipping `excluded`.
    ///
    /// Entities on `cells` come first. The search then grows one cell at a
    /// time, always taking the unsearched neighbour whose reference vector
    /// is closest to an already searched cell, until enough entities are
    /// found or the grid is exhausted. No cells means no results.
    pub fn similar_near<E>(
        &self,
        network: &Network,
        cells: BTreeSet<Position>,
        excluded: &[Id],
        max_count: usize,
        mut accept: impl FnMut(Id) -> Result<bool, E>,
    ) -> Result<Vec<Id>, E> {
        let mut search = Search {
            excluded: excluded.iter().copied().collect(),
            seen: BTreeSet::new(),
            results: Vec::new(),
            max_count,
        };
        if max_count == 0 || cells.is_empty() {
            return Ok(search.results);
        }

        let mut searched = cells;
        for &position in &searched {
            search.collect(&self.matrix[position], &mut accept)?;
        }

        while !search.is_full() {
            let Some(next) = network.closest_unsearched_neighbor(&searched) else {
                break;
            };
            searched.insert(next);
            search.collect(&self.matrix[next], &mut accept)?;
        }

        Ok(search.results)
    }
}

struct Search<Id> {
    excluded: BTreeSet<Id>,
    seen: BTreeSet<Id>,
    results: Vec<Id>,
    max_count: usize,
}

impl<Id: Ord + Copy> Search<Id> {
    fn is_full(&self) -> bool {
        self.results.len() >= self.max_count
    }

    fn collect<E>(
        &mut self,
        ids: &BTreeSet<Id>,
        accept: &mut impl FnMut(Id) -> Result<bool, E>,
    ) -> Result<(), E> {
        for &id in ids {
            if self.is_full() {
                break;
            }
            if self.excluded.contains(&id) || !self.seen.insert(id) {
                continue;
            }
            if accept(id)? {
                self.results.push(id);
            }
        }
        Ok(())
    }
}

/// Track, release and per-link-type artist positions of one model.
#[derive(Debug, Clone)]
pub struct PositionIndex {
    tracks: EntityPositions<TrackId>,
    releases: EntityPositions<ReleaseId>,
    artists: [EntityPositions<ArtistId>; ArtistLinkType::COUNT],
    /// Cells of each artist whatever its role.
    artist_cells: BTreeMap<ArtistId, BTreeSet<Position>>,
}

impl PositionIndex {
    /// Derive every index from the model's track positions.
    ///
    /// Tracks the catalog no longer knows keep their track entry but
    /// contribute to no release or artist. Returns `None` if `cancel` is
    /// observed before the index is complete.
    pub fn build<C: Catalog>(
        model: &TrainedModel,
        catalog: &C,
        cancel: &CancellationToken,
    ) -> EngineResult<Option<Self>> {
        let network = model.network();
        let (width, height) = (network.width(), network.height());

        let mut index = Self {
            tracks: EntityPositions::new(width, height),
            releases: EntityPositions::new(width, height),
            artists: std::array::from_fn(|_| EntityPositions::new(width, height)),
            artist_cells: BTreeMap::new(),
        };

        for (&track, positions) in model.track_positions() {
            if cancel.is_cancelled() {
                log::debug!("Index building cancelled");
                return Ok(None);
            }

            let release = catalog.track_release(track)?;
            let links = catalog.track_artist_links(track)?;

            for &position in positions {
                index.tracks.insert(track, position);
                if let Some(release) = release {
                    index.releases.insert(release, position);
                }
                for &(artist, link_type) in &links {
                    index.artists[link_type.ordinal()].insert(artist, position);
                    index.artist_cells.entry(artist).or_default().insert(position);
                }
            }
        }

        log::debug!(
            "Indexed {} tracks, {} releases",
            index.tracks.len(),
            index.releases.len()
        );

        Ok(Some(index))
    }

    pub fn tracks(&self) -> &EntityPositions<TrackId> {
        &self.tracks
    }

    pub fn releases(&self) -> &EntityPositions<ReleaseId> {
        &self.releases
    }

    pub fn artists(&self, link_type: ArtistLinkType) -> &EntityPositions<ArtistId> {
        &self.artists[link_type.ordinal()]
    }

    /// Cells covered by `artist` through any link type; empty for an
    /// unknown artist.
    pub fn artist_cells(&self, artist: ArtistId) -> BTreeSet<Position> {
        self.artist_cells.get(&artist).cloned().unwrap_or_default()
    }
}
