//! Collaborator interfaces consumed by the recommendation engine.
//!
//! The engine never owns catalog objects: it works on opaque IDs and asks
//! these traits for relationships, existence and feature values.

use std::collections::BTreeSet;

use crate::error::Result;
use crate::features::{FeatureName, FeatureValuesMap};
use crate::ids::{ArtistId, ReleaseId, TrackId, TrackListId};
use crate::link::ArtistLinkType;

/// Read access to catalog entities and their relationships.
pub trait Catalog {
    /// IDs of every track that has analysis data attached.
    fn track_ids_with_features(&self) -> Result<Vec<TrackId>>;

    /// The release a track belongs to, if any.
    fn track_release(&self, track: TrackId) -> Result<Option<ReleaseId>>;

    /// Every `(artist, link type)` pair attached to a track.
    fn track_artist_links(&self, track: TrackId) -> Result<Vec<(ArtistId, ArtistLinkType)>>;

    /// Tracks of a track list, in list order. Unknown lists yield no tracks.
    fn track_list_tracks(&self, list: TrackListId) -> Result<Vec<TrackId>>;

    fn track_exists(&self, track: TrackId) -> Result<bool>;

    fn release_exists(&self, release: ReleaseId) -> Result<bool>;

    fn artist_exists(&self, artist: ArtistId) -> Result<bool>;
}

/// Source of per-track feature values.
pub trait FeatureSource {
    /// Fetch the requested features of a track.
    ///
    /// Returns `None` when the track has no usable analysis data.
    fn fetch_features(
        &self,
        track: TrackId,
        names: &BTreeSet<FeatureName>,
    ) -> Result<Option<FeatureValuesMap>>;
}

impl<T: Catalog + ?Sized> Catalog for &T {
    fn track_ids_with_features(&self) -> Result<Vec<TrackId>> {
        (**self).track_ids_with_features()
    }

    fn track_release(&self, track: TrackId) -> Result<Option<ReleaseId>> {
        (**self).track_release(track)
    }

    fn track_artist_links(&self, track: TrackId) -> Result<Vec<(ArtistId, ArtistLinkType)>> {
        (**self).track_artist_links(track)
    }

    fn track_list_tracks(&self, list: TrackListId) -> Result<Vec<TrackId>> {
        (**self).track_list_tracks(list)
    }

    fn track_exists(&self, track: TrackId) -> Result<bool> {
        (**self).track_exists(track)
    }

    fn release_exists(&self, release: ReleaseId) -> Result<bool> {
        (**self).release_exists(release)
    }

    fn artist_exists(&self, artist: ArtistId) -> Result<bool> {
        (**self).artist_exists(artist)
    }
}

impl<T: FeatureSource + ?Sized> FeatureSource for &T {
    fn fetch_features(
        &self,
        track: TrackId,
        names: &BTreeSet<FeatureName>,
    ) -> Result<Option<FeatureValuesMap>> {
        (**self).fetch_features(track, names)
    }
}
