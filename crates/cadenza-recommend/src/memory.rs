//! In-memory catalog, for tests and for hosts that keep their catalog in
//! memory.

use cadenza_core::{
    ArtistId, ArtistLinkType, Catalog, FeatureName, FeatureSource, FeatureValuesMap, ReleaseId,
    TrackId, TrackListId,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct TrackEntry {
    release: Option<ReleaseId>,
    artists: BTreeSet<(ArtistId, ArtistLinkType)>,
    features: Option<FeatureValuesMap>,
}

#[derive(Debug, Default)]
struct Inner {
    tracks: BTreeMap<TrackId, TrackEntry>,
    releases: BTreeSet<ReleaseId>,
    artists: BTreeSet<ArtistId>,
    track_lists: BTreeMap<TrackListId, Vec<TrackId>>,
}

/// A [`Catalog`] and [`FeatureSource`] held entirely in memory.
///
/// Mutation goes through `&self` so the catalog can change while an
/// engine borrows it.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    inner: RwLock<Inner>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_release(&self, id: ReleaseId) {
        self.write().releases.insert(id);
    }

    pub fn add_artist(&self, id: ArtistId) {
        self.write().artists.insert(id);
    }

    /// Add a track, or move an existing one to another release.
    pub fn add_track(&self, id: TrackId, release: Option<ReleaseId>) {
        self.write().tracks.entry(id).or_default().release = release;
    }

    /// Attach analysis values to a track. Unknown tracks are ignored.
    pub fn set_features(&self, id: TrackId, features: FeatureValuesMap) {
        if let Some(track) = self.write().tracks.get_mut(&id) {
            track.features = Some(features);
        }
    }

    pub fn link_artist(&self, track: TrackId, artist: ArtistId, link_type: ArtistLinkType) {
        if let Some(track) = self.write().tracks.get_mut(&track) {
            track.artists.insert((artist, link_type));
        }
    }

    pub fn add_track_list(&self, id: TrackListId, tracks: Vec<TrackId>) {
        self.write().track_lists.insert(id, tracks);
    }

    pub fn remove_track(&self, id: TrackId) {
        let mut inner = self.write();
        inner.tracks.remove(&id);
        for tracks in inner.track_lists.values_mut() {
            tracks.retain(|&track| track != id);
        }
    }

    /// Remove a release. Its tracks stay, without a release.
    pub fn remove_release(&self, id: ReleaseId) {
        let mut inner = self.write();
        inner.releases.remove(&id);
        for track in inner.tracks.values_mut() {
            if track.release == Some(id) {
                track.release = None;
            }
        }
    }

    pub fn remove_artist(&self, id: ArtistId) {
        let mut inner = self.write();
        inner.artists.remove(&id);
        for track in inner.tracks.values_mut() {
            track.artists.retain(|&(artist, _)| artist != id);
        }
    }
}

impl Catalog for MemoryCatalog {
    fn track_ids_with_features(&self) -> cadenza_core::Result<Vec<TrackId>> {
        Ok(self
            .read()
            .tracks
            .iter()
            .filter(|(_, track)| track.features.is_some())
            .map(|(&id, _)| id)
            .collect())
    }

    fn track_release(&self, track: TrackId) -> cadenza_core::Result<Option<ReleaseId>> {
        Ok(self.read().tracks.get(&track).and_then(|t| t.release))
    }

    fn track_artist_links(
        &self,
        track: TrackId,
    ) -> cadenza_core::Result<Vec<(ArtistId, ArtistLinkType)>> {
        Ok(self
            .read()
            .tracks
            .get(&track)
            .map(|t| t.artists.iter().copied().collect())
            .unwrap_or_default())
    }

    fn track_list_tracks(&self, list: TrackListId) -> cadenza_core::Result<Vec<TrackId>> {
        Ok(self
            .read()
            .track_lists
            .get(&list)
            .cloned()
            .unwrap_or_default())
    }

    fn track_exists(&self, track: TrackId) -> cadenza_core::Result<bool> {
        Ok(self.read().tracks.contains_key(&track))
    }

    fn release_exists(&self, release: ReleaseId) -> cadenza_core::Result<bool> {
        Ok(self.read().releases.contains(&release))
    }

    fn artist_exists(&self, artist: ArtistId) -> cadenza_core::Result<bool> {
        Ok(self.read().artists.contains(&artist))
    }
}

impl FeatureSource for MemoryCatalog {
    fn fetch_features(
        &self,
        track: TrackId,
        names: &BTreeSet<FeatureName>,
    ) -> cadenza_core::Result<Option<FeatureValuesMap>> {
        let inner = self.read();
        let Some(features) = inner.tracks.get(&track).and_then(|t| t.features.as_ref()) else {
            return Ok(None);
        };

        let values: FeatureValuesMap = features
            .iter()
            .filter(|(name, _)| names.contains(*name))
            .map(|(name, values)| (name.clone(), values.clone()))
            .collect();
        Ok((!values.is_empty()).then_some(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_tracks_with_features_are_listed() {
        let catalog = MemoryCatalog::new();
        catalog.add_track(TrackId::new(1), None);
        catalog.add_track(TrackId::new(2), None);
        catalog.set_features(
            TrackId::new(2),
            FeatureValuesMap::from([(FeatureName::from("rhythm.bpm"), vec![90.0])]),
        );

        assert_eq!(catalog.track_ids_with_features().unwrap(), vec![TrackId::new(2)]);
    }

    #[test]
    fn test_fetch_features_filters_names() {
        let catalog = MemoryCatalog::new();
        catalog.add_track(TrackId::new(1), None);
        catalog.set_features(
            TrackId::new(1),
            FeatureValuesMap::from([
                (FeatureName::from("rhythm.bpm"), vec![90.0]),
                (FeatureName::from("rhythm.danceability"), vec![0.3]),
            ]),
        );

        let names = BTreeSet::from([FeatureName::from("rhythm.bpm")]);
        let values = catalog.fetch_features(TrackId::new(1), &names).unwrap().unwrap();
        assert_eq!(values.len(), 1);

        let names = BTreeSet::from([FeatureName::from("lowlevel.gfcc.mean")]);
        assert!(catalog.fetch_features(TrackId::new(1), &names).unwrap().is_none());
        assert!(catalog.fetch_features(TrackId::new(9), &names).unwrap().is_none());
    }

    #[test]
    fn test_removals() {
        let catalog = MemoryCatalog::new();
        catalog.add_release(ReleaseId::new(1));
        catalog.add_artist(ArtistId::new(1));
        catalog.add_track(TrackId::new(1), Some(ReleaseId::new(1)));
        catalog.link_artist(TrackId::new(1), ArtistId::new(1), ArtistLinkType::Performer);
        catalog.add_track_list(TrackListId::new(1), vec![TrackId::new(1)]);

        catalog.remove_release(ReleaseId::new(1));
        assert!(!catalog.release_exists(ReleaseId::new(1)).unwrap());
        assert_eq!(catalog.track_release(TrackId::new(1)).unwrap(), None);

        catalog.remove_artist(ArtistId::new(1));
        assert!(catalog.track_artist_links(TrackId::new(1)).unwrap().is_empty());

        catalog.remove_track(TrackId::new(1));
        assert!(!catalog.track_exists(TrackId::new(1)).unwrap());
        assert!(catalog
            .track_list_tracks(TrackListId::new(1))
            .unwrap()
            .is_empty());
    }
}
