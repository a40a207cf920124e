//! On-disk persistence of a [`TrainedModel`].
//!
//! The cache is a single JSON document written atomically (temp file in
//! the same directory, then rename). Floats are written in shortest
//! round-trip form, so reading back a written model yields bit-identical
//! values.

use cadenza_core::TrackId;
use cadenza_som::{Coordinate, InputVector, Network, Position};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::CacheError;
use crate::model::{TrackPositions, TrainedModel};

/// File name of the cached model inside the cache directory.
pub const CACHE_FILE_NAME: &str = "features-model.json";

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Deserialize)]
struct VersionProbe {
    version: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    network: NetworkRecord,
    track_positions: Vec<TrackPositionsRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct NetworkRecord {
    width: Coordinate,
    height: Coordinate,
    dimensions: usize,
    /// Row-major.
    ref_vectors: Vec<InputVector>,
    data_weights: InputVector,
}

#[derive(Debug, Serialize, Deserialize)]
struct TrackPositionsRecord {
    track: TrackId,
    positions: Vec<Position>,
}

/// Location of the cached model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCache {
    path: PathBuf,
}

impl ModelCache {
    /// Cache stored as [`CACHE_FILE_NAME`] inside `dir`.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(CACHE_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and validate the cached model.
    pub fn read(&self) -> Result<TrainedModel, CacheError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(CacheError::Missing(self.path.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        let probe: VersionProbe = serde_json::from_slice(&bytes)?;
        if probe.version != FORMAT_VERSION {
            return Err(CacheError::UnsupportedVersion(probe.version));
        }

        let file: CacheFile = serde_json::from_slice(&bytes)?;
        let model = from_record(file)?;

        log::debug!(
            "Read cached model ({}x{}, {} tracks) from {}",
            model.network().width(),
            model.network().height(),
            model.track_positions().len(),
            self.path.display()
        );

        Ok(model)
    }

    /// Atomically replace the cached model.
    pub fn write(&self, model: &TrainedModel) -> Result<(), CacheError> {
        let dir = self
            .path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let temp = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(temp.as_file());
            serde_json::to_writer(&mut writer, &to_record(model))?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| CacheError::Io(e.error))?;

        log::debug!("Wrote cached model to {}", self.path.display());
        Ok(())
    }

    /// Delete the cached model. A missing cache is not an error.
    pub fn invalidate(&self) -> Result<(), CacheError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                log::debug!("Removed cached model {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn to_record(model: &TrainedModel) -> CacheFile {
    let network = model.network();
    CacheFile {
        version: FORMAT_VERSION,
        network: NetworkRecord {
            width: network.width(),
            height: network.height(),
            dimensions: network.dimensions(),
            ref_vectors: network.ref_vectors().to_vec(),
            data_weights: network.data_weights().to_vec(),
        },
        track_positions: model
            .track_positions()
            .iter()
            .map(|(&track, positions)| TrackPositionsRecord {
                track,
                positions: positions.iter().copied().collect(),
            })
            .collect(),
    }
}

fn from_record(file: CacheFile) -> Result<TrainedModel, CacheError> {
    let NetworkRecord {
        width,
        height,
        dimensions,
        ref_vectors,
        data_weights,
    } = file.network;
    let network = Network::from_parts(width, height, dimensions, ref_vectors, data_weights)?;

    let mut track_positions = TrackPositions::new();
    for record in file.track_positions {
        if let Some(bad) = record
            .positions
            .iter()
            .find(|p| p.x >= width || p.y >= height)
        {
            return Err(CacheError::Invalid(format!(
                "track {} at {} outside {}x{} grid",
                record.track, bad, width, height
            )));
        }
        if track_positions
            .insert(record.track, record.positions.into_iter().collect())
            .is_some()
        {
            return Err(CacheError::Invalid(format!(
                "track {} listed twice",
                record.track
            )));
        }
    }

    Ok(TrainedModel::new(network, track_positions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn sample_model() -> TrainedModel {
        let network = Network::from_parts(
            2,
            2,
            2,
            vec![
                vec![0.1, 0.2],
                vec![1.0 / 3.0, 2.0 / 3.0],
                vec![0.1 + 0.2, 1e-300],
                vec![1.0 - f64::EPSILON, 0.0],
            ],
            vec![0.5, std::f64::consts::PI],
        )
        .unwrap();

        let mut positions = TrackPositions::new();
        positions.insert(TrackId::new(1), BTreeSet::from([Position::new(0, 0)]));
        positions.insert(
            TrackId::new(2),
            BTreeSet::from([Position::new(1, 0), Position::new(1, 1)]),
        );
        TrainedModel::new(network, positions)
    }

    #[test]
    fn test_round_trip_is_bit_identical() {
        let dir = TempDir::new().unwrap();
        let cache = ModelCache::new(dir.path());
        let model = sample_model();

        cache.write(&model).unwrap();
        let read = cache.read().unwrap();
        assert_eq!(read, model);

        for (a, b) in read
            .network()
            .ref_vectors()
            .iter()
            .flatten()
            .zip(model.network().ref_vectors().iter().flatten())
        {
            assert_eq!(a.to_bits(), b.to_bits());
        }

        // Writing the read model again produces the same document.
        let first = fs::read(cache.path()).unwrap();
        cache.write(&read).unwrap();
        assert_eq!(fs::read(cache.path()).unwrap(), first);
    }

    #[test]
    fn test_missing_cache() {
        let dir = TempDir::new().unwrap();
        let cache = ModelCache::new(dir.path());
        assert!(matches!(cache.read(), Err(CacheError::Missing(_))));
        assert!(cache.invalidate().is_ok());
    }

    #[test]
    fn test_corrupt_cache() {
        let dir = TempDir::new().unwrap();
        let cache = ModelCache::new(dir.path());
        fs::write(cache.path(), b"{ not json").unwrap();
        assert!(matches!(cache.read(), Err(CacheError::Corrupt(_))));
    }

    #[test]
    fn test_unsupported_version() {
        let dir = TempDir::new().unwrap();
        let cache = ModelCache::new(dir.path());
        fs::write(cache.path(), br#"{"version": 99}"#).unwrap();
        assert!(matches!(cache.read(), Err(CacheError::UnsupportedVersion(99))));
    }

    #[test]
    fn test_inconsistent_cache_rejected() {
        let dir = TempDir::new().unwrap();
        let cache = ModelCache::new(dir.path());
        let json = r#"{
            "version": 1,
            "network": {
                "width": 1, "height": 1, "dimensions": 2,
                "ref_vectors": [[0.0, 0.0]],
                "data_weights": [1.0]
            },
            "track_positions": []
        }"#;
        fs::write(cache.path(), json).unwrap();
        assert!(matches!(cache.read(), Err(CacheError::Invalid(_))));

        let json = r#"{
            "version": 1,
            "network": {
                "width": 1, "height": 1, "dimensions": 1,
                "ref_vectors": [[0.0]],
                "data_weights": [1.0]
            },
            "track_positions": [{"track": 1, "positions": [{"x": 3, "y": 0}]}]
        }"#;
        fs::write(cache.path(), json).unwrap();
        assert!(matches!(cache.read(), Err(CacheError::Invalid(_))));
    }

    #[test]
    fn test_invalidate_removes_file() {
        let dir = TempDir::new().unwrap();
        let cache = ModelCache::new(dir.path().join("nested"));
        cache.write(&sample_model()).unwrap();
        assert!(cache.path().exists());

        cache.invalidate().unwrap();
        assert!(!cache.path().exists());
        assert!(matches!(cache.read(), Err(CacheError::Missing(_))));
    }
}
