use rusqlite::{Connection, OptionalExtension};
use std::collections::BTreeSet;
use std::path::Path;

use crate::catalog::{Catalog, FeatureSource};
use crate::error::{Error, Result};
use crate::features::{extract_feature_values, FeatureName, FeatureValuesMap};
use crate::ids::{ArtistId, ReleaseId, TrackId, TrackListId};
use crate::link::ArtistLinkType;

use super::migrations::MIGRATIONS;

/// A catalog database connection.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) a database at the given path and apply migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.apply_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.apply_migrations()?;
        Ok(db)
    }

    /// Get a reference to the underlying connection (for advanced queries).
    #[must_use]
    pub const fn conn(&self) -> &Connection {
        &self.conn
    }

    fn apply_migrations(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            [],
        )?;

        let mut stmt = self
            .conn
            .prepare("SELECT version FROM schema_migrations ORDER BY version")?;
        let applied: Vec<u32> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for migration in MIGRATIONS {
            if !applied.contains(&migration.version) {
                log::info!(
                    "Applying migration {} ({})",
                    migration.version,
                    migration.name
                );
                self.conn.execute_batch(migration.sql)?;
                self.conn.execute(
                    "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
                    rusqlite::params![migration.version, migration.name],
                )?;
            }
        }

        Ok(())
    }
}

fn sql_id(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| Error::InvalidData(format!("id out of range: {value}")))
}

// Catalog writes
impl Database {
    pub fn insert_release(&self, id: ReleaseId, name: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO releases (id, name) VALUES (?1, ?2)",
            rusqlite::params![sql_id(id.value())?, name],
        )?;
        Ok(())
    }

    pub fn insert_artist(&self, id: ArtistId, name: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO artists (id, name) VALUES (?1, ?2)",
            rusqlite::params![sql_id(id.value())?, name],
        )?;
        Ok(())
    }

    pub fn insert_track(&self, id: TrackId, name: &str, release: Option<ReleaseId>) -> Result<()> {
        let release = release.map(|r| sql_id(r.value())).transpose()?;
        self.conn.execute(
            "INSERT INTO tracks (id, name, release_id) VALUES (?1, ?2, ?3)",
            rusqlite::params![sql_id(id.value())?, name, release],
        )?;
        Ok(())
    }

    /// Attach an artist to a track with the given role. Re-linking is a no-op.
    pub fn link_artist(
        &self,
        track: TrackId,
        artist: ArtistId,
        link_type: ArtistLinkType,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO track_artist_links (track_id, artist_id, link_type)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![
                sql_id(track.value())?,
                sql_id(artist.value())?,
                link_type.as_str()
            ],
        )?;
        Ok(())
    }

    /// Store (or replace) the analysis document of a track.
    pub fn set_track_analysis(&self, track: TrackId, analysis: &serde_json::Value) -> Result<()> {
        self.conn.execute(
            "INSERT INTO track_features (track_id, analysis) VALUES (?1, ?2)
             ON CONFLICT(track_id) DO UPDATE SET analysis = excluded.analysis",
            rusqlite::params![sql_id(track.value())?, serde_json::to_string(analysis)?],
        )?;
        Ok(())
    }

    pub fn insert_track_list(&self, id: TrackListId, name: &str, tracks: &[TrackId]) -> Result<()> {
        let list_id = sql_id(id.value())?;
        self.conn.execute(
            "INSERT INTO track_lists (id, name) VALUES (?1, ?2)",
            rusqlite::params![list_id, name],
        )?;
        for (position, track) in tracks.iter().enumerate() {
            self.conn.execute(
                "INSERT INTO track_list_entries (list_id, position, track_id) VALUES (?1, ?2, ?3)",
                rusqlite::params![list_id, position as i64, sql_id(track.value())?],
            )?;
        }
        Ok(())
    }

    pub fn delete_track(&self, id: TrackId) -> Result<()> {
        self.conn.execute(
            "DELETE FROM tracks WHERE id = ?1",
            [sql_id(id.value())?],
        )?;
        Ok(())
    }

    pub fn delete_release(&self, id: ReleaseId) -> Result<()> {
        self.conn.execute(
            "DELETE FROM releases WHERE id = ?1",
            [sql_id(id.value())?],
        )?;
        Ok(())
    }

    pub fn delete_artist(&self, id: ArtistId) -> Result<()> {
        self.conn.execute(
            "DELETE FROM artists WHERE id = ?1",
            [sql_id(id.value())?],
        )?;
        Ok(())
    }

    fn exists(&self, sql: &str, id: u64) -> Result<bool> {
        let found: bool = self.conn.query_row(sql, [sql_id(id)?], |row| row.get(0))?;
        Ok(found)
    }
}

impl Catalog for Database {
    fn track_ids_with_features(&self) -> Result<Vec<TrackId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT track_id FROM track_features ORDER BY track_id")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .map(|id| id.map(|id| TrackId::new(id as u64)))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }

    fn track_release(&self, track: TrackId) -> Result<Option<ReleaseId>> {
        let release: Option<Option<i64>> = self
            .conn
            .query_row(
                "SELECT release_id FROM tracks WHERE id = ?1",
                [sql_id(track.value())?],
                |row| row.get(0),
            )
            .optional()?;
        Ok(release.flatten().map(|id| ReleaseId::new(id as u64)))
    }

    fn track_artist_links(&self, track: TrackId) -> Result<Vec<(ArtistId, ArtistLinkType)>> {
        let mut stmt = self.conn.prepare(
            "SELECT artist_id, link_type FROM track_artist_links
             WHERE track_id = ?1
             ORDER BY artist_id, link_type",
        )?;
        let rows = stmt
            .query_map([sql_id(track.value())?], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut links = Vec::with_capacity(rows.len());
        for (artist, link_type) in rows {
            match link_type.parse::<ArtistLinkType>() {
                Ok(link_type) => links.push((ArtistId::new(artist as u64), link_type)),
                Err(e) => log::warn!("Skipping artist link of track {}: {}", track, e),
            }
        }
        Ok(links)
    }

    fn track_list_tracks(&self, list: TrackListId) -> Result<Vec<TrackId>> {
        let mut stmt = self.conn.prepare(
            "SELECT track_id FROM track_list_entries WHERE list_id = ?1 ORDER BY position",
        )?;
        let ids = stmt
            .query_map([sql_id(list.value())?], |row| row.get::<_, i64>(0))?
            .map(|id| id.map(|id| TrackId::new(id as u64)))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }

    fn track_exists(&self, track: TrackId) -> Result<bool> {
        self.exists("SELECT EXISTS(SELECT 1 FROM tracks WHERE id = ?1)", track.value())
    }

    fn release_exists(&self, release: ReleaseId) -> Result<bool> {
        self.exists("SELECT EXISTS(SELECT 1 FROM releases WHERE id = ?1)", release.value())
    }

    fn artist_exists(&self, artist: ArtistId) -> Result<bool> {
        self.exists("SELECT EXISTS(SELECT 1 FROM artists WHERE id = ?1)", artist.value())
    }
}

impl FeatureSource for Database {
    fn fetch_features(
        &self,
        track: TrackId,
        names: &BTreeSet<FeatureName>,
    ) -> Result<Option<FeatureValuesMap>> {
        let analysis: Option<String> = self
            .conn
            .query_row(
                "SELECT analysis FROM track_features WHERE track_id = ?1",
                [sql_id(track.value())?],
                |row| row.get(0),
            )
            .optional()?;

        let Some(analysis) = analysis else {
            return Ok(None);
        };

        let analysis: serde_json::Value = serde_json::from_str(&analysis)?;
        let values = extract_feature_values(&analysis, names);
        Ok((!values.is_empty()).then_some(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.insert_release(ReleaseId::new(1), "Kind of Blue").unwrap();
        db.insert_artist(ArtistId::new(1), "Miles Davis").unwrap();
        db.insert_artist(ArtistId::new(2), "Bill Evans").unwrap();
        db.insert_track(TrackId::new(1), "So What", Some(ReleaseId::new(1)))
            .unwrap();
        db.insert_track(TrackId::new(2), "Blue in Green", Some(ReleaseId::new(1)))
            .unwrap();
        db.insert_track(TrackId::new(3), "Untitled", None).unwrap();
        db
    }

    #[test]
    fn test_database_open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(count, MIGRATIONS.len() as i64);
    }

    #[test]
    fn test_reopen_keeps_data() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("catalog.db");
        {
            let db = Database::open(&path).unwrap();
            db.insert_release(ReleaseId::new(9), "Release").unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert!(db.release_exists(ReleaseId::new(9)).unwrap());
    }

    #[test]
    fn test_track_release() {
        let db = sample_db();
        assert_eq!(db.track_release(TrackId::new(1)).unwrap(), Some(ReleaseId::new(1)));
        assert_eq!(db.track_release(TrackId::new(3)).unwrap(), None);
        assert_eq!(db.track_release(TrackId::new(99)).unwrap(), None);
    }

    #[test]
    fn test_artist_links_are_per_role() {
        let db = sample_db();
        db.link_artist(TrackId::new(2), ArtistId::new(1), ArtistLinkType::Performer)
            .unwrap();
        db.link_artist(TrackId::new(2), ArtistId::new(2), ArtistLinkType::Composer)
            .unwrap();
        db.link_artist(TrackId::new(2), ArtistId::new(2), ArtistLinkType::Performer)
            .unwrap();
        db.link_artist(TrackId::new(2), ArtistId::new(2), ArtistLinkType::Performer)
            .unwrap();

        let links = db.track_artist_links(TrackId::new(2)).unwrap();
        assert_eq!(
            links,
            vec![
                (ArtistId::new(1), ArtistLinkType::Performer),
                (ArtistId::new(2), ArtistLinkType::Composer),
                (ArtistId::new(2), ArtistLinkType::Performer),
            ]
        );
    }

    #[test]
    fn test_exists_after_delete() {
        let db = sample_db();
        assert!(db.track_exists(TrackId::new(1)).unwrap());
        db.delete_track(TrackId::new(1)).unwrap();
        assert!(!db.track_exists(TrackId::new(1)).unwrap());

        db.delete_artist(ArtistId::new(2)).unwrap();
        assert!(!db.artist_exists(ArtistId::new(2)).unwrap());
        assert!(db.artist_exists(ArtistId::new(1)).unwrap());
    }

    #[test]
    fn test_deleting_release_detaches_tracks() {
        let db = sample_db();
        db.delete_release(ReleaseId::new(1)).unwrap();
        assert!(!db.release_exists(ReleaseId::new(1)).unwrap());
        assert_eq!(db.track_release(TrackId::new(1)).unwrap(), None);
    }

    #[test]
    fn test_track_list_order() {
        let db = sample_db();
        db.insert_track_list(
            TrackListId::new(5),
            "Late night",
            &[TrackId::new(3), TrackId::new(1)],
        )
        .unwrap();
        assert_eq!(
            db.track_list_tracks(TrackListId::new(5)).unwrap(),
            vec![TrackId::new(3), TrackId::new(1)]
        );
        assert!(db.track_list_tracks(TrackListId::new(6)).unwrap().is_empty());
    }

    #[test]
    fn test_fetch_features() {
        let db = sample_db();
        db.set_track_analysis(
            TrackId::new(1),
            &json!({ "rhythm": { "bpm": 136.0, "danceability": 1.2 } }),
        )
        .unwrap();

        let names: BTreeSet<FeatureName> = [FeatureName::from("rhythm.bpm")].into_iter().collect();
        let values = db.fetch_features(TrackId::new(1), &names).unwrap().unwrap();
        assert_eq!(values[&FeatureName::from("rhythm.bpm")], vec![136.0]);

        assert!(db.fetch_features(TrackId::new(2), &names).unwrap().is_none());
        assert_eq!(db.track_ids_with_features().unwrap(), vec![TrackId::new(1)]);
    }

    #[test]
    fn test_fetch_features_without_requested_values() {
        let db = sample_db();
        db.set_track_analysis(TrackId::new(2), &json!({ "rhythm": {} }))
            .unwrap();
        let names: BTreeSet<FeatureName> = [FeatureName::from("rhythm.bpm")].into_iter().collect();
        assert!(db.fetch_features(TrackId::new(2), &names).unwrap().is_none());
    }

    #[test]
    fn test_replacing_analysis() {
        let db = sample_db();
        db.set_track_analysis(TrackId::new(1), &json!({ "rhythm": { "bpm": 90 } }))
            .unwrap();
        db.set_track_analysis(TrackId::new(1), &json!({ "rhythm": { "bpm": 120 } }))
            .unwrap();
        let names: BTreeSet<FeatureName> = [FeatureName::from("rhythm.bpm")].into_iter().collect();
        let values = db.fetch_features(TrackId::new(1), &names).unwrap().unwrap();
        assert_eq!(values[&FeatureName::from("rhythm.bpm")], vec![120.0]);
    }
}
