/// A schema migration.
#[derive(Debug)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
}

const MIGRATION_001: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS releases (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS artists (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tracks (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    release_id INTEGER REFERENCES releases(id) ON DELETE SET NULL
);

CREATE INDEX IF NOT EXISTS idx_tracks_release_id ON tracks(release_id);

-- An artist may appear on a track once per role
CREATE TABLE IF NOT EXISTS track_artist_links (
    track_id INTEGER NOT NULL REFERENCES tracks(id) ON DELETE CASCADE,
    artist_id INTEGER NOT NULL REFERENCES artists(id) ON DELETE CASCADE,
    link_type TEXT NOT NULL,
    PRIMARY KEY (track_id, artist_id, link_type)
);

CREATE INDEX IF NOT EXISTS idx_track_artist_links_artist_id ON track_artist_links(artist_id);
"#;

const MIGRATION_002: &str = r#"
-- Per-track analysis documents (JSON, one per track)
CREATE TABLE IF NOT EXISTS track_features (
    track_id INTEGER PRIMARY KEY REFERENCES tracks(id) ON DELETE CASCADE,
    analysis TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS track_lists (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS track_list_entries (
    list_id INTEGER NOT NULL REFERENCES track_lists(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    track_id INTEGER NOT NULL REFERENCES tracks(id) ON DELETE CASCADE,
    PRIMARY KEY (list_id, position)
);
"#;

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "catalog",
        sql: MIGRATION_001,
    },
    Migration {
        version: 2,
        name: "features_and_track_lists",
        sql: MIGRATION_002,
    },
];
