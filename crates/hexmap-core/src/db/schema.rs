//! Canonical SQLite schema for the map store.
//!
//! - `contents` holds node payloads with their own identity
//! - `nodes` holds the materialized-path tree; `path` is the comma-joined
//!   direction list (`''` for a root) and `depth` its length
//! - `parking_slot = 0` marks a stable row; a parked row carries its slot
//!   and the `final_path` it will land on
//! - `store_meta` records the schema version for diagnostics

/// Migration v1: contents, nodes, address uniqueness.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS contents (
    content_id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL CHECK (length(trim(title)) > 0),
    description TEXT NOT NULL DEFAULT '',
    link TEXT NOT NULL DEFAULT '',
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS nodes (
    node_id INTEGER PRIMARY KEY AUTOINCREMENT,
    kind TEXT NOT NULL CHECK (kind IN ('root', 'child')),
    space_id INTEGER NOT NULL,
    group_id INTEGER NOT NULL DEFAULT 0,
    path TEXT NOT NULL,
    depth INTEGER NOT NULL CHECK (depth >= 0),
    parent_id INTEGER REFERENCES nodes(node_id),
    origin_id INTEGER REFERENCES nodes(node_id) ON DELETE SET NULL,
    content_id INTEGER NOT NULL REFERENCES contents(content_id),
    parking_slot INTEGER NOT NULL DEFAULT 0 CHECK (parking_slot BETWEEN 0 AND 255),
    final_path TEXT,
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL,
    CHECK ((kind = 'root') = (parent_id IS NULL)),
    CHECK ((kind = 'root') = (depth = 0)),
    CHECK ((parking_slot = 0) = (final_path IS NULL)),
    CHECK (kind = 'child' OR parking_slot = 0)
);

CREATE TABLE IF NOT EXISTS store_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL,
    created_at_us INTEGER NOT NULL DEFAULT 0
);

INSERT OR IGNORE INTO store_meta (id, schema_version, created_at_us)
VALUES (1, 1, 0);
";

/// Migration v2: address uniqueness and read-path indexes.
pub const MIGRATION_V2_SQL: &str = r"
CREATE UNIQUE INDEX IF NOT EXISTS idx_nodes_address
    ON nodes(space_id, group_id, path, parking_slot);

CREATE UNIQUE INDEX IF NOT EXISTS idx_nodes_single_root
    ON nodes(space_id, group_id) WHERE kind = 'root';

CREATE INDEX IF NOT EXISTS idx_nodes_parent
    ON nodes(parent_id);

CREATE INDEX IF NOT EXISTS idx_nodes_depth
    ON nodes(space_id, group_id, parking_slot, depth, path);

CREATE INDEX IF NOT EXISTS idx_nodes_content
    ON nodes(content_id);

UPDATE store_meta
SET schema_version = 2
WHERE id = 1;
";

/// Indexes expected by lookup and relocation query paths.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_nodes_address",
    "idx_nodes_single_root",
    "idx_nodes_parent",
    "idx_nodes_depth",
    "idx_nodes_content",
];
