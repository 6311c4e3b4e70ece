//! `SQLite` implementation of the repository contracts.
//!
//! [`SqliteRepository`] borrows a `&Connection`. A `rusqlite::Transaction`
//! dereferences to `Connection`, so the same repository type serves
//! standalone reads and the inside of a unit of work; which one it is depends
//! only on the handle it was built from.

use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};

use crate::coord::{Coord, ParkingSlot, decode_path, encode_path};
use crate::error::{Result, TreeError};
use crate::model::{
    Content, ContentId, InvariantViolation, NewContent, NewNode, Node, NodeId, NodeKind,
    NodeRecord, NodeState, NodeUpdate, now_us,
};
use crate::repo::{ContentRepository, DescendantQuery, NodeQuery, NodeRepository};

const NODE_COLUMNS: &str = "node_id, kind, space_id, group_id, path, parent_id, origin_id, \
                            content_id, parking_slot, final_path, created_at_us, updated_at_us";

const CONTENT_COLUMNS: &str =
    "content_id, title, description, link, created_at_us, updated_at_us";

// ---------------------------------------------------------------------------
// Row decoding
// ---------------------------------------------------------------------------

/// Raw `nodes` row before path decoding and invariant checks.
struct NodeRow {
    node_id: i64,
    kind: String,
    space_id: i64,
    group_id: i64,
    path: String,
    parent_id: Option<i64>,
    origin_id: Option<i64>,
    content_id: i64,
    parking_slot: i64,
    final_path: Option<String>,
    created_at_us: i64,
    updated_at_us: i64,
}

impl NodeRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            node_id: row.get(0)?,
            kind: row.get(1)?,
            space_id: row.get(2)?,
            group_id: row.get(3)?,
            path: row.get(4)?,
            parent_id: row.get(5)?,
            origin_id: row.get(6)?,
            content_id: row.get(7)?,
            parking_slot: row.get(8)?,
            final_path: row.get(9)?,
            created_at_us: row.get(10)?,
            updated_at_us: row.get(11)?,
        })
    }

    fn into_node(self) -> Result<Node> {
        let kind: NodeKind = self.kind.parse()?;
        let coord = Coord::new(self.space_id, self.group_id, decode_path(&self.path)?);
        let slot = u8::try_from(self.parking_slot).ok().and_then(ParkingSlot::new);
        let state = match (self.parking_slot, slot, self.final_path) {
            (0, _, None) => NodeState::Stable,
            (_, Some(slot), Some(final_path)) => NodeState::Relocating {
                slot,
                final_coord: Coord::new(self.space_id, self.group_id, decode_path(&final_path)?),
            },
            (raw, _, final_path) => {
                return Err(InvariantViolation::InconsistentParking {
                    coord: coord.to_string(),
                    slot: raw,
                    has_final: final_path.is_some(),
                }
                .into());
            }
        };

        Ok(Node::from_record(NodeRecord {
            id: NodeId(self.node_id),
            kind,
            coord,
            parent_id: self.parent_id.map(NodeId),
            origin_id: self.origin_id.map(NodeId),
            content_id: ContentId(self.content_id),
            state,
            created_at_us: self.created_at_us,
            updated_at_us: self.updated_at_us,
        })?)
    }
}

fn content_from_row(row: &Row<'_>) -> rusqlite::Result<Content> {
    Ok(Content {
        id: ContentId(row.get(0)?),
        title: row.get(1)?,
        description: row.get(2)?,
        link: row.get(3)?,
        created_at_us: row.get(4)?,
        updated_at_us: row.get(5)?,
    })
}

fn depth_param(depth: usize) -> i64 {
    i64::try_from(depth).unwrap_or(i64::MAX)
}

fn parking_columns(state: &NodeState) -> (i64, Option<String>) {
    match state {
        NodeState::Stable => (0, None),
        NodeState::Relocating { slot, final_coord } => {
            (i64::from(slot.index()), Some(encode_path(&final_coord.path)))
        }
    }
}

// ---------------------------------------------------------------------------
// SqliteRepository
// ---------------------------------------------------------------------------

/// Repository over one SQLite handle.
#[derive(Debug, Clone, Copy)]
pub struct SqliteRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRepository<'conn> {
    /// Bind a repository to a connection or an active transaction.
    #[must_use]
    pub const fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_nodes(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Node>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt
            .query_map(params, NodeRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(NodeRow::into_node).collect()
    }

    fn query_node(&self, sql: &str, params: impl rusqlite::Params) -> Result<Option<Node>> {
        let row = self
            .conn
            .query_row(sql, params, NodeRow::from_row)
            .optional()?;
        row.map(NodeRow::into_node).transpose()
    }
}

impl NodeRepository for SqliteRepository<'_> {
    fn get_one(&self, id: NodeId) -> Result<Option<Node>> {
        self.query_node(
            &format!("SELECT {NODE_COLUMNS} FROM nodes WHERE node_id = ?1"),
            params![id.0],
        )
    }

    fn get_one_by_coord(&self, coord: &Coord) -> Result<Option<Node>> {
        self.query_node(
            &format!(
                "SELECT {NODE_COLUMNS} FROM nodes \
                 WHERE space_id = ?1 AND group_id = ?2 AND path = ?3 AND parking_slot = 0"
            ),
            params![coord.space_id, coord.group_id, encode_path(&coord.path)],
        )
    }

    fn get_many(&self, query: &NodeQuery) -> Result<Vec<Node>> {
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(ids) = &query.ids {
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            let placeholders = vec!["?"; ids.len()].join(", ");
            clauses.push(format!("node_id IN ({placeholders})"));
            values.extend(ids.iter().map(|id| Value::Integer(id.0)));
        }
        if let Some(space_id) = query.space_id {
            clauses.push("space_id = ?".into());
            values.push(Value::Integer(space_id));
        }
        if let Some(group_id) = query.group_id {
            clauses.push("group_id = ?".into());
            values.push(Value::Integer(group_id));
        }
        if let Some(parent_id) = query.parent_id {
            clauses.push("parent_id = ?".into());
            values.push(Value::Integer(parent_id.0));
        }
        if let Some(max_depth) = query.max_depth {
            clauses.push("depth <= ?".into());
            values.push(Value::Integer(depth_param(max_depth)));
        }
        if !query.include_parked {
            clauses.push("parking_slot = 0".into());
        }

        let mut sql = format!("SELECT {NODE_COLUMNS} FROM nodes");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY space_id, group_id, parking_slot, depth, path, node_id");
        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            values.push(Value::Integer(i64::from(limit)));
        }

        self.query_nodes(&sql, params_from_iter(values))
    }

    fn get_root(&self, space_id: i64, group_id: i64) -> Result<Option<Node>> {
        self.query_node(
            &format!(
                "SELECT {NODE_COLUMNS} FROM nodes \
                 WHERE kind = 'root' AND space_id = ?1 AND group_id = ?2"
            ),
            params![space_id, group_id],
        )
    }

    fn get_roots_for_space(&self, space_id: i64) -> Result<Vec<Node>> {
        self.query_nodes(
            &format!(
                "SELECT {NODE_COLUMNS} FROM nodes \
                 WHERE kind = 'root' AND space_id = ?1 ORDER BY group_id"
            ),
            params![space_id],
        )
    }

    fn get_descendants_by_parent(&self, query: &DescendantQuery) -> Result<Vec<Node>> {
        self.query_nodes(
            &format!(
                "SELECT {NODE_COLUMNS} FROM nodes \
                 WHERE space_id = ?1 AND group_id = ?2 AND parking_slot = 0 AND depth > ?3 \
                   AND (?4 = '' OR path LIKE ?4 || ',%') \
                 ORDER BY depth, path"
            ),
            params![
                query.space_id,
                query.group_id,
                depth_param(query.parent_path.len()),
                encode_path(&query.parent_path)
            ],
        )
    }

    fn get_children(&self, parent_id: NodeId) -> Result<Vec<Node>> {
        self.query_nodes(
            &format!(
                "SELECT {NODE_COLUMNS} FROM nodes \
                 WHERE parent_id = ?1 AND parking_slot = 0 ORDER BY path"
            ),
            params![parent_id.0],
        )
    }

    fn get_parked(&self, space_id: i64, group_id: i64) -> Result<Vec<Node>> {
        self.query_nodes(
            &format!(
                "SELECT {NODE_COLUMNS} FROM nodes \
                 WHERE space_id = ?1 AND group_id = ?2 AND parking_slot > 0 \
                 ORDER BY parking_slot, depth, path"
            ),
            params![space_id, group_id],
        )
    }

    fn get_parked_trees(&self) -> Result<Vec<(i64, i64)>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT DISTINCT space_id, group_id FROM nodes \
             WHERE parking_slot > 0 ORDER BY space_id, group_id",
        )?;
        let trees = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(trees)
    }

    fn is_parking_slot_occupied(&self, coord: &Coord, slot: ParkingSlot) -> Result<bool> {
        let occupied: bool = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM nodes
                WHERE space_id = ?1 AND group_id = ?2 AND parking_slot = ?3
                  AND (?4 = '' OR path = ?4 OR path LIKE ?4 || ',%')
             )",
            params![
                coord.space_id,
                coord.group_id,
                i64::from(slot.index()),
                encode_path(&coord.path)
            ],
            |row| row.get(0),
        )?;
        Ok(occupied)
    }

    fn create(&self, node: NewNode) -> Result<Node> {
        let now = now_us();
        let coord = node.coord();
        self.conn.execute(
            "INSERT INTO nodes (
                kind, space_id, group_id, path, depth, parent_id, origin_id, content_id,
                parking_slot, final_path, created_at_us, updated_at_us
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, NULL, ?9, ?9)",
            params![
                node.kind().as_str(),
                coord.space_id,
                coord.group_id,
                encode_path(&coord.path),
                depth_param(coord.depth()),
                node.parent_id().map(|id| id.0),
                node.origin_id().map(|id| id.0),
                node.content_id().0,
                now,
            ],
        )?;
        let id = NodeId(self.conn.last_insert_rowid());
        self.get_one(id)?
            .ok_or_else(|| TreeError::not_found("created node", id))
    }

    fn update(&self, id: NodeId, update: &NodeUpdate) -> Result<Node> {
        let (parking_slot, final_path) = parking_columns(&update.state);
        let changed = self.conn.execute(
            "UPDATE nodes SET
                space_id = ?1, group_id = ?2, path = ?3, depth = ?4, parent_id = ?5,
                parking_slot = ?6, final_path = ?7, updated_at_us = ?8
             WHERE node_id = ?9",
            params![
                update.coord.space_id,
                update.coord.group_id,
                encode_path(&update.coord.path),
                depth_param(update.coord.depth()),
                update.parent_id.map(|id| id.0),
                parking_slot,
                final_path,
                now_us(),
                id.0,
            ],
        )?;
        if changed == 0 {
            return Err(TreeError::not_found("node", id));
        }
        self.get_one(id)?
            .ok_or_else(|| TreeError::not_found("node", id))
    }

    fn remove(&self, id: NodeId) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM nodes WHERE node_id = ?1", params![id.0])?;
        if changed == 0 {
            return Err(TreeError::not_found("node", id));
        }
        Ok(())
    }
}

impl ContentRepository for SqliteRepository<'_> {
    fn create_content(&self, content: &NewContent) -> Result<Content> {
        let now = now_us();
        self.conn.execute(
            "INSERT INTO contents (title, description, link, created_at_us, updated_at_us)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![content.title(), content.description(), content.link(), now],
        )?;
        let id = ContentId(self.conn.last_insert_rowid());
        self.get_content(id)?
            .ok_or_else(|| TreeError::not_found("created content", id))
    }

    fn get_content(&self, id: ContentId) -> Result<Option<Content>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {CONTENT_COLUMNS} FROM contents WHERE content_id = ?1"),
                params![id.0],
                content_from_row,
            )
            .optional()?)
    }

    fn update_content(&self, id: ContentId, content: &NewContent) -> Result<Content> {
        let changed = self.conn.execute(
            "UPDATE contents SET title = ?1, description = ?2, link = ?3, updated_at_us = ?4
             WHERE content_id = ?5",
            params![
                content.title(),
                content.description(),
                content.link(),
                now_us(),
                id.0
            ],
        )?;
        if changed == 0 {
            return Err(TreeError::not_found("content", id));
        }
        self.get_content(id)?
            .ok_or_else(|| TreeError::not_found("content", id))
    }

    fn remove_content(&self, id: ContentId) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM contents WHERE content_id = ?1", params![id.0])?;
        if changed == 0 {
            return Err(TreeError::not_found("content", id));
        }
        Ok(())
    }

    fn is_content_referenced(&self, id: ContentId) -> Result<bool> {
        let referenced: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM nodes WHERE content_id = ?1)",
            params![id.0],
            |row| row.get(0),
        )?;
        Ok(referenced)
    }
}
