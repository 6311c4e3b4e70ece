//! Hexagonal coordinate algebra.
//!
//! Every node in a map is addressed by a [`Coord`]: a `(space_id, group_id)`
//! pair naming the tree, plus a materialized path of [`Direction`] steps from
//! that tree's root. The path length is the node's depth.
//!
//! # Wire format
//!
//! ```text
//! {space_id},{group_id}                 root of a tree
//! {space_id},{group_id}:{d1},{d2},...   descendant, one direction per level
//! ```
//!
//! [`create_id`] and [`parse_id`] are exact inverses. Directions are the
//! integers `1..=6`; values from [`PARKING_SENTINEL`] upward only ever appear
//! in diagnostic renderings of parked rows ([`ParkedCoord`]) and are rejected
//! by [`parse_id`].
//!
//! Everything in this module is pure: no storage, no logging.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};
use std::num::NonZeroU8;
use std::str::FromStr;

/// First wire value reserved for parking slots. Never a valid direction.
pub const PARKING_SENTINEL: u8 = 7;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A direction value outside `1..=6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid direction {0}: expected 1-6")]
pub struct InvalidDirection(pub u8);

/// Failure to decode a coordinate from its wire form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    /// The string does not follow `{space},{group}[:{d1,...}]`.
    #[error("invalid address '{input}': {reason}")]
    Malformed { input: String, reason: &'static str },

    /// A path element parsed as an integer but is not a direction.
    #[error("invalid address '{input}': direction {value} is outside 1-6")]
    DirectionOutOfRange { input: String, value: i64 },
}

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// One of the six hex neighbours of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum Direction {
    NorthWest = 1,
    NorthEast = 2,
    East = 3,
    SouthEast = 4,
    SouthWest = 5,
    West = 6,
}

impl Direction {
    /// All directions in rendering order: NW, NE, E, SE, SW, W.
    pub const ALL: [Self; 6] = [
        Self::NorthWest,
        Self::NorthEast,
        Self::East,
        Self::SouthEast,
        Self::SouthWest,
        Self::West,
    ];

    /// Integer wire value (`1..=6`).
    #[must_use]
    pub const fn value(self) -> u8 {
        self as u8
    }

    /// The direction pointing the opposite way across the hex.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::NorthWest => Self::SouthEast,
            Self::NorthEast => Self::SouthWest,
            Self::East => Self::West,
            Self::SouthEast => Self::NorthWest,
            Self::SouthWest => Self::NorthEast,
            Self::West => Self::East,
        }
    }

    /// Short compass label used by human output.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NorthWest => "NW",
            Self::NorthEast => "NE",
            Self::East => "E",
            Self::SouthEast => "SE",
            Self::SouthWest => "SW",
            Self::West => "W",
        }
    }
}

impl From<Direction> for u8 {
    fn from(direction: Direction) -> Self {
        direction.value()
    }
}

impl TryFrom<u8> for Direction {
    type Error = InvalidDirection;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::NorthWest),
            2 => Ok(Self::NorthEast),
            3 => Ok(Self::East),
            4 => Ok(Self::SouthEast),
            5 => Ok(Self::SouthWest),
            6 => Ok(Self::West),
            other => Err(InvalidDirection(other)),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl FromStr for Direction {
    type Err = InvalidDirection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nw" | "northwest" => Ok(Self::NorthWest),
            "ne" | "northeast" => Ok(Self::NorthEast),
            "e" | "east" => Ok(Self::East),
            "se" | "southeast" => Ok(Self::SouthEast),
            "sw" | "southwest" => Ok(Self::SouthWest),
            "w" | "west" => Ok(Self::West),
            other => {
                let value: u8 = other.parse().map_err(|_| InvalidDirection(0))?;
                Self::try_from(value)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Coord
// ---------------------------------------------------------------------------

/// The address of a node: tree identity plus path from that tree's root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    pub space_id: i64,
    pub group_id: i64,
    pub path: Vec<Direction>,
}

impl Coord {
    /// Root-depth coordinate of a tree.
    #[must_use]
    pub const fn root(space_id: i64, group_id: i64) -> Self {
        Self {
            space_id,
            group_id,
            path: Vec::new(),
        }
    }

    #[must_use]
    pub const fn new(space_id: i64, group_id: i64, path: Vec<Direction>) -> Self {
        Self {
            space_id,
            group_id,
            path,
        }
    }

    /// Number of path steps from the root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// The coordinate one step further in `direction`.
    #[must_use]
    pub fn child(&self, direction: Direction) -> Self {
        let mut path = Vec::with_capacity(self.path.len() + 1);
        path.extend_from_slice(&self.path);
        path.push(direction);
        Self::new(self.space_id, self.group_id, path)
    }

    /// Parent coordinate, or `None` at depth 0.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let (_, prefix) = self.path.split_last()?;
        Some(Self::new(self.space_id, self.group_id, prefix.to_vec()))
    }

    /// Final step of the path, `None` for a root.
    #[must_use]
    pub fn last_direction(&self) -> Option<Direction> {
        self.path.last().copied()
    }

    /// Whether both coordinates belong to the same `(space_id, group_id)` tree.
    #[must_use]
    pub const fn same_space(&self, other: &Self) -> bool {
        self.space_id == other.space_id && self.group_id == other.group_id
    }

    /// Strict ancestry: `other` lies below `self` in the same tree.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        self.same_space(other)
            && other.path.len() > self.path.len()
            && other.path.starts_with(&self.path)
    }

    /// Replace the `old_prefix` portion of this coordinate with `new_prefix`,
    /// keeping the remaining suffix unchanged.
    ///
    /// Returns `None` when `self` is neither `old_prefix` nor one of its
    /// descendants.
    #[must_use]
    pub fn rebase(&self, old_prefix: &Self, new_prefix: &Self) -> Option<Self> {
        if !self.same_space(old_prefix) || !self.path.starts_with(&old_prefix.path) {
            return None;
        }
        let suffix = &self.path[old_prefix.path.len()..];
        let mut path = Vec::with_capacity(new_prefix.path.len() + suffix.len());
        path.extend_from_slice(&new_prefix.path);
        path.extend_from_slice(suffix);
        Some(Self::new(new_prefix.space_id, new_prefix.group_id, path))
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&create_id(self))
    }
}

impl FromStr for Coord {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_id(s)
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

/// Render a coordinate as `"{space},{group}"` plus `":{d1,...}"` when the
/// path is non-empty.
#[must_use]
pub fn create_id(coord: &Coord) -> String {
    let mut id = format!("{},{}", coord.space_id, coord.group_id);
    if !coord.path.is_empty() {
        id.push(':');
        id.push_str(&encode_path(&coord.path));
    }
    id
}

/// Parse the wire form produced by [`create_id`].
///
/// # Errors
///
/// Returns [`AddressError::Malformed`] when the base segment is not two
/// integers or a path element is not an integer, and
/// [`AddressError::DirectionOutOfRange`] for integers outside `1..=6`.
pub fn parse_id(input: &str) -> Result<Coord, AddressError> {
    let malformed = |reason| AddressError::Malformed {
        input: input.to_string(),
        reason,
    };

    let (base, path) = match input.split_once(':') {
        Some((base, path)) => (base, Some(path)),
        None => (input, None),
    };

    let (space, group) = base
        .split_once(',')
        .ok_or_else(|| malformed("expected '{space},{group}'"))?;
    let space_id: i64 = space
        .parse()
        .map_err(|_| malformed("space id is not an integer"))?;
    let group_id: i64 = group
        .parse()
        .map_err(|_| malformed("group id is not an integer"))?;

    let path = match path {
        None => Vec::new(),
        Some("") => return Err(malformed("empty path segment")),
        Some(raw) => parse_path_elements(input, raw)?,
    };

    Ok(Coord::new(space_id, group_id, path))
}

fn parse_path_elements(input: &str, raw: &str) -> Result<Vec<Direction>, AddressError> {
    raw.split(',')
        .map(|element| {
            let value: i64 = element.parse().map_err(|_| AddressError::Malformed {
                input: input.to_string(),
                reason: "path elements must be integers",
            })?;
            u8::try_from(value)
                .ok()
                .and_then(|v| Direction::try_from(v).ok())
                .ok_or_else(|| AddressError::DirectionOutOfRange {
                    input: input.to_string(),
                    value,
                })
        })
        .collect()
}

/// Comma-joined direction values, `""` for an empty path. This is the
/// storage encoding of a path column.
#[must_use]
pub fn encode_path(path: &[Direction]) -> String {
    let mut out = String::with_capacity(path.len() * 2);
    for (i, direction) in path.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        let _ = write!(out, "{}", direction.value());
    }
    out
}

/// Inverse of [`encode_path`].
///
/// # Errors
///
/// Returns an [`AddressError`] if any element is not a direction.
pub fn decode_path(encoded: &str) -> Result<Vec<Direction>, AddressError> {
    if encoded.is_empty() {
        return Ok(Vec::new());
    }
    parse_path_elements(encoded, encoded)
}

// ---------------------------------------------------------------------------
// Topology
// ---------------------------------------------------------------------------

/// The six child coordinates of `parent`, in the fixed order
/// NW, NE, E, SE, SW, W.
#[must_use]
pub fn get_child_coords(parent: &Coord) -> [Coord; 6] {
    Direction::ALL.map(|direction| parent.child(direction))
}

/// Parent of `coord`, `None` at depth 0.
#[must_use]
pub fn get_parent_coord(coord: &Coord) -> Option<Coord> {
    coord.parent()
}

/// Two same-depth siblings whose final directions face each other across the
/// parent hex (NW/SE, NE/SW, E/W).
#[must_use]
pub fn is_adjacent(a: &Coord, b: &Coord) -> bool {
    if !a.same_space(b) || a.depth() != b.depth() || a.is_root() {
        return false;
    }
    let n = a.depth() - 1;
    a.path[..n] == b.path[..n] && a.path[n].opposite() == b.path[n]
}

/// The unique coordinate adjacent to `coord` under [`is_adjacent`].
#[must_use]
pub fn adjacent_coord(coord: &Coord) -> Option<Coord> {
    let last = coord.last_direction()?;
    let parent = coord.parent()?;
    Some(parent.child(last.opposite()))
}

// ---------------------------------------------------------------------------
// Parking
// ---------------------------------------------------------------------------

/// Index of a transient parking slot. Slot `n` renders on the wire as
/// `6 + n`, so the first slot is [`PARKING_SENTINEL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParkingSlot(NonZeroU8);

impl ParkingSlot {
    pub const FIRST: Self = Self(NonZeroU8::MIN);

    /// `None` for index 0, which is the stable (unparked) state.
    #[must_use]
    pub const fn new(index: u8) -> Option<Self> {
        match NonZeroU8::new(index) {
            Some(index) => Some(Self(index)),
            None => None,
        }
    }

    #[must_use]
    pub const fn index(self) -> u8 {
        self.0.get()
    }

    #[must_use]
    pub const fn wire_value(self) -> u16 {
        self.0.get() as u16 + PARKING_SENTINEL as u16 - 1
    }

    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(index) => Some(Self(index)),
            None => None,
        }
    }
}

impl fmt::Display for ParkingSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wire_value())
    }
}

/// Physical location of a parked row: its coordinate plus the slot it is
/// held in. Only used for diagnostics; never parsed back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ParkedCoord {
    pub coord: Coord,
    pub slot: ParkingSlot,
}

impl fmt::Display for ParkedCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}:", self.coord.space_id, self.coord.group_id)?;
        for direction in &self.coord.path {
            write!(f, "{direction},")?;
        }
        write!(f, "{}", self.slot)
    }
}
