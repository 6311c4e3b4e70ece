use hexmap_core::coord::{Coord, Direction};
use proptest::prelude::*;

pub fn arb_direction() -> impl Strategy<Value = Direction> + Clone {
    prop::sample::select(Direction::ALL.to_vec())
}

pub fn arb_path(max_depth: usize) -> impl Strategy<Value = Vec<Direction>> + Clone {
    prop::collection::vec(arb_direction(), 0..=max_depth)
}

pub fn arb_coord() -> impl Strategy<Value = Coord> + Clone {
    (any::<i64>(), any::<i64>(), arb_path(12))
        .prop_map(|(space_id, group_id, path)| Coord::new(space_id, group_id, path))
}

/// Non-root coordinate inside tree `(1, 0)`.
#[allow(dead_code)]
pub fn arb_child_coord(max_depth: usize) -> impl Strategy<Value = Coord> + Clone {
    prop::collection::vec(arb_direction(), 1..=max_depth).prop_map(|path| Coord::new(1, 0, path))
}
