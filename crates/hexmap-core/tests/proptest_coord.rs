use hexmap_core::coord::{
    AddressError, Coord, create_id, decode_path, encode_path, get_child_coords, is_adjacent,
    parse_id,
};
use proptest::prelude::*;

#[path = "generators.rs"]
mod generators;
use generators::*;

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(2000))]

    #[test]
    fn parse_inverts_create(coord in arb_coord()) {
        let id = create_id(&coord);
        prop_assert_eq!(parse_id(&id).expect("own output parses"), coord);
    }

    #[test]
    fn path_encoding_inverts(path in arb_path(16)) {
        prop_assert_eq!(decode_path(&encode_path(&path)).expect("decode"), path);
    }

    #[test]
    fn every_child_has_its_parent(coord in arb_coord(), direction in arb_direction()) {
        let child = coord.child(direction);
        prop_assert_eq!(child.depth(), coord.depth() + 1);
        prop_assert_eq!(child.parent(), Some(coord.clone()));
        prop_assert!(coord.is_ancestor_of(&child));
        prop_assert!(!child.is_ancestor_of(&coord));
    }

    #[test]
    fn opposite_siblings_are_adjacent(coord in arb_coord(), direction in arb_direction()) {
        let a = coord.child(direction);
        prop_assert!(is_adjacent(&a, &coord.child(direction.opposite())));
        prop_assert!(!is_adjacent(&a, &coord));

        let children = get_child_coords(&coord);
        for (i, child) in children.iter().enumerate() {
            prop_assert!(children[i + 1..].iter().all(|other| other != child));
        }
    }

    #[test]
    fn rebase_moves_suffix_verbatim(
        from in arb_child_coord(6),
        to in arb_child_coord(6),
        suffix in arb_path(6),
    ) {
        let mut path = from.path.clone();
        path.extend_from_slice(&suffix);
        let node = Coord::new(1, 0, path);

        let moved = node.rebase(&from, &to).expect("node lies under from");
        prop_assert_eq!(&moved.path[to.depth()..], suffix.as_slice());
        prop_assert_eq!(moved.rebase(&to, &from), Some(node));
    }

    #[test]
    fn out_of_range_directions_are_rejected(
        space in any::<i64>(),
        group in any::<i64>(),
        bad in prop_oneof![Just(0u32), 7u32..1000],
    ) {
        let id = format!("{space},{group}:1,{bad}");
        let rejected = matches!(
            parse_id(&id),
            Err(AddressError::DirectionOutOfRange { .. })
        );
        prop_assert!(rejected, "{} should be out of range", id);
    }
}
