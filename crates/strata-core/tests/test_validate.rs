#[allow(dead_code)]
mod common;

use std::path::Path;

use strata_core::error::StrataError;
use strata_core::tile::Tile;
use strata_core::validate::validate_shapes;

// ---------------------------------------------------------------------------
// validate_shapes
// ---------------------------------------------------------------------------

#[test]
fn test_first_tile_sets_reference() {
    let tiles = vec![
        common::make_tile("a.tif", 2, 10, 10, 1.0),
        common::make_tile("b.tif", 2, 10, 10, 2.0),
        common::make_tile("c.tif", 2, 11, 10, 3.0),
    ];
    let (accepted, skipped) = validate_shapes(tiles).unwrap();

    assert_eq!(accepted.len(), 2);
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].path, Path::new("c.tif"));
    assert_eq!(skipped[0].expected, (2, 10, 10));
    assert_eq!(skipped[0].actual, (2, 11, 10));
}

#[test]
fn test_all_matching_accepted_in_order() {
    let tiles = vec![
        common::make_tile("a.tif", 1, 4, 4, 1.0),
        common::make_tile("b.tif", 1, 4, 4, 2.0),
        common::make_tile("c.tif", 1, 4, 4, 3.0),
    ];
    let (accepted, skipped) = validate_shapes(tiles).unwrap();

    assert!(skipped.is_empty());
    let names: Vec<_> = accepted
        .iter()
        .map(|t| t.metadata.path.clone())
        .collect();
    assert_eq!(
        names,
        vec![
            Path::new("a.tif").to_path_buf(),
            Path::new("b.tif").to_path_buf(),
            Path::new("c.tif").to_path_buf()
        ]
    );
}

#[test]
fn test_band_count_mismatch_skipped() {
    let tiles = vec![
        common::make_tile("a.tif", 1, 4, 4, 1.0),
        common::make_tile("b.tif", 3, 4, 4, 2.0),
    ];
    let (accepted, skipped) = validate_shapes(tiles).unwrap();
    assert_eq!(accepted.len(), 1);
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].actual, (3, 4, 4));
}

#[test]
fn test_empty_input_is_empty_stack() {
    let tiles: Vec<Tile> = vec![];
    assert!(matches!(
        validate_shapes(tiles),
        Err(StrataError::EmptyStack)
    ));
}

#[test]
fn test_single_tile_accepted() {
    let tiles = vec![common::make_tile("a.tif", 1, 2, 2, 0.5)];
    let (accepted, skipped) = validate_shapes(tiles).unwrap();
    assert_eq!(accepted.len(), 1);
    assert!(skipped.is_empty());
}

#[test]
fn test_skip_diagnostic_message_names_path() {
    let tiles = vec![
        common::make_tile("a.tif", 1, 4, 4, 1.0),
        common::make_tile("odd.tif", 1, 5, 4, 2.0),
    ];
    let (_, skipped) = validate_shapes(tiles).unwrap();
    let msg = skipped[0].to_string();
    assert!(msg.contains("odd.tif"), "diagnostic should cite the path: {msg}");
    assert!(msg.contains("(1, 4, 4)"), "diagnostic should cite the expected shape: {msg}");
}
