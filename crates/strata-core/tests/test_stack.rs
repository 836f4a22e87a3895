#[allow(dead_code)]
mod common;

use approx::assert_abs_diff_eq;
use ndarray::array;

use strata_core::error::StrataError;
use strata_core::stack::mean::mean_stack;
use strata_core::stack::Stack;
use strata_core::tile::Tile;

// ---------------------------------------------------------------------------
// Stack::from_tiles
// ---------------------------------------------------------------------------

#[test]
fn test_stack_shape_and_order() {
    let tiles = vec![
        common::make_tile("a.tif", 2, 3, 4, 1.0),
        common::make_tile("b.tif", 2, 3, 4, 2.0),
        common::make_tile("c.tif", 2, 3, 4, 3.0),
    ];
    let stack = Stack::from_tiles(tiles).unwrap();

    assert_eq!(stack.observations(), 3);
    assert_eq!(stack.tile_shape(), (2, 3, 4));
    // Observation order matches input order
    assert_eq!(stack.values[[0, 0, 0, 0]], 1.0);
    assert_eq!(stack.values[[1, 1, 2, 3]], 2.0);
    assert_eq!(stack.values[[2, 0, 1, 1]], 3.0);
}

#[test]
fn test_stack_carries_validity() {
    let t1 = common::band_tile("a.tif", array![[1.0, f32::NAN]]);
    let t2 = common::band_tile("b.tif", array![[2.0, 5.0]]);
    let stack = Stack::from_tiles(vec![t1, t2]).unwrap();

    assert!(stack.valid[[0, 0, 0, 0]]);
    assert!(!stack.valid[[0, 0, 0, 1]]);
    assert!(stack.valid[[1, 0, 0, 1]]);
}

#[test]
fn test_stack_empty_error() {
    let tiles: Vec<Tile> = vec![];
    assert!(matches!(
        Stack::from_tiles(tiles),
        Err(StrataError::EmptyStack)
    ));
}

// ---------------------------------------------------------------------------
// mean_stack
// ---------------------------------------------------------------------------

#[test]
fn test_mean_of_constants() {
    let tiles = vec![
        common::make_tile("a.tif", 1, 2, 2, 0.2),
        common::make_tile("b.tif", 1, 2, 2, 0.8),
    ];
    let stack = Stack::from_tiles(tiles).unwrap();
    let result = mean_stack(&stack).unwrap();

    for v in result.values.iter() {
        assert_abs_diff_eq!(*v, 0.5, epsilon = 1e-6);
    }
    assert!(result.valid.iter().all(|&v| v));
}

#[test]
fn test_mean_skips_missing_observations() {
    // Column [missing, 1.0, 2.0] -> mean 1.5
    let t1 = common::band_tile("a.tif", array![[f32::NAN]]);
    let t2 = common::band_tile("b.tif", array![[1.0]]);
    let t3 = common::band_tile("c.tif", array![[2.0]]);
    let stack = Stack::from_tiles(vec![t1, t2, t3]).unwrap();
    let result = mean_stack(&stack).unwrap();

    assert_abs_diff_eq!(result.values[[0, 0, 0]], 1.5, epsilon = 1e-6);
    assert!(result.valid[[0, 0, 0]]);
}

#[test]
fn test_mean_all_missing_coordinate() {
    let t1 = common::band_tile("a.tif", array![[f32::NAN, 1.0]]);
    let t2 = common::band_tile("b.tif", array![[f32::NAN, 3.0]]);
    let stack = Stack::from_tiles(vec![t1, t2]).unwrap();
    let result = mean_stack(&stack).unwrap();

    assert!(!result.valid[[0, 0, 0]]);
    assert!(result.valid[[0, 0, 1]]);
    assert_abs_diff_eq!(result.values[[0, 0, 1]], 2.0, epsilon = 1e-6);
    // Missing coordinates serialize as NaN
    assert!(result.masked_values()[[0, 0, 0]].is_nan());
}

#[test]
fn test_mean_per_band() {
    let mut t1 = common::make_tile("a.tif", 2, 1, 1, 0.0);
    t1.values[[0, 0, 0]] = 10.0;
    t1.values[[1, 0, 0]] = 100.0;
    let mut t2 = common::make_tile("b.tif", 2, 1, 1, 0.0);
    t2.values[[0, 0, 0]] = 20.0;
    t2.values[[1, 0, 0]] = 200.0;

    let stack = Stack::from_tiles(vec![t1, t2]).unwrap();
    let result = mean_stack(&stack).unwrap();

    assert_abs_diff_eq!(result.values[[0, 0, 0]], 15.0, epsilon = 1e-6);
    assert_abs_diff_eq!(result.values[[1, 0, 0]], 150.0, epsilon = 1e-6);
}
