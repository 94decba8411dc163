//! # Tile Location Tests

use tileload_core::common::TileLocation;

#[test]
fn test_neighbours_in_the_middle() {
    let loc = TileLocation::new(3, 10);
    assert_eq!(loc.south(), Some(TileLocation::new(2, 10)));
    assert_eq!(loc.north(), Some(TileLocation::new(4, 10)));
    assert_eq!(loc.west(), Some(TileLocation::new(3, 9)));
    assert_eq!(loc.east(), Some(TileLocation::new(3, 11)));
}

#[test]
fn test_neighbours_saturate_at_edges() {
    assert_eq!(TileLocation::new(0, 4).south(), None);
    assert_eq!(TileLocation::new(4, 0).west(), None);
    assert_eq!(TileLocation::new(u8::MAX, 4).north(), None);
    assert_eq!(TileLocation::new(4, u8::MAX).east(), None);
}

#[test]
fn test_display_is_column_first() {
    assert_eq!(TileLocation::new(2, 7).to_string(), "(col 7, row 2)");
}
