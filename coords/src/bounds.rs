//! Rectangular bounds in cell space.

use crate::cell::CellCoord;

/// An inclusive rectangle in cell space. Any side may be left unbounded.
///
/// Constructing a bounds with an inverted range (`min > max` on a bounded
/// side) is a programmer error and panics immediately, matching the
/// distilled spec's "fatal at construction" policy for malformed bounds.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct BoundsCoord {
    pub min_x: Option<i32>,
    pub max_x: Option<i32>,
    pub min_y: Option<i32>,
    pub max_y: Option<i32>,
}

impl BoundsCoord {
    /// No restriction on either axis.
    pub fn unbounded() -> Self {
        BoundsCoord::default()
    }

    /// Construct a bounds, panicking if a bounded axis is inverted.
    pub fn new(
        min_x: Option<i32>,
        max_x: Option<i32>,
        min_y: Option<i32>,
        max_y: Option<i32>,
    ) -> Self {
        if let (Some(lo), Some(hi)) = (min_x, max_x) {
            assert!(lo <= hi, "BoundsCoord: min_x={} > max_x={}", lo, hi);
        }
        if let (Some(lo), Some(hi)) = (min_y, max_y) {
            assert!(lo <= hi, "BoundsCoord: min_y={} > max_y={}", lo, hi);
        }
        BoundsCoord { min_x, max_x, min_y, max_y }
    }

    /// A cell is in bounds iff every bounded dimension contains it.
    pub fn contains(&self, cell: CellCoord) -> bool {
        self.min_x.map_or(true, |lo| cell.x >= lo)
            && self.max_x.map_or(true, |hi| cell.x <= hi)
            && self.min_y.map_or(true, |lo| cell.y >= lo)
            && self.max_y.map_or(true, |hi| cell.y <= hi)
    }
}

#[test]
#[should_panic]
fn test_inverted_bounds_panics() {
    BoundsCoord::new(Some(5), Some(1), None, None);
}

#[test]
fn test_bounds_containment() {
    let bounds = BoundsCoord::new(Some(-2), Some(2), None, Some(10));
    assert!(bounds.contains(CellCoord::new(0, 0)));
    assert!(bounds.contains(CellCoord::new(-2, 10)));
    assert!(bounds.contains(CellCoord::new(2, -1000)));
    assert!(!bounds.contains(CellCoord::new(3, 0)));
    assert!(!bounds.contains(CellCoord::new(0, 11)));
    assert!(!bounds.contains(CellCoord::new(-3, 0)));
}
