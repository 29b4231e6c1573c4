use geo_types::{Coord, LineString};
use image::{GrayImage, ImageBuffer, Luma};
use serde::{Deserialize, Serialize};

use crate::error::{PhenotypeError, Result};

/// Binary mask, pixel values restricted to {0, 255}
pub type BinaryMask = GrayImage;

/// Labeled mask: 0 is background, k >= 1 is membership in region k
pub type LabeledMask = ImageBuffer<Luma<u32>, Vec<u32>>;

/// Closed point sequence `[x, y]` outlining one region
pub type Boundary = Vec<[i32; 2]>;

/// Nesting descriptor of one boundary, `-1` meaning "none"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nesting {
    pub next: i32,
    pub previous: i32,
    pub first_child: i32,
    pub parent: i32,
}

impl Nesting {
    pub const NONE: i32 = -1;

    /// Top-level boundary with no siblings and no children
    pub fn root() -> Self {
        Self {
            next: Self::NONE,
            previous: Self::NONE,
            first_child: Self::NONE,
            parent: Self::NONE,
        }
    }

    /// Build from the `[next, previous, first_child, parent]` layout
    pub fn from_array([next, previous, first_child, parent]: [i32; 4]) -> Self {
        Self { next, previous, first_child, parent }
    }

    pub fn to_array(self) -> [i32; 4] {
        [self.next, self.previous, self.first_child, self.parent]
    }

    /// A pure hole has no child but does have a parent
    pub fn is_hole(&self) -> bool {
        self.first_child == Self::NONE && self.parent > Self::NONE
    }
}

/// Boundaries of a mask paired with their nesting descriptors
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundarySet {
    boundaries: Vec<Boundary>,
    hierarchy: Vec<Nesting>,
}

impl BoundarySet {
    pub fn new(boundaries: Vec<Boundary>, hierarchy: Vec<Nesting>) -> Result<Self> {
        if boundaries.len() != hierarchy.len() {
            return Err(PhenotypeError::GeometricComputation(format!(
                "{} boundaries but {} nesting descriptors",
                boundaries.len(),
                hierarchy.len()
            )));
        }
        Ok(Self { boundaries, hierarchy })
    }

    pub fn boundaries(&self) -> &[Boundary] {
        &self.boundaries
    }

    pub fn hierarchy(&self) -> &[Nesting] {
        &self.hierarchy
    }

    pub fn len(&self) -> usize {
        self.boundaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Boundary, &Nesting)> {
        self.boundaries.iter().zip(self.hierarchy.iter())
    }
}

/// Union of every non-hole boundary of a mask ("the plant")
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombinedObject {
    pub points: Vec<[i32; 2]>,
}

impl CombinedObject {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Axis-aligned extent as `(min, max)` corners, `None` when empty
    pub fn bounding_box(&self) -> Option<([i32; 2], [i32; 2])> {
        let first = *self.points.first()?;
        let extent = self.points.iter().fold((first, first), |(min, max), &[x, y]| {
            ([min[0].min(x), min[1].min(y)], [max[0].max(x), max[1].max(y)])
        });
        Some(extent)
    }

    /// Convert to a geo-types line string for geometric operations
    pub fn to_line_string(&self) -> LineString<f64> {
        let coords: Vec<Coord<f64>> = self.points
            .iter()
            .map(|&[x, y]| Coord { x: x as f64, y: y as f64 })
            .collect();
        LineString::new(coords)
    }
}

/// Result of the segmentation pipeline
#[derive(Debug, Clone)]
pub struct SegmentedObject {
    /// Mask after preprocessing and region filtering
    pub mask: BinaryMask,
    pub boundaries: BoundarySet,
    pub combined: CombinedObject,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nesting_array_layout() {
        let nesting = Nesting::from_array([2, -1, 1, -1]);
        assert_eq!(nesting.next, 2);
        assert_eq!(nesting.first_child, 1);
        assert_eq!(nesting.to_array(), [2, -1, 1, -1]);
    }

    #[test]
    fn test_hole_classification() {
        assert!(!Nesting::root().is_hole());
        assert!(Nesting::from_array([-1, -1, -1, 0]).is_hole());
        // a nested boundary that itself has a child is kept
        assert!(!Nesting::from_array([-1, -1, 2, 0]).is_hole());
    }

    #[test]
    fn test_boundary_set_length_mismatch() {
        let result = BoundarySet::new(vec![vec![[0, 0]]], vec![]);
        assert!(matches!(result, Err(PhenotypeError::GeometricComputation(_))));
    }

    #[test]
    fn test_combined_bounding_box() {
        let object = CombinedObject { points: vec![[3, 4], [10, 1], [5, 9]] };
        assert_eq!(object.bounding_box(), Some(([3, 1], [10, 9])));
        assert_eq!(CombinedObject::default().bounding_box(), None);
        assert_eq!(object.to_line_string().0.len(), 3);
    }
}
