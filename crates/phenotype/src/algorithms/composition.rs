use crate::types::{BoundarySet, CombinedObject};

/// Merge every boundary that is not a pure hole into one point set.
///
/// A boundary is dropped only when it has a parent and no child. Kept
/// boundaries are concatenated in index order with their point order intact.
/// When nothing is kept the result is empty.
pub fn compose_object(set: &BoundarySet) -> CombinedObject {
    let points: Vec<[i32; 2]> = set
        .iter()
        .filter(|(_, nesting)| !nesting.is_hole())
        .flat_map(|(boundary, _)| boundary.iter().copied())
        .collect();

    CombinedObject { points }
}

/// Indices of the boundaries [`compose_object`] keeps
pub fn kept_boundaries(set: &BoundarySet) -> Vec<usize> {
    set.hierarchy()
        .iter()
        .enumerate()
        .filter(|(_, nesting)| !nesting.is_hole())
        .map(|(i, _)| i)
        .collect()
}
