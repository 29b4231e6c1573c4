use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use crate::{
    error::Result,
    traits::ContourExtractor,
    types::{Boundary, BoundarySet, Nesting},
};

/// Imageproc-based contour extractor.
///
/// Returns every outer and hole border in discovery order, with a full
/// `[next, previous, first_child, parent]` tree built from the parent links.
#[derive(Debug, Clone, Default)]
pub struct ImageprocContourExtractor;

impl ContourExtractor for ImageprocContourExtractor {
    fn extract_contours(&self, binary_image: &GrayImage) -> Result<BoundarySet> {
        let contours = find_contours::<i32>(binary_image);

        let parents: Vec<Option<usize>> = contours.iter().map(|c| c.parent).collect();
        let hierarchy = build_hierarchy(&parents);

        let boundaries: Vec<Boundary> = contours
            .iter()
            .map(|contour| contour.points.iter().map(|p| [p.x, p.y]).collect())
            .collect();

        let holes = contours
            .iter()
            .filter(|c| c.border_type == BorderType::Hole)
            .count();
        tracing::debug!(
            contours = boundaries.len(),
            holes,
            "extracted contours"
        );

        BoundarySet::new(boundaries, hierarchy)
    }
}

/// Derive sibling and first-child links from parent links.
///
/// Siblings are chained in index order; the first child of a node is its
/// lowest-indexed child.
pub fn build_hierarchy(parents: &[Option<usize>]) -> Vec<Nesting> {
    let mut hierarchy: Vec<Nesting> = parents
        .iter()
        .map(|parent| Nesting {
            parent: parent.map_or(Nesting::NONE, |p| p as i32),
            ..Nesting::root()
        })
        .collect();

    // last seen child per parent slot; index `parents.len()` is the top level
    let mut last_child: Vec<Option<usize>> = vec![None; parents.len() + 1];

    for (index, parent) in parents.iter().enumerate() {
        let slot = parent.unwrap_or(parents.len());

        match last_child[slot] {
            Some(previous) => {
                hierarchy[previous].next = index as i32;
                hierarchy[index].previous = previous as i32;
            }
            None => {
                if let Some(p) = parent {
                    hierarchy[*p].first_child = index as i32;
                }
            }
        }
        last_child[slot] = Some(index);
    }

    hierarchy
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn fill(img: &mut GrayImage, x0: u32, y0: u32, x1: u32, y1: u32, value: u8) {
        for y in y0..y1 {
            for x in x0..x1 {
                img.put_pixel(x, y, Luma([value]));
            }
        }
    }

    #[test]
    fn test_build_hierarchy_links() {
        // 0: outer, 1: hole of 0, 2: island in 1, 3: second outer, 4: second hole of 0
        let parents = vec![None, Some(0), Some(1), None, Some(0)];
        let h = build_hierarchy(&parents);

        assert_eq!(h[0].to_array(), [3, -1, 1, -1]);
        assert_eq!(h[1].to_array(), [4, -1, 2, 0]);
        assert_eq!(h[2].to_array(), [-1, -1, -1, 1]);
        assert_eq!(h[3].to_array(), [-1, 0, -1, -1]);
        assert_eq!(h[4].to_array(), [-1, 1, -1, 0]);
    }

    #[test]
    fn test_square_with_hole() {
        let mut img = GrayImage::new(40, 40);
        fill(&mut img, 5, 5, 35, 35, 255);
        fill(&mut img, 15, 15, 25, 25, 0);

        let set = ImageprocContourExtractor.extract_contours(&img).unwrap();
        assert_eq!(set.len(), 2);

        let outer = set.hierarchy().iter().position(|n| n.parent == -1).unwrap();
        let hole = set.hierarchy().iter().position(|n| n.parent != -1).unwrap();
        assert_eq!(set.hierarchy()[hole].parent, outer as i32);
        assert_eq!(set.hierarchy()[outer].first_child, hole as i32);
        assert!(set.hierarchy()[hole].is_hole());
        assert!(!set.hierarchy()[outer].is_hole());
    }

    #[test]
    fn test_blank_image_has_no_contours() {
        let set = ImageprocContourExtractor
            .extract_contours(&GrayImage::new(10, 10))
            .unwrap();
        assert!(set.is_empty());
    }
}
