use geo::{Area, ConvexHull, EuclideanLength};
use geo_types::{Coord, LineString, MultiPoint, Point, Polygon};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_filled_circle_mut;
use plant_kit_common::{Observation, ObservationValue};
use tracing::{debug, warn};

use crate::{
    algorithms::{compose_object, iterate_analysis, kept_boundaries, ImageprocContourExtractor},
    context::AnalysisContext,
    error::Result,
    traits::ContourExtractor,
    types::{Boundary, BinaryMask, BoundarySet, LabeledMask, Nesting},
};

const METHOD: &str = "phenotype::analyze::size";
const OUTLINE_COLOR: Rgb<u8> = Rgb([255, 0, 255]);

/// Shape measurements of one composed object
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeTraits {
    /// Foreground pixel count
    pub area: i64,
    pub convex_hull_area: f64,
    /// Area enclosed by the top-level boundaries over the convex hull area
    pub solidity: f64,
    /// Total length of the kept boundaries, each closed
    pub perimeter: f64,
    pub width: i64,
    pub height: i64,
}

fn closed_ring(boundary: &Boundary) -> LineString<f64> {
    let mut ring: LineString<f64> = boundary
        .iter()
        .map(|&[x, y]| Coord { x: x as f64, y: y as f64 })
        .collect();
    ring.close();
    ring
}

fn measure(mask: &BinaryMask, boundaries: &BoundarySet) -> Option<SizeTraits> {
    let combined = compose_object(boundaries);
    let ([min_x, min_y], [max_x, max_y]) = combined.bounding_box()?;

    let points: MultiPoint<f64> = combined
        .points
        .iter()
        .map(|&[x, y]| Point::new(x as f64, y as f64))
        .collect();
    let convex_hull_area = points.convex_hull().unsigned_area();

    let enclosed: f64 = boundaries
        .iter()
        .filter(|(_, nesting)| nesting.parent == Nesting::NONE)
        .map(|(boundary, _)| Polygon::new(closed_ring(boundary), vec![]).unsigned_area())
        .sum();
    let solidity = if convex_hull_area > 0.0 {
        (enclosed / convex_hull_area).min(1.0)
    } else {
        1.0
    };

    let perimeter = kept_boundaries(boundaries)
        .into_iter()
        .map(|i| closed_ring(&boundaries.boundaries()[i]).euclidean_length())
        .sum();

    Some(SizeTraits {
        area: mask.pixels().filter(|p| p[0] != 0).count() as i64,
        convex_hull_area,
        solidity,
        perimeter,
        width: (max_x - min_x + 1) as i64,
        height: (max_y - min_y + 1) as i64,
    })
}

fn record(ctx: &mut AnalysisContext, sample: &str, variable: &str, trait_name: &str, scale: &str, value: ObservationValue) {
    ctx.record_observation(Observation {
        sample: sample.to_string(),
        variable: variable.to_string(),
        trait_name: trait_name.to_string(),
        method: METHOD.to_string(),
        scale: scale.to_string(),
        datatype: value.datatype(),
        value,
        label: scale.to_string(),
    });
}

/// Measure the single object of `mask` and draw its outline onto `image`.
///
/// An empty mask records nothing and returns the image unchanged.
pub fn size(
    image: RgbImage,
    mask: &BinaryMask,
    label: &str,
    ctx: &mut AnalysisContext,
) -> Result<RgbImage> {
    ctx.next_step();

    let boundaries = ImageprocContourExtractor.extract_contours(mask)?;
    let Some(traits) = measure(mask, &boundaries) else {
        warn!(label, "object mask is empty, no size traits recorded");
        return Ok(image);
    };
    debug!(label, area = traits.area, perimeter = traits.perimeter, "measured object size");

    record(ctx, label, "area", "area", "pixels", ObservationValue::Int(traits.area));
    record(ctx, label, "convex_hull_area", "convex hull area", "pixels", ObservationValue::Float(traits.convex_hull_area));
    record(ctx, label, "solidity", "solidity", "none", ObservationValue::Float(traits.solidity));
    record(ctx, label, "perimeter", "perimeter", "pixels", ObservationValue::Float(traits.perimeter));
    record(ctx, label, "width", "width", "pixels", ObservationValue::Int(traits.width));
    record(ctx, label, "height", "height", "pixels", ObservationValue::Int(traits.height));

    let mut image = image;
    let radius = (ctx.params().line_thickness / 2) as i32;
    for &[x, y] in &compose_object(&boundaries).points {
        draw_filled_circle_mut(&mut image, (x, y), radius, OUTLINE_COLOR);
    }
    ctx.emit_debug(&DynamicImage::ImageRgb8(image.clone()), "size.png")?;

    Ok(image)
}

/// Run [`size`] once per region of a labeled mask.
///
/// Each object is recorded under its own sample name, `"{label}_{n}"`.
pub fn size_labeled(
    image: RgbImage,
    labeled_mask: &LabeledMask,
    n_labels: u32,
    label: &str,
    ctx: &mut AnalysisContext,
) -> Result<RgbImage> {
    let mut object = 0;
    iterate_analysis(image, labeled_mask, n_labels, label, ctx, |img, mask: &BinaryMask, label: &str, ctx: &mut AnalysisContext| {
        object += 1;
        size(img, mask, &format!("{}_{}", label, object), ctx)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use plant_kit_common::Datatype;

    fn fill(img: &mut GrayImage, x0: u32, y0: u32, w: u32, h: u32) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                img.put_pixel(x, y, Luma([255]));
            }
        }
    }

    fn value(ctx: &AnalysisContext, sample: &str, variable: &str) -> f64 {
        ctx.outputs().get(sample, variable).unwrap().value.as_f64().unwrap()
    }

    #[test]
    fn test_rectangle_traits() {
        let mut mask = GrayImage::new(30, 20);
        fill(&mut mask, 5, 4, 10, 6);

        let mut ctx = AnalysisContext::default();
        size(RgbImage::new(30, 20), &mask, "plant", &mut ctx).unwrap();

        assert_eq!(value(&ctx, "plant", "area"), 60.0);
        assert_eq!(value(&ctx, "plant", "width"), 10.0);
        assert_eq!(value(&ctx, "plant", "height"), 6.0);
        // hull spans pixel centers, 9 x 5
        assert!((value(&ctx, "plant", "convex_hull_area") - 45.0).abs() < 1e-9);
        assert!((value(&ctx, "plant", "solidity") - 1.0).abs() < 1e-9);
        assert!((value(&ctx, "plant", "perimeter") - 28.0).abs() < 1e-9);
        assert_eq!(ctx.outputs().get("plant", "area").unwrap().datatype, Datatype::Int);
    }

    #[test]
    fn test_outline_drawn_on_image() {
        let mut mask = GrayImage::new(30, 20);
        fill(&mut mask, 5, 4, 10, 6);

        let mut ctx = AnalysisContext::default();
        let drawn = size(RgbImage::new(30, 20), &mask, "plant", &mut ctx).unwrap();
        assert_eq!(drawn.get_pixel(5, 4), &OUTLINE_COLOR);
        assert_eq!(drawn.get_pixel(25, 15), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_hole_does_not_count_toward_perimeter() {
        let mut mask = GrayImage::new(30, 30);
        fill(&mut mask, 5, 5, 15, 15);
        for y in 10..14 {
            for x in 10..14 {
                mask.put_pixel(x, y, Luma([0]));
            }
        }

        let mut ctx = AnalysisContext::default();
        size(RgbImage::new(30, 30), &mask, "ring", &mut ctx).unwrap();
        assert!((value(&ctx, "ring", "perimeter") - 56.0).abs() < 1e-9);
        assert_eq!(value(&ctx, "ring", "area"), (225 - 16) as f64);
    }

    #[test]
    fn test_empty_mask_records_nothing() {
        let mut ctx = AnalysisContext::default();
        let image = RgbImage::from_pixel(8, 8, Rgb([1, 2, 3]));
        let out = size(image.clone(), &GrayImage::new(8, 8), "none", &mut ctx).unwrap();
        assert_eq!(out, image);
        assert!(ctx.outputs().is_empty());
    }

    #[test]
    fn test_labeled_objects_recorded_separately() {
        let mut labeled = LabeledMask::new(40, 10);
        for y in 2..6 {
            for x in 2..6 {
                labeled.put_pixel(x, y, Luma([1]));
            }
            for x in 20..30 {
                labeled.put_pixel(x, y, Luma([2]));
            }
        }

        let mut ctx = AnalysisContext::default();
        size_labeled(RgbImage::new(40, 10), &labeled, 2, "plant", &mut ctx).unwrap();
        assert_eq!(value(&ctx, "plant_1", "area"), 16.0);
        assert_eq!(value(&ctx, "plant_2", "area"), 40.0);
        assert_eq!(value(&ctx, "plant_2", "width"), 10.0);
    }
}
