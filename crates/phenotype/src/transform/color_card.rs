//! Automatic detection of a 6x4 color calibration card.
//!
//! Chips are found as square-like contours of similar size. The card
//! outline is the minimal rotated rectangle around the chip centers, and an
//! idealized grid is projected onto it to stamp one labeled disc per chip.

use geo::{Area, MinimumRotatedRect};
use geo_types::{Coord, LineString, MultiPoint, Point, Polygon};
use image::{DynamicImage, Luma, Rgb, RgbImage};
use imageproc::drawing::draw_filled_circle_mut;
use imageproc::geometric_transformations::Projection;
use plant_kit_common::{stats, Datatype, Observation, ObservationValue, Point2D, Size};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    algorithms::{
        to_grayscale, AdaptiveMethod, AdaptiveThresholdPreprocessor, GaussianBlurPreprocessor,
        ImageprocContourExtractor,
    },
    context::AnalysisContext,
    error::{PhenotypeError, Result},
    traits::{ContourExtractor, ImagePreprocessor},
    types::{Boundary, LabeledMask},
};

/// Rows of chips on the supported card
pub const CARD_ROWS: u32 = 6;
/// Columns of chips on the supported card
pub const CARD_COLUMNS: u32 = 4;

const METHOD: &str = "phenotype::transform::detect_color_card";
const DEBUG_DISC_COLOR: Rgb<u8> = Rgb([255, 255, 0]);

/// Tunables of the color card detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ColorCardConfig {
    /// Radius of each stamped chip disc in pixels
    pub radius: u32,
    pub blur_sigma: f32,
    pub adaptive_method: AdaptiveMethod,
    /// Adaptive threshold neighbourhood, odd
    pub block_size: u32,
    pub offset: f32,
    pub min_chip_area: f64,
    /// Upper bound on long side / short side of a chip
    pub max_aspect_ratio: f64,
    /// Lower bound on contour area / rotated rectangle area
    pub min_fill_ratio: f64,
    /// Allowed relative deviation from the median chip area
    pub area_tolerance: f64,
    /// Spacing of the idealized grid, rescaled by the projection
    pub grid_pitch: f32,
}

impl Default for ColorCardConfig {
    fn default() -> Self {
        Self {
            radius: 20,
            blur_sigma: 2.0,
            adaptive_method: AdaptiveMethod::Gaussian,
            block_size: 51,
            offset: 2.0,
            min_chip_area: 1000.0,
            max_aspect_ratio: 1.27,
            min_fill_ratio: 0.8,
            area_tolerance: 0.2,
            grid_pitch: 100.0,
        }
    }
}

impl ColorCardConfig {
    /// JSON schema of the detector settings
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ColorCardConfig)
    }

    /// Reject settings the detector cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.radius == 0 {
            return Err(PhenotypeError::Configuration("radius must be at least 1".to_string()));
        }
        if self.block_size < 3 || self.block_size % 2 == 0 {
            return Err(PhenotypeError::Configuration(format!(
                "block_size must be odd and >= 3, got {}",
                self.block_size
            )));
        }
        if !(0.0..1.0).contains(&self.area_tolerance) {
            return Err(PhenotypeError::Configuration(format!(
                "area_tolerance must be in [0, 1), got {}",
                self.area_tolerance
            )));
        }
        if self.grid_pitch <= 0.0 {
            return Err(PhenotypeError::Configuration("grid_pitch must be positive".to_string()));
        }
        Ok(())
    }

    /// Load detector settings from a JSON string, missing keys taking defaults
    pub fn from_json(content: &str) -> Result<Self> {
        let config: ColorCardConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }
}

/// One square-like contour
#[derive(Debug, Clone, Copy)]
struct Chip {
    area: f64,
    size: Size,
    center: Point2D,
}

fn to_polygon(boundary: &Boundary) -> Polygon<f64> {
    let coords: Vec<Coord<f64>> = boundary
        .iter()
        .map(|&[x, y]| Coord { x: x as f64, y: y as f64 })
        .collect();
    Polygon::new(LineString::new(coords), vec![])
}

/// First four corners of a rotated rectangle, in ring order
fn rect_corners(rect: &Polygon<f64>) -> Option<[Coord<f64>; 4]> {
    let ring = &rect.exterior().0;
    if ring.len() < 4 {
        return None;
    }
    Some([ring[0], ring[1], ring[2], ring[3]])
}

fn distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    Point2D::new(a.x, a.y).distance_to(Point2D::new(b.x, b.y))
}

impl Chip {
    fn measure(boundary: &Boundary, config: &ColorCardConfig) -> Option<Self> {
        if boundary.len() < 3 {
            return None;
        }
        let polygon = to_polygon(boundary);
        let area = polygon.unsigned_area();
        if area <= config.min_chip_area {
            return None;
        }

        let rect = polygon.minimum_rotated_rect()?;
        let [c0, c1, c2, c3] = rect_corners(&rect)?;
        let size = Size::new(distance(c0, c1), distance(c1, c2));
        let center = Point2D::new(
            (c0.x + c1.x + c2.x + c3.x) / 4.0,
            (c0.y + c1.y + c2.y + c3.y) / 4.0,
        );

        let square = size.elongation() < config.max_aspect_ratio
            && area / size.area() > config.min_fill_ratio;
        square.then_some(Self { area, size, center })
    }
}

/// Keep chips within `tolerance` of the median area
fn similar_chips(chips: Vec<Chip>, tolerance: f64) -> Vec<Chip> {
    let areas: Vec<f64> = chips.iter().map(|c| c.area).collect();
    let Some(target) = stats::median(&areas) else {
        return Vec::new();
    };
    chips
        .into_iter()
        .filter(|chip| {
            let ratio = chip.area / target;
            1.0 - tolerance < ratio && ratio < 1.0 + tolerance
        })
        .collect()
}

/// Card corners ordered white, short-side neighbour, diagonal, long-side neighbour
fn order_corners(rgb_img: &RgbImage, corners: [Coord<f64>; 4]) -> [Coord<f64>; 4] {
    let (max_x, max_y) = (rgb_img.width() - 1, rgb_img.height() - 1);
    let whiteness = |c: Coord<f64>| {
        let x = (c.x.max(0.0) as u32).min(max_x);
        let y = (c.y.max(0.0) as u32).min(max_y);
        let Rgb([r, g, b]) = *rgb_img.get_pixel(x, y);
        [r, g, b]
            .iter()
            .map(|&v| (255.0 - v as f64).powi(2))
            .sum::<f64>()
            .sqrt()
    };

    let mut white_index = 0;
    let mut best = f64::INFINITY;
    for (i, &corner) in corners.iter().enumerate() {
        let d = whiteness(corner);
        if d < best {
            best = d;
            white_index = i;
        }
    }

    let white = corners[white_index];
    let mut by_distance = [0usize, 1, 2, 3];
    by_distance.sort_by(|&a, &b| distance(corners[a], white).total_cmp(&distance(corners[b], white)));
    [0, 1, 3, 2].map(|i| corners[by_distance[i]])
}

/// Idealized chip centers in row-major order, and the grid corners in cyclic order
fn ideal_grid(pitch: f32) -> (Vec<(f32, f32)>, [(f32, f32); 4]) {
    let centers = (0..CARD_ROWS)
        .flat_map(|row| (0..CARD_COLUMNS).map(move |col| (col as f32 * pitch, row as f32 * pitch)))
        .collect();
    let w = (CARD_COLUMNS - 1) as f32 * pitch;
    let h = (CARD_ROWS - 1) as f32 * pitch;
    (centers, [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)])
}

fn record(ctx: &mut AnalysisContext, sample: &str, variable: &str, trait_name: &str, scale: &str, value: f64, label: &str) {
    ctx.record_observation(Observation {
        sample: sample.to_string(),
        variable: variable.to_string(),
        trait_name: trait_name.to_string(),
        method: METHOD.to_string(),
        scale: scale.to_string(),
        datatype: Datatype::Float,
        value: ObservationValue::Float(value),
        label: label.to_string(),
    });
}

/// Locate a color card and return a labeled mask with one disc per chip.
///
/// Discs are labeled `(index + 1) * 10` in row-major order, starting at the
/// white chip. Median chip area, width and height are recorded under
/// `label`, or the context's sample label when `None`.
pub fn detect_color_card(
    rgb_img: &RgbImage,
    label: Option<&str>,
    config: &ColorCardConfig,
    ctx: &mut AnalysisContext,
) -> Result<LabeledMask> {
    ctx.next_step();
    config.validate()?;
    let sample = ctx.sample_label(label).to_string();

    let gray = to_grayscale(rgb_img);
    let blurred = GaussianBlurPreprocessor { sigma: config.blur_sigma }.preprocess(&gray)?;
    let thresh = AdaptiveThresholdPreprocessor {
        method: config.adaptive_method,
        block_size: config.block_size,
        offset: config.offset,
        invert: true,
    }
    .preprocess(&blurred)?;
    let contours = ImageprocContourExtractor.extract_contours(&thresh)?;

    let squares: Vec<Chip> = contours
        .boundaries()
        .iter()
        .filter_map(|boundary| Chip::measure(boundary, config))
        .collect();
    let square_count = squares.len();
    let chips = similar_chips(squares, config.area_tolerance);
    debug!(contours = contours.len(), squares = square_count, chips = chips.len(), "filtered chip contours");

    if chips.is_empty() {
        return Err(PhenotypeError::NotFound("No color card found".to_string()));
    }

    let areas: Vec<f64> = chips.iter().map(|c| c.area).collect();
    let widths: Vec<f64> = chips.iter().map(|c| c.size.width).collect();
    let heights: Vec<f64> = chips.iter().map(|c| c.size.height).collect();
    let (chip_size, chip_width, chip_height) = match (
        stats::median(&areas),
        stats::median(&widths),
        stats::median(&heights),
    ) {
        (Some(a), Some(w), Some(h)) => (a, w, h),
        _ => return Err(PhenotypeError::NotFound("No color card found".to_string())),
    };

    let centers: MultiPoint<f64> = chips
        .iter()
        .map(|c| Point::new(c.center.x.trunc(), c.center.y.trunc()))
        .collect();
    let card_rect = centers
        .minimum_rotated_rect()
        .and_then(|rect| rect_corners(&rect))
        .ok_or_else(|| {
            PhenotypeError::GeometricComputation("could not fit a rectangle around the chips".to_string())
        })?;
    let corners = order_corners(rgb_img, card_rect.map(|c| Coord { x: c.x.round(), y: c.y.round() }));

    let (ideal_centers, ideal_corners) = ideal_grid(config.grid_pitch);
    let projection = Projection::from_control_points(
        ideal_corners,
        corners.map(|c| (c.x as f32, c.y as f32)),
    )
    .ok_or_else(|| {
        PhenotypeError::GeometricComputation("degenerate color card corners".to_string())
    })?;

    let mut labeled_mask = LabeledMask::new(rgb_img.width(), rgb_img.height());
    let mut debug_img = rgb_img.clone();
    let radius = config.radius as i32;
    for (i, &center) in ideal_centers.iter().enumerate() {
        let (x, y) = projection * center;
        let center = (x.round() as i32, y.round() as i32);
        draw_filled_circle_mut(&mut labeled_mask, center, radius, Luma([(i as u32 + 1) * 10]));
        draw_filled_circle_mut(&mut debug_img, center, radius, DEBUG_DISC_COLOR);
    }

    info!(chips = chips.len(), chip_size, chip_width, chip_height, "color card detected");

    record(ctx, &sample, "median_color_chip_size", "size of color card chips identified", "square pixels", chip_size, "median");
    record(ctx, &sample, "median_color_chip_width", "width of color card chips identified", "pixels", chip_width, "width");
    record(ctx, &sample, "median_color_chip_height", "height of color card chips identified", "pixels", chip_height, "height");

    ctx.emit_debug(&DynamicImage::ImageRgb8(debug_img), "color_card.png")?;

    Ok(labeled_mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryDebugSink;
    use plant_kit_common::{DebugMode, Params};
    use std::collections::BTreeSet;
    use std::f64::consts::PI;

    const MARGIN: u32 = 40;
    const CHIP: u32 = 50;
    const PITCH: u32 = 70;

    fn chip_origin(row: u32, col: u32) -> (u32, u32) {
        (MARGIN + col * PITCH, MARGIN + row * PITCH)
    }

    fn chip_center(row: u32, col: u32) -> (u32, u32) {
        let (x0, y0) = chip_origin(row, col);
        (x0 + CHIP / 2, y0 + CHIP / 2)
    }

    fn fill(img: &mut RgbImage, x0: u32, y0: u32, side: u32, shade: u8) {
        for y in y0..y0 + side {
            for x in x0..x0 + side {
                img.put_pixel(x, y, Rgb([shade, shade, shade]));
            }
        }
    }

    fn disc_sizes(mask: &LabeledMask) -> Vec<f64> {
        (1..=24)
            .map(|i| mask.pixels().filter(|p| p[0] == i * 10).count() as f64)
            .collect()
    }

    /// Dark background with bright chips, the top-left chip near white
    fn synthetic_card() -> RgbImage {
        synthetic_card_with_space(0)
    }

    /// Same card with `extra` dark columns appended on the right
    fn synthetic_card_with_space(extra: u32) -> RgbImage {
        let width = 2 * MARGIN + (CARD_COLUMNS - 1) * PITCH + CHIP + extra;
        let height = 2 * MARGIN + (CARD_ROWS - 1) * PITCH + CHIP;
        let mut img = RgbImage::from_pixel(width, height, Rgb([20, 20, 20]));

        for row in 0..CARD_ROWS {
            for col in 0..CARD_COLUMNS {
                let shade = if row == 0 && col == 0 {
                    250
                } else {
                    180 + ((row * CARD_COLUMNS + col) % 5) as u8 * 8
                };
                let (x0, y0) = chip_origin(row, col);
                fill(&mut img, x0, y0, CHIP, shade);
            }
        }
        img
    }

    #[test]
    fn test_synthetic_card_yields_24_labeled_discs() {
        let mut ctx = AnalysisContext::default();
        let mask = detect_color_card(&synthetic_card(), None, &ColorCardConfig::default(), &mut ctx).unwrap();

        let labels: BTreeSet<u32> = mask.pixels().map(|p| p[0]).filter(|&v| v != 0).collect();
        let expected: BTreeSet<u32> = (1..=24).map(|i| i * 10).collect();
        assert_eq!(labels, expected);

        let disc_area = PI * 20.5 * 20.5;
        for count in disc_sizes(&mask) {
            assert!((count - disc_area).abs() / disc_area < 0.1, "disc has {count} pixels");
        }
    }

    #[test]
    fn test_disc_size_follows_radius() {
        let config = ColorCardConfig { radius: 12, ..ColorCardConfig::default() };
        let mut ctx = AnalysisContext::default();
        let small = detect_color_card(&synthetic_card(), None, &config, &mut ctx).unwrap();
        let large = detect_color_card(&synthetic_card(), None, &ColorCardConfig::default(), &mut ctx).unwrap();

        let disc_area = PI * 12.5 * 12.5;
        let small_sizes = disc_sizes(&small);
        for (&s, &l) in small_sizes.iter().zip(&disc_sizes(&large)) {
            assert!((s - disc_area).abs() / disc_area < 0.1, "disc has {s} pixels");
            assert!(s < l);
        }
        let (x, y) = chip_center(0, 0);
        assert_eq!(small.get_pixel(x, y)[0], 10);
    }

    #[test]
    fn test_oversized_square_is_ignored() {
        let mut img = synthetic_card_with_space(140);
        let x0 = 2 * MARGIN + (CARD_COLUMNS - 1) * PITCH + CHIP + 10;
        fill(&mut img, x0, MARGIN, 80, 210);

        let mut ctx = AnalysisContext::default();
        let mask = detect_color_card(&img, Some("card"), &ColorCardConfig::default(), &mut ctx).unwrap();

        let labels: BTreeSet<u32> = mask.pixels().map(|p| p[0]).filter(|&v| v != 0).collect();
        assert_eq!(labels.len(), 24);
        assert_eq!(mask.get_pixel(x0 + 40, MARGIN + 40)[0], 0);
        let (x, y) = chip_center(0, 0);
        assert_eq!(mask.get_pixel(x, y)[0], 10);

        let mut clean = AnalysisContext::default();
        detect_color_card(&synthetic_card(), Some("card"), &ColorCardConfig::default(), &mut clean).unwrap();
        let median = |ctx: &AnalysisContext| {
            ctx.outputs().get("card", "median_color_chip_size").unwrap().value.as_f64().unwrap()
        };
        assert!((median(&ctx) - median(&clean)).abs() < 1.0);
    }

    fn outline(points: &[[i32; 2]]) -> Boundary {
        points.to_vec()
    }

    #[test]
    fn test_square_like_contours_only() {
        let config = ColorCardConfig::default();

        let square = outline(&[[0, 0], [60, 0], [60, 60], [0, 60]]);
        let chip = Chip::measure(&square, &config).unwrap();
        assert!((chip.area - 3600.0).abs() < 1e-6);
        assert!((chip.size.area() - 3600.0).abs() < 1e-6);
        assert!((chip.center.x - 30.0).abs() < 1e-6 && (chip.center.y - 30.0).abs() < 1e-6);

        // aspect 2.5
        let elongated = outline(&[[0, 0], [100, 0], [100, 40], [0, 40]]);
        assert!(Chip::measure(&elongated, &config).is_none());

        // area 900, below the minimum
        let small = outline(&[[0, 0], [30, 0], [30, 30], [0, 30]]);
        assert!(Chip::measure(&small, &config).is_none());

        // fills half of its rectangle
        let triangle = outline(&[[0, 0], [60, 0], [0, 60]]);
        assert!(Chip::measure(&triangle, &config).is_none());
    }

    #[test]
    fn test_chips_far_from_median_area_dropped() {
        let chip = |area: f64| Chip {
            area,
            size: Size::new(area.sqrt(), area.sqrt()),
            center: Point2D::new(0.0, 0.0),
        };
        let kept = similar_chips(vec![chip(2500.0), chip(2600.0), chip(2550.0), chip(6400.0), chip(1900.0)], 0.2);
        let areas: Vec<f64> = kept.iter().map(|c| c.area).collect();
        assert_eq!(areas, vec![2500.0, 2600.0, 2550.0]);

        assert!(similar_chips(Vec::new(), 0.2).is_empty());
    }

    #[test]
    fn test_white_chip_gets_first_label() {
        let mut ctx = AnalysisContext::default();
        let mask = detect_color_card(&synthetic_card(), None, &ColorCardConfig::default(), &mut ctx).unwrap();

        let (x, y) = chip_center(0, 0);
        assert_eq!(mask.get_pixel(x, y)[0], 10);
        let (x, y) = chip_center(0, 1);
        assert_eq!(mask.get_pixel(x, y)[0], 20);
        let (x, y) = chip_center(1, 0);
        assert_eq!(mask.get_pixel(x, y)[0], 50);
        let (x, y) = chip_center(CARD_ROWS - 1, CARD_COLUMNS - 1);
        assert_eq!(mask.get_pixel(x, y)[0], 240);
    }

    #[test]
    fn test_chip_size_observations_recorded() {
        let mut ctx = AnalysisContext::default();
        detect_color_card(&synthetic_card(), Some("card"), &ColorCardConfig::default(), &mut ctx).unwrap();

        let size = ctx.outputs().get("card", "median_color_chip_size").unwrap();
        assert_eq!(size.scale, "square pixels");
        assert_eq!(size.label, "median");
        let area = size.value.as_f64().unwrap();
        assert!(area > 2000.0 && area < 3200.0, "chip area {area}");

        let width = ctx.outputs().get("card", "median_color_chip_width").unwrap();
        assert_eq!(width.datatype, Datatype::Float);
        assert!(ctx.outputs().get("card", "median_color_chip_height").is_some());
    }

    #[test]
    fn test_black_image_is_not_found() {
        let mut ctx = AnalysisContext::default();
        let result = detect_color_card(&RgbImage::new(200, 200), None, &ColorCardConfig::default(), &mut ctx);
        assert!(matches!(result, Err(PhenotypeError::NotFound(_))));
        assert!(ctx.outputs().is_empty());
    }

    #[test]
    fn test_debug_overlay_emitted() {
        let sink = MemoryDebugSink::new();
        let params = Params { debug: DebugMode::Plot, ..Params::default() };
        let mut ctx = AnalysisContext::with_debug_sink(params, Box::new(sink.clone()));

        detect_color_card(&synthetic_card(), None, &ColorCardConfig::default(), &mut ctx).unwrap();
        assert_eq!(sink.filenames(), vec!["1_color_card.png".to_string()]);

        let overlay = sink.images()[0].image.to_rgb8();
        let (x, y) = chip_center(2, 2);
        assert_eq!(overlay.get_pixel(x, y), &DEBUG_DISC_COLOR);
    }

    #[test]
    fn test_config_from_json_uses_defaults() {
        let config = ColorCardConfig::from_json(r#"{"radius": 12, "adaptive_method": "mean"}"#).unwrap();
        assert_eq!(config.radius, 12);
        assert_eq!(config.adaptive_method, AdaptiveMethod::Mean);
        assert_eq!(config.block_size, 51);

        assert!(matches!(
            ColorCardConfig::from_json(r#"{"block_size": 50}"#),
            Err(PhenotypeError::Configuration(_))
        ));
        assert!(ColorCardConfig::from_json(r#"{"adaptive_method": "median"}"#).is_err());
    }

    #[test]
    fn test_corners_start_at_white() {
        let mut img = RgbImage::from_pixel(10, 10, Rgb([0, 0, 0]));
        img.put_pixel(9, 0, Rgb([255, 255, 255]));
        let corners = [
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 9.0, y: 0.0 },
            Coord { x: 9.0, y: 6.0 },
            Coord { x: 0.0, y: 6.0 },
        ];

        let ordered = order_corners(&img, corners);
        assert_eq!(ordered[0], corners[1]);
        // short side first, then the diagonal
        assert_eq!(ordered[1], corners[2]);
        assert_eq!(ordered[2], corners[3]);
        assert_eq!(ordered[3], corners[0]);
    }
}
