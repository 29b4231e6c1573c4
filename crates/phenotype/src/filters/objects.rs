use image::{DynamicImage, GrayImage, Luma};
use plant_kit_common::stats;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr, VariantNames};
use tracing::{debug, info, warn};

use crate::{
    algorithms::{label_regions, region_props, RegionProperty},
    context::AnalysisContext,
    error::{PhenotypeError, Result},
    types::BinaryMask,
};

/// Which side of the threshold survives the filter
#[derive(
    Debug, Clone, Copy,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, VariantNames, IntoStaticStr,
    PartialEq, Eq,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CutSide {
    /// Keep regions strictly above the threshold
    Upper,
    /// Keep regions strictly below the threshold
    Lower,
}

impl CutSide {
    pub fn parse(name: &str) -> Result<Self> {
        name.parse().map_err(|_| {
            PhenotypeError::Configuration(format!(
                "Must specify either 'upper' or 'lower' for cut_side, got '{}'",
                name
            ))
        })
    }

    /// A value equal to the threshold is never kept
    pub fn keeps(self, value: f64, threshold: f64) -> bool {
        match self {
            CutSide::Upper => value > threshold,
            CutSide::Lower => value < threshold,
        }
    }
}

/// Keeps the regions of a binary mask whose property passes a threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RegionFilter {
    pub cut_side: CutSide,
    pub threshold: f64,
    pub property: RegionProperty,
}

impl RegionFilter {
    pub fn new(cut_side: CutSide, threshold: f64, property: RegionProperty) -> Self {
        Self { cut_side, threshold, property }
    }

    /// Filter `bin_img`, returning a mask of the kept regions only
    pub fn apply(&self, bin_img: &BinaryMask, ctx: &mut AnalysisContext) -> Result<BinaryMask> {
        ctx.next_step();

        if !self.property.is_scalar() {
            return Err(PhenotypeError::Type(format!(
                "regprop must be of type 'integer' or 'float', '{}' is not",
                self.property
            )));
        }

        let (labeled, count) = label_regions(bin_img)?;
        let regions = region_props(&labeled);
        debug!(regions = count, property = %self.property, "measured regions");

        let mut filtered = GrayImage::new(bin_img.width(), bin_img.height());
        let mut values = Vec::with_capacity(regions.len());

        for region in &regions {
            let measured = region.get(self.property);
            let value = measured.as_scalar().ok_or_else(|| {
                PhenotypeError::Type(format!(
                    "regprop '{}' resolved to a {}",
                    self.property,
                    measured.type_name()
                ))
            })?;
            values.push(value);

            if !self.cut_side.keeps(value, self.threshold) {
                continue;
            }
            for &[row, col] in &region.coords {
                debug_assert_eq!(filtered.get_pixel(col, row)[0], 0, "labeled regions overlap");
                filtered.put_pixel(col, row, Luma([255]));
            }
        }

        match stats::summarize(&values) {
            Some(summary) if ctx.diagnostics_enabled() => info!(
                property = %self.property,
                min = summary.min,
                max = summary.max,
                mean = summary.mean,
                "region property summary"
            ),
            Some(_) => {}
            None => warn!("no regions found in mask, nothing to filter"),
        }

        ctx.emit_debug(
            &DynamicImage::ImageLuma8(filtered.clone()),
            &format!("discs_mask_{}_{}.png", self.property, self.threshold),
        )?;

        Ok(filtered)
    }
}

/// Filter regions of a binary mask by a named property.
///
/// `cut_side` must be `"upper"` or `"lower"`; it is checked before any labeling.
pub fn filter_objs(
    bin_img: &BinaryMask,
    cut_side: &str,
    thresh: f64,
    regprop: &str,
    ctx: &mut AnalysisContext,
) -> Result<BinaryMask> {
    let cut_side = CutSide::parse(cut_side)?;
    let property = RegionProperty::parse(regprop)?;
    RegionFilter::new(cut_side, thresh, property).apply(bin_img, ctx)
}

/// Keep regions whose eccentricity is below `ecc_thresh` (rounder objects)
pub fn filter_eccentricity(
    bin_img: &BinaryMask,
    ecc_thresh: f64,
    ctx: &mut AnalysisContext,
) -> Result<BinaryMask> {
    RegionFilter::new(CutSide::Lower, ecc_thresh, RegionProperty::Eccentricity).apply(bin_img, ctx)
}
