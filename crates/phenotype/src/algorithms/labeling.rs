use std::borrow::Cow;

use image::{GrayImage, Luma, RgbImage};
use imageproc::region_labelling::{connected_components, Connectivity};
use tracing::debug;

use crate::{
    context::AnalysisContext,
    error::Result,
    traits::RegionLabeler,
    types::{BinaryMask, LabeledMask},
};

/// Connected-component labeler backed by imageproc
#[derive(Debug, Clone, Copy)]
pub struct ImageprocRegionLabeler {
    pub connectivity: Connectivity,
}

impl Default for ImageprocRegionLabeler {
    fn default() -> Self {
        Self { connectivity: Connectivity::Eight }
    }
}

impl RegionLabeler for ImageprocRegionLabeler {
    fn label_regions(&self, image: &GrayImage) -> Result<(LabeledMask, u32)> {
        let labeled = connected_components(image, self.connectivity, Luma([0u8]));
        let count = labeled.pixels().map(|p| p[0]).max().unwrap_or(0);
        Ok((labeled, count))
    }
}

/// Label the 8-connected foreground regions of a binary mask
pub fn label_regions(image: &GrayImage) -> Result<(LabeledMask, u32)> {
    ImageprocRegionLabeler::default().label_regions(image)
}

/// Widen an 8-bit mask to a labeled mask without changing values
pub fn labeled_from_gray(mask: &GrayImage) -> LabeledMask {
    LabeledMask::from_fn(mask.width(), mask.height(), |x, y| {
        Luma([mask.get_pixel(x, y)[0] as u32])
    })
}

/// Narrow a labeled mask to 8 bits for display, saturating at 255
pub fn labeled_to_gray(mask: &LabeledMask) -> GrayImage {
    GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        Luma([mask.get_pixel(x, y)[0].min(255) as u8])
    })
}

/// Whether the mask holds exactly the two values 0 and 255
pub fn is_binary_in_disguise(mask: &LabeledMask) -> bool {
    let mut has_zero = false;
    let mut has_full = false;
    for pixel in mask.pixels() {
        match pixel[0] {
            0 => has_zero = true,
            255 => has_full = true,
            _ => return false,
        }
    }
    has_zero && has_full
}

/// Remap a {0, 255} mask to {0, 1} so that its single object is region 1
pub fn normalize_labels(mask: &LabeledMask) -> Cow<'_, LabeledMask> {
    if !is_binary_in_disguise(mask) {
        return Cow::Borrowed(mask);
    }
    let mut remapped = mask.clone();
    for pixel in remapped.pixels_mut() {
        if pixel[0] == 255 {
            pixel[0] = 1;
        }
    }
    Cow::Owned(remapped)
}

/// Binary mask of the pixels carrying `id`
pub fn submask(mask: &LabeledMask, id: u32) -> BinaryMask {
    GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        Luma([if mask.get_pixel(x, y)[0] == id { 255 } else { 0 }])
    })
}

/// Run a single-object analysis once per region of a labeled mask.
///
/// IDs `1..=n_labels` are visited in ascending order. Each call gets the
/// visualization image returned by the previous one, so overlays accumulate.
/// `n_labels` is trusted: IDs absent from the mask yield empty submasks and
/// the analysis decides what that means.
pub fn iterate_analysis<F>(
    image: RgbImage,
    labeled_mask: &LabeledMask,
    n_labels: u32,
    label: &str,
    ctx: &mut AnalysisContext,
    mut analysis: F,
) -> Result<RgbImage>
where
    F: FnMut(RgbImage, &BinaryMask, &str, &mut AnalysisContext) -> Result<RgbImage>,
{
    let mask = normalize_labels(labeled_mask);
    debug!(n_labels, label, "iterating analysis over labeled mask");

    let mut image = image;
    for id in 1..=n_labels {
        let object = submask(&mask, id);
        image = analysis(image, &object, label, ctx)?;
    }
    Ok(image)
}
