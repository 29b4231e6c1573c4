use image::{DynamicImage, GrayImage};
use crate::{
    error::Result,
    types::{BoundarySet, LabeledMask},
};

/// Trait for image preprocessing algorithms
pub trait ImagePreprocessor: Send + Sync {
    /// Preprocess the input image (e.g., blur, threshold)
    fn preprocess(&self, image: &GrayImage) -> Result<GrayImage>;
}

/// Trait for contour extraction algorithms
pub trait ContourExtractor: Send + Sync {
    /// Extract boundaries and their nesting from a binary image
    fn extract_contours(&self, image: &GrayImage) -> Result<BoundarySet>;
}

/// Trait for connected-region labeling
pub trait RegionLabeler: Send + Sync {
    /// Label connected foreground regions, returning the mask and the region count
    fn label_regions(&self, image: &GrayImage) -> Result<(LabeledMask, u32)>;
}

/// Destination for intermediate debug images
pub trait DebugSink {
    /// Receive an image and a filename hint
    fn emit(&mut self, image: &DynamicImage, filename: &str) -> Result<()>;
}
