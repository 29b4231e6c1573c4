pub mod builder;

use image::GrayImage;
use tracing::debug;

use crate::{
    algorithms::compose_object,
    context::AnalysisContext,
    error::Result,
    filters::RegionFilter,
    traits::{ContourExtractor, ImagePreprocessor},
    types::SegmentedObject,
};

/// Segmentation pipeline: preprocessing, region filtering, contour
/// extraction and composition into a single object
pub struct Pipeline {
    preprocessors: Vec<Box<dyn ImagePreprocessor>>,
    filters: Vec<RegionFilter>,
    contour_extractor: Box<dyn ContourExtractor>,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> builder::PipelineBuilder {
        builder::PipelineBuilder::new()
    }

    /// Create a new pipeline with the given components
    pub fn new(
        preprocessors: Vec<Box<dyn ImagePreprocessor>>,
        filters: Vec<RegionFilter>,
        contour_extractor: Box<dyn ContourExtractor>,
    ) -> Self {
        Self {
            preprocessors,
            filters,
            contour_extractor,
        }
    }

    /// Process a grayscale image into a composed object
    pub fn process(&self, image: &GrayImage, ctx: &mut AnalysisContext) -> Result<SegmentedObject> {
        let mut mask = image.clone();
        for preprocessor in &self.preprocessors {
            mask = preprocessor.preprocess(&mask)?;
        }

        for filter in &self.filters {
            mask = filter.apply(&mask, ctx)?;
        }

        let boundaries = self.contour_extractor.extract_contours(&mask)?;
        let combined = compose_object(&boundaries);
        debug!(
            boundaries = boundaries.len(),
            points = combined.len(),
            "segmented object"
        );

        Ok(SegmentedObject {
            mask,
            boundaries,
            combined,
        })
    }

    /// Get information about the pipeline configuration
    pub fn info(&self) -> String {
        format!(
            "Pipeline: {} preprocessors, {} region filters, 1 contour extractor",
            self.preprocessors.len(),
            self.filters.len()
        )
    }
}
