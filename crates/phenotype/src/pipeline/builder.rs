use crate::{
    algorithms::{ImageprocContourExtractor, RegionProperty, ThresholdPreprocessor},
    filters::{CutSide, RegionFilter},
    pipeline::Pipeline,
    traits::{ContourExtractor, ImagePreprocessor},
};

/// Builder for creating segmentation pipelines with a fluent API
pub struct PipelineBuilder {
    preprocessors: Vec<Box<dyn ImagePreprocessor>>,
    filters: Vec<RegionFilter>,
    contour_extractor: Option<Box<dyn ContourExtractor>>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            preprocessors: Vec::new(),
            filters: Vec::new(),
            contour_extractor: None,
        }
    }

    /// Add a preprocessor to the pipeline
    pub fn add_preprocessor<P>(mut self, preprocessor: P) -> Self
    where
        P: ImagePreprocessor + 'static,
    {
        self.preprocessors.push(Box::new(preprocessor));
        self
    }

    /// Add a region filter, applied after all preprocessors
    pub fn add_region_filter(mut self, filter: RegionFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Keep only regions rounder than `ecc_thresh`
    pub fn with_eccentricity_filter(self, ecc_thresh: f64) -> Self {
        self.add_region_filter(RegionFilter::new(
            CutSide::Lower,
            ecc_thresh,
            RegionProperty::Eccentricity,
        ))
    }

    /// Set the contour extractor (replaces any existing one)
    pub fn set_contour_extractor<E>(mut self, extractor: E) -> Self
    where
        E: ContourExtractor + 'static,
    {
        self.contour_extractor = Some(Box::new(extractor));
        self
    }

    /// Build the pipeline with default components if not specified
    pub fn build(self) -> Pipeline {
        let contour_extractor = self
            .contour_extractor
            .unwrap_or_else(|| Box::new(ImageprocContourExtractor));

        Pipeline::new(self.preprocessors, self.filters, contour_extractor)
    }

    /// Build a simple pipeline with basic threshold preprocessing
    pub fn build_simple(threshold: u8) -> Pipeline {
        Self::new()
            .add_preprocessor(ThresholdPreprocessor { threshold })
            .build()
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
