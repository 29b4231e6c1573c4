use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use image::DynamicImage;
use tracing::debug;

use crate::{error::Result, traits::DebugSink};

/// Discards every debug image
#[derive(Debug, Clone, Default)]
pub struct NullDebugSink;

impl DebugSink for NullDebugSink {
    fn emit(&mut self, _image: &DynamicImage, _filename: &str) -> Result<()> {
        Ok(())
    }
}

/// Writes debug images into a directory, format chosen from the file extension
#[derive(Debug, Clone)]
pub struct DirectoryDebugSink {
    pub outdir: PathBuf,
}

impl DirectoryDebugSink {
    pub fn new(outdir: impl Into<PathBuf>) -> Self {
        Self { outdir: outdir.into() }
    }
}

impl DebugSink for DirectoryDebugSink {
    fn emit(&mut self, image: &DynamicImage, filename: &str) -> Result<()> {
        std::fs::create_dir_all(&self.outdir)?;
        let path = self.outdir.join(filename);
        debug!(path = %path.display(), "writing debug image");
        image.save(&path)?;
        Ok(())
    }
}

/// A debug image held in memory
#[derive(Debug, Clone)]
pub struct DebugImage {
    pub filename: String,
    pub image: DynamicImage,
}

/// Keeps debug images in memory for inline display.
///
/// Clones share the same store, so a caller can keep one handle and give
/// another to an [`AnalysisContext`](crate::context::AnalysisContext).
#[derive(Debug, Clone, Default)]
pub struct MemoryDebugSink {
    images: Arc<Mutex<Vec<DebugImage>>>,
}

impl MemoryDebugSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the images received so far
    pub fn images(&self) -> Vec<DebugImage> {
        self.images
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn filenames(&self) -> Vec<String> {
        self.images().into_iter().map(|i| i.filename).collect()
    }
}

impl DebugSink for MemoryDebugSink {
    fn emit(&mut self, image: &DynamicImage, filename: &str) -> Result<()> {
        self.images
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(DebugImage {
                filename: filename.to_string(),
                image: image.clone(),
            });
        Ok(())
    }
}
