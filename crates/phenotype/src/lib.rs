//! # Phenotype - Plant Image Analysis
//!
//! Object-level analysis of plant images: contour composition, per-object
//! iteration over labeled masks, region filtering by shape properties and
//! automatic color card detection.
//!
//! ## Core Features
//!
//! - **Object Composition**: merge every non-hole boundary of a mask into one object
//! - **Label Iteration**: run a single-object analysis once per labeled region
//! - **Region Filtering**: keep regions above or below a property threshold
//! - **Color Card Detection**: label the chips of a 6x4 calibration card
//! - **Analysis Context**: parameters, observations and debug output passed explicitly
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use phenotype::{filter_objs, AnalysisContext};
//! use plant_kit_common::Params;
//!
//! let mut ctx = AnalysisContext::new(Params::default());
//! let mask = image::open("mask.png")?.to_luma8();
//!
//! // Keep regions larger than 500 pixels
//! let filtered = filter_objs(&mask, "upper", 500.0, "area", &mut ctx)?;
//! filtered.save("filtered.png")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Color Card
//!
//! ```rust,no_run
//! use phenotype::{detect_color_card, AnalysisContext, ColorCardConfig};
//!
//! let mut ctx = AnalysisContext::default();
//! let rgb = image::open("card.jpg")?.to_rgb8();
//! let chips = detect_color_card(&rgb, Some("plant1"), &ColorCardConfig::default(), &mut ctx)?;
//! ctx.outputs().save_json("results.json")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Core modules
pub mod error;
pub mod types;
pub mod traits;
pub mod context;
pub mod algorithms;
pub mod filters;
pub mod transform;
pub mod analyze;
pub mod pipeline;
pub mod io;

// Re-exports for convenience
pub use error::{PhenotypeError, Result};
pub use types::{BinaryMask, Boundary, BoundarySet, CombinedObject, LabeledMask, Nesting, SegmentedObject};
pub use context::AnalysisContext;
pub use traits::*;
pub use algorithms::*;
pub use filters::*;
pub use transform::*;
pub use analyze::*;
pub use pipeline::{Pipeline, builder::PipelineBuilder};
pub use io::*;
