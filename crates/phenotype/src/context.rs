//! Per-run analysis state: parameters, recorded observations, debug output
//! and the step counter used to name debug images.

use image::DynamicImage;
use plant_kit_common::{DebugMode, Observation, Outputs, Params};

use crate::{
    error::Result,
    io::{DirectoryDebugSink, MemoryDebugSink, NullDebugSink},
    traits::DebugSink,
};

/// Explicit replacement for process-wide parameters, results and counters.
///
/// The caller of a workflow owns the context and passes it `&mut` to each
/// operation. Step ids increase monotonically for the lifetime of the context.
pub struct AnalysisContext {
    params: Params,
    outputs: Outputs,
    debug: Box<dyn DebugSink>,
    step: u32,
}

impl AnalysisContext {
    /// Create a context whose debug sink follows `params.debug`
    pub fn new(params: Params) -> Self {
        let debug: Box<dyn DebugSink> = match params.debug {
            DebugMode::None => Box::new(NullDebugSink),
            DebugMode::Print => Box::new(DirectoryDebugSink::new(params.debug_outdir.clone())),
            DebugMode::Plot => Box::new(MemoryDebugSink::new()),
        };
        Self::with_debug_sink(params, debug)
    }

    /// Create a context with a caller-supplied debug sink
    pub fn with_debug_sink(params: Params, debug: Box<dyn DebugSink>) -> Self {
        Self {
            params,
            outputs: Outputs::new(),
            debug,
            step: 0,
        }
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn outputs(&self) -> &Outputs {
        &self.outputs
    }

    pub fn outputs_mut(&mut self) -> &mut Outputs {
        &mut self.outputs
    }

    pub fn into_outputs(self) -> Outputs {
        self.outputs
    }

    /// Current step id
    pub fn step(&self) -> u32 {
        self.step
    }

    /// Advance the step counter and return the new id
    pub fn next_step(&mut self) -> u32 {
        self.step += 1;
        self.step
    }

    /// Sample name to use when an operation is given no explicit label
    pub fn sample_label<'a>(&'a self, label: Option<&'a str>) -> &'a str {
        label.unwrap_or(&self.params.sample_label)
    }

    /// Whether diagnostic summaries should be logged
    pub fn diagnostics_enabled(&self) -> bool {
        self.params.debug == DebugMode::Plot
    }

    pub fn record_observation(&mut self, observation: Observation) {
        self.outputs.add_observation(observation);
    }

    /// Send an image to the debug sink as `"{step}_{name}"`; no-op when debugging is off
    pub fn emit_debug(&mut self, image: &DynamicImage, name: &str) -> Result<()> {
        if !self.params.debug.is_enabled() {
            return Ok(());
        }
        let filename = format!("{}_{}", self.step, name);
        self.debug.emit(image, &filename)
    }
}

impl Default for AnalysisContext {
    fn default() -> Self {
        Self::new(Params::default())
    }
}
