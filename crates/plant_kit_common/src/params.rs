use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use strum::{Display, EnumString, IntoStaticStr, VariantNames};

use crate::{CommonError, Result};

/// Where debug images go
#[derive(
    Debug, Clone, Copy, Default,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, VariantNames, IntoStaticStr,
    PartialEq, Eq,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DebugMode {
    /// No debug output
    #[default]
    None,
    /// Write debug images into `debug_outdir`
    Print,
    /// Keep debug images in memory for inline display, and log diagnostics
    Plot,
}

impl DebugMode {
    pub fn is_enabled(self) -> bool {
        self != DebugMode::None
    }
}

/// Analysis parameters shared by every step of a workflow
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct Params {
    pub debug: DebugMode,
    pub debug_outdir: PathBuf,
    /// Default sample name for recorded observations
    pub sample_label: String,
    /// Thickness of lines drawn on visualization images
    #[schemars(range(min = 1, max = 50))]
    pub line_thickness: u32,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            debug: DebugMode::None,
            debug_outdir: PathBuf::from("."),
            sample_label: "default".to_string(),
            line_thickness: 5,
        }
    }
}

impl Params {
    /// JSON schema of the parameter file
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(Params)
    }

    /// Reject values that cannot drive an analysis
    pub fn validate(&self) -> Result<()> {
        if self.sample_label.trim().is_empty() {
            return Err(CommonError::ValidationFailed {
                details: "sample_label must not be empty".to_string(),
            });
        }
        if self.line_thickness == 0 {
            return Err(CommonError::ValidationFailed {
                details: "line_thickness must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Load parameters from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load parameters from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let params: Params = toml::from_str(content)?;
        params.validate()?;
        Ok(params)
    }

    /// Load parameters from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load parameters from a JSON string
    pub fn from_json(content: &str) -> Result<Self> {
        let params: Params = serde_json::from_str(content)?;
        params.validate()?;
        Ok(params)
    }

    /// Auto-detect file format and load parameters
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(CommonError::UnsupportedFileFormat),
        }
    }

    /// Convert parameters to a TOML string
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Convert parameters to a JSON string
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
