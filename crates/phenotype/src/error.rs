use thiserror::Error;

#[derive(Error, Debug)]
pub enum PhenotypeError {
    /// An enumerated option was given a value outside its allowed set
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A measurement resolved to a type the operation cannot use
    #[error("Type error: {0}")]
    Type(String),

    /// Nothing qualifying was detected in the input
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Geometric computation error: {0}")]
    GeometricComputation(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Common(#[from] plant_kit_common::CommonError),
}

pub type Result<T> = std::result::Result<T, PhenotypeError>;
