pub mod size;

pub use size::*;
