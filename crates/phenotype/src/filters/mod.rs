pub mod objects;

pub use objects::*;
