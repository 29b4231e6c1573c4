pub mod preprocessing;
pub mod extraction;
pub mod composition;
pub mod labeling;
pub mod regionprops;

pub use preprocessing::*;
pub use extraction::*;
pub use composition::*;
pub use labeling::*;
pub use regionprops::*;
