pub mod color_card;

pub use color_card::*;
