pub mod analysis;
pub mod document;
pub mod segment;
