pub mod import;
pub mod extraction;
pub mod index;
pub mod scoring;
pub mod aggregation;
pub mod analysis;
