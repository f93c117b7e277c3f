//! Review pipeline - normalization, aggregation, filtering, stats, export

pub mod aggregate;
pub mod export;
pub mod filter;
pub mod google;
pub mod hostaway;
pub mod seed;
pub mod service;
pub mod sort;
pub mod sources;
pub mod stats;
pub mod types;

pub use types::*;
