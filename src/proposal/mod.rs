//! Match proposal handling

pub mod pipeline;

pub use pipeline::{ProposalPipeline, ProposalReport};
