// Frame detection and annotation pipeline

pub mod annotate;
pub mod detection;
pub mod orchestrator;
pub mod types;
