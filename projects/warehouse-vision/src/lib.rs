pub mod cli;
pub mod labels;
pub mod pipeline;
pub mod report;
pub mod video;
