pub mod analysis;
pub mod color;
pub mod config;
pub mod enhance;
pub mod error;
pub mod pdf;
pub mod pipeline;
