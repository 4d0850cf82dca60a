pub mod app;
pub mod color;
pub mod data;
pub mod error;
pub mod ml;
pub mod ui;
pub mod workflow;
