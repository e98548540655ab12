// src/pipeline/mod.rs

//! The [`Pipeline`] type: definition and structural edits (`definition`),
//! handler registration (`hooks`) and the run loop (`execution`).

pub mod definition;
pub mod execution;
pub mod hooks;

pub use definition::Pipeline;
