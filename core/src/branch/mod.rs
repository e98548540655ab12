// src/branch/mod.rs

//! Branching inside a step.
//!
//! A step can host several branches, each a sub-pipeline over its own context
//! type plus a condition on the parent context. When the step runs, the first
//! branch whose condition holds is executed; the checkout flow uses this to
//! pick between the verified, retry and new-payment paths.

pub mod arm;
pub mod builder;

pub use builder::{BranchBuilder, BranchConfigurator};

/// What a branching step does when no branch condition holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoMatch {
  #[default]
  Continue,
  Stop,
  /// Fail the step with [`crate::FlowError::NoBranchMatched`].
  Fail,
}
