// src/lib.rs

//! iduka-flow: asynchronous step pipelines for storefront workflows.
//!
//! A [`Pipeline`] is an ordered list of named steps run against a shared
//! [`ContextData`]. Each step can carry `before`, `on` and `after` handlers,
//! a skip condition, and can be marked best-effort so that its failure is
//! reported to fault observers instead of aborting the run. A step can also
//! host branches: alternative sub-pipelines of which the first whose condition
//! holds is executed over a sub-context.
//!
//! The storefront builds its checkout flow (validation, order acceptance,
//! payment dispatch, order write, post-commit reconciliation) and its
//! notification flow on top of these pieces, and runs them through a
//! [`FlowRegistry`] keyed by context type.

pub mod branch;
pub mod core;
pub mod error;
pub mod pipeline;
pub mod registry;

pub use crate::branch::{BranchBuilder, BranchConfigurator, NoMatch};
pub use crate::core::context_data::ContextData;
pub use crate::core::control::{PipelineControl, PipelineResult};
pub use crate::core::handler::{FaultHandler, Handler};
pub use crate::core::step::{SkipCondition, StepDef};
pub use crate::error::{FlowError, FlowResult};
pub use crate::pipeline::Pipeline;
pub use crate::registry::FlowRegistry;
