// src/core/handler.rs

use crate::core::context_data::ContextData;
use crate::core::control::PipelineControl;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future every handler resolves to.
pub type HandlerFuture<Err> = Pin<Box<dyn Future<Output = Result<PipelineControl, Err>> + Send>>;

/// A step handler.
///
/// Receives a clone of the run's context handle. Handlers read what they
/// need under a short lock, release it, do their I/O, then write results
/// back under a second short lock.
pub type Handler<TData, Err> = Box<dyn Fn(ContextData<TData>) -> HandlerFuture<Err> + Send + Sync>;

/// Observer called when a best-effort step fails.
///
/// Arguments are the run's context, the failing step's name and the error.
/// The pipeline keeps going after every observer has been called.
pub type FaultHandler<TData, Err> = Arc<dyn Fn(ContextData<TData>, &str, &Err) + Send + Sync>;
