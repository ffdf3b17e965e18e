// src/presentation/mod.rs

//! Presentation scheduling: debounced queries and batched, cancellable
//! delivery of visible sets.

mod debounce;
mod scheduler;
mod session;

pub use debounce::Debouncer;
pub use scheduler::{
    Batch, BatchScheduler, Generation, RenderSession, RenderState, ViewEvent, ViewSubscriber,
};
pub use session::{QueryHandle, QuerySession};
