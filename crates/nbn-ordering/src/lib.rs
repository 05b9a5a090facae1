//! Order fulfillment for NBN service applications.
//!
//! Applications waiting on an order are swept from the registry, dispatched as
//! work items onto an in-process queue, and ordered through the external NBN
//! gateway by a pool of workers. See [`workflows::ordering`] for the pipeline.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;

#[cfg(test)]
pub(crate) mod test_support;
