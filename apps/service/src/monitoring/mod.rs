//! Periodic execution of the configured checks
//!
//! Every cycle runs all checks concurrently and hands the batch of results to
//! a single notifier, which decides what is worth reporting.

pub mod scheduler;

pub use scheduler::Scheduler;
