//! Tracing setup shared by the Vigil binaries.

mod subscriber;

pub use subscriber::{init, init_with_level};
