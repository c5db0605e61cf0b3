//! Core traits for the portal subsystem
//!
//! This module defines the seams consumers plug into.
//!
//! - [`PathHandler`]: Serve one registered web path

pub mod path_handler;

pub use path_handler::{BoxedHandler, PathHandler};
