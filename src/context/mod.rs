//! Context types that bind a configuration to a backend and run it.
//!
//! - [`ksp_context`]: `KspContext`, the solve entry point.

pub mod ksp_context;
pub use ksp_context::KspContext;
