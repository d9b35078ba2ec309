//! The `fibertrack` crate traces fibers through diffusion tensor fields.
//!
//! A fiber is grown in both directions from a seed point by following the
//! locally dominant diffusion direction, using a configurable step direction
//! policy, numerical integrator and set of stop conditions. The field itself
//! is accessed through the [`field::TensorSampler3`] trait.

pub mod error;
pub mod field;
pub mod geometry;
pub mod io;
pub mod num;
pub mod tensor;
pub mod tracing;
