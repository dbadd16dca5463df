//! Function frames
//!
//! ## Architecture
//!
//! - `frame.rs` - Pre-pass analysis, frame geometry, canonical locations,
//!   prologue and epilogue
//! - `builder.rs` - Collects a function body and back-patches the prologue

mod builder;
mod frame;

pub use builder::FunctionBuilder;
pub use frame::FunctionFrame;

#[cfg(test)]
mod tests;
