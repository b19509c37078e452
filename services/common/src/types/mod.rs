//! Core domain types

pub mod instrument;
pub mod tick;

pub use instrument::*;
pub use tick::*;
