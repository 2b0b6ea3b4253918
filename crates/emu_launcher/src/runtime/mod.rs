//! Runtime components for process management

pub mod executor;
pub mod supervisor;

pub use executor::*;
pub use supervisor::*;
