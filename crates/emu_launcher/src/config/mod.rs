//! Launch file parsing, variable substitution, and error collection

mod context;
mod diagnostics;
mod environment;
mod launch_spec;
mod parser;
pub mod substitution;
mod variables;

pub use context::*;
pub use diagnostics::*;
pub use environment::*;
pub use launch_spec::*;
pub use parser::*;
pub use substitution::{substitute, SubstitutionError};
pub use variables::*;
