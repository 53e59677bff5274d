//! Foundation types for incant.
//!
//! Shared by the engine and the REPL binary: the error enum, the runtime
//! value model with declared parameter types, and session configuration.

pub mod config;
pub mod error;
pub mod value;

pub use config::ReplConfig;
pub use error::{IncantError, Result};
pub use value::{EnumType, TypeTag, Value};
