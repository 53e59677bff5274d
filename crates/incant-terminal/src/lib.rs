//! Command resolution engine.
//!
//! Commands are declared up front as [`CommandSpec`]s and registered with a
//! handler. A [`Session`] reads lines, tokenizes them without splitting
//! quoted or bracketed literals, binds the blocks to the command's typed
//! parameters, and invokes the handler. The [`CompletionEngine`] computes
//! legal continuations of a partial line for interactive editors.

pub mod binder;
mod builtins;
pub mod catalog;
pub mod completion;
pub mod display;
mod interpreter;
pub mod literal;
mod registry;
pub mod source;
pub mod tokenizer;

/// Typed arguments bound to a command's parameters.
pub use binder::{BoundArgs, bind, coerce};
/// Command and parameter declarations.
pub use catalog::{Catalog, CommandSpec, ParamKind, ParameterSpec};
/// Completion computation and its override context.
pub use completion::{CompletionContext, CompletionEngine, CompletionKind, Completions};
/// Candidate list formatting.
pub use display::{candidate_entries, columnize};
/// The dispatch loop.
pub use interpreter::{Flow, Session, panic_message};
/// Command registration and the environment passed to handlers.
pub use registry::{CommandOutput, CommandRegistry, Environment, Handler};
/// Line input.
pub use source::{Input, LineSource, ScriptedSource};
pub use tokenizer::{Token, Tokenized, split_keyword, tokenize};
