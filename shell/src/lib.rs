//! `dsh`: a small interactive shell that runs pipelines of external programs.
//!
//! A line is tokenized ([`lexer`]), split on `|` and stripped of `<`, `>` and `>>`
//! operators ([`parser`]), then either handed to a builtin or launched as a chain of
//! child processes whose standard streams are connected by pipes. The session state
//! lives in an [`env::Environment`] owned by the [`Interpreter`].
//!
//! Limits and the prompt come from [`Config`], which merges an embedded default file
//! with an optional user file.

mod builtin;
pub mod command;
pub mod config;
pub mod env;
mod external;
mod interpreter;
pub mod lexer;
pub mod logging;
pub mod parser;
mod pipeline;

pub use config::Config;
pub use external::LaunchError;
/// The interactive command runner.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::Interpreter;
