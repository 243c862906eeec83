//! Command execution for CodeMap operations.
//!
//! The optimizer runs every operation's command through a [`CommandRunner`].

#![warn(missing_docs)]

pub mod r#trait;
pub mod builtin;

pub use r#trait::{CommandRunner, CommandOutput};
pub use builtin::{EchoRunner, ShellRunner};
