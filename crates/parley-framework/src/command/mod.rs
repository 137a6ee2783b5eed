//! Command recognition.
//!
//! A command is a message that starts with a configured marker followed by a
//! registered name:
//!
//! ```text
//! /weather.today Tokyo
//! ^ ^~~~~~~~~~~~ ^~~~~
//! │ name          argument
//! start marker
//! ```
//!
//! The dispatcher resolves each message event once, before any matcher
//! runs. Handlers read the result through the [`CommandArg`] extractor, and
//! [`Rule::command`](crate::Rule::command) matches on it.

mod group;
mod pattern;
mod table;

use std::ops::Deref;
use std::sync::Arc;

pub use group::{CommandGroup, on_command};
pub use pattern::{CommandSyntax, Pattern};
pub use table::{CommandName, CommandTable, ResolvedCommand};

use crate::context::ParleyContext;
use crate::error::{ExtractError, ExtractResult};
use crate::extractor::FromContext;

/// The text following a resolved command.
///
/// Handlers that ask for it are skipped when the event is not a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandArg(pub String);

impl CommandArg {
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Deref for CommandArg {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromContext for CommandArg {
    fn from_context(ctx: &Arc<ParleyContext>) -> ExtractResult<Self> {
        ctx.command()
            .map(|command| CommandArg(command.arg.clone()))
            .ok_or(ExtractError::NotACommand)
    }
}

impl FromContext for ResolvedCommand {
    fn from_context(ctx: &Arc<ParleyContext>) -> ExtractResult<Self> {
        ctx.command().cloned().ok_or(ExtractError::NotACommand)
    }
}
