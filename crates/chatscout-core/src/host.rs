//! Seams to the chat host.
//!
//! The pipeline never touches a UI directly: it reads chat turns through
//! [`ChatHistory`], reports user-visible errors through [`Notifier`] and writes
//! HTML to a [`Surface`].

use crate::ChatTurn;

/// Number of trailing chat turns a run looks at.
pub const CONTEXT_TURNS: usize = 10;

pub trait ChatHistory: Send + Sync {
    /// All turns, oldest first.
    fn turns(&self) -> &[ChatTurn];

    fn recent(&self, n: usize) -> &[ChatTurn] {
        let all = self.turns();
        &all[all.len().saturating_sub(n)..]
    }
}

impl ChatHistory for Vec<ChatTurn> {
    fn turns(&self) -> &[ChatTurn] {
        self
    }
}

/// User-visible error toasts.
pub trait Notifier: Send + Sync {
    fn error(&self, message: &str);
}

/// The results display. Each call replaces what was shown before.
pub trait Surface: Send + Sync {
    fn render(&self, html: &str);
}

/// Flags a registered command may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommandFlags {
    /// Hide the command from the host's command list.
    pub hidden: bool,
}

/// A chat command as handed to the host's registration API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    /// Argument description shown in help; empty when the command takes none.
    pub args: &'static str,
    pub help: &'static str,
    pub flags: CommandFlags,
}

impl CommandSpec {
    pub fn matches(&self, word: &str) -> bool {
        let w = word.trim().trim_start_matches('/');
        self.name == w || self.aliases.contains(&w)
    }
}

pub trait CommandRegistry {
    fn register(&mut self, spec: CommandSpec);
}

/// Format turns as `name: message`, one per line.
pub fn chat_excerpt(turns: &[ChatTurn]) -> String {
    turns
        .iter()
        .map(|t| format!("{}: {}", t.name, t.message))
        .collect::<Vec<_>>()
        .join("\n")
}
