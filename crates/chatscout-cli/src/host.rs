//! Terminal stand-ins for the chat host: transcript file, stderr toasts, stdout surface.

use anyhow::{Context, Result};
use chatscout_core::host::{ChatHistory, CommandRegistry, CommandSpec, Notifier, Surface};
use chatscout_core::ChatTurn;
use std::io::Write;
use std::path::Path;

pub struct Transcript {
    turns: Vec<ChatTurn>,
}

impl Transcript {
    /// A JSON array of `{name, message}` objects, oldest first.
    pub fn load(path: &Path) -> Result<Self> {
        let txt = std::fs::read_to_string(path)
            .with_context(|| format!("read chat transcript {}", path.display()))?;
        let turns: Vec<ChatTurn> = serde_json::from_str(&txt)
            .with_context(|| format!("parse chat transcript {}", path.display()))?;
        Ok(Self { turns })
    }
}

impl ChatHistory for Transcript {
    fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }
}

pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn error(&self, message: &str) {
        eprintln!("chatscout: error: {message}");
    }
}

/// Used by `run`: the final card list is printed from the report, so frames
/// are only logged (and echoed to stderr with `--progress`).
pub struct ProgressSurface {
    echo: bool,
}

impl ProgressSurface {
    pub fn new(echo: bool) -> Self {
        Self { echo }
    }
}

impl Surface for ProgressSurface {
    fn render(&self, html: &str) {
        tracing::debug!(bytes = html.len(), "surface update");
        if self.echo {
            eprintln!("{html}");
        }
    }
}

/// Prints every frame on its own line, prefixed so scripts can pick them out.
pub struct StdoutSurface;

fn write_frame(out: &mut impl Write, html: &str) -> std::io::Result<()> {
    writeln!(out, "frame: {html}")?;
    out.flush()
}

impl Surface for StdoutSurface {
    fn render(&self, html: &str) {
        if let Err(e) = write_frame(&mut std::io::stdout().lock(), html) {
            tracing::debug!(error = %e, "stdout surface write failed");
        }
    }
}

#[derive(Default)]
pub struct TerminalCommands {
    specs: Vec<CommandSpec>,
}

impl TerminalCommands {
    pub fn find(&self, word: &str) -> Option<&CommandSpec> {
        self.specs.iter().find(|s| s.matches(word))
    }

    pub fn help(&self) -> String {
        let mut out = String::new();
        for s in self.specs.iter().filter(|s| !s.flags.hidden) {
            out.push_str(&format!("/{}  {}\n", s.name, s.help));
        }
        out.push_str("/run  start a run\n/close  hide the panel\n/quit  exit\n");
        out
    }
}

impl CommandRegistry for TerminalCommands {
    fn register(&mut self, spec: CommandSpec) {
        self.specs.push(spec);
    }
}
