//! Panel state, the chat command, and the single-flight run guard.

use crate::analyze::{Analyzer, RunReport};
use crate::host::{ChatHistory, CommandFlags, CommandRegistry, CommandSpec, Surface};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Toggles the panel and, when that opens it, starts a run.
pub const SCOUT_COMMAND: CommandSpec = CommandSpec {
    name: "scout",
    aliases: &["lore"],
    args: "",
    help: "Open the chatscout panel and analyze the recent chat against web sources.",
    flags: CommandFlags { hidden: false },
};

pub fn register_commands(registry: &mut dyn CommandRegistry) {
    registry.register(SCOUT_COMMAND);
}

/// Results panel visibility. Hidden until first opened.
#[derive(Debug, Default)]
pub struct Panel {
    visible: AtomicBool,
}

impl Panel {
    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }

    /// Flip visibility and return the new state.
    pub fn toggle(&self) -> bool {
        !self.visible.fetch_xor(true, Ordering::SeqCst)
    }

    pub fn close(&self) {
        self.visible.store(false, Ordering::SeqCst);
    }
}

/// At most one run at a time. A run that cannot get a ticket is rejected.
#[derive(Debug, Default)]
pub struct RunGuard {
    active: AtomicBool,
}

pub struct RunTicket<'a> {
    guard: &'a RunGuard,
}

impl RunGuard {
    pub fn try_begin(&self) -> Option<RunTicket<'_>> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunTicket { guard: self })
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl Drop for RunTicket<'_> {
    fn drop(&mut self) {
        self.guard.active.store(false, Ordering::Release);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellAction {
    /// The registered chat command was invoked.
    Command,
    /// The panel's run button.
    Run,
    /// The panel's close button.
    Close,
}

#[derive(Debug, Clone)]
pub enum ShellEvent {
    Closed,
    Ran(RunReport),
    /// A run was already in flight; nothing was started.
    Busy,
}

pub struct Shell {
    panel: Panel,
    guard: RunGuard,
    analyzer: Analyzer,
    history: Arc<dyn ChatHistory>,
    surface: Arc<dyn Surface>,
}

impl Shell {
    pub fn new(
        analyzer: Analyzer,
        history: Arc<dyn ChatHistory>,
        surface: Arc<dyn Surface>,
    ) -> Self {
        Self {
            panel: Panel::default(),
            guard: RunGuard::default(),
            analyzer,
            history,
            surface,
        }
    }

    pub fn panel(&self) -> &Panel {
        &self.panel
    }

    pub fn is_running(&self) -> bool {
        self.guard.is_active()
    }

    pub async fn dispatch(&self, action: ShellAction) -> ShellEvent {
        match action {
            ShellAction::Command => {
                if self.panel.toggle() {
                    self.run().await
                } else {
                    ShellEvent::Closed
                }
            }
            ShellAction::Run => self.run().await,
            ShellAction::Close => {
                // An in-flight run keeps going; only visibility changes.
                self.panel.close();
                ShellEvent::Closed
            }
        }
    }

    async fn run(&self) -> ShellEvent {
        let Some(_ticket) = self.guard.try_begin() else {
            warn!("run rejected: another run is in flight");
            return ShellEvent::Busy;
        };
        debug!("run started");
        let report = self
            .analyzer
            .run(self.history.as_ref(), self.surface.as_ref())
            .await;
        ShellEvent::Ran(report)
    }
}
