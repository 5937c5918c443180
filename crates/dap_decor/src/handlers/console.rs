use std::sync::atomic::{AtomicBool, Ordering};

use crate::{
    handler::Handler,
    protocol::{console_output, DapMessage},
    session::Session,
};

pub const CONSOLE_MODE_NOTICE: &str = "Console is in 'commands' mode, prefix expressions with '?'.\n";

/// Announces the console mode once, immediately before the first
/// `initialized` event from the backend. A second `initialized` event (a
/// backend should never send one) passes through unchanged.
pub struct ConsoleModeHandler {
    injected: AtomicBool,
}

impl ConsoleModeHandler {
    pub fn new() -> ConsoleModeHandler {
        ConsoleModeHandler {
            injected: AtomicBool::new(false),
        }
    }
}

impl Default for ConsoleModeHandler {
    fn default() -> Self {
        ConsoleModeHandler::new()
    }
}

impl Handler for ConsoleModeHandler {
    fn name(&self) -> &'static str {
        "console-mode"
    }

    fn on_backend_message(&self, message: DapMessage, _session: &Session) -> Vec<DapMessage> {
        if let DapMessage::Event(event) = &message {
            if event.event == "initialized" && !self.injected.swap(true, Ordering::AcqRel) {
                return vec![console_output(CONSOLE_MODE_NOTICE), message];
            }
        }
        vec![message]
    }
}
