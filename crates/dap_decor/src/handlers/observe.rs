use crate::{
    handler::{Handler, RequestAction},
    protocol::{InitializeArguments, Request},
    session::Session,
};

/// Pure observer for the `initialize` handshake: remembers whether the
/// client can service `runInTerminal` reverse requests. The request itself
/// always goes to the backend.
pub struct InitializeObserver;

impl Handler for InitializeObserver {
    fn name(&self) -> &'static str {
        "initialize-observer"
    }

    fn on_request(&self, request: &Request, session: &Session) -> RequestAction {
        if request.command == "initialize" {
            if let Ok(args) = request.load_args::<InitializeArguments>() {
                session.set_client_supports_run_in_terminal(
                    args.supports_run_in_terminal_request.unwrap_or(false),
                );
            }
        }
        RequestAction::Forward
    }
}
