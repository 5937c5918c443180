#![forbid(unsafe_code)]
//! A DAP decorator server: speaks the Debug Adapter Protocol to an editor on
//! one side and to a stock LLDB-based adapter it spawns on the other,
//! presenting a richer and more uniform surface than the backend alone.
//!
//! The pipeline is a pair of reader loops joined by a correlation layer and
//! a chain of small interception handlers. A handler can rewrite a request
//! before it reaches the backend, answer it locally, or claim it for an
//! async task that holds its own conversation with the backend; on the way
//! back it can rewrite, inject, or suppress backend messages. Anything no
//! handler touches passes through verbatim — unknown commands included.
//!
//! ```rust,no_run
//! use dap_decor::{default_handlers, BackendConfig, BackendProcess, SessionRouter};
//! # #[tokio::main]
//! # async fn main() -> Result<(), dap_decor::DecorError> {
//! let mut backend = BackendProcess::spawn(&BackendConfig::new("lldb-dap")).await?;
//! let (backend_out, backend_in) = backend.take_io()?;
//! let router = SessionRouter::new(default_handlers());
//! router
//!     .run(tokio::io::stdin(), tokio::io::stdout(), backend_out, backend_in)
//!     .await?;
//! # Ok(()) }
//! ```

pub mod backend;
pub mod codec;
pub mod error;
pub mod handler;
pub mod handlers;
pub mod protocol;
pub mod router;
pub mod session;
pub mod transport;

pub use backend::{BackendConfig, BackendProcess};
pub use error::DecorError;
pub use handler::{Handler, RequestAction};
pub use handlers::default_handlers;
pub use protocol::{DapMessage, Event, Request, RequestKind, Response};
pub use router::{HandlerCtx, RouterConfig, SessionRouter};
pub use session::Session;
pub use transport::ClientTransport;

#[cfg(test)]
mod tests;
