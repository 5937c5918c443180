//! Client-side byte sources. All three carry identical DAP semantics; only
//! where the bytes come from differs.

use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{TcpListener, TcpStream},
};
use tracing::info;

use crate::error::DecorError;

pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientTransport {
    /// Speak DAP on this process's stdin/stdout.
    Stdio,
    /// Listen on `127.0.0.1:<port>` and accept exactly one client.
    Listen(u16),
    /// Dial a client already listening on `127.0.0.1:<port>`.
    Connect(u16),
}

impl ClientTransport {
    pub async fn open(self) -> Result<(BoxedReader, BoxedWriter), DecorError> {
        match self {
            ClientTransport::Stdio => Ok((
                Box::new(tokio::io::stdin()) as BoxedReader,
                Box::new(tokio::io::stdout()) as BoxedWriter,
            )),
            ClientTransport::Listen(port) => {
                let listener = TcpListener::bind(("127.0.0.1", port)).await?;
                info!(port, "waiting for a DAP client");
                let (stream, peer) = listener.accept().await?;
                info!(%peer, "client connected");
                let (reader, writer) = stream.into_split();
                Ok((Box::new(reader), Box::new(writer)))
            }
            ClientTransport::Connect(port) => {
                let stream = TcpStream::connect(("127.0.0.1", port)).await?;
                info!(port, "connected to DAP client");
                let (reader, writer) = stream.into_split();
                Ok((Box::new(reader), Box::new(writer)))
            }
        }
    }
}
