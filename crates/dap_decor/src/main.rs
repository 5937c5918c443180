use std::{path::PathBuf, process::ExitCode, time::Duration};

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use dap_decor::{
    default_handlers, BackendConfig, BackendProcess, ClientTransport, DecorError, RouterConfig,
    SessionRouter,
};

/// DAP decorator fronting an LLDB-based debug adapter.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Listen for one DAP client connection on this port.
    #[arg(long, conflicts_with = "connect")]
    port: Option<u16>,
    /// Connect to a DAP client listening on 127.0.0.1:<port>.
    #[arg(long)]
    connect: Option<u16>,
    /// Path to the backend adapter binary.
    #[arg(long, default_value = "lldb-dap")]
    backend: PathBuf,
    /// Extra argument passed to the backend (repeatable).
    #[arg(long = "backend-arg")]
    backend_args: Vec<String>,
    /// Budget in seconds for locally handled requests.
    #[arg(long, default_value_t = 60)]
    timeout: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return ExitCode::from(1);
        }
    };

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "session failed");
            ExitCode::from(2)
        }
    }
}

async fn run(args: Args) -> Result<(), DecorError> {
    let transport = match (args.port, args.connect) {
        (Some(port), _) => ClientTransport::Listen(port),
        (None, Some(port)) => ClientTransport::Connect(port),
        (None, None) => ClientTransport::Stdio,
    };

    let mut backend_config = BackendConfig::new(args.backend);
    backend_config.args = args.backend_args;
    let mut backend = BackendProcess::spawn(&backend_config).await?;
    let (backend_out, backend_in) = backend.take_io()?;

    let (client_reader, client_writer) = transport.open().await?;
    let router = SessionRouter::with_config(
        default_handlers(),
        RouterConfig {
            handler_timeout: Duration::from_secs(args.timeout),
            ..RouterConfig::default()
        },
    );

    let session = router.run(client_reader, client_writer, backend_out, backend_in);
    tokio::pin!(session);
    tokio::select! {
        result = &mut session => result,
        status = backend.wait() => {
            match status {
                Ok(status) => info!(%status, "backend exited"),
                Err(err) => warn!(%err, "could not observe backend exit"),
            }
            // The router sees the backend's EOF and winds the session down.
            session.await
        }
    }
}
