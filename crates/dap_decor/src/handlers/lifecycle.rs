//! The async lifecycle handlers: launch, attach, terminate, disconnect.
//!
//! Each one claims its command with [`RequestAction::HandleAsync`] and holds
//! a multi-step conversation with the backend before producing the client's
//! response. The cleanup sequence (pre-terminate commands, graceful
//! shutdown, exit commands) is shared between terminate and disconnect.

use std::time::Duration;

use serde_json::{json, Map, Value};
use tracing::warn;

use crate::{
    error::DecorError,
    handler::{Handler, RequestAction},
    protocol::{
        AttachArguments, DisconnectArguments, GracefulShutdown, LaunchArguments, Request, Response,
        Terminal,
    },
    router::HandlerCtx,
    session::Session,
};

/// Budget for the detached exit-command run after a successful terminate.
const EXIT_COMMAND_BUDGET: Duration = Duration::from_secs(5);

/// Launch/attach argument keys the decorator consumes itself; the backend
/// never sees them.
const DECORATOR_KEYS: [&str; 4] = [
    "terminal",
    "preTerminateCommands",
    "exitCommands",
    "gracefulShutdown",
];

fn arguments_object(arguments: &Value) -> Map<String, Value> {
    match arguments {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    }
}

fn strip_decorator_keys(arguments: &Value) -> Map<String, Value> {
    let mut map = arguments_object(arguments);
    for key in DECORATOR_KEYS {
        map.remove(key);
    }
    map
}

#[derive(Clone, Copy, PartialEq)]
enum CommandMode {
    /// Run in order, stop the sequence at the first failed command.
    StopOnFailure,
    /// Run every command, logging failures.
    BestEffort,
}

/// Sends each command to the backend as an `evaluate` in `repl` context.
/// Transport failures propagate; command failures follow `mode`.
async fn run_commands(
    ctx: &HandlerCtx,
    commands: &[String],
    mode: CommandMode,
) -> Result<(), DecorError> {
    for command in commands {
        let response = ctx
            .send_backend_request(
                "evaluate",
                json!({ "expression": command, "context": "repl" }),
            )
            .await?;
        if !response.success {
            let message = response
                .message
                .unwrap_or_else(|| "command failed".to_string());
            warn!(command = %command, %message, "debugger command failed");
            if mode == CommandMode::StopOnFailure {
                break;
            }
        }
    }
    Ok(())
}

async fn apply_graceful_shutdown(ctx: &HandlerCtx) -> Result<(), DecorError> {
    match ctx.session().graceful_shutdown() {
        None => Ok(()),
        Some(GracefulShutdown::Signal(signal)) => {
            let response = ctx
                .send_backend_request(
                    "evaluate",
                    json!({ "expression": format!("process signal {signal}"), "context": "repl" }),
                )
                .await?;
            if !response.success {
                warn!(%signal, "signal delivery failed");
            }
            Ok(())
        }
        Some(GracefulShutdown::Commands(commands)) => {
            run_commands(ctx, &commands, CommandMode::StopOnFailure).await
        }
    }
}

/// `launch`: record the session's shutdown configuration, translate the
/// arguments for the backend, and relay the backend's verdict.
pub struct LaunchHandler;

impl Handler for LaunchHandler {
    fn name(&self) -> &'static str {
        "launch"
    }

    fn on_request(&self, request: &Request, _session: &Session) -> RequestAction {
        if request.command == "launch" {
            RequestAction::handle_async(launch)
        } else {
            RequestAction::Forward
        }
    }
}

async fn launch(request: Request, ctx: HandlerCtx) -> Result<Response, DecorError> {
    let args: LaunchArguments = request.load_args()?;
    let session = ctx.session();
    session.set_terminate_on_disconnect(true);
    session.set_pre_terminate_commands(args.pre_terminate_commands.clone());
    session.set_exit_commands(args.exit_commands.clone());
    session.set_graceful_shutdown(args.graceful_shutdown.clone());

    let mut backend_args = strip_decorator_keys(&request.arguments);
    if args.terminal != Terminal::Console && session.client_supports_run_in_terminal() {
        // The backend answers with a runInTerminal reverse request, which
        // the router relays to the client while we wait here.
        backend_args.insert("runInTerminal".to_string(), json!(true));
    }
    ctx.send_backend_request("launch", Value::Object(backend_args))
        .await
}

/// `attach`: same shutdown bookkeeping as launch, but a disconnect defaults
/// to detaching rather than killing the debuggee.
pub struct AttachHandler;

impl Handler for AttachHandler {
    fn name(&self) -> &'static str {
        "attach"
    }

    fn on_request(&self, request: &Request, _session: &Session) -> RequestAction {
        if request.command == "attach" {
            RequestAction::handle_async(attach)
        } else {
            RequestAction::Forward
        }
    }
}

async fn attach(request: Request, ctx: HandlerCtx) -> Result<Response, DecorError> {
    let args: AttachArguments = request.load_args()?;
    let session = ctx.session();
    session.set_terminate_on_disconnect(false);
    session.set_pre_terminate_commands(args.pre_terminate_commands.clone());
    session.set_exit_commands(args.exit_commands.clone());
    session.set_graceful_shutdown(args.graceful_shutdown.clone());

    let backend_args = strip_decorator_keys(&request.arguments);
    ctx.send_backend_request("attach", Value::Object(backend_args))
        .await
}

/// `terminate`: pre-terminate commands, then graceful shutdown, then the
/// backend's own terminate; exit commands run once the backend agreed.
pub struct TerminateHandler;

impl Handler for TerminateHandler {
    fn name(&self) -> &'static str {
        "terminate"
    }

    fn on_request(&self, request: &Request, _session: &Session) -> RequestAction {
        if request.command == "terminate" {
            RequestAction::handle_async(terminate)
        } else {
            RequestAction::Forward
        }
    }
}

async fn terminate(request: Request, ctx: HandlerCtx) -> Result<Response, DecorError> {
    let session = ctx.session();
    run_commands(
        &ctx,
        &session.pre_terminate_commands(),
        CommandMode::StopOnFailure,
    )
    .await?;
    apply_graceful_shutdown(&ctx).await?;
    let response = ctx
        .send_backend_request("terminate", request.arguments.clone())
        .await?;
    if response.success {
        // Fire and forget: the backend may close its pipe right after
        // acking terminate, and a slow command must not delay the response.
        let exit_commands = session.exit_commands();
        if !exit_commands.is_empty() {
            let ctx = ctx.clone();
            tokio::spawn(async move {
                let run = run_commands(&ctx, &exit_commands, CommandMode::BestEffort);
                match tokio::time::timeout(EXIT_COMMAND_BUDGET, run).await {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => warn!(%err, "exit commands skipped"),
                    Err(_) => warn!("exit commands abandoned after {EXIT_COMMAND_BUDGET:?}"),
                }
            });
        }
    }
    Ok(response)
}

/// `disconnect`: kill or detach depending on the request (falling back to
/// what launch/attach decided), run the terminate cleanup when killing, and
/// end the session once the response is out.
pub struct DisconnectHandler;

impl Handler for DisconnectHandler {
    fn name(&self) -> &'static str {
        "disconnect"
    }

    fn on_request(&self, request: &Request, _session: &Session) -> RequestAction {
        if request.command == "disconnect" {
            RequestAction::handle_async(disconnect)
        } else {
            RequestAction::Forward
        }
    }
}

async fn disconnect(request: Request, ctx: HandlerCtx) -> Result<Response, DecorError> {
    let args = request.load_args::<DisconnectArguments>().unwrap_or_default();
    let session = ctx.session();
    let terminate_debuggee = args
        .terminate_debuggee
        .unwrap_or_else(|| session.terminate_on_disconnect());

    if terminate_debuggee {
        run_commands(
            &ctx,
            &session.pre_terminate_commands(),
            CommandMode::StopOnFailure,
        )
        .await?;
        apply_graceful_shutdown(&ctx).await?;
    }

    let mut backend_args = arguments_object(&request.arguments);
    backend_args.insert("terminateDebuggee".to_string(), json!(terminate_debuggee));
    let response = ctx
        .send_backend_request("disconnect", Value::Object(backend_args))
        .await?;

    if let Err(err) = run_commands(&ctx, &session.exit_commands(), CommandMode::BestEffort).await {
        warn!(%err, "exit commands skipped");
    }
    ctx.request_shutdown();
    Ok(response)
}
