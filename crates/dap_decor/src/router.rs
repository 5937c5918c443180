//! The session router: two reader loops, two writer tasks, a correlation
//! layer, and the pool of per-request async handler tasks.
//!
//! Each direction funnels through a single writer task that stamps `seq`
//! from its own counter and owns the stream, so wire order equals enqueue
//! order and sequence numbers are strictly monotonic. Requests that expect a
//! response travel with their pending-map entry and the writer registers the
//! entry under the stamped `seq` before the bytes leave, so a fast answer
//! can never beat its bookkeeping.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use serde_json::Value;
use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    sync::{mpsc, oneshot, Mutex, Notify},
    time,
};
use tracing::{debug, warn};

use crate::{
    codec,
    error::DecorError,
    handler::{AsyncHandlerFn, Handler, RequestAction},
    protocol::{self, CancelArguments, DapMessage, Event, Request, Response},
    session::Session,
};

const DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// What a writer task does with a queue item.
pub(crate) enum Outbound {
    /// Stamp a fresh `seq` and send.
    Message(DapMessage),
    /// A request expecting a response: the writer stamps `seq`, registers
    /// `entry` in its direction's pending map under that `seq`, then sends.
    Request { request: Request, entry: Pending },
}

/// How a response correlates back once it arrives.
pub(crate) enum Pending {
    /// Relay to the other side with `request_seq` rewritten to the seq the
    /// originator used.
    Relay { origin_seq: i64, command: String },
    /// Hand the response to an async handler awaiting it.
    Internal(oneshot::Sender<Result<Response, DecorError>>),
}

type PendingMap = Arc<Mutex<HashMap<i64, Pending>>>;
type CancelRegistry = Arc<Mutex<HashMap<i64, oneshot::Sender<()>>>>;

#[derive(Default)]
pub(crate) struct Shutdown {
    requested: AtomicBool,
    notify: Notify,
}

impl Shutdown {
    fn request(&self) {
        self.requested.store(true, Ordering::Release);
    }

    /// Fires the shutdown notification if one was requested. Split from
    /// [`Shutdown::request`] so a handler can ask for shutdown while its
    /// response is still pending and the router only acts once the response
    /// has been queued.
    fn flush(&self) {
        if self.requested.load(Ordering::Acquire) {
            self.notify.notify_one();
        }
    }

    async fn wait(&self) {
        self.notify.notified().await;
    }
}

/// Capabilities handed to a [`RequestAction::HandleAsync`] task: a channel
/// to the backend, a channel to the client (for reverse requests and status
/// output), the shared session, and a shutdown hook.
#[derive(Clone)]
pub struct HandlerCtx {
    backend_tx: mpsc::Sender<Outbound>,
    client_tx: mpsc::Sender<Outbound>,
    session: Arc<Session>,
    shutdown: Arc<Shutdown>,
}

impl HandlerCtx {
    /// Sends a request to the backend and awaits its response.
    pub async fn send_backend_request(
        &self,
        command: &str,
        arguments: Value,
    ) -> Result<Response, DecorError> {
        Self::send_request(&self.backend_tx, command, arguments).await
    }

    /// Sends a reverse request to the client and awaits its response.
    pub async fn send_client_request(
        &self,
        command: &str,
        arguments: Value,
    ) -> Result<Response, DecorError> {
        Self::send_request(&self.client_tx, command, arguments).await
    }

    async fn send_request(
        tx: &mpsc::Sender<Outbound>,
        command: &str,
        arguments: Value,
    ) -> Result<Response, DecorError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let request = Request::new(command, arguments);
        tx.send(Outbound::Request {
            request,
            entry: Pending::Internal(reply_tx),
        })
        .await
        .map_err(|_| DecorError::ChannelClosed)?;
        match reply_rx.await {
            Ok(result) => result,
            Err(_) => Err(DecorError::ChannelClosed),
        }
    }

    /// Queues an `output` event of category `console` to the client.
    pub async fn emit_console(&self, text: impl Into<String>) -> Result<(), DecorError> {
        self.client_tx
            .send(Outbound::Message(protocol::console_output(text)))
            .await
            .map_err(|_| DecorError::ChannelClosed)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Asks the router to end the session once this handler's response has
    /// been queued to the client.
    pub fn request_shutdown(&self) {
        self.shutdown.request();
    }
}

#[derive(Clone, Debug)]
pub struct RouterConfig {
    /// Budget for async handler tasks without a per-handler override.
    pub handler_timeout: Duration,
    /// Depth of each direction's writer queue.
    pub queue_depth: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        RouterConfig {
            handler_timeout: Duration::from_secs(60),
            queue_depth: 64,
        }
    }
}

pub struct SessionRouter {
    handlers: Arc<Vec<Box<dyn Handler>>>,
    session: Arc<Session>,
    config: RouterConfig,
}

impl SessionRouter {
    pub fn new(handlers: Vec<Box<dyn Handler>>) -> SessionRouter {
        SessionRouter::with_config(handlers, RouterConfig::default())
    }

    pub fn with_config(handlers: Vec<Box<dyn Handler>>, config: RouterConfig) -> SessionRouter {
        SessionRouter {
            handlers: Arc::new(handlers),
            session: Arc::new(Session::new()),
            config,
        }
    }

    pub fn session(&self) -> Arc<Session> {
        self.session.clone()
    }

    /// Drives one session to completion: client EOF, backend EOF, a framing
    /// failure, or a completed `disconnect` all end it. On return all async
    /// handler tasks are cancelled and both writer queues have drained.
    pub async fn run<CR, CW, BR, BW>(
        self,
        client_reader: CR,
        client_writer: CW,
        backend_reader: BR,
        backend_writer: BW,
    ) -> Result<(), DecorError>
    where
        CR: AsyncRead + Unpin + Send + 'static,
        CW: AsyncWrite + Unpin + Send + 'static,
        BR: AsyncRead + Unpin + Send + 'static,
        BW: AsyncWrite + Unpin + Send + 'static,
    {
        let (client_tx, client_rx) = mpsc::channel(self.config.queue_depth);
        let (backend_tx, backend_rx) = mpsc::channel(self.config.queue_depth);
        let pending: PendingMap = Arc::default();
        let reverse_pending: PendingMap = Arc::default();
        let cancels: CancelRegistry = Arc::default();
        let shutdown = Arc::new(Shutdown::default());

        let client_writer_task =
            tokio::spawn(writer_task(client_writer, client_rx, reverse_pending.clone()));
        let backend_writer_task =
            tokio::spawn(writer_task(backend_writer, backend_rx, pending.clone()));
        let mut backend_task = tokio::spawn(backend_reader_task(
            backend_reader,
            self.handlers.clone(),
            self.session.clone(),
            pending.clone(),
            client_tx.clone(),
        ));

        let client = client_loop(
            client_reader,
            self.handlers.clone(),
            self.session.clone(),
            client_tx.clone(),
            backend_tx.clone(),
            reverse_pending.clone(),
            cancels.clone(),
            shutdown.clone(),
            self.config.handler_timeout,
        );
        tokio::pin!(client);

        let result = tokio::select! {
            res = &mut client => res,
            res = &mut backend_task => match res {
                Ok(inner) => inner,
                Err(_) => Err(DecorError::ChannelClosed),
            },
            _ = shutdown.wait() => Ok(()),
        };

        for (_, cancel) in cancels.lock().await.drain() {
            let _ = cancel.send(());
        }
        backend_task.abort();
        drop(client_tx);
        drop(backend_tx);
        let _ = time::timeout(DRAIN_TIMEOUT, client_writer_task).await;
        let _ = time::timeout(DRAIN_TIMEOUT, backend_writer_task).await;

        result
    }
}

async fn writer_task<W>(mut writer: W, mut rx: mpsc::Receiver<Outbound>, pending: PendingMap)
where
    W: AsyncWrite + Unpin,
{
    let mut next_seq = 1i64;
    while let Some(item) = rx.recv().await {
        let seq = next_seq;
        next_seq += 1;
        let payload = match item {
            Outbound::Message(mut message) => {
                message.set_seq(seq);
                match protocol::to_json(&message) {
                    Ok(payload) => payload,
                    Err(err) => {
                        warn!(%err, "dropping unserializable message");
                        continue;
                    }
                }
            }
            Outbound::Request { mut request, entry } => {
                request.base.seq = seq;
                match protocol::to_json(&DapMessage::Request(request)) {
                    Ok(payload) => {
                        pending.lock().await.insert(seq, entry);
                        payload
                    }
                    Err(err) => {
                        warn!(%err, "dropping unserializable request");
                        continue;
                    }
                }
            }
        };
        debug!(%payload, "write");
        if let Err(err) = codec::write_payload(&mut writer, &payload).await {
            warn!(%err, "write failed, stopping writer");
            break;
        }
    }
    let _ = writer.shutdown().await;
}

fn apply_backend_chain(
    handlers: &[Box<dyn Handler>],
    session: &Session,
    message: DapMessage,
) -> Vec<DapMessage> {
    let mut current = vec![message];
    for handler in handlers {
        let mut next = Vec::with_capacity(current.len());
        for message in current {
            next.extend(handler.on_backend_message(message, session));
        }
        current = next;
    }
    current
}

/// Runs a backend message through the handler chain and queues the results
/// to the client. Reverse requests surviving the chain are registered so the
/// client's answer finds its way back to the backend.
async fn deliver_to_client(
    handlers: &[Box<dyn Handler>],
    session: &Session,
    message: DapMessage,
    client_tx: &mpsc::Sender<Outbound>,
) -> Result<(), DecorError> {
    for out in apply_backend_chain(handlers, session, message) {
        let item = match out {
            DapMessage::Request(request) => {
                let entry = Pending::Relay {
                    origin_seq: request.base.seq,
                    command: request.command.clone(),
                };
                Outbound::Request { request, entry }
            }
            other => Outbound::Message(other),
        };
        client_tx
            .send(item)
            .await
            .map_err(|_| DecorError::ChannelClosed)?;
    }
    Ok(())
}

async fn backend_reader_task<R>(
    reader: R,
    handlers: Arc<Vec<Box<dyn Handler>>>,
    session: Arc<Session>,
    pending: PendingMap,
    client_tx: mpsc::Sender<Outbound>,
) -> Result<(), DecorError>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let result = loop {
        let payload = match codec::read_payload(&mut reader).await {
            Ok(Some(payload)) => payload,
            Ok(None) => break Ok(()),
            Err(err) => break Err(err),
        };
        debug!(%payload, "backend read");
        let message = match protocol::from_json(&payload) {
            Ok(message) => message,
            Err(err) => break Err(err),
        };
        match message {
            DapMessage::Response(mut response) => {
                let entry = pending.lock().await.remove(&response.request_seq);
                match entry {
                    Some(Pending::Relay { origin_seq, .. }) => {
                        response.request_seq = origin_seq;
                        if let Err(err) = deliver_to_client(
                            &handlers,
                            &session,
                            DapMessage::Response(response),
                            &client_tx,
                        )
                        .await
                        {
                            break Err(err);
                        }
                    }
                    Some(Pending::Internal(reply)) => {
                        let _ = reply.send(Ok(response));
                    }
                    None => {
                        warn!(
                            request_seq = response.request_seq,
                            "backend response without a pending request"
                        );
                    }
                }
            }
            DapMessage::Event(event) => {
                if event.event == "exited" || event.event == "terminated" {
                    session.set_process_running(false);
                }
                // The running flag flips only after this event's chain pass,
                // so the launch narration injected alongside it still goes
                // out as `console`.
                let process_started = event.event == "process";
                if let Err(err) =
                    deliver_to_client(&handlers, &session, DapMessage::Event(event), &client_tx)
                        .await
                {
                    break Err(err);
                }
                if process_started {
                    session.set_process_running(true);
                }
            }
            DapMessage::Request(request) => {
                if let Err(err) =
                    deliver_to_client(&handlers, &session, DapMessage::Request(request), &client_tx)
                        .await
                {
                    break Err(err);
                }
            }
        }
    };

    // Backend gone: every outstanding request gets exactly one answer, then
    // the client hears the session is over.
    let drained: Vec<(i64, Pending)> = pending.lock().await.drain().collect();
    for (_, entry) in drained {
        match entry {
            Pending::Relay {
                origin_seq,
                command,
            } => {
                let response = Response::failure(origin_seq, command, "backend_terminated");
                let _ = client_tx
                    .send(Outbound::Message(DapMessage::Response(response)))
                    .await;
            }
            Pending::Internal(reply) => {
                let _ = reply.send(Err(DecorError::BackendTerminated));
            }
        }
    }
    let _ = client_tx
        .send(Outbound::Message(DapMessage::Event(Event::new(
            "terminated",
            Value::Null,
        ))))
        .await;
    result
}

#[allow(clippy::too_many_arguments)]
async fn client_loop<R>(
    reader: R,
    handlers: Arc<Vec<Box<dyn Handler>>>,
    session: Arc<Session>,
    client_tx: mpsc::Sender<Outbound>,
    backend_tx: mpsc::Sender<Outbound>,
    reverse_pending: PendingMap,
    cancels: CancelRegistry,
    shutdown: Arc<Shutdown>,
    handler_timeout: Duration,
) -> Result<(), DecorError>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    loop {
        let payload = match codec::read_payload(&mut reader).await? {
            Some(payload) => payload,
            None => return Ok(()),
        };
        debug!(%payload, "client read");
        match protocol::from_json(&payload)? {
            DapMessage::Request(request) => {
                handle_client_request(
                    request,
                    &handlers,
                    &session,
                    &client_tx,
                    &backend_tx,
                    &cancels,
                    &shutdown,
                    handler_timeout,
                )
                .await?;
            }
            DapMessage::Response(mut response) => {
                let entry = reverse_pending.lock().await.remove(&response.request_seq);
                match entry {
                    Some(Pending::Relay { origin_seq, .. }) => {
                        response.request_seq = origin_seq;
                        backend_tx
                            .send(Outbound::Message(DapMessage::Response(response)))
                            .await
                            .map_err(|_| DecorError::ChannelClosed)?;
                    }
                    Some(Pending::Internal(reply)) => {
                        let _ = reply.send(Ok(response));
                    }
                    None => {
                        warn!(
                            request_seq = response.request_seq,
                            "client response without a pending reverse request"
                        );
                    }
                }
            }
            DapMessage::Event(event) => {
                // Clients do not normally send events; pass them through.
                backend_tx
                    .send(Outbound::Message(DapMessage::Event(event)))
                    .await
                    .map_err(|_| DecorError::ChannelClosed)?;
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_client_request(
    request: Request,
    handlers: &Arc<Vec<Box<dyn Handler>>>,
    session: &Arc<Session>,
    client_tx: &mpsc::Sender<Outbound>,
    backend_tx: &mpsc::Sender<Outbound>,
    cancels: &CancelRegistry,
    shutdown: &Arc<Shutdown>,
    handler_timeout: Duration,
) -> Result<(), DecorError> {
    if request.command == "cancel" {
        return handle_cancel(request, cancels, client_tx).await;
    }

    let mut action = RequestAction::Forward;
    let mut claimed_by: Option<usize> = None;
    for (index, handler) in handlers.iter().enumerate() {
        let candidate = handler.on_request(&request, session);
        if claimed_by.is_none() && !matches!(candidate, RequestAction::Forward) {
            debug!(handler = handler.name(), command = %request.command, "request claimed");
            claimed_by = Some(index);
            action = candidate;
        }
    }

    let client_seq = request.base.seq;
    let command = request.command.clone();
    match action {
        RequestAction::Forward => {
            let entry = Pending::Relay {
                origin_seq: client_seq,
                command,
            };
            backend_tx
                .send(Outbound::Request { request, entry })
                .await
                .map_err(|_| DecorError::ChannelClosed)?;
        }
        RequestAction::ForwardModified(modified) => {
            let entry = Pending::Relay {
                origin_seq: client_seq,
                command,
            };
            backend_tx
                .send(Outbound::Request {
                    request: modified,
                    entry,
                })
                .await
                .map_err(|_| DecorError::ChannelClosed)?;
        }
        RequestAction::Respond(response) => {
            client_tx
                .send(Outbound::Message(DapMessage::Response(response)))
                .await
                .map_err(|_| DecorError::ChannelClosed)?;
        }
        RequestAction::HandleAsync(run) => {
            let budget = claimed_by
                .and_then(|index| handlers[index].async_timeout())
                .unwrap_or(handler_timeout);
            let ctx = HandlerCtx {
                backend_tx: backend_tx.clone(),
                client_tx: client_tx.clone(),
                session: session.clone(),
                shutdown: shutdown.clone(),
            };
            spawn_async_handler(request, run, budget, ctx, cancels).await;
        }
    }
    Ok(())
}

async fn handle_cancel(
    request: Request,
    cancels: &CancelRegistry,
    client_tx: &mpsc::Sender<Outbound>,
) -> Result<(), DecorError> {
    let target = request
        .load_args::<CancelArguments>()
        .ok()
        .and_then(|args| args.request_id);
    let cancelled = match target {
        Some(id) => match cancels.lock().await.remove(&id) {
            Some(cancel) => cancel.send(()).is_ok(),
            None => false,
        },
        None => false,
    };
    let response = if cancelled {
        Response::success(request.base.seq, &request.command, Value::Null)
    } else {
        Response::failure(request.base.seq, &request.command, "unknown request")
    };
    client_tx
        .send(Outbound::Message(DapMessage::Response(response)))
        .await
        .map_err(|_| DecorError::ChannelClosed)
}

/// Wraps an async handler so exactly one response reaches the client: the
/// handler's own, or a failure carrying the timeout / cancellation / error
/// message.
async fn spawn_async_handler(
    request: Request,
    run: AsyncHandlerFn,
    budget: Duration,
    ctx: HandlerCtx,
    cancels: &CancelRegistry,
) {
    let client_seq = request.base.seq;
    let command = request.command.clone();
    let client_tx = ctx.client_tx.clone();
    let shutdown = ctx.shutdown.clone();
    let cancels = cancels.clone();

    let (cancel_tx, cancel_rx) = oneshot::channel();
    cancels.lock().await.insert(client_seq, cancel_tx);

    tokio::spawn(async move {
        // The handler runs on its own task so a panic inside it still turns
        // into a failed response instead of a silently dropped request.
        let mut inner = tokio::spawn(run(request, ctx));
        let outcome = tokio::select! {
            _ = cancel_rx => {
                inner.abort();
                Err(DecorError::Cancelled)
            }
            res = time::timeout(budget, &mut inner) => match res {
                Ok(Ok(result)) => result,
                Ok(Err(join_error)) => Err(DecorError::HandlerFailed(format!(
                    "handler task failed: {join_error}"
                ))),
                Err(_) => {
                    inner.abort();
                    Err(DecorError::Timeout(budget))
                }
            },
        };
        cancels.lock().await.remove(&client_seq);
        let mut response = match outcome {
            Ok(response) => response,
            Err(err) => {
                debug!(command = %command, %err, "async handler failed");
                Response::failure(client_seq, &command, err.to_string())
            }
        };
        response.request_seq = client_seq;
        response.command = command;
        if client_tx
            .send(Outbound::Message(DapMessage::Response(response)))
            .await
            .is_err()
        {
            warn!("client writer gone before async response could be delivered");
        }
        shutdown.flush();
    });
}
