//! Connection lifecycle
//!
//! `Connecting -> LoggedIn -> Active -> Terminated | Failed`

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use contracts::{ChannelName, Clock, Endpoint, RecordSink, RecordSinkFactory};
use recorder::{record_chunk, Framer};
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, ReadHalf, WriteHalf};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::writer::{command_channel, CommandSender, CommandWriter, Outgoing};
use crate::{
    Command, ConnectionMetrics, ConnectionMetricsSnapshot, Dialer, SessionError, SessionSettings,
    TokenBucket,
};

/// Outbound commands buffered ahead of the writer
const COMMAND_QUEUE_CAPACITY: usize = 16;

/// Lifecycle state, published through a watch channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connecting,
    LoggedIn,
    Active,
    Terminated,
    Failed,
}

impl ConnectionState {
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Terminated | Self::Failed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Connecting => "connecting",
            Self::LoggedIn => "logged_in",
            Self::Active => "active",
            Self::Terminated => "terminated",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Final report of a connection that stopped without error
#[derive(Debug, Clone)]
pub struct ConnectionSummary {
    pub connection: String,
    pub endpoint: Endpoint,
    pub metrics: ConnectionMetricsSnapshot,
}

/// Establishes connections with a shared dialer, file factory and clock
pub struct Connector<D, F> {
    dialer: Arc<D>,
    sinks: Arc<F>,
    clock: Arc<dyn Clock>,
    settings: Arc<SessionSettings>,
}

impl<D, F> Clone for Connector<D, F> {
    fn clone(&self) -> Self {
        Self {
            dialer: Arc::clone(&self.dialer),
            sinks: Arc::clone(&self.sinks),
            clock: Arc::clone(&self.clock),
            settings: Arc::clone(&self.settings),
        }
    }
}

impl<D, F> Connector<D, F>
where
    D: Dialer + 'static,
    F: RecordSinkFactory + 'static,
{
    pub fn new(
        dialer: Arc<D>,
        sinks: Arc<F>,
        clock: Arc<dyn Clock>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            dialer,
            sinks,
            clock,
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Dial, open the log file, log in and start the connection loops.
    ///
    /// Returns once the connection is Active. The connection runs until
    /// `cancel` (or [`ConnectionHandle::shutdown`]) fires or a loop fails.
    #[instrument(
        name = "connection_open",
        skip_all,
        fields(connection = %id, endpoint = %endpoint)
    )]
    pub async fn connect(
        &self,
        id: String,
        endpoint: Endpoint,
        cancel: CancellationToken,
    ) -> Result<ConnectionHandle, SessionError> {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);

        let stream = self.dial(&endpoint, &cancel).await.inspect_err(|_| {
            observability::record_connect_failure(&endpoint.to_string());
        })?;

        let mut sink = self
            .sinks
            .create(&id)
            .await
            .map_err(SessionError::FileCreate)?;

        let (reader, write_half) = tokio::io::split(stream);
        let mut writer = CommandWriter::new(write_half, id.clone());
        if let Err(e) = self.login(&mut writer, &cancel).await {
            if let Err(close_err) = sink.close().await {
                warn!(connection = %id, error = %close_err, "Failed to close log file");
            }
            return Err(e);
        }
        state_tx.send_replace(ConnectionState::LoggedIn);
        debug!(connection = %id, "Logged in");

        let (joins_tx, joins_rx) = mpsc::channel(self.settings.join_queue_capacity.max(1));
        let (commands, command_rx) = command_channel(COMMAND_QUEUE_CAPACITY);
        let metrics = Arc::new(ConnectionMetrics::new());
        let token = cancel.child_token();

        let driver = Driver {
            id: id.clone(),
            endpoint: endpoint.clone(),
            settings: Arc::clone(&self.settings),
            clock: Arc::clone(&self.clock),
            metrics: Arc::clone(&metrics),
            cancel: token.clone(),
            reader,
            sink,
            writer,
            command_rx,
            commands,
            joins: joins_rx,
            state: state_tx,
        };

        driver.state.send_replace(ConnectionState::Active);
        observability::record_connection_opened(&endpoint.to_string());
        info!(connection = %id, endpoint = %endpoint, "Connection active");

        let task = tokio::spawn(drive(driver));

        Ok(ConnectionHandle {
            id,
            endpoint,
            joins: joins_tx,
            state: state_rx,
            cancel: token,
            metrics,
            task,
        })
    }

    async fn dial(
        &self,
        endpoint: &Endpoint,
        cancel: &CancellationToken,
    ) -> Result<D::Stream, SessionError> {
        let timeout = self.settings.connect_timeout;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SessionError::Cancelled),
            dialed = tokio::time::timeout(timeout, self.dialer.dial(endpoint)) => match dialed {
                Ok(Ok(stream)) => Ok(stream),
                Ok(Err(source)) => Err(SessionError::Connect {
                    endpoint: endpoint.to_string(),
                    source,
                }),
                Err(_) => Err(SessionError::ConnectTimeout {
                    endpoint: endpoint.to_string(),
                    timeout,
                }),
            },
        }
    }

    async fn login<W: AsyncWrite + Unpin>(
        &self,
        writer: &mut CommandWriter<W>,
        cancel: &CancellationToken,
    ) -> Result<(), SessionError> {
        for command in Command::handshake(&self.settings.nick, &self.settings.capabilities) {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(SessionError::Cancelled),
                written = writer.write_now(&command) => written?,
            }
        }
        Ok(())
    }
}

/// Control surface of a running connection
pub struct ConnectionHandle {
    id: String,
    endpoint: Endpoint,
    joins: mpsc::Sender<ChannelName>,
    state: watch::Receiver<ConnectionState>,
    cancel: CancellationToken,
    metrics: Arc<ConnectionMetrics>,
    task: JoinHandle<Result<ConnectionSummary, SessionError>>,
}

impl ConnectionHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch state transitions
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    pub fn metrics(&self) -> &Arc<ConnectionMetrics> {
        &self.metrics
    }

    /// Resolves once the connection is Terminated or Failed
    pub async fn finished(&self) {
        let mut state = self.state.clone();
        loop {
            let done = state.borrow_and_update().is_finished();
            if done || state.changed().await.is_err() {
                return;
            }
        }
    }

    /// Queue a channel for joining. Waits while the queue is full.
    pub async fn join(&self, channel: ChannelName) -> Result<(), SessionError> {
        self.joins
            .send(channel)
            .await
            .map_err(|e| SessionError::QueueClosed { channel: e.0 })?;
        self.metrics
            .set_join_queue_len(self.joins.max_capacity() - self.joins.capacity());
        Ok(())
    }

    /// Request a graceful stop
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Wait for the connection to end
    pub async fn wait(self) -> Result<ConnectionSummary, SessionError> {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => Err(SessionError::Panicked {
                connection: self.id,
                message: e.to_string(),
            }),
        }
    }

    /// Stop and wait
    pub async fn close(self) -> Result<ConnectionSummary, SessionError> {
        self.shutdown();
        self.wait().await
    }
}

struct Driver<T, S> {
    id: String,
    endpoint: Endpoint,
    settings: Arc<SessionSettings>,
    clock: Arc<dyn Clock>,
    metrics: Arc<ConnectionMetrics>,
    cancel: CancellationToken,
    reader: ReadHalf<T>,
    sink: S,
    writer: CommandWriter<WriteHalf<T>>,
    command_rx: mpsc::Receiver<Outgoing>,
    commands: CommandSender,
    joins: mpsc::Receiver<ChannelName>,
    state: watch::Sender<ConnectionState>,
}

/// Run the four loops until all have stopped. The first failure cancels
/// the rest; the reported error prefers reader, then writer, then joins,
/// then keepalive.
#[instrument(
    name = "connection_drive",
    skip_all,
    fields(connection = %driver.id, endpoint = %driver.endpoint)
)]
async fn drive<T, S>(driver: Driver<T, S>) -> Result<ConnectionSummary, SessionError>
where
    T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    S: RecordSink + 'static,
{
    let Driver {
        id,
        endpoint,
        settings,
        clock,
        metrics,
        cancel,
        reader,
        sink,
        writer,
        command_rx,
        commands,
        joins,
        state,
    } = driver;

    let fail_fast = |result: Result<(), SessionError>| {
        if result.is_err() {
            cancel.cancel();
        }
        result
    };
    let pacer = TokenBucket::new(settings.join_burst, settings.join_interval);
    let keepalive_commands = commands.clone();

    let (read, write, join, keepalive) = tokio::join!(
        async {
            fail_fast(
                read_loop(
                    &id,
                    reader,
                    sink,
                    clock.as_ref(),
                    settings.read_buffer_size,
                    settings.flush_interval,
                    &metrics,
                    &cancel,
                )
                .await,
            )
        },
        async { fail_fast(writer.run(command_rx, cancel.clone()).await) },
        async { fail_fast(join_loop(&id, joins, commands, pacer, &metrics, &cancel).await) },
        async {
            fail_fast(
                keepalive_loop(
                    &id,
                    keepalive_commands,
                    &settings.keepalive_target,
                    settings.keepalive_interval,
                    &metrics,
                    &cancel,
                )
                .await,
            )
        },
    );
    cancel.cancel();

    let outcome = read.and(write).and(join).and(keepalive);
    let snapshot = metrics.snapshot();

    match &outcome {
        Ok(()) => {
            state.send_replace(ConnectionState::Terminated);
            observability::record_connection_closed("stopped");
            info!(
                connection = %id,
                lines = snapshot.lines_recorded,
                bytes = snapshot.bytes_recorded,
                "Connection terminated"
            );
        }
        Err(e) => {
            state.send_replace(ConnectionState::Failed);
            observability::record_connection_closed(e.kind());
            warn!(connection = %id, error = %e, "Connection failed");
        }
    }

    outcome.map(|()| ConnectionSummary {
        connection: id,
        endpoint,
        metrics: snapshot,
    })
}

/// Frame inbound bytes into the log. Owns and finally closes the sink.
///
/// Flushes at most once per `flush_interval`, and only after new bytes.
#[allow(clippy::too_many_arguments)]
#[instrument(name = "connection_read_loop", skip_all, fields(connection = %id))]
async fn read_loop<R, S>(
    id: &str,
    mut reader: R,
    mut sink: S,
    clock: &dyn Clock,
    buffer_size: usize,
    flush_interval: Duration,
    metrics: &ConnectionMetrics,
    cancel: &CancellationToken,
) -> Result<(), SessionError>
where
    R: AsyncRead + Unpin,
    S: RecordSink,
{
    let mut framer = Framer::new();
    let mut buf = BytesMut::with_capacity(buffer_size.max(1));
    let flush_interval = flush_interval.max(Duration::from_millis(1));
    let mut flush_ticker = interval_at(Instant::now() + flush_interval, flush_interval);
    flush_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut dirty = false;

    let result = loop {
        buf.clear();
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => break Ok(()),
            _ = flush_ticker.tick(), if dirty => {
                if let Err(source) = sink.flush().await {
                    break Err(SessionError::Sink {
                        connection: id.to_string(),
                        source,
                    });
                }
                dirty = false;
                continue;
            }
            read = reader.read_buf(&mut buf) => read,
        };

        match read {
            Ok(0) => {
                break Err(SessionError::Closed {
                    connection: id.to_string(),
                })
            }
            Ok(_) => {}
            Err(source) => {
                break Err(SessionError::Read {
                    connection: id.to_string(),
                    source,
                })
            }
        }

        match record_chunk(&mut framer, &buf, &mut sink, clock).await {
            Ok(stats) => {
                dirty = true;
                metrics.record_chunk(stats);
                observability::record_lines_recorded(id, stats.lines, stats.bytes);
                if stats.partial_bytes > 0 {
                    observability::record_partial_write(id, stats.partial_bytes);
                }
            }
            Err(source) => {
                break Err(SessionError::Sink {
                    connection: id.to_string(),
                    source,
                })
            }
        }
    };

    if let Err(e) = sink.close().await {
        warn!(connection = %id, error = %e, "Failed to close log file");
    }
    debug!(
        connection = %id,
        lines = framer.lines(),
        pending = framer.pending(),
        "Read loop stopped"
    );
    result
}

/// Send queued JOINs in FIFO order, one pacer token each
#[instrument(name = "connection_join_loop", skip_all, fields(connection = %id))]
async fn join_loop(
    id: &str,
    mut joins: mpsc::Receiver<ChannelName>,
    commands: CommandSender,
    mut pacer: TokenBucket,
    metrics: &ConnectionMetrics,
    cancel: &CancellationToken,
) -> Result<(), SessionError> {
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            next = joins.recv() => next,
        };
        let Some(channel) = next else {
            // Every handle dropped; nothing more to join
            cancel.cancelled().await;
            return Ok(());
        };
        metrics.set_join_queue_len(joins.len());
        observability::record_join_queue_depth(id, joins.len());

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            _ = pacer.acquire() => {}
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            sent = commands.send(Command::Join(channel.clone())) => sent?,
        }
        // Spacing counts from when the JOIN left, not from when it was queued
        pacer.restart_refill(Instant::now());
        metrics.inc_joins_sent();
        observability::record_join_sent(id);
        info!(connection = %id, channel = %channel, "Joining channel");
    }
}

/// Proactive `PONG` every period, first one after a full period
#[instrument(name = "connection_keepalive", skip_all, fields(connection = %id))]
async fn keepalive_loop(
    id: &str,
    commands: CommandSender,
    target: &str,
    period: Duration,
    metrics: &ConnectionMetrics,
    cancel: &CancellationToken,
) -> Result<(), SessionError> {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            _ = ticker.tick() => {}
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            sent = commands.send(Command::Pong(target.to_string())) => sent?,
        }
        metrics.inc_keepalives_sent();
        observability::record_keepalive_sent(id);
        debug!(connection = %id, "Keepalive sent");
    }
}
