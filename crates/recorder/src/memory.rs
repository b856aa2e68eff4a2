//! MemorySink - in-memory RecordSink for tests and dry runs

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use contracts::{Clock, ContractError, RecordSink, RecordSinkFactory};
use tracing::debug;

use crate::format::{decode, encode_timestamp, DecodeError, DecodedLog};

/// Shared view of the bytes a [`MemorySink`] has written.
#[derive(Debug, Clone)]
pub struct MemoryLog {
    name: Arc<str>,
    bytes: Arc<Mutex<Vec<u8>>>,
    closed: Arc<Mutex<bool>>,
    flushes: Arc<AtomicUsize>,
}

impl MemoryLog {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Copy of everything written so far
    pub fn bytes(&self) -> Vec<u8> {
        self.bytes.lock().map(|b| b.clone()).unwrap_or_default()
    }

    pub fn decode(&self) -> Result<DecodedLog, DecodeError> {
        decode(&self.bytes())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.lock().map(|c| *c).unwrap_or(false)
    }

    /// Explicit flushes, not counting the one implied by close
    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::Relaxed)
    }
}

/// Sink that keeps the binary log layout in memory
pub struct MemorySink {
    log: MemoryLog,
}

impl MemorySink {
    /// Create a sink whose open marker is already written
    pub fn new(name: impl Into<String>, open_marker: u64) -> (Self, MemoryLog) {
        let log = MemoryLog {
            name: Arc::from(name.into()),
            bytes: Arc::new(Mutex::new(encode_timestamp(open_marker).to_vec())),
            closed: Arc::new(Mutex::new(false)),
            flushes: Arc::new(AtomicUsize::new(0)),
        };
        (Self { log: log.clone() }, log)
    }

    fn append(&self, bytes: &[u8]) -> Result<(), ContractError> {
        if self.log.is_closed() {
            return Err(ContractError::sink_write(self.log.name(), "sink closed"));
        }
        self.log
            .bytes
            .lock()
            .map_err(|_| ContractError::sink_write(self.log.name(), "buffer poisoned"))?
            .extend_from_slice(bytes);
        Ok(())
    }
}

impl RecordSink for MemorySink {
    fn name(&self) -> &str {
        self.log.name()
    }

    async fn write_line(&mut self, bytes: &[u8]) -> Result<(), ContractError> {
        self.append(bytes)
    }

    async fn write_timestamp(&mut self, nanos: u64) -> Result<(), ContractError> {
        self.append(&encode_timestamp(nanos))
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        if self.log.is_closed() {
            return Err(ContractError::sink_write(self.log.name(), "sink closed"));
        }
        self.log.flushes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        if let Ok(mut closed) = self.log.closed.lock() {
            *closed = true;
        }
        debug!(sink = %self.log.name(), "MemorySink closed");
        Ok(())
    }
}

/// Factory handing out [`MemorySink`]s and remembering every log it created
#[derive(Clone)]
pub struct MemorySinkFactory {
    clock: Arc<dyn Clock>,
    logs: Arc<Mutex<Vec<MemoryLog>>>,
    fail: bool,
}

impl MemorySinkFactory {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            logs: Arc::new(Mutex::new(Vec::new())),
            fail: false,
        }
    }

    /// Factory whose `create` always fails (file-create error path)
    pub fn failing(clock: Arc<dyn Clock>) -> Self {
        Self {
            fail: true,
            ..Self::new(clock)
        }
    }

    /// Logs in creation order
    pub fn logs(&self) -> Vec<MemoryLog> {
        self.logs.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl RecordSinkFactory for MemorySinkFactory {
    type Sink = MemorySink;

    async fn create(&self, connection: &str) -> Result<MemorySink, ContractError> {
        if self.fail {
            return Err(ContractError::sink_create(connection, "injected failure"));
        }

        let (sink, log) = MemorySink::new(connection, self.clock.now_nanos());
        if let Ok(mut logs) = self.logs.lock() {
            logs.push(log);
        }
        Ok(sink)
    }
}
