//! BinaryLogFile - append-only timestamped chat log on disk

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use contracts::{Clock, ContractError, OutputConfig, RecordSink, RecordSinkFactory};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, instrument};

use crate::format::encode_timestamp;

/// Name collisions tolerated before giving up on a file.
const MAX_NAME_ATTEMPTS: u64 = 64;

/// Configuration for BinaryLogFactory
#[derive(Debug, Clone)]
pub struct BinaryLogConfig {
    /// Output directory, created on demand
    pub directory: PathBuf,
    pub file_prefix: String,
    pub file_extension: String,
}

impl BinaryLogConfig {
    /// `<prefix>-<nanos>.<extension>`
    pub fn file_name(&self, nanos: u64) -> String {
        if self.file_extension.is_empty() {
            format!("{}-{}", self.file_prefix, nanos)
        } else {
            format!("{}-{}.{}", self.file_prefix, nanos, self.file_extension)
        }
    }
}

impl From<&OutputConfig> for BinaryLogConfig {
    fn from(output: &OutputConfig) -> Self {
        Self {
            directory: output.directory.clone(),
            file_prefix: output.file_prefix.clone(),
            file_extension: output.file_extension.clone(),
        }
    }
}

/// Sink that appends raw lines and timestamps to one file
pub struct BinaryLogFile {
    name: String,
    path: PathBuf,
    file: Option<File>,
    bytes_written: u64,
}

impl BinaryLogFile {
    /// Create a new file at `path` and write the open marker.
    ///
    /// Fails if the file already exists.
    #[instrument(name = "binary_log_create", skip(path), fields(path = %path.display()))]
    pub async fn create(path: PathBuf, open_marker: u64) -> std::io::Result<Self> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        file.write_all(&encode_timestamp(open_marker)).await?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        debug!(file = %name, open_marker, "BinaryLogFile created");

        Ok(Self {
            name,
            path,
            file: Some(file),
            bytes_written: encode_timestamp(open_marker).len() as u64,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes written so far, including the open marker
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    async fn append(&mut self, bytes: &[u8]) -> Result<(), ContractError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| ContractError::sink_write(&self.name, "file already closed"))?;

        file.write_all(bytes).await.map_err(|e| {
            error!(sink = %self.name, error = %e, "Write failed");
            ContractError::sink_write(&self.name, e.to_string())
        })?;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }
}

impl RecordSink for BinaryLogFile {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write_line(&mut self, bytes: &[u8]) -> Result<(), ContractError> {
        if bytes.is_empty() {
            return Ok(());
        }
        self.append(bytes).await
    }

    async fn write_timestamp(&mut self, nanos: u64) -> Result<(), ContractError> {
        self.append(&encode_timestamp(nanos)).await
    }

    #[instrument(name = "binary_log_flush", skip(self), fields(sink = %self.name))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        if let Some(file) = self.file.as_mut() {
            file.flush()
                .await
                .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        }
        Ok(())
    }

    #[instrument(name = "binary_log_close", skip(self), fields(sink = %self.name))]
    async fn close(&mut self) -> Result<(), ContractError> {
        if let Some(mut file) = self.file.take() {
            file.flush()
                .await
                .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        }
        debug!(sink = %self.name, bytes = self.bytes_written, "BinaryLogFile closed");
        Ok(())
    }
}

/// Opens one `BinaryLogFile` per connection attempt, named by creation time
pub struct BinaryLogFactory {
    config: BinaryLogConfig,
    clock: Arc<dyn Clock>,
}

impl BinaryLogFactory {
    pub fn new(config: BinaryLogConfig, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock }
    }

    pub fn config(&self) -> &BinaryLogConfig {
        &self.config
    }
}

impl RecordSinkFactory for BinaryLogFactory {
    type Sink = BinaryLogFile;

    #[instrument(
        name = "binary_log_factory_create",
        skip(self),
        fields(dir = %self.config.directory.display())
    )]
    async fn create(&self, connection: &str) -> Result<BinaryLogFile, ContractError> {
        fs::create_dir_all(&self.config.directory)
            .await
            .map_err(|e| ContractError::sink_create(connection, e.to_string()))?;

        let created = self.clock.now_nanos();
        for bump in 0..MAX_NAME_ATTEMPTS {
            let stamp = created + bump;
            let path = self.config.directory.join(self.config.file_name(stamp));

            match BinaryLogFile::create(path, stamp).await {
                Ok(file) => {
                    info!(
                        connection,
                        file = %file.path().display(),
                        "Log file opened"
                    );
                    return Ok(file);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(ContractError::sink_create(connection, e.to_string())),
            }
        }

        Err(ContractError::sink_create(
            connection,
            format!("no free file name after {MAX_NAME_ATTEMPTS} attempts"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::decode;
    use crate::{record_chunk, Framer, ManualClock};
    use tempfile::tempdir;

    fn config(dir: &Path) -> BinaryLogConfig {
        BinaryLogConfig {
            directory: dir.to_path_buf(),
            file_prefix: "twitch".into(),
            file_extension: "txt".into(),
        }
    }

    #[test]
    fn test_file_name() {
        let cfg = config(Path::new("."));
        assert_eq!(cfg.file_name(123), "twitch-123.txt");

        let bare = BinaryLogConfig {
            file_extension: String::new(),
            ..cfg
        };
        assert_eq!(bare.file_name(123), "twitch-123");
    }

    #[tokio::test]
    async fn test_factory_writes_open_marker() {
        let dir = tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(1_700_000_000_000_000_000));
        let factory = BinaryLogFactory::new(config(dir.path()), clock);

        let mut file = factory.create("shard-0").await.unwrap();
        assert_eq!(
            file.path().file_name().unwrap(),
            "twitch-1700000000000000000.txt"
        );
        file.close().await.unwrap();

        let bytes = std::fs::read(file.path()).unwrap();
        assert_eq!(bytes.len(), 8);
        assert_eq!(decode(&bytes).unwrap().marker, 1_700_000_000_000_000_000);
    }

    #[tokio::test]
    async fn test_factory_never_reuses_a_file() {
        let dir = tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(5));
        let factory = BinaryLogFactory::new(config(dir.path()), clock);

        let a = factory.create("a").await.unwrap();
        let b = factory.create("b").await.unwrap();
        assert_ne!(a.path(), b.path());
        assert!(b.path().ends_with("twitch-6.txt"));
    }

    #[tokio::test]
    async fn test_factory_creates_missing_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let factory = BinaryLogFactory::new(config(&nested), Arc::new(ManualClock::new(1)));

        let file = factory.create("shard-0").await.unwrap();
        assert!(file.path().starts_with(&nested));
    }

    #[tokio::test]
    async fn test_records_reach_disk() {
        let dir = tempdir().unwrap();
        let clock = ManualClock::new(10);
        let mut file = BinaryLogFile::create(dir.path().join("log.bin"), 9)
            .await
            .unwrap();

        let mut framer = Framer::new();
        record_chunk(&mut framer, b"PING :tmi\r\nPA", &mut file, &clock)
            .await
            .unwrap();
        clock.advance(1);
        record_chunk(&mut framer, b"RT\r\n", &mut file, &clock)
            .await
            .unwrap();
        file.close().await.unwrap();

        let log = decode(&std::fs::read(dir.path().join("log.bin")).unwrap()).unwrap();
        assert_eq!(log.marker, 9);
        assert_eq!(log.records.len(), 2);
        assert_eq!(log.records[0].line, b"PING :tmi\r\n");
        assert_eq!(log.records[0].timestamp, 10);
        assert_eq!(log.records[1].line, b"PART\r\n");
        assert_eq!(log.records[1].timestamp, 11);
        assert_eq!(file.bytes_written(), 8 + 11 + 8 + 6 + 8);
    }

    #[tokio::test]
    async fn test_write_after_close_fails() {
        let dir = tempdir().unwrap();
        let mut file = BinaryLogFile::create(dir.path().join("x"), 0).await.unwrap();
        file.close().await.unwrap();
        assert!(file.write_line(b"late\n").await.is_err());
    }
}
