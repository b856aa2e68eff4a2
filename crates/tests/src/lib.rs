//! # Integration Tests
//!
//! Cross-crate and end-to-end tests.
//!
//! Covers:
//! - Config document to runtime settings
//! - Full recorder against a loopback chat server (real TCP, real files)

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::PoolMode;
    use dispatcher::DispatcherConfig;
    use session::SessionSettings;
    use std::time::Duration;

    #[test]
    fn test_config_document_drives_every_layer() {
        let toml = r##"
channels = ["Foo", "#bar"]

[server]
mode = "direct"
shard_size = 50

[login]
nick = "JustinFan42"

[timing]
join_interval_ms = 1500
keepalive_interval_secs = 5

[reconnect]
max_attempts = 0
"##;
        let blueprint = ConfigLoader::load_from_str(toml, ConfigFormat::Toml).unwrap();

        let settings = SessionSettings::from(&blueprint);
        assert_eq!(settings.nick, "JustinFan42");
        assert_eq!(settings.join_interval, Duration::from_millis(1500));
        assert_eq!(settings.keepalive_interval, Duration::from_secs(5));
        assert_eq!(settings.join_queue_capacity, 100);

        let dispatcher = DispatcherConfig::from(&blueprint);
        assert_eq!(dispatcher.mode, PoolMode::Direct);
        assert_eq!(dispatcher.shard_size, 50);
        assert_eq!(dispatcher.reconnect.max_attempts, 1);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::Duration;

    use contracts::{Endpoint, PoolMode, RecorderBlueprint};
    use dispatcher::{Dispatcher, DispatcherConfig, ShardOutcome};
    use recorder::format::{decode, DecodedLog};
    use recorder::{BinaryLogConfig, BinaryLogFactory, SystemClock};
    use resolver::StaticResolver;
    use session::{Connector, SessionSettings, TcpDialer};
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    /// Loopback server that reports every received line and echoes each
    /// JOIN back as a membership line, split across two writes.
    async fn spawn_server() -> (Endpoint, mpsc::UnboundedReceiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve(stream, tx.clone()));
            }
        });

        (Endpoint::new(addr.ip().to_string(), addr.port()), rx)
    }

    async fn serve(stream: TcpStream, tx: mpsc::UnboundedSender<String>) {
        let (read, mut write) = stream.into_split();
        let mut lines = BufReader::new(read).lines();

        while let Ok(Some(line)) = lines.next_line().await {
            if let Some(channel) = line.strip_prefix("JOIN ") {
                let echo = format!(":justinfan0!justinfan0@justinfan0.tmi.twitch.tv JOIN {channel}\r\n");
                let (head, tail) = echo.split_at(echo.len() / 2);
                if write.write_all(head.as_bytes()).await.is_err() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
                if write.write_all(tail.as_bytes()).await.is_err() {
                    break;
                }
            }
            if tx.send(line).is_err() {
                break;
            }
        }
    }

    fn blueprint(dir: &Path, endpoint: Endpoint, mode: PoolMode) -> RecorderBlueprint {
        let mut blueprint = RecorderBlueprint::default();
        blueprint.server.mode = mode;
        blueprint.server.endpoint = endpoint;
        blueprint.timing.join_interval_ms = 50;
        blueprint.output.directory = dir.to_path_buf();
        blueprint
    }

    fn dispatcher(
        blueprint: &RecorderBlueprint,
        resolver: StaticResolver,
    ) -> Dispatcher<TcpDialer, BinaryLogFactory, StaticResolver> {
        let clock = Arc::new(SystemClock::new());
        let sinks = BinaryLogFactory::new(BinaryLogConfig::from(&blueprint.output), clock.clone());
        let connector = Connector::new(
            Arc::new(TcpDialer),
            Arc::new(sinks),
            clock,
            SessionSettings::from(blueprint),
        );
        Dispatcher::new(connector, Arc::new(resolver), DispatcherConfig::from(blueprint))
    }

    fn log_files(dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok().map(|e| e.path()))
            .collect();
        files.sort();
        files
    }

    fn read_logs(dir: &Path) -> Vec<DecodedLog> {
        log_files(dir)
            .iter()
            .filter_map(|p| std::fs::read(p).ok())
            .filter_map(|bytes| decode(&bytes).ok())
            .collect()
    }

    /// Poll the output directory until `lines` records have reached disk
    async fn wait_for_records(dir: &Path, lines: usize) {
        for _ in 0..200 {
            let recorded: usize = read_logs(dir).iter().map(|l| l.records.len()).sum();
            if recorded >= lines {
                return;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("expected {lines} records in {}", dir.display());
    }

    #[tokio::test]
    async fn test_sharded_recording_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let (endpoint, mut received) = spawn_server().await;
        let blueprint = blueprint(dir.path(), endpoint, PoolMode::Sharded);
        let dispatcher = dispatcher(&blueprint, StaticResolver::empty());

        let cancel = CancellationToken::new();
        let pool = dispatcher.run(["Foo", "#bar", "foo"], cancel.clone()).await;
        assert_eq!(pool.shard_count(), 1);

        let mut sent = Vec::new();
        while sent.len() < 7 {
            sent.push(received.recv().await.unwrap());
        }
        assert_eq!(
            sent,
            [
                "USER justinfan0",
                "NICK justinfan0",
                "CAP REQ :twitch.tv/tags",
                "CAP REQ :twitch.tv/commands",
                "CAP REQ :twitch.tv/membership",
                "JOIN #foo",
                "JOIN #bar",
            ]
        );

        wait_for_records(dir.path(), 2).await;
        cancel.cancel();
        let report = pool.wait().await;

        assert_eq!(report.shards[0].outcome, ShardOutcome::Stopped);
        assert_eq!(report.connections_opened(), 1);
        assert_eq!(report.totals().joins_sent, 2);

        let logs = read_logs(dir.path());
        assert_eq!(logs.len(), 1);
        let log = &logs[0];
        assert!(log.trailing.is_empty());
        assert_eq!(log.records.len(), 2);
        assert!(log.records[0].line.ends_with(b"JOIN #foo\r\n"));
        assert!(log.records[1].line.ends_with(b"JOIN #bar\r\n"));
        assert!(log.marker <= log.records[0].timestamp);
        assert!(log.records[0].timestamp <= log.records[1].timestamp);
    }

    #[tokio::test]
    async fn test_direct_mode_opens_one_file_per_channel() {
        let dir = tempfile::tempdir().unwrap();
        let (endpoint, mut received) = spawn_server().await;
        let blueprint = blueprint(dir.path(), endpoint.clone(), PoolMode::Direct);
        let resolver = StaticResolver::new(endpoint).reject("gone");
        let dispatcher = dispatcher(&blueprint, resolver);

        let cancel = CancellationToken::new();
        let pool = dispatcher.run(["alpha", "gone", "beta"], cancel.clone()).await;
        assert_eq!(pool.shard_count(), 2);

        let mut joins = Vec::new();
        while joins.len() < 2 {
            let line = received.recv().await.unwrap();
            if line.starts_with("JOIN ") {
                joins.push(line);
            }
        }
        joins.sort();
        assert_eq!(joins, ["JOIN #alpha", "JOIN #beta"]);

        wait_for_records(dir.path(), 2).await;
        pool.shutdown();
        let report = pool.wait().await;

        assert!(!report.all_failed());
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].channel.as_str(), "gone");

        let logs = read_logs(dir.path());
        assert_eq!(logs.len(), 2);
        for log in &logs {
            assert_eq!(log.records.len(), 1);
            assert!(log.trailing.is_empty());
        }
    }
}
