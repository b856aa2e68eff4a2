//! Framer - splits raw reads on line terminators
//!
//! The framer never parses or buffers payload. Each physical read is cut
//! into terminated `Line` segments and at most one trailing `Partial`
//! segment; the caller persists both immediately and emits one timestamp
//! per `Line`.

use contracts::{Clock, ContractError, RecordSink};
use tracing::trace;

/// Protocol line terminator (ASCII LF).
pub const LINE_TERMINATOR: u8 = b'\n';

/// One slice of a physical read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Bytes up to and including a terminator
    Line(&'a [u8]),
    /// Bytes after the last terminator of the read
    Partial(&'a [u8]),
}

impl<'a> Segment<'a> {
    pub fn bytes(&self) -> &'a [u8] {
        match self {
            Segment::Line(b) | Segment::Partial(b) => b,
        }
    }
}

/// Line boundary tracker for one connection.
#[derive(Debug, Default)]
pub struct Framer {
    /// Unterminated bytes written since the last terminator
    pending: usize,
    /// Terminators observed so far
    lines: u64,
}

impl Framer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unterminated bytes already persisted but not yet closed by a terminator.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Number of terminators seen.
    pub fn lines(&self) -> u64 {
        self.lines
    }

    /// Cut one physical read into segments, in stream order.
    pub fn segments<'f, 'c>(&'f mut self, chunk: &'c [u8]) -> Segments<'f, 'c> {
        Segments {
            framer: self,
            chunk,
            pos: 0,
        }
    }
}

/// Iterator returned by [`Framer::segments`].
pub struct Segments<'f, 'c> {
    framer: &'f mut Framer,
    chunk: &'c [u8],
    pos: usize,
}

impl<'c> Iterator for Segments<'_, 'c> {
    type Item = Segment<'c>;

    fn next(&mut self) -> Option<Self::Item> {
        let chunk: &'c [u8] = self.chunk;
        let rest = chunk.get(self.pos..).filter(|r| !r.is_empty())?;

        match rest.iter().position(|&b| b == LINE_TERMINATOR) {
            Some(idx) => {
                let end = idx + 1;
                self.pos += end;
                self.framer.pending = 0;
                self.framer.lines += 1;
                Some(Segment::Line(&rest[..end]))
            }
            None => {
                self.pos = chunk.len();
                self.framer.pending += rest.len();
                Some(Segment::Partial(rest))
            }
        }
    }
}

/// Counters for one recorded read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkStats {
    /// Terminated lines (= timestamps written)
    pub lines: u64,
    /// Bytes written, excluding timestamps
    pub bytes: u64,
    /// Bytes of the unterminated tail written without a timestamp
    pub partial_bytes: u64,
}

/// Persist one physical read: every line followed by its timestamp, then
/// the unterminated tail (if any) as-is.
///
/// The timestamp is captured as soon as the terminator is found.
pub async fn record_chunk<S, C>(
    framer: &mut Framer,
    chunk: &[u8],
    sink: &mut S,
    clock: &C,
) -> Result<ChunkStats, ContractError>
where
    S: RecordSink,
    C: Clock + ?Sized,
{
    let mut stats = ChunkStats::default();

    for segment in framer.segments(chunk) {
        match segment {
            Segment::Line(line) => {
                let nanos = clock.now_nanos();
                sink.write_line(line).await?;
                sink.write_timestamp(nanos).await?;
                stats.lines += 1;
                stats.bytes += line.len() as u64;
            }
            Segment::Partial(tail) => {
                sink.write_line(tail).await?;
                stats.bytes += tail.len() as u64;
                stats.partial_bytes += tail.len() as u64;
            }
        }
    }

    trace!(
        sink = sink.name(),
        lines = stats.lines,
        bytes = stats.bytes,
        partial = stats.partial_bytes,
        "Chunk recorded"
    );

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::decode;
    use crate::{ManualClock, MemorySink};

    #[test]
    fn test_single_read_multiple_lines() {
        let mut framer = Framer::new();
        let segs: Vec<_> = framer.segments(b"PING :a\r\nPING :b\r\n").collect();
        assert_eq!(
            segs,
            vec![
                Segment::Line(b"PING :a\r\n"),
                Segment::Line(b"PING :b\r\n")
            ]
        );
        assert_eq!(framer.lines(), 2);
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn test_tail_is_partial() {
        let mut framer = Framer::new();
        let segs: Vec<_> = framer.segments(b"abc\ndef").collect();
        assert_eq!(segs, vec![Segment::Line(b"abc\n"), Segment::Partial(b"def")]);
        assert_eq!(framer.pending(), 3);

        let segs: Vec<_> = framer.segments(b"gh").collect();
        assert_eq!(segs, vec![Segment::Partial(b"gh")]);
        assert_eq!(framer.pending(), 5);

        let segs: Vec<_> = framer.segments(b"\n").collect();
        assert_eq!(segs, vec![Segment::Line(b"\n")]);
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn test_empty_read_yields_nothing() {
        let mut framer = Framer::new();
        assert_eq!(framer.segments(b"").count(), 0);
    }

    #[tokio::test]
    async fn test_record_chunk_layout() {
        let clock = ManualClock::new(100);
        let (mut sink, log) = MemorySink::new("mem", 1);

        let mut framer = Framer::new();
        let stats = record_chunk(&mut framer, b"one\ntw", &mut sink, &clock)
            .await
            .unwrap();
        assert_eq!(stats.lines, 1);
        assert_eq!(stats.partial_bytes, 2);

        clock.advance(5);
        record_chunk(&mut framer, b"o\n", &mut sink, &clock)
            .await
            .unwrap();

        let mut expected = 1u64.to_le_bytes().to_vec();
        expected.extend_from_slice(b"one\n");
        expected.extend_from_slice(&100u64.to_le_bytes());
        expected.extend_from_slice(b"tw");
        expected.extend_from_slice(b"o\n");
        expected.extend_from_slice(&105u64.to_le_bytes());
        assert_eq!(log.bytes(), expected);
    }

    /// Any split of the stream concatenates back to the original bytes and
    /// produces exactly one timestamp per terminator.
    #[tokio::test]
    async fn test_arbitrary_splits_preserve_stream() {
        let stream: &[u8] =
            b":tmi.twitch.tv 001 justinfan0 :Welcome\r\nPING :tmi.twitch.tv\r\n@badge=1 :x PRIVMSG #a :hi\r\npartial";
        let terminators = stream.iter().filter(|&&b| b == b'\n').count();

        for split_every in [1usize, 2, 3, 7, 13, 64, stream.len()] {
            let clock = ManualClock::new(0);
            let (mut sink, log) = MemorySink::new("mem", 0);
            let mut framer = Framer::new();

            for chunk in stream.chunks(split_every) {
                record_chunk(&mut framer, chunk, &mut sink, &clock)
                    .await
                    .unwrap();
                clock.advance(1);
            }

            let decoded = decode(&log.bytes()).unwrap();
            let mut rebuilt: Vec<u8> = decoded
                .records
                .iter()
                .flat_map(|r| r.line.iter().copied())
                .collect();
            rebuilt.extend_from_slice(&decoded.trailing);

            assert_eq!(rebuilt, stream, "split_every={split_every}");
            assert_eq!(decoded.records.len(), terminators);
            assert!(decoded
                .records
                .windows(2)
                .all(|w| w[0].timestamp <= w[1].timestamp));
        }
    }
}
