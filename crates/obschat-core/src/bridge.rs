//! Output-to-stream bridge.
//!
//! Runs a blocking producer on tokio's blocking pool while exposing its
//! textual progress output as a lazy, line-oriented async sequence. The
//! producer writes through an injected [`ProgressWriter`]; a bounded channel
//! carries fragments across, and the consumer re-chunks them into complete
//! lines. If the producer fails, its error surfaces only after every
//! fragment written before the failure has been yielded.

use std::io::{self, Write};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Capacity of the producer-to-consumer channel. Bounds buffered memory when
/// the producer outruns the consumer; a full channel blocks the producer.
const CHANNEL_CAPACITY: usize = 256;

/// Writer handle given to the bridged producer.
///
/// Each write sends one text fragment over the channel, blocking while the
/// channel is full. Once the consumer is gone, writes fail with
/// `BrokenPipe`, which stops a producer from working into the void.
///
/// Byte writes may split a multibyte character anywhere; an internal carry
/// holds the incomplete tail until the following write completes it, so the
/// consumer sees the exact text the producer wrote.
pub struct ProgressWriter {
    tx: mpsc::Sender<String>,
    carry: Vec<u8>,
}

impl ProgressWriter {
    /// Send one text fragment. Empty fragments are dropped.
    pub fn write_str(&mut self, text: &str) -> io::Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        self.tx
            .blocking_send(text.to_string())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "output consumer dropped"))
    }
}

impl Write for ProgressWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.carry.extend_from_slice(buf);
        let mut text = String::new();
        loop {
            match std::str::from_utf8(&self.carry) {
                Ok(s) => {
                    text.push_str(s);
                    self.carry.clear();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    text.push_str(&String::from_utf8_lossy(&self.carry[..valid]));
                    match e.error_len() {
                        // Invalid sequence: replace it and move on.
                        Some(bad) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            self.carry.drain(..valid + bad);
                        }
                        // Incomplete trailing character: carry it into the
                        // next write.
                        None => {
                            self.carry.drain(..valid);
                            break;
                        }
                    }
                }
            }
        }
        self.write_str(&text)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.carry.is_empty() {
            let tail = String::from_utf8_lossy(&self.carry).into_owned();
            self.carry.clear();
            self.write_str(&tail)?;
        }
        Ok(())
    }
}

impl Drop for ProgressWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

/// Start `producer` on the blocking pool and return a stream of its output.
///
/// The producer receives a [`ProgressWriter`] by value; dropping it (or
/// returning) closes the channel, which lets the consumer distinguish
/// completion from a momentarily quiet producer. Dropping the returned
/// [`LineStream`] cancels cooperatively: the producer's next write fails
/// with `BrokenPipe`.
pub fn bridge<F>(producer: F) -> LineStream
where
    F: FnOnce(ProgressWriter) -> io::Result<()> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let writer = ProgressWriter {
        tx,
        carry: Vec::new(),
    };
    let handle = tokio::task::spawn_blocking(move || producer(writer));
    LineStream {
        rx,
        handle: Some(handle),
        buf: String::new(),
    }
}

/// Lazy line-oriented view of a bridged producer's output.
pub struct LineStream {
    rx: mpsc::Receiver<String>,
    handle: Option<JoinHandle<io::Result<()>>>,
    buf: String,
}

impl LineStream {
    /// Yield the next item: a complete line (terminator included), the final
    /// terminator-less remainder, or — only after all buffered output has
    /// been drained — the producer's error. `None` ends the sequence.
    pub async fn next_line(&mut self) -> Option<io::Result<String>> {
        loop {
            if let Some(pos) = self.buf.find('\n') {
                let line: String = self.buf.drain(..=pos).collect();
                return Some(Ok(line));
            }
            match self.rx.recv().await {
                Some(fragment) => self.buf.push_str(&fragment),
                None => {
                    // Channel closed: producer finished or dropped its
                    // writer. Flush the partial tail before reporting.
                    if !self.buf.is_empty() {
                        return Some(Ok(std::mem::take(&mut self.buf)));
                    }
                    let handle = self.handle.take()?;
                    return match handle.await {
                        Ok(Ok(())) => None,
                        Ok(Err(e)) => Some(Err(e)),
                        Err(join_err) => Some(Err(io::Error::other(format!(
                            "producer task panicked: {join_err}"
                        )))),
                    };
                }
            }
        }
    }

    /// Drain the remaining lines into one string, discarding any terminal
    /// error (callers that care about failure use `next_line` directly).
    pub async fn collect_remaining(&mut self) -> String {
        let mut out = String::new();
        while let Some(Ok(line)) = self.next_line().await {
            out.push_str(&line);
        }
        out
    }
}
