//! Queue diagnostics.
//!
//! AQM queues report every admission and departure to an optional
//! [`QueueObserver`]. [`WriteBehindLog`] is the file-backed observer: the
//! queue only formats a line and hands it to a channel, and a dedicated
//! writer thread batches the lines into the file. Nothing on the packet
//! path ever touches the filesystem.

use log::{debug, warn};
use parking_lot::Mutex;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use std::time::Instant;
use tokio::sync::mpsc;

/// Something that happened to a queue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QueueEvent {
    /// A packet was admitted.
    Enqueued {
        /// Occupancy after the admission.
        occupancy: usize,
        /// Average occupancy the AQM computed for this admission.
        average: f64,
        /// Marking probability applied to this admission.
        probability: f64,
        /// Whether the admitted packet was marked.
        marked: bool,
    },
    /// A packet left for the wire.
    Dequeued {
        /// Occupancy after the departure.
        occupancy: usize,
    },
}

/// Receives queue events. Implementations must not block.
pub trait QueueObserver: Send + Sync {
    fn record(&self, event: QueueEvent);
}

/// Tab-separated queue log written behind the packet path.
///
/// Each line starts with a record tag and the milliseconds elapsed since
/// the log was opened:
///
/// ```text
/// Q  <ms>  <occupancy>  <average>  <probability>
/// M  <ms>  <occupancy>  <average>
/// D  <ms>  <occupancy>
/// ```
///
/// An `M` line always follows the `Q` line of the admission it marks.
pub struct WriteBehindLog {
    path: PathBuf,
    opened: Instant,
    lines: Mutex<Option<mpsc::UnboundedSender<String>>>,
    writer: Mutex<Option<JoinHandle<io::Result<()>>>>,
}

impl WriteBehindLog {
    /// Create (or truncate) the log file and start its writer thread.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        let (tx, rx) = mpsc::unbounded_channel();
        let writer = std::thread::Builder::new()
            .name("queue-log".to_string())
            .spawn(move || write_lines(rx, file))?;

        debug!("Queue log opened at {}", path.display());
        Ok(Self {
            path,
            opened: Instant::now(),
            lines: Mutex::new(Some(tx)),
            writer: Mutex::new(Some(writer)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stop accepting events and wait until everything queued so far is on disk.
    ///
    /// Later calls return immediately.
    pub fn close(&self) -> io::Result<()> {
        // Dropping the sender ends the writer loop once the channel is drained.
        self.lines.lock().take();
        let Some(writer) = self.writer.lock().take() else {
            return Ok(());
        };
        writer
            .join()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "queue log writer panicked"))?
    }

    /// Whether events still reach the writer thread.
    pub fn is_open(&self) -> bool {
        self.lines.lock().is_some()
    }

    fn push(&self, line: String) {
        let mut lines = self.lines.lock();
        let Some(sender) = lines.as_ref() else {
            return;
        };
        if sender.send(line).is_err() {
            // The writer stopped on an I/O error; close() reports it.
            warn!(
                "Queue log {} stopped writing, dropping further events",
                self.path.display()
            );
            lines.take();
        }
    }
}

impl QueueObserver for WriteBehindLog {
    fn record(&self, event: QueueEvent) {
        let ms = self.opened.elapsed().as_millis();
        match event {
            QueueEvent::Enqueued {
                occupancy,
                average,
                probability,
                marked,
            } => {
                self.push(format!("Q\t{ms}\t{occupancy}\t{average}\t{probability}"));
                if marked {
                    self.push(format!("M\t{ms}\t{occupancy}\t{average}"));
                }
            }
            QueueEvent::Dequeued { occupancy } => {
                self.push(format!("D\t{ms}\t{occupancy}"));
            }
        }
    }
}

impl Drop for WriteBehindLog {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to flush queue log {}: {}", self.path.display(), e);
        }
    }
}

fn write_lines(mut rx: mpsc::UnboundedReceiver<String>, file: File) -> io::Result<()> {
    let mut out = BufWriter::new(file);
    while let Some(line) = rx.blocking_recv() {
        writeln!(out, "{line}")?;
        // Take whatever else is already waiting before paying for a flush.
        while let Ok(line) = rx.try_recv() {
            writeln!(out, "{line}")?;
        }
        out.flush()?;
    }
    out.flush()
}
