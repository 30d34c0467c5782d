//! Serial link
//!
//! Owns the open connection and the background reader that drains it into
//! a bounded byte queue. The reader is the only producer; the command thread
//! is the only consumer.

use flume::{Receiver, Sender};
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

use super::{
    serial::{clear_buffers, open_port, resolve_device_path},
    CommunicationChannel, SerialChannel, TransportError, POLL_INTERVAL_MS, READ_BUF_SIZE,
};

/// Bytes removed from the queue in one drain, plus the latched error if the
/// reader had stopped.
#[derive(Debug, Default)]
pub struct Drained {
    /// Bytes in arrival order
    pub bytes: Vec<u8>,
    /// Error that stopped the reader, reported once
    pub error: Option<TransportError>,
}

/// An open connection to the adapter
pub struct SerialLink {
    /// Device path (or a label for non-serial channels)
    path: String,
    /// Write half; the reader thread owns a clone
    writer: Box<dyn CommunicationChannel>,
    /// Bytes received but not yet consumed
    bytes: Receiver<u8>,
    /// Sticky terminal error slot, holds at most one error
    errors: Receiver<TransportError>,
    stop: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl SerialLink {
    /// Open the adapter at `path` (empty selects the platform default)
    pub fn open(path: &str, queue_capacity: usize) -> Result<Self, TransportError> {
        let path = resolve_device_path(path);
        let mut port = open_port(&path)?;
        clear_buffers(port.as_mut())?;

        let channel = SerialChannel::new(port);
        info!(
            "Opened {} ({})",
            path,
            channel.name().unwrap_or_else(|| "unnamed".to_string())
        );
        Self::from_channel(path, Box::new(channel), queue_capacity)
    }

    /// Run the link over an already-open channel
    pub fn from_channel(
        path: impl Into<String>,
        channel: Box<dyn CommunicationChannel>,
        queue_capacity: usize,
    ) -> Result<Self, TransportError> {
        let path = path.into();
        let mut reader_channel = channel
            .try_clone()
            .map_err(|e| TransportError::SerialError(e.to_string()))?;
        reader_channel
            .set_timeout(Duration::from_millis(POLL_INTERVAL_MS))
            .map_err(|e| TransportError::SerialError(e.to_string()))?;

        // Bounded: a full queue blocks the reader instead of dropping bytes.
        let (byte_tx, byte_rx) = flume::bounded(queue_capacity.max(1));
        let (err_tx, err_rx) = flume::bounded(1);
        let stop = Arc::new(AtomicBool::new(false));

        let reader_stop = Arc::clone(&stop);
        let reader = thread::Builder::new()
            .name("buspirate-reader".to_string())
            .spawn(move || run_reader(reader_channel, byte_tx, err_tx, reader_stop))
            .map_err(|e| TransportError::SerialError(e.to_string()))?;

        Ok(Self {
            path,
            writer: channel,
            bytes: byte_rx,
            errors: err_rx,
            stop,
            reader: Some(reader),
        })
    }

    /// Device path this link was opened on
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Write all of `data` to the adapter
    pub fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        self.writer.write_all(data).map_err(TransportError::Write)?;
        self.writer.flush().map_err(TransportError::Write)?;
        trace!("wrote {} bytes: {:02x?}", data.len(), data);
        Ok(data.len())
    }

    /// Number of bytes waiting in the queue
    pub fn pending(&self) -> usize {
        self.bytes.len()
    }

    /// Take everything queued right now without waiting
    ///
    /// The latched error is handed out once; bytes queued before it keep
    /// draining on later calls.
    pub fn drain(&self) -> Drained {
        let error = self.errors.try_recv().ok();
        let available = self.bytes.len();
        let bytes: Vec<u8> = self.bytes.try_iter().take(available).collect();
        if let Some(e) = &error {
            warn!("Reader stopped: {}", e);
        }
        Drained { bytes, error }
    }

    /// Stop the reader thread and wait for it to exit
    pub fn close(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.reader.take() {
            // Keep draining so a reader blocked on a full queue can observe the flag.
            while !handle.is_finished() {
                let _ = self.bytes.try_iter().count();
                thread::sleep(Duration::from_millis(POLL_INTERVAL_MS));
            }
            if handle.join().is_err() {
                warn!("Reader thread for {} panicked", self.path);
            }
        }
        debug!("Closed {}", self.path);
    }
}

impl Drop for SerialLink {
    fn drop(&mut self) {
        // The reader exits on its next poll, or as soon as its send fails.
        self.stop.store(true, Ordering::Relaxed);
    }
}

fn run_reader(
    mut channel: Box<dyn CommunicationChannel>,
    bytes: Sender<u8>,
    errors: Sender<TransportError>,
    stop: Arc<AtomicBool>,
) {
    let mut buf = [0u8; READ_BUF_SIZE];
    debug!("Starting reader");

    while !stop.load(Ordering::Relaxed) {
        match channel.read(&mut buf) {
            Ok(0) => {
                let _ = errors.send(TransportError::Closed);
                return;
            }
            Ok(n) => {
                trace!("reader {}: {:02x?}", n, &buf[..n]);
                for &b in &buf[..n] {
                    if bytes.send(b).is_err() {
                        debug!("Queue dropped, reader exiting");
                        return;
                    }
                }
            }
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) => {}
            Err(e) => {
                let _ = errors.send(TransportError::Read(e));
                return;
            }
        }
    }

    debug!("Reader stopped on request");
}
