//! Ingestion worker and transport readers
//!
//! Readers run on their own threads and push raw lines or frames into a
//! channel. A single worker thread drains the channel and applies each input
//! to the shared session under one write lock.

use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, error, info, trace, warn};
use sigmundr_core::{write_session, SharedSession};
use sigmundr_types::TelemetryError;
use std::io::{self, BufRead, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use super::handshake::strip_line_ending;

/// Raw input from the link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireInput {
    /// One ASCII line, without its terminator
    Line(Vec<u8>),
    /// One composite binary frame
    Frame(Vec<u8>),
}

/// Background thread feeding a shared session
pub struct IngestionWorker {
    sender: Option<Sender<WireInput>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl IngestionWorker {
    /// Spawn the worker. `read_timeout` bounds how late a stop request is seen.
    pub fn start(session: SharedSession, read_timeout: Duration) -> Self {
        let (sender, receiver) = unbounded::<WireInput>();
        let stop = Arc::new(AtomicBool::new(false));

        write_session(&session).set_reading(true);
        let thread_stop = stop.clone();
        let handle = std::thread::spawn(move || {
            run(&session, &receiver, &thread_stop, read_timeout);
            let mut session = write_session(&session);
            session.flush();
            session.set_reading(false);
            debug!("Ingestion worker exiting");
        });

        Self {
            sender: Some(sender),
            stop,
            handle: Some(handle),
        }
    }

    /// New handle for a reader to send inputs with
    pub fn sender(&self) -> Option<Sender<WireInput>> {
        self.sender.clone()
    }

    /// Flag readers can share to stop together with the worker
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Wait until every sender is gone and the queued inputs are applied
    pub fn finish(mut self) {
        self.sender = None;
        self.join();
    }

    /// Ask the worker to stop after the current input and wait for it.
    /// Inputs still queued are dropped.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        self.sender = None;
        self.join();
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.join() {
                warn!("Ingestion worker panicked: {:?}", e);
            }
        }
    }
}

impl Drop for IngestionWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(
    session: &SharedSession,
    receiver: &Receiver<WireInput>,
    stop: &AtomicBool,
    read_timeout: Duration,
) {
    while !stop.load(Ordering::Relaxed) {
        match receiver.recv_timeout(read_timeout) {
            Ok(WireInput::Line(line)) => {
                if let Err(e) = write_session(session).process_line(&line) {
                    log_dropped("line", &e);
                }
            }
            Ok(WireInput::Frame(frame)) => {
                let report = write_session(session).process_frame(&frame);
                for (sensor, e) in &report.errors {
                    log_dropped(sensor, e);
                }
                trace!(
                    "Frame of {} bytes: {} row(s), {} error(s)",
                    frame.len(),
                    report.total_rows(),
                    report.errors.len()
                );
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                info!("Link closed");
                break;
            }
        }
    }
}

/// Log a dropped input: warning when recoverable, error otherwise
fn log_dropped(what: &str, e: &TelemetryError) {
    if e.is_recoverable() {
        warn!("Dropped {what}: {e}");
    } else {
        error!("Dropped {what}: {e}");
    }
}

/// Read newline-terminated lines from `reader` on a new thread.
///
/// Ends at end of input, on a stop request or when the worker is gone.
/// Returns the number of lines sent.
pub fn spawn_line_reader<R>(
    mut reader: R,
    sender: Sender<WireInput>,
    stop: Arc<AtomicBool>,
) -> JoinHandle<io::Result<u64>>
where
    R: BufRead + Send + 'static,
{
    std::thread::spawn(move || {
        let mut sent = 0;
        let mut buffer = Vec::with_capacity(256);
        while !stop.load(Ordering::Relaxed) {
            buffer.clear();
            if reader.read_until(b'\n', &mut buffer)? == 0 {
                break;
            }
            let line = strip_line_ending(&buffer).to_vec();
            if sender.send(WireInput::Line(line)).is_err() {
                break;
            }
            sent += 1;
        }
        Ok(sent)
    })
}

/// Read fixed-length frames from `reader` on a new thread.
///
/// A trailing partial frame is still sent; the decoder handles short frames.
/// Returns the number of frames sent.
pub fn spawn_frame_reader<R>(
    mut reader: R,
    frame_len: usize,
    sender: Sender<WireInput>,
    stop: Arc<AtomicBool>,
) -> JoinHandle<io::Result<u64>>
where
    R: Read + Send + 'static,
{
    std::thread::spawn(move || {
        let mut sent = 0;
        while !stop.load(Ordering::Relaxed) {
            let frame = read_frame(&mut reader, frame_len)?;
            if frame.is_empty() {
                break;
            }
            let complete = frame.len() == frame_len;
            if sender.send(WireInput::Frame(frame)).is_err() {
                break;
            }
            sent += 1;
            if !complete {
                break;
            }
        }
        Ok(sent)
    })
}

/// Fill up to `frame_len` bytes, stopping early at end of input
fn read_frame<R: Read>(reader: &mut R, frame_len: usize) -> io::Result<Vec<u8>> {
    let mut frame = vec![0u8; frame_len];
    let mut filled = 0;
    while filled < frame_len {
        match reader.read(&mut frame[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    frame.truncate(filled);
    Ok(frame)
}
