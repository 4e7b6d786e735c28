//! Device handshake: find the port the telemetry receiver is connected to
//!
//! After reset the receiver sends one identification line. Each candidate
//! port is opened in turn and its first line compared to the expected one.

use crossbeam::channel::bounded;
use log::{debug, info, warn};
use sigmundr_types::{Result, TelemetryError};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::time::Duration;

use crate::config::LinkConfig;

/// Access to the serial ports of the host
pub trait PortProbe {
    /// Names of the candidate ports
    fn list_ports(&mut self) -> io::Result<Vec<String>>;

    /// Open `port` at `baud_rate` and read its first line, waiting at most `timeout`
    fn read_first_line(
        &mut self,
        port: &str,
        baud_rate: u32,
        timeout: Duration,
    ) -> io::Result<Vec<u8>>;
}

/// Probe over device paths named by the operator, e.g. `/dev/ttyUSB0`.
///
/// Ports are opened as plain files, so the line settings (baud rate
/// included) must already be applied to the device.
pub struct PathProbe {
    ports: Vec<String>,
}

impl PathProbe {
    pub fn new<I, S>(ports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ports: ports.into_iter().map(Into::into).collect(),
        }
    }
}

impl PortProbe for PathProbe {
    fn list_ports(&mut self) -> io::Result<Vec<String>> {
        Ok(self.ports.clone())
    }

    fn read_first_line(
        &mut self,
        port: &str,
        baud_rate: u32,
        timeout: Duration,
    ) -> io::Result<Vec<u8>> {
        debug!("{port}: expecting {baud_rate} baud");
        let file = File::open(port)?;

        // A silent device blocks the read; the thread is left behind on timeout
        let (sender, receiver) = bounded(1);
        std::thread::spawn(move || {
            let mut line = Vec::with_capacity(64);
            let result = BufReader::new(file)
                .read_until(b'\n', &mut line)
                .map(|_| line);
            let _ = sender.send(result);
        });

        receiver.recv_timeout(timeout).unwrap_or_else(|_| {
            Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("no line within {} ms", timeout.as_millis()),
            ))
        })
    }
}

/// [`find_device`] with the identification line, speed and timeout of `link`
pub fn find_link_device<P: PortProbe + ?Sized>(
    probe: &mut P,
    link: &LinkConfig,
) -> Result<String> {
    find_device(
        probe,
        &link.bonjour,
        link.baud_rate,
        link.handshake_timeout(),
    )
}

/// Return the first port whose first line is exactly `bonjour`
///
/// Ports that fail to open or read are skipped. There is no retry.
pub fn find_device<P: PortProbe + ?Sized>(
    probe: &mut P,
    bonjour: &str,
    baud_rate: u32,
    timeout: Duration,
) -> Result<String> {
    let ports = probe.list_ports()?;
    info!("Searching for the telemetry receiver on: {}", ports.join(", "));

    for port in ports {
        debug!("Testing {port}...");
        match probe.read_first_line(&port, baud_rate, timeout) {
            Ok(line) if strip_line_ending(&line) == bonjour.as_bytes() => {
                info!("Found telemetry device on port {port}");
                return Ok(port);
            }
            Ok(line) => debug!(
                "{port}: unexpected first line {:?}",
                String::from_utf8_lossy(&line)
            ),
            Err(e) => warn!("{port}: {e}"),
        }
    }

    warn!("Failed to find the telemetry device");
    Err(TelemetryError::HandshakeNotFound(bonjour.to_string()))
}

/// Drop a trailing `\n` or `\r\n`
pub(crate) fn strip_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
