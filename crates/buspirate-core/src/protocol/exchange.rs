//! Timed request/response exchange
//!
//! The adapter's protocol has no framing: a response is whatever arrives
//! within the read timeout after a command is written. Everything here
//! relies on that timeout being long enough for the device to finish.

use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::{Drained, SerialLink, TransportError};
use crate::config::TimeoutConfig;
use crate::error::BusPirateError;

/// A transport failure together with the bytes collected before it
#[derive(Error, Debug)]
#[error("{source} (after receiving {} bytes)", .received.len())]
pub struct ExchangeError {
    /// Bytes collected before the failure
    pub received: Vec<u8>,
    /// What went wrong
    #[source]
    pub source: TransportError,
}

impl ExchangeError {
    fn new(received: Vec<u8>, source: TransportError) -> Self {
        Self { received, source }
    }
}

/// Write-then-collect primitive over a [`SerialLink`]
///
/// Exchanges take `&mut self`; callers that share one adapter must
/// serialize access themselves.
pub struct TimedExchange {
    link: SerialLink,
    timeouts: TimeoutConfig,
    read_timeout: Duration,
}

impl TimedExchange {
    /// Exchange over `link`, starting at the short timeout
    pub fn new(link: SerialLink, timeouts: TimeoutConfig) -> Self {
        Self {
            link,
            read_timeout: timeouts.short(),
            timeouts,
        }
    }

    /// Timeout presets this exchange was built with
    pub fn timeouts(&self) -> &TimeoutConfig {
        &self.timeouts
    }

    /// Current read timeout
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Override the read timeout until the next restore
    pub fn set_read_timeout(&mut self, timeout: Duration) {
        self.read_timeout = timeout;
    }

    /// Put the read timeout back to the short preset
    pub fn restore_read_timeout(&mut self) {
        self.read_timeout = self.timeouts.short();
    }

    /// Underlying link
    pub fn link(&self) -> &SerialLink {
        &self.link
    }

    /// Release the underlying link
    pub fn into_link(self) -> SerialLink {
        self.link
    }

    /// Remove everything currently queued, surfacing a latched reader error once
    pub fn drain_available(&mut self) -> Result<Vec<u8>, ExchangeError> {
        let Drained { bytes, error } = self.link.drain();
        match error {
            Some(e) => Err(ExchangeError::new(bytes, e)),
            None => Ok(bytes),
        }
    }

    /// Drain, wait out the read timeout, then drain again
    pub fn read_with_timeout(&mut self) -> Result<Vec<u8>, ExchangeError> {
        let mut res = self.drain_available()?;

        if !self.read_timeout.is_zero() {
            thread::sleep(self.read_timeout);
            match self.drain_available() {
                Ok(more) => res.extend(more),
                Err(mut e) => {
                    res.append(&mut e.received);
                    return Err(ExchangeError::new(res, e.source));
                }
            }
        }

        Ok(res)
    }

    /// Write `cmd` and collect the response
    pub fn write_read(&mut self, cmd: &[u8]) -> Result<Vec<u8>, ExchangeError> {
        debug!("write_read: {:02x?}", cmd);
        self.link
            .write(cmd)
            .map_err(|e| ExchangeError::new(Vec::new(), e))?;

        let bytes = self.read_with_timeout()?;
        debug!("write_read: got {} bytes: {:?}", bytes.len(), String::from_utf8_lossy(&bytes));
        Ok(bytes)
    }

    /// Write `cmd` and report whether the response starts with `expected`
    ///
    /// An empty `expected` always matches.
    pub fn write_read_check(
        &mut self,
        cmd: &[u8],
        expected: &[u8],
    ) -> Result<(Vec<u8>, bool), ExchangeError> {
        let bytes = self.write_read(cmd)?;
        let found = response_matches(&bytes, expected);
        debug!(
            "write_read_check: expected {:?}, found={}",
            String::from_utf8_lossy(expected),
            found
        );
        Ok((bytes, found))
    }

    /// Like [`write_read_check`](Self::write_read_check) but a miss is an error
    pub fn write_find(&mut self, cmd: &[u8], expected: &[u8]) -> Result<Vec<u8>, BusPirateError> {
        let (bytes, found) = self.write_read_check(cmd, expected)?;
        if found {
            Ok(bytes)
        } else {
            Err(BusPirateError::PatternNotFound {
                expected: expected.to_vec(),
                received: bytes,
            })
        }
    }
}

/// Prefix match used by every handshake
pub fn response_matches(response: &[u8], expected: &[u8]) -> bool {
    expected.is_empty() || response.starts_with(expected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_expected_always_matches() {
        assert!(response_matches(b"", b""));
        assert!(response_matches(b"garbage", b""));
    }

    #[test]
    fn test_short_response_never_matches() {
        assert!(!response_matches(b"BBI", b"BBIO1"));
        assert!(!response_matches(b"", &[0x01]));
    }

    #[test]
    fn test_prefix_match() {
        assert!(response_matches(b"BBIO1BBIO1", b"BBIO1"));
        assert!(response_matches(b"\r\nHiZ>\r\nHiZ>", b"\r\nHiZ>"));
        assert!(!response_matches(b"xBBIO1", b"BBIO1"));
    }

    #[test]
    fn test_exchange_error_display_mentions_partial_bytes() {
        let err = ExchangeError::new(vec![1, 2, 3], TransportError::Closed);
        assert_eq!(
            err.to_string(),
            "Connection closed by device (after receiving 3 bytes)"
        );
    }
}
