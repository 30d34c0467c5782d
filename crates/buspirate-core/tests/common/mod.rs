//! Simulated adapter shared by the integration tests
#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use buspirate_core::protocol::{CommunicationChannel, SerialLink, TimedExchange};
use buspirate_core::{BusPirate, BusPirateConfig, TimeoutConfig};

pub const PROMPT: &[u8] = b"\r\nHiZ>";

type Responder = Box<dyn FnMut(&[u8]) -> Vec<u8> + Send>;

struct DeviceState {
    pending: VecDeque<u8>,
    writes: Vec<Vec<u8>>,
    responder: Responder,
    closed: bool,
    read_error: Option<io::ErrorKind>,
}

type Shared = Arc<(Mutex<DeviceState>, Condvar)>;

/// A fake adapter: every write is handed to a responder closure whose
/// output becomes readable immediately.
#[derive(Clone)]
pub struct SimulatedDevice {
    state: Shared,
}

impl SimulatedDevice {
    pub fn new(responder: impl FnMut(&[u8]) -> Vec<u8> + Send + 'static) -> Self {
        let state = DeviceState {
            pending: VecDeque::new(),
            writes: Vec::new(),
            responder: Box::new(responder),
            closed: false,
            read_error: None,
        };
        Self {
            state: Arc::new((Mutex::new(state), Condvar::new())),
        }
    }

    /// A device that never answers anything
    pub fn silent() -> Self {
        Self::new(|_| Vec::new())
    }

    pub fn channel(&self) -> Box<dyn CommunicationChannel> {
        Box::new(SimChannel {
            state: Arc::clone(&self.state),
            timeout: Duration::from_millis(10),
        })
    }

    /// Every write received so far, one entry per command
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state.0.lock().unwrap().writes.clone()
    }

    pub fn write_count(&self) -> usize {
        self.state.0.lock().unwrap().writes.len()
    }

    /// Make unsolicited bytes readable
    pub fn push(&self, bytes: &[u8]) {
        let (lock, cvar) = &*self.state;
        lock.lock().unwrap().pending.extend(bytes);
        cvar.notify_all();
    }

    /// End of stream once pending bytes are consumed
    pub fn close(&self) {
        let (lock, cvar) = &*self.state;
        lock.lock().unwrap().closed = true;
        cvar.notify_all();
    }

    /// Fail reads with `kind` once pending bytes are consumed
    pub fn fail_reads(&self, kind: io::ErrorKind) {
        let (lock, cvar) = &*self.state;
        lock.lock().unwrap().read_error = Some(kind);
        cvar.notify_all();
    }
}

struct SimChannel {
    state: Shared,
    timeout: Duration,
}

impl Read for SimChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock().unwrap();
        if state.pending.is_empty() && !state.closed && state.read_error.is_none() {
            state = cvar.wait_timeout(state, self.timeout).unwrap().0;
        }
        if !state.pending.is_empty() {
            let n = buf.len().min(state.pending.len());
            for (slot, byte) in buf.iter_mut().zip(state.pending.drain(..n)) {
                *slot = byte;
            }
            return Ok(n);
        }
        if state.closed {
            return Ok(0);
        }
        if let Some(kind) = state.read_error {
            return Err(io::Error::new(kind, "simulated read failure"));
        }
        Err(io::Error::new(io::ErrorKind::TimedOut, "no data"))
    }
}

impl Write for SimChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock().unwrap();
        if state.closed {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device gone"));
        }
        state.writes.push(buf.to_vec());
        let reply = (state.responder)(buf);
        state.pending.extend(reply);
        cvar.notify_all();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl CommunicationChannel for SimChannel {
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.timeout = timeout;
        Ok(())
    }

    fn try_clone(&self) -> io::Result<Box<dyn CommunicationChannel>> {
        Ok(Box::new(SimChannel {
            state: Arc::clone(&self.state),
            timeout: self.timeout,
        }))
    }
}

/// Short timeouts so the handshakes run quickly against the simulator
pub fn test_config() -> BusPirateConfig {
    BusPirateConfig {
        device: String::new(),
        timeouts: TimeoutConfig {
            short_ms: 15,
            reset_ms: 30,
        },
        queue_capacity: 256,
    }
}

pub fn connect(device: &SimulatedDevice) -> BusPirate {
    init_tracing();
    BusPirate::from_channel("sim", device.channel(), &test_config()).unwrap()
}

pub fn exchange(device: &SimulatedDevice) -> TimedExchange {
    init_tracing();
    let config = test_config();
    let link = SerialLink::from_channel("sim", device.channel(), config.queue_capacity).unwrap();
    TimedExchange::new(link, config.timeouts)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SimMode {
    Console,
    Bitbang,
    I2c,
}

/// Responder modelling a well-behaved adapter
///
/// `devices` are the 7-bit addresses that acknowledge on the bus; each one
/// answers both its write and read variant.
pub fn bus_pirate(devices: &[u8]) -> impl FnMut(&[u8]) -> Vec<u8> + Send + 'static {
    let devices = devices.to_vec();
    let mut mode = SimMode::Console;

    move |cmd: &[u8]| -> Vec<u8> {
        match (mode, cmd) {
            (SimMode::Console, [0x0D]) => PROMPT.to_vec(),
            (SimMode::Console, [b'#', 0x0D]) => PROMPT.to_vec(),
            (SimMode::Console | SimMode::Bitbang, [0x00]) => {
                mode = SimMode::Bitbang;
                b"BBIO1".to_vec()
            }
            (SimMode::Bitbang, [0x01]) => b"BBIO1".to_vec(),
            (SimMode::Bitbang, [0x02]) => {
                mode = SimMode::I2c;
                b"I2C1".to_vec()
            }
            (SimMode::Bitbang | SimMode::I2c, [0x0F]) => {
                mode = SimMode::Console;
                vec![0x01]
            }
            (SimMode::Bitbang, [0x10]) => b"short ok".to_vec(),
            (SimMode::Bitbang, [0x11]) => b"long ok".to_vec(),
            (SimMode::Bitbang, [op]) if op & 0xC0 == 0x40 || op & 0x80 == 0x80 => vec![0x01],
            (SimMode::I2c, [0x02 | 0x03 | 0x06 | 0x07]) => vec![0x01],
            (SimMode::I2c, [0x04]) => vec![0xA5],
            (SimMode::I2c, [op]) if op & 0xF0 == 0x40 || op & 0xF0 == 0x60 => vec![0x01],
            (SimMode::I2c, [op, rest @ ..]) if op & 0xF0 == 0x10 => {
                let mut reply = vec![*op];
                for (i, byte) in rest.iter().enumerate() {
                    let ack = if i == 0 { devices.contains(&(byte >> 1)) } else { true };
                    reply.push(if ack { 0x00 } else { 0x01 });
                }
                reply
            }
            _ => Vec::new(),
        }
    }
}
