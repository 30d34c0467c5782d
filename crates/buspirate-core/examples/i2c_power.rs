//! Bus Pirate I2C bring-up tool
//!
//! Powers the target, enables pull-ups, scans the bus and prints every
//! address that acknowledged, then switches power and pull-ups off again.
//!
//! Usage:
//!   cargo run --example i2c_power -- [PORT]
//!
//! With no PORT the platform default device path is used. Set RUST_LOG=debug
//! (or trace) to watch the handshakes.

use anyhow::{Context, Result};
use buspirate_core::protocol::{default_device_path, list_ports};
use buspirate_core::{BusPirate, BusPirateConfig};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let device = std::env::args().nth(1).unwrap_or_default();

    println!("=== Bus Pirate I2C Power Test ===");
    println!(
        "Port: {}",
        if device.is_empty() {
            default_device_path()
        } else {
            device.as_str()
        }
    );
    for port in list_ports() {
        let marker = if port.is_likely_adapter() { " (adapter?)" } else { "" };
        println!("  available: {}{}", port.name, marker);
    }
    println!();

    let mut bp = BusPirate::open(&BusPirateConfig::with_device(device))
        .context("failed to open the adapter")?;

    {
        let mut i2c = bp.i2c().context("failed to enter I2C mode")?;
        i2c.power(true)?;
        i2c.pullups(true)?;

        let found = i2c.scan();
        if found.is_empty() {
            println!("No devices acknowledged.");
        } else {
            println!("Acknowledged addresses:");
            for addr in &found {
                let dir = if addr & 1 == 1 { "read" } else { "write" };
                println!("  {:#04x} (7-bit {:#04x}, {})", addr, addr >> 1, dir);
            }
        }

        i2c.pullups(false)?;
        i2c.power(false)?;
    }

    bp.close();
    Ok(())
}
