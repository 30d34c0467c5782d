mod common;

use buspirate_core::{BusPirateError, DeviceMode, ErrorKind};
use common::{bus_pirate, connect, SimulatedDevice, PROMPT};
use pretty_assertions::assert_eq;

const ACK: &[u8] = &[0x01];

/// Adapter that accepts the handshake but rejects every pin command
fn rejecting_device() -> SimulatedDevice {
    SimulatedDevice::new(|cmd| match cmd {
        [0x0D] => PROMPT.to_vec(),
        [0x00] => b"BBIO1".to_vec(),
        _ => vec![0x00],
    })
}

#[test]
fn test_set_high_and_low_update_level_mask() {
    let device = SimulatedDevice::new(bus_pirate(&[]));
    let mut bp = connect(&device);
    bp.enter_binary_mode().unwrap();

    bp.set_high(0x08, ACK).unwrap();
    assert_eq!(bp.pins().level_mask(), 0x08);
    bp.set_high(0x04, ACK).unwrap();
    assert_eq!(bp.pins().level_mask(), 0x0C);
    bp.set_low(0x08, ACK).unwrap();
    assert_eq!(bp.pins().level_mask(), 0x04);

    let writes = device.writes();
    assert_eq!(
        writes[writes.len() - 3..].to_vec(),
        vec![vec![0x88u8], vec![0x8C], vec![0x84]]
    );
}

#[test]
fn test_set_in_and_out_update_direction_mask() {
    let device = SimulatedDevice::new(bus_pirate(&[]));
    let mut bp = connect(&device);
    bp.enter_binary_mode().unwrap();

    bp.set_in(0x03, ACK).unwrap();
    assert_eq!(bp.pins().direction_mask(), 0x03);
    bp.set_out(0x01, ACK).unwrap();
    assert_eq!(bp.pins().direction_mask(), 0x02);

    let writes = device.writes();
    assert_eq!(
        writes[writes.len() - 2..].to_vec(),
        vec![vec![0x43u8], vec![0x42]]
    );
}

#[test]
fn test_failed_apply_restores_level_mask() {
    let device = SimulatedDevice::new(bus_pirate(&[]));
    let mut bp = connect(&device);
    bp.set_high(0x01, ACK).unwrap();

    // Expected reply the device will never send.
    let err = bp.set_high(0x10, b"\x02").unwrap_err();
    assert!(matches!(err, BusPirateError::BadReply { command: 0x91, .. }));
    assert_eq!(bp.pins().level_mask(), 0x01);

    let err = bp.set_low(0x01, b"\x02").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProtocolMismatch);
    assert_eq!(bp.pins().level_mask(), 0x01);
}

#[test]
fn test_failed_apply_restores_direction_mask() {
    let device = rejecting_device();
    let mut bp = connect(&device);

    assert!(bp.set_in(0x0C, ACK).is_err());
    assert_eq!(bp.pins().direction_mask(), 0x00);
    assert!(bp.set_out(0x0C, ACK).is_err());
    assert_eq!(bp.pins().direction_mask(), 0x00);
}

#[test]
fn test_pin_command_enters_binary_mode_first() {
    let device = SimulatedDevice::new(bus_pirate(&[]));
    let mut bp = connect(&device);
    assert_eq!(bp.mode(), DeviceMode::Unknown);

    bp.set_in(0x08, ACK).unwrap();
    assert_eq!(bp.mode(), DeviceMode::BinaryBitbang);
    assert_eq!(device.writes(), vec![vec![0x0D], vec![0x00], vec![0x48]]);
}

#[test]
fn test_failed_mode_entry_leaves_mask_untouched() {
    let device = SimulatedDevice::silent();
    let mut bp = connect(&device);

    let err = bp.set_high(0x08, ACK).unwrap_err();
    assert!(matches!(err, BusPirateError::ResetFailed { .. }));
    assert_eq!(bp.pins().level_mask(), 0x00);
}

#[test]
fn test_empty_expected_accepts_any_reply() {
    let device = rejecting_device();
    let mut bp = connect(&device);

    bp.set_high(0x02, b"").unwrap();
    assert_eq!(bp.pins().level_mask(), 0x02);
}
