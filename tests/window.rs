//! Byte-port invariants: busy masking, lock monotonicity, read-only fields

use dummy_platform::*;

use cryptomem::{opcode, reg, IoWindow, STAT_BUSY, STAT_READY};

#[test]
fn boot_state() {
    let win = IoWindow::new();
    let device = boot(&win);

    assert_eq!(win.host_read(reg::STAT as u8), STAT_READY);
    assert!(!win.command_active());

    // UID latched from the platform, user data mirrored from NV.
    assert_eq!(
        read_region(&win, reg::DEVICE_UID, reg::DEVICE_UID_LEN),
        b"unique-device-id".to_vec()
    );
    assert_eq!(
        read_region(&win, reg::USER_DATA, 20),
        b"don't feed the bugs!".to_vec()
    );

    // PCRs and counters start cleared.
    for i in 0..3 {
        assert_eq!(read_region(&win, reg::pcr(i), reg::PCR_LEN), vec![0u8; 32]);
    }
    assert_eq!(read_region(&win, reg::VOLATILE_COUNTER_0, 8), vec![0u8; 8]);

    // Transport started at the configured address, ready pin asserted.
    assert_eq!(device.platform().transport_addr, Some(0x20));
    assert!(device.platform().ready_pin);
}

#[test]
fn uid_latch_failure_reads_all_ones() {
    let win = IoWindow::new();
    let mut platform = DummyPlatform::new();
    platform.uid_ok = false;
    let _device = boot_with(&win, platform);

    assert_eq!(
        read_region(&win, reg::DEVICE_UID, reg::DEVICE_UID_LEN),
        vec![0xFF; 16]
    );
}

#[test]
fn cmd_write_flips_to_busy_and_masks_low_region() {
    let win = IoWindow::new();
    let mut device = boot(&win);

    write_region(&win, reg::DATA, b"abcd");
    win.host_write(reg::ARG_0 as u8, 1);
    win.host_write(reg::ARG_1 as u8, 4);
    win.host_write(reg::CMD as u8, opcode::EXTEND);

    // Everything at or below STAT answers busy until dispatch completes.
    assert_eq!(win.host_read(reg::STAT as u8), STAT_BUSY);
    assert_eq!(win.host_read(reg::CMD as u8), STAT_BUSY);
    assert_eq!(win.host_read(0x00), STAT_BUSY);
    assert_eq!(win.host_read(0x4F), STAT_BUSY);

    // The return registers above STAT were cleared at activation and stay
    // visible, as does the rest of the window.
    assert_eq!(win.host_read(reg::RET_0 as u8), 0);
    assert_eq!(
        read_region(&win, reg::DEVICE_UID, reg::DEVICE_UID_LEN),
        b"unique-device-id".to_vec()
    );

    assert!(device.poll());
    assert_eq!(win.host_read(reg::STAT as u8), STAT_READY);
}

#[test]
fn data_writes_ignored_while_busy() {
    let win = IoWindow::new();
    let mut device = boot(&win);

    write_region(&win, reg::DATA, b"abcd");
    win.host_write(reg::ARG_0 as u8, 1);
    win.host_write(reg::ARG_1 as u8, 4);
    win.host_write(reg::CMD as u8, opcode::EXTEND);

    // Must not land: the dispatcher still has to see "abcd".
    win.host_write(reg::DATA as u8, b'x');

    assert!(device.poll());
    assert_eq!(win.host_read(reg::RET_0 as u8), 0x00);

    // PCR[1] = SHA256(0^32 || "abcd")
    let expected = [
        0x88, 0xD4, 0x26, 0x6F, 0xD4, 0xE6, 0x33, 0x8D, 0x13, 0xB8, 0x45, 0xFC, 0xF2, 0x89,
        0x57, 0x9D, 0x20, 0x9C, 0x89, 0x78, 0x23, 0xB9, 0x21, 0x7D, 0xA3, 0xE1, 0x61, 0x93,
        0x5F, 0x5C, 0x9C, 0x38,
    ];
    assert_eq!(read_region(&win, reg::pcr(1), reg::PCR_LEN), expected.to_vec());
}

#[test]
fn cmd_writes_ignored_while_busy() {
    let win = IoWindow::new();
    let mut device = boot(&win);

    win.host_write(reg::CMD as u8, opcode::NOP);
    // A second activation attempt while busy must be dropped.
    win.host_write(reg::CMD as u8, opcode::EXTEND);

    assert!(device.poll());
    assert_eq!(win.host_read(reg::RET_0 as u8), 0x00);
    // Nothing else is pending.
    assert!(!device.poll());
}

#[test]
fn locks_are_monotone() {
    let win = IoWindow::new();
    let _device = boot(&win);

    win.host_write(reg::VOLATILE_LOCKS as u8, 0x0F);
    win.host_write(reg::VOLATILE_LOCKS as u8, 0x00);
    assert_eq!(win.host_read(reg::VOLATILE_LOCKS as u8), 0x0F);

    win.host_write(reg::VOLATILE_LOCKS as u8, 0x30);
    assert_eq!(win.host_read(reg::VOLATILE_LOCKS as u8), 0x3F);
}

#[test]
fn bits_honor_locks() {
    let win = IoWindow::new();
    let _device = boot(&win);

    write_region(&win, reg::VOLATILE_LOCKS, &[0x0F, 0x00, 0x00, 0x00]);
    win.host_write(reg::VOLATILE_BITS as u8, 0xFF);

    // Upper nibble accepted, locked lower nibble preserved.
    assert_eq!(win.host_read(reg::VOLATILE_BITS as u8), 0xF0);

    // Unlocked bytes stay fully writable.
    win.host_write((reg::VOLATILE_BITS + 1) as u8, 0xAA);
    assert_eq!(win.host_read((reg::VOLATILE_BITS + 1) as u8), 0xAA);
    win.host_write((reg::VOLATILE_BITS + 1) as u8, 0x00);
    assert_eq!(win.host_read((reg::VOLATILE_BITS + 1) as u8), 0x00);
}

#[test]
fn locked_bits_survive_further_writes() {
    let win = IoWindow::new();
    let _device = boot(&win);

    win.host_write(reg::VOLATILE_BITS as u8, 0xA5);
    win.host_write(reg::VOLATILE_LOCKS as u8, 0xFF);

    win.host_write(reg::VOLATILE_BITS as u8, 0x00);
    win.host_write(reg::VOLATILE_BITS as u8, 0xFF);
    assert_eq!(win.host_read(reg::VOLATILE_BITS as u8), 0xA5);
}

#[test]
fn locks_and_bits_stay_live_while_busy() {
    let win = IoWindow::new();
    let mut device = boot(&win);

    win.host_write(reg::CMD as u8, opcode::NOP);

    win.host_write((reg::VOLATILE_LOCKS + 1) as u8, 0x55);
    win.host_write((reg::VOLATILE_BITS + 2) as u8, 0x77);

    assert!(device.poll());
    assert_eq!(win.host_read((reg::VOLATILE_LOCKS + 1) as u8), 0x55);
    assert_eq!(win.host_read((reg::VOLATILE_BITS + 2) as u8), 0x77);
}

#[test]
fn stat_is_host_read_only() {
    let win = IoWindow::new();
    let _device = boot(&win);

    win.host_write(reg::STAT as u8, 0x00);
    assert_eq!(win.host_read(reg::STAT as u8), STAT_READY);
}

#[test]
fn uid_and_reserved_region_ignore_writes() {
    let win = IoWindow::new();
    let _device = boot(&win);

    win.host_write(reg::DEVICE_UID as u8, 0x00);
    assert_eq!(win.host_read(reg::DEVICE_UID as u8), b'u');

    win.host_write(reg::RFU as u8, 0x99);
    assert_eq!(win.host_read(reg::RFU as u8), 0x00);

    win.host_write(reg::RET_0 as u8, 0x99);
    assert_eq!(win.host_read(reg::RET_0 as u8), 0x00);

    win.host_write(reg::VOLATILE_COUNTER_0 as u8, 0x99);
    assert_eq!(win.host_read(reg::VOLATILE_COUNTER_0 as u8), 0x00);
}

#[test]
fn data_region_readable_and_writable_while_ready() {
    let win = IoWindow::new();
    let _device = boot(&win);

    write_region(&win, reg::DATA, b"scratch");
    assert_eq!(read_region(&win, reg::DATA, 7), b"scratch".to_vec());

    win.host_write(reg::ARG_2 as u8, 0x5A);
    assert_eq!(win.host_read(reg::ARG_2 as u8), 0x5A);
}
