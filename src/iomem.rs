//! Shared 256-byte I/O window and the host byte-port policy
//!
//! The window is the only state shared between the transport's byte-level
//! interrupt context and the command engine in main context. Every cell is
//! an [`AtomicU8`] so both sides may touch it without further locking; the
//! `command_active` flag is the cross-context handshake, with release stores
//! on the busy/ready transitions and acquire loads on the observers.
//!
//! [`host_read`] and [`host_write`] are the two callbacks the transport
//! drives, one call per wire byte. They encode the visibility contract:
//!
//! * while a command is active, every read at or below STAT answers the busy
//!   pattern, and every write except VOLATILE_BITS, VOLATILE_LOCKS and CMD
//!   is dropped;
//! * VOLATILE_LOCKS bytes OR-combine (lock bits only ever set);
//! * VOLATILE_BITS bytes change only where the matching lock byte permits;
//! * a write to CMD while ready atomically latches the command, flips STAT
//!   to busy, clears the return registers and raises `command_active`.
//!
//! Lock and bits updates run inside a `critical-section` critical section so
//! the quote handler can sample the pair coherently on any target.
//!
//! [`host_read`]: IoWindow::host_read
//! [`host_write`]: IoWindow::host_write

use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Byte offsets of the named fields in the I/O window.
#[allow(missing_docs)]
pub mod reg {
    pub const DATA: usize = 0x00;
    pub const DATA_LEN: usize = 80;
    pub const ARG_0: usize = 0x50;
    pub const ARG_1: usize = 0x51;
    pub const ARG_2: usize = 0x52;
    pub const CMD: usize = 0x53;
    pub const STAT: usize = 0x54;
    pub const RET_0: usize = 0x55;
    pub const RET_1: usize = 0x56;
    pub const RET_2: usize = 0x57;
    pub const VOLATILE_BITS: usize = 0x58;
    pub const VOLATILE_LOCKS: usize = 0x5C;
    pub const VOLATILE_COUNTER_0: usize = 0x60;
    pub const VOLATILE_COUNTER_1: usize = 0x64;
    pub const RFU: usize = 0x68;
    pub const USER_DATA: usize = 0x70;
    pub const USER_DATA_LEN: usize = 32;
    pub const PCR_0: usize = 0x90;
    pub const PCR_LEN: usize = 32;
    pub const DEVICE_UID: usize = 0xF0;
    pub const DEVICE_UID_LEN: usize = 16;

    /// Offset of the indexed PCR (0..=2).
    pub const fn pcr(index: usize) -> usize {
        PCR_0 + index * PCR_LEN
    }

    /// Offset of the indexed volatile counter (0..=1).
    pub const fn counter(index: usize) -> usize {
        VOLATILE_COUNTER_0 + index * 4
    }
}

const VOLATILE_BITS_FIRST: usize = reg::VOLATILE_BITS;
const VOLATILE_BITS_LAST: usize = reg::VOLATILE_BITS + 3;
const VOLATILE_LOCKS_FIRST: usize = reg::VOLATILE_LOCKS;
const VOLATILE_LOCKS_LAST: usize = reg::VOLATILE_LOCKS + 3;

// Field map sanity.
const _: () = assert!(reg::DATA + reg::DATA_LEN == reg::ARG_0);
const _: () = assert!(reg::USER_DATA + reg::USER_DATA_LEN == reg::PCR_0);
const _: () = assert!(reg::pcr(2) + reg::PCR_LEN == reg::DEVICE_UID);
const _: () = assert!(reg::DEVICE_UID + reg::DEVICE_UID_LEN == 256);

/// STAT value while a command is executing. Doubles as the busy read-back
/// pattern for the masked low region of the window.
pub const STAT_BUSY: u8 = 0xFF;

/// STAT value while the device is ready for the next command.
pub const STAT_READY: u8 = 0xC3;

/// The 256-byte I/O window shared by the transport and the command engine.
///
/// `IoWindow::new` is `const`, so a window can live in a `static` and be
/// referenced from both the interrupt handler and the main loop.
#[allow(missing_debug_implementations)]
pub struct IoWindow {
    raw: [AtomicU8; 256],
    command_active: AtomicBool,
}

impl IoWindow {
    /// Creates a zeroed window with no command active.
    pub const fn new() -> Self {
        const ZERO: AtomicU8 = AtomicU8::new(0);
        IoWindow {
            raw: [ZERO; 256],
            command_active: AtomicBool::new(false),
        }
    }

    /// Whether a command is currently executing.
    pub fn command_active(&self) -> bool {
        self.command_active.load(Ordering::Acquire)
    }

    /// Host-side byte read, one call per wire byte.
    pub fn host_read(&self, addr: u8) -> u8 {
        let addr = usize::from(addr);

        // Addresses at or below STAT read as the busy pattern while a
        // command is ongoing; the engine's in-flight stores must never be
        // partially visible there.
        if addr <= reg::STAT && self.command_active() {
            return STAT_BUSY;
        }

        self.raw[addr].load(Ordering::Acquire)
    }

    /// Host-side byte write, one call per wire byte.
    pub fn host_write(&self, addr: u8, data: u8) {
        let addr = usize::from(addr);

        match addr {
            reg::CMD => {
                // A write to CMD while ready latches the command. STAT and
                // the return registers are set before the flag is raised so
                // a read interrupt arriving before dispatch already sees
                // consistent values. Writes while busy are dropped.
                if !self.command_active() {
                    self.raw[reg::CMD].store(data, Ordering::Relaxed);
                    self.raw[reg::STAT].store(STAT_BUSY, Ordering::Relaxed);
                    self.raw[reg::RET_0].store(0, Ordering::Relaxed);
                    self.raw[reg::RET_1].store(0, Ordering::Relaxed);
                    self.raw[reg::RET_2].store(0, Ordering::Relaxed);
                    self.command_active.store(true, Ordering::Release);
                }
            }

            VOLATILE_LOCKS_FIRST..=VOLATILE_LOCKS_LAST => {
                // Lock bits only ever go 0 -> 1, accepted even while busy.
                critical_section::with(|_| {
                    let old = self.raw[addr].load(Ordering::Relaxed);
                    self.raw[addr].store(old | data, Ordering::Release);
                });
            }

            VOLATILE_BITS_FIRST..=VOLATILE_BITS_LAST => {
                // Value bits change only where the lock byte has a 0,
                // accepted even while busy.
                critical_section::with(|_| {
                    let lock = self.raw[addr - reg::VOLATILE_BITS + reg::VOLATILE_LOCKS]
                        .load(Ordering::Relaxed);
                    let old = self.raw[addr].load(Ordering::Relaxed);
                    self.raw[addr].store((old & lock) | (data & !lock), Ordering::Release);
                });
            }

            _ => {
                // The region below STAT is host-writable while no command is
                // active; everything else ignores writes.
                if addr < reg::STAT && !self.command_active() {
                    self.raw[addr].store(data, Ordering::Release);
                }
            }
        }
    }

    /// Engine-side raw byte read.
    pub(crate) fn get(&self, offset: usize) -> u8 {
        self.raw[offset].load(Ordering::Acquire)
    }

    /// Engine-side raw byte write.
    pub(crate) fn set(&self, offset: usize, value: u8) {
        self.raw[offset].store(value, Ordering::Release)
    }

    /// Engine-side little-endian word read.
    pub(crate) fn get_u32(&self, offset: usize) -> u32 {
        u32::from_le_bytes([
            self.get(offset),
            self.get(offset + 1),
            self.get(offset + 2),
            self.get(offset + 3),
        ])
    }

    /// Engine-side little-endian word write.
    pub(crate) fn set_u32(&self, offset: usize, value: u32) {
        for (i, byte) in value.to_le_bytes().iter().enumerate() {
            self.set(offset + i, *byte);
        }
    }

    /// Copies a window region into a buffer.
    pub(crate) fn read_into(&self, offset: usize, buf: &mut [u8]) {
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = self.get(offset + i);
        }
    }

    /// Copies a buffer into a window region.
    pub(crate) fn write_from(&self, offset: usize, buf: &[u8]) {
        for (i, byte) in buf.iter().enumerate() {
            self.set(offset + i, *byte);
        }
    }

    /// Fills a window region with a byte value.
    pub(crate) fn fill(&self, offset: usize, len: usize, value: u8) {
        for i in offset..offset + len {
            self.set(i, value);
        }
    }

    /// Samples VOLATILE_BITS and VOLATILE_LOCKS as a coherent pair. Runs in
    /// the same critical section as the byte-port updates, so a concurrent
    /// host write cannot land between the two loads.
    pub(crate) fn volatile_pair(&self) -> ([u8; 4], [u8; 4]) {
        critical_section::with(|_| {
            let mut bits = [0u8; 4];
            let mut locks = [0u8; 4];
            self.read_into(reg::VOLATILE_BITS, &mut bits);
            self.read_into(reg::VOLATILE_LOCKS, &mut locks);
            (bits, locks)
        })
    }

    /// Drops the busy flag after the completing STAT store.
    pub(crate) fn clear_command_active(&self) {
        self.command_active.store(false, Ordering::Release);
    }
}
