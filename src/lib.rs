//! Firmware core for an EEPROM-style cryptographic co-processor
//!
//! The device looks like a classic byte-addressable serial EEPROM to the
//! host: a 256-byte register window carrying a command/status block, a
//! scratch DATA area, lockable volatile bits, saturating counters, three
//! SHA-256 platform configuration registers (PCRs) and the device UID.
//! Writing the CMD register launches a command handler (PCR extend, quote,
//! HMAC key derivation, counter increment, NV write, clock switch) that
//! runs to completion in the main loop while the wire-level byte port keeps
//! answering with busy semantics.
//!
//! The crate is transport- and MCU-agnostic. Board support plugs in at two
//! seams:
//!
//! * the [`Platform`] trait supplies the silicon collaborators (device UID,
//!   NV page programming, bootloader entry, clock switch, idle/halt, ready
//!   pin, transport start/stop);
//! * the transport delivers host accesses byte by byte to
//!   [`IoWindow::host_read`] / [`IoWindow::host_write`], either directly or
//!   through the bundled [`I2cSlave`] / [`SimpleSerial`] front-ends.
//!
//! # Usage
//!
//! ```
//! use cryptomem::{reg, CryptoMem, IoWindow, Nv, NvPage, Platform};
//!
//! struct Board;
//!
//! impl Platform for Board {
//!     fn read_device_uid(&mut self, uid: &mut [u8; 16]) -> bool {
//!         *uid = [0x42; 16];
//!         true
//!     }
//!     fn nv_write_page(&mut self, _page: NvPage, _data: &[u8; 64]) -> bool {
//!         true
//!     }
//!     fn enter_bootloader(&mut self) {}
//!     fn switch_to_external_clock(&mut self) {}
//!     fn idle(&mut self) {}
//!     fn halt(&mut self) -> ! {
//!         panic!("device halt");
//!     }
//!     fn set_ready_pin(&mut self, _ready: bool) {}
//!     fn start_transport(&mut self, _i2c_addr: u8) {}
//!     fn stop_transport(&mut self) {}
//! }
//!
//! let window = IoWindow::new();
//! let mut device = CryptoMem::new(&window, Board, Nv::factory());
//! device.init();
//!
//! // The transport delivers host accesses one byte at a time. Writing CMD
//! // latches a command and flips the device to busy...
//! window.host_write(reg::ARG_0 as u8, 1); // PCR index
//! window.host_write(reg::ARG_1 as u8, 0); // extend length
//! window.host_write(reg::CMD as u8, 0xE0); // Extend-PCR
//! assert_eq!(window.host_read(reg::STAT as u8), 0xFF);
//!
//! // ...and the main loop drives the engine back to ready.
//! assert!(device.poll());
//! assert_eq!(window.host_read(reg::STAT as u8), 0xC3);
//! assert_eq!(window.host_read(reg::RET_0 as u8), 0x00);
//! ```
//!
//! On the device, `window` lives in a `static` (the constructor is `const`)
//! and [`CryptoMem::run`] replaces the `poll` calls as the firmware main
//! loop, sleeping in [`Platform::idle`] between commands.
#![no_std]
// rustc lints.
#![warn(
    bare_trait_objects,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_qualifications,
    unused_results
)]

#[macro_use]
mod macros;

mod command;
pub use command::{nv_slot, opcode, status};

mod device;
pub use device::CryptoMem;

mod i2c;
pub use i2c::{I2cSlave, I2cSlaveEvent, SlaveFault};

mod iomem;
pub use iomem::{reg, IoWindow, STAT_BUSY, STAT_READY};

mod nv;
pub use nv::{Nv, NvPage, FACTORY_CONFIG_PAGE, FACTORY_USER_PAGE, PAGE_LEN, UNLOCK_MARKER};

mod serial;
pub use serial::SimpleSerial;

mod sha256;
pub use sha256::{Sha256, BLOCK_LEN, DIGEST_LEN};

/// Platform collaborators the command engine imports from the board.
///
/// Everything silicon-specific lives behind this trait: the engine itself
/// never touches registers, flash or clocks directly.
pub trait Platform {
    /// Reads the device-unique ID. Returns `false` when the ID is
    /// unavailable, in which case the engine reports an all-0xFF UID.
    fn read_device_uid(&mut self, uid: &mut [u8; 16]) -> bool;

    /// Erases and programs one 64-byte NV page. Returns `false` when the
    /// erase or program step fails.
    fn nv_write_page(&mut self, page: NvPage, data: &[u8; PAGE_LEN]) -> bool;

    /// Re-invokes the bootloader for in-system programming. Returns only on
    /// failure.
    fn enter_bootloader(&mut self);

    /// Switches the system clock to the external clock input.
    fn switch_to_external_clock(&mut self);

    /// Waits for the next interrupt or event.
    fn idle(&mut self);

    /// Stops the device after an unrecoverable fault. Does not return; the
    /// board typically parks the core until the watchdog resets it.
    fn halt(&mut self) -> !;

    /// Drives the external ready pin: `true` while the device accepts a new
    /// command, `false` while one is executing.
    fn set_ready_pin(&mut self, ready: bool);

    /// Starts the wire transport with the configured 7-bit I2C address.
    fn start_transport(&mut self, i2c_addr: u8);

    /// Stops the wire transport, e.g. ahead of bootloader entry.
    fn stop_transport(&mut self);
}
