//! Command engine: boot, key derivation and the dispatch loop
//!
//! [`CryptoMem`] owns everything that lives in main context: the platform
//! collaborators, the hash engine and the RAM view of NV. The only state it
//! shares with interrupt context is the borrowed [`IoWindow`].

use crate::iomem::{reg, IoWindow, STAT_READY};
use crate::nv::Nv;
use crate::sha256::{Sha256, DIGEST_LEN};
use crate::Platform;

/// The command engine, generic over the board's [`Platform`] collaborators.
///
/// Boot order follows the device: construct, [`init`](CryptoMem::init)
/// (latches the UID, seeds the window from NV and starts the transport),
/// then either [`run`](CryptoMem::run) as the firmware main loop or
/// [`poll`](CryptoMem::poll) from a host-side event loop.
#[allow(missing_debug_implementations)]
pub struct CryptoMem<'a, P> {
    pub(crate) win: &'a IoWindow,
    pub(crate) platform: P,
    pub(crate) nv: Nv,
    pub(crate) sha: Sha256,
}

impl<'a, P: Platform> CryptoMem<'a, P> {
    /// Creates the engine around a shared window, the board platform and
    /// the NV image loaded from flash.
    pub fn new(win: &'a IoWindow, platform: P, nv: Nv) -> Self {
        CryptoMem {
            win,
            platform,
            nv,
            sha: Sha256::new(),
        }
    }

    /// Access to the platform collaborators.
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Initialises the window and starts the transport. Commands can arrive
    /// at any time once this returns.
    pub fn init(&mut self) {
        self.win.fill(0, 256, 0);

        // Latch the device UID for the life of the session.
        let mut uid = [0u8; reg::DEVICE_UID_LEN];
        if !self.platform.read_device_uid(&mut uid) {
            uid = [0xFF; reg::DEVICE_UID_LEN];
        }
        self.win.write_from(reg::DEVICE_UID, &uid);

        self.win.set(reg::STAT, STAT_READY);
        self.win.clear_command_active();

        // Seed the volatile bits/locks and the user data mirror from NV.
        self.win.set_u32(reg::VOLATILE_BITS, self.nv.volatile_bits_init());
        self.win
            .set_u32(reg::VOLATILE_LOCKS, self.nv.volatile_locks_init());
        self.win.write_from(reg::USER_DATA, &self.nv.user_data());

        cmem_trace!("window initialised, starting transport at {}", self.nv.i2c_addr());
        self.platform.start_transport(self.nv.i2c_addr());
        self.platform.set_ready_pin(true);
    }

    /// Firmware main loop: idle until the byte port flags a command, run it,
    /// repeat. The ready pin mirrors the dispatch state.
    pub fn run(&mut self) -> ! {
        loop {
            self.platform.set_ready_pin(true);

            while !self.win.command_active() {
                self.platform.idle();
            }

            self.platform.set_ready_pin(false);
            self.handle_command();
        }
    }

    /// Runs one pending command, if any. Returns whether a command ran.
    pub fn poll(&mut self) -> bool {
        if !self.win.command_active() {
            return false;
        }

        self.platform.set_ready_pin(false);
        self.handle_command();
        self.platform.set_ready_pin(true);
        true
    }

    /// Derives the device key for a seed/tag pair:
    /// `HMAC_root_key(seed || tag)`.
    pub(crate) fn derive_device_key(&mut self, seed: [u8; 8], tag: [u8; 4]) -> [u8; DIGEST_LEN] {
        let mut key = [0u8; DIGEST_LEN];
        self.sha.hmac_init(&self.nv.root_key());
        self.sha.update(&seed);
        self.sha.update(&tag);
        self.sha.hmac_finalize(&mut key);
        key
    }

    /// Starts an HMAC with the derived device key for a seed/tag pair and
    /// scrubs the key from the stack copy.
    pub(crate) fn hmac_init_device(&mut self, seed: [u8; 8], tag: [u8; 4]) {
        let mut key = self.derive_device_key(seed, tag);
        self.sha.hmac_init(&key);
        for byte in key.iter_mut() {
            *byte = 0;
        }
    }
}
