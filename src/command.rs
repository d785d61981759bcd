//! Command dispatch and handlers
//!
//! Each handler is a straight-line transformation over the I/O window, the
//! hash engine and NV; it validates its arguments before touching any state
//! and reports a status byte plus the number of leading DATA bytes that
//! carry response data. The dispatcher's completion sequence then scrubs the
//! rest of DATA, mirrors ARG_2 into RET_2, clears CMD and the arguments, and
//! flips STAT back to ready before dropping the busy flag.

use crate::device::CryptoMem;
use crate::iomem::{reg, STAT_READY};
use crate::nv::{NvPage, PAGE_LEN};
use crate::sha256::DIGEST_LEN;
use crate::Platform;

/// Command codes accepted in the CMD register.
#[allow(missing_docs)]
pub mod opcode {
    pub const NOP: u8 = 0x00;
    pub const QUOTE: u8 = 0xA0;
    pub const HMAC_KDF: u8 = 0xB0;
    pub const INCREMENT: u8 = 0xC0;
    pub const EXTEND: u8 = 0xE0;
    pub const NV_WRITE: u8 = 0xF1;
    pub const SWITCH_CLOCK: u8 = 0xF2;
}

/// Status codes reported in RET_0.
pub mod status {
    /// Command completed successfully.
    pub const OK: u8 = 0x00;
    /// Out-of-range index or length, reserved bits set, or bad NV slot.
    pub const ERR_PARAM: u8 = 0xE1;
    /// CMD value is not in the command table.
    pub const ERR_UNKNOWN_CMD: u8 = 0xE2;
    /// Counter increment would overflow; the counter is unchanged.
    pub const ERR_COUNTER: u8 = 0xE3;
    /// NV erase/program or bootloader re-entry failed.
    pub const ERR_EXEC: u8 = 0xE4;
    /// Operation not permitted in the current lifecycle state, or the
    /// user-data write password did not match.
    pub const ERR_LOCKED: u8 = 0xE5;
}

/// NV slot selectors for the NV write command.
#[allow(missing_docs)]
pub mod nv_slot {
    pub const USER: u8 = 0x2A;
    pub const CONFIG: u8 = 0x5C;
    pub const ISP: u8 = 0xFA;
}

const TAG_QUOTE: [u8; 4] = *b"QUOT";
const TAG_HKDF: [u8; 4] = *b"HKDF";

impl<'a, P: Platform> CryptoMem<'a, P> {
    /// Dispatches the currently latched command and completes it.
    pub(crate) fn handle_command(&mut self) {
        let cmd = self.win.get(reg::CMD);
        cmem_debug!("dispatching command {}", cmd);

        let (status, response_len) = match cmd {
            opcode::NOP => {
                // Scrubs DATA and the arguments via the completion sequence.
                (status::OK, 0)
            }
            opcode::QUOTE => self.quote(),
            opcode::HMAC_KDF => self.hmac_kdf(),
            opcode::INCREMENT => self.increment_counter(),
            opcode::EXTEND => self.extend_pcr(),
            opcode::NV_WRITE => self.nv_write(),
            opcode::SWITCH_CLOCK => {
                self.platform.switch_to_external_clock();
                (status::OK, 0)
            }
            _ => (status::ERR_UNKNOWN_CMD, 0),
        };

        self.complete_command(status, response_len);
    }

    /// Common completion sequence for every command.
    fn complete_command(&mut self, status: u8, response_len: usize) {
        let win = self.win;

        win.fill(reg::DATA + response_len, reg::DATA_LEN - response_len, 0);

        win.set(reg::CMD, 0);
        win.set(reg::RET_0, status);
        win.set(reg::RET_1, 0);
        win.set(reg::RET_2, win.get(reg::ARG_2));
        win.set(reg::ARG_0, 0);
        win.set(reg::ARG_1, 0);
        win.set(reg::ARG_2, 0);

        // Ready must become visible before the busy flag drops, so a host
        // that sees STAT ready also sees every store above.
        win.set(reg::STAT, STAT_READY);
        win.clear_command_active();

        cmem_debug!("command complete, status {}", status);
    }

    /// Extend PCR (0xE0): `PCR[i] := SHA256(PCR[i] || DATA[..len])`.
    ///
    /// ARG_0 selects the PCR (0..=2, upper bits must be zero), ARG_1 is the
    /// extend length (0..=80).
    fn extend_pcr(&mut self) -> (u8, usize) {
        let index = self.win.get(reg::ARG_0);
        let len = usize::from(self.win.get(reg::ARG_1));

        if index > 2 || len > reg::DATA_LEN {
            return (status::ERR_PARAM, 0);
        }

        let pcr = reg::pcr(usize::from(index));
        let mut value = [0u8; reg::PCR_LEN];
        self.win.read_into(pcr, &mut value);

        let mut data = [0u8; reg::DATA_LEN];
        self.win.read_into(reg::DATA, &mut data[..len]);

        self.sha.reset();
        self.sha.update(&value);
        self.sha.update(&data[..len]);
        self.sha.finalize(&mut value);

        self.win.write_from(pcr, &value);
        (status::OK, 0)
    }

    /// Quote (0xA0): HMAC over a caller-selected subset of device state.
    ///
    /// ARG_0 is the selector mask, ARG_1 the length of extra DATA to
    /// include (0..=80). The 32-byte tag lands in DATA.
    fn quote(&mut self) -> (u8, usize) {
        let mask = self.win.get(reg::ARG_0);
        let len = usize::from(self.win.get(reg::ARG_1));

        if len > reg::DATA_LEN {
            return (status::ERR_PARAM, 0);
        }

        self.hmac_init_device(self.nv.quote_seed(), TAG_QUOTE);

        self.sha.update(&TAG_QUOTE);
        self.sha.update(&u32::from(mask).to_le_bytes());

        if mask & 0x80 != 0 {
            let mut uid = [0u8; reg::DEVICE_UID_LEN];
            self.win.read_into(reg::DEVICE_UID, &mut uid);
            self.sha.update(&uid);
        }

        if mask & 0x40 != 0 {
            // Bits and locks must go in as a coherent pair even while the
            // host keeps writing them.
            let (bits, locks) = self.win.volatile_pair();
            self.sha.update(&bits);
            self.sha.update(&locks);
        }

        if mask & 0x20 != 0 {
            self.sha
                .update(&self.win.get_u32(reg::VOLATILE_COUNTER_1).to_le_bytes());
        }

        if mask & 0x10 != 0 {
            self.sha
                .update(&self.win.get_u32(reg::VOLATILE_COUNTER_0).to_le_bytes());
        }

        if mask & 0x08 != 0 {
            let mut user_data = [0u8; reg::USER_DATA_LEN];
            self.win.read_into(reg::USER_DATA, &mut user_data);
            self.sha.update(&user_data);
        }

        for i in 0..3 {
            if (mask >> i) & 1 != 0 {
                let mut value = [0u8; reg::PCR_LEN];
                self.win.read_into(reg::pcr(i), &mut value);
                self.sha.update(&value);
            }
        }

        let mut data = [0u8; reg::DATA_LEN];
        self.win.read_into(reg::DATA, &mut data[..len]);
        self.sha.update(&data[..len]);

        let mut tag = [0u8; DIGEST_LEN];
        self.sha.hmac_finalize(&mut tag);
        self.win.write_from(reg::DATA, &tag);

        (status::OK, DIGEST_LEN)
    }

    /// HMAC key derivation (0xB0): `HMAC_device_key(DATA[..len])` with the
    /// storage derivation key. ARG_0 is the seed length (0..=80).
    fn hmac_kdf(&mut self) -> (u8, usize) {
        let len = usize::from(self.win.get(reg::ARG_0));

        if len > reg::DATA_LEN {
            return (status::ERR_PARAM, 0);
        }

        self.hmac_init_device(self.nv.hkdf_seed(), TAG_HKDF);

        let mut data = [0u8; reg::DATA_LEN];
        self.win.read_into(reg::DATA, &mut data[..len]);
        self.sha.update(&data[..len]);

        let mut derived = [0u8; DIGEST_LEN];
        self.sha.hmac_finalize(&mut derived);
        self.win.write_from(reg::DATA, &derived);

        (status::OK, DIGEST_LEN)
    }

    /// Increment counter (0xC0): adds ARG_1 to counter ARG_0, refusing the
    /// increment rather than wrapping.
    fn increment_counter(&mut self) -> (u8, usize) {
        let index = self.win.get(reg::ARG_0);
        let increment = u32::from(self.win.get(reg::ARG_1));

        if index > 1 {
            return (status::ERR_PARAM, 0);
        }

        let offset = reg::counter(usize::from(index));
        match self.win.get_u32(offset).checked_add(increment) {
            Some(value) => {
                self.win.set_u32(offset, value);
                (status::OK, 0)
            }
            None => (status::ERR_COUNTER, 0),
        }
    }

    /// NV write (0xF1): maintenance page write, authenticated user data
    /// write, or ISP entry, selected by ARG_0.
    fn nv_write(&mut self) -> (u8, usize) {
        let slot = self.win.get(reg::ARG_0);

        match slot {
            nv_slot::CONFIG => {
                if !self.nv.is_unlocked() {
                    return (status::ERR_LOCKED, 0);
                }

                let mut page = [0u8; PAGE_LEN];
                self.win.read_into(reg::DATA, &mut page);

                cmem_trace!("programming NV config page");
                if !self.platform.nv_write_page(NvPage::Config, &page) {
                    return (status::ERR_EXEC, 0);
                }

                self.nv.set_page(NvPage::Config, &page);
                (status::OK, 0)
            }

            nv_slot::USER => {
                // Hash the supplied password in place; DATA is scratch and
                // the hash doubles as the stored auth field of the new page.
                let mut password = [0u8; DIGEST_LEN];
                self.win.read_into(reg::DATA + DIGEST_LEN, &mut password);

                let mut digest = [0u8; DIGEST_LEN];
                self.sha.reset();
                self.sha.update(&password);
                self.sha.finalize(&mut digest);
                self.win.write_from(reg::DATA + DIGEST_LEN, &digest);

                if digest != self.nv.user_auth() {
                    return (status::ERR_LOCKED, 0);
                }

                let mut page = [0u8; PAGE_LEN];
                self.win.read_into(reg::DATA, &mut page);

                cmem_trace!("programming NV user page");
                if !self.platform.nv_write_page(NvPage::User, &page) {
                    return (status::ERR_EXEC, 0);
                }

                self.nv.set_page(NvPage::User, &page);
                self.win.write_from(reg::USER_DATA, &self.nv.user_data());
                (status::OK, 0)
            }

            nv_slot::ISP => {
                if !self.nv.is_unlocked() {
                    return (status::ERR_LOCKED, 0);
                }

                cmem_trace!("entering ISP mode");
                self.platform.stop_transport();
                self.platform.enter_bootloader();

                // enter_bootloader returns only on failure.
                (status::ERR_EXEC, 0)
            }

            _ => (status::ERR_PARAM, 0),
        }
    }
}
