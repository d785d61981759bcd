//! Non-volatile configuration and user pages
//!
//! The device persists 128 bytes of state in two 64-byte flash pages. Page 0
//! carries the lifecycle unlock marker, the system configuration word, the
//! power-on seeds for the volatile bits/locks, the two key-derivation seeds
//! and the root key. Page 1 carries the user data area and the SHA-256 hash
//! of the user-data write password.
//!
//! The engine reads the pages as plain memory through [`Nv`]; writes go
//! through the platform's `nv_write_page` capability, which receives the
//! [`NvPage`] identity of the page being replaced, and the engine refreshes
//! its copy only after the platform reports success.

/// Length of one NV page in bytes.
pub const PAGE_LEN: usize = 64;

/// Value of the unlock marker while the device is in the unlocked lifecycle
/// state. Production provisioning overwrites the marker with any other value
/// to lock the device.
pub const UNLOCK_MARKER: u32 = 0xAACC_EE55;

// Page 0 field offsets.
const UNLOCK_MARKER_OFFSET: usize = 0x00;
const SYS_CFG_OFFSET: usize = 0x04;
const VOLATILE_BITS_INIT_OFFSET: usize = 0x08;
const VOLATILE_LOCKS_INIT_OFFSET: usize = 0x0C;
const HKDF_SEED_OFFSET: usize = 0x10;
const QUOTE_SEED_OFFSET: usize = 0x18;
const ROOT_KEY_OFFSET: usize = 0x20;

// Page 1 field offsets.
const USER_DATA_OFFSET: usize = 0x00;
const USER_AUTH_OFFSET: usize = 0x20;

/// Identity of one of the two NV pages, as passed to the platform's page
/// write capability.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NvPage {
    /// Page 0: unlock marker, system config, seeds and root key.
    Config,
    /// Page 1: user data and the user-data write password hash.
    User,
}

/// Factory image of page 0.
///
/// The device ships unlocked at I2C address 0x20, with cleared volatile
/// seeds, fixed derivation seeds and the SHA-256 hash of 32 zero bytes as
/// the root key.
pub const FACTORY_CONFIG_PAGE: [u8; PAGE_LEN] = [
    // Unlock marker 0xAACCEE55, system config (I2C address 0x20)
    0x55, 0xEE, 0xCC, 0xAA, 0x20, 0x00, 0x00, 0x00,
    // Volatile bits / locks power-on seeds
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    // HKDF key seed
    0xC3, 0xC3, 0xC3, 0xC3, 0xC3, 0xC3, 0xC3, 0xC3,
    // Quote key seed
    0x3C, 0x3C, 0x3C, 0x3C, 0x3C, 0x3C, 0x3C, 0x3C,
    // Root key: SHA-256 of 32 zero bytes
    0x66, 0x68, 0x7A, 0xAD, 0xF8, 0x62, 0xBD, 0x77,
    0x6C, 0x8F, 0xC1, 0x8B, 0x8E, 0x9F, 0x8E, 0x20,
    0x08, 0x97, 0x14, 0x85, 0x6E, 0xE2, 0x33, 0xB3,
    0x90, 0x2A, 0x59, 0x1D, 0x0D, 0x5F, 0x29, 0x25,
];

/// Factory image of page 1: a placeholder user data string and, as the
/// password hash, the SHA-256 hash of 32 zero bytes (so the factory write
/// password is 32 zero bytes).
pub const FACTORY_USER_PAGE: [u8; PAGE_LEN] = [
    // |don't feed the b|
    0x64, 0x6F, 0x6E, 0x27, 0x74, 0x20, 0x66, 0x65,
    0x65, 0x64, 0x20, 0x74, 0x68, 0x65, 0x20, 0x62,
    // |ugs!............|
    0x75, 0x67, 0x73, 0x21, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    // User auth: SHA-256 of 32 zero bytes
    0x66, 0x68, 0x7A, 0xAD, 0xF8, 0x62, 0xBD, 0x77,
    0x6C, 0x8F, 0xC1, 0x8B, 0x8E, 0x9F, 0x8E, 0x20,
    0x08, 0x97, 0x14, 0x85, 0x6E, 0xE2, 0x33, 0xB3,
    0x90, 0x2A, 0x59, 0x1D, 0x0D, 0x5F, 0x29, 0x25,
];

/// RAM view of the two NV pages.
///
/// On the device this is loaded from flash at boot; hosts and tests start
/// from [`Nv::factory`] or from captured page images via
/// [`Nv::from_pages`].
#[allow(missing_debug_implementations)]
#[derive(Clone, Copy)]
pub struct Nv {
    config: [u8; PAGE_LEN],
    user: [u8; PAGE_LEN],
}

impl Nv {
    /// Builds an NV view from raw page images.
    pub const fn from_pages(config: [u8; PAGE_LEN], user: [u8; PAGE_LEN]) -> Self {
        Nv { config, user }
    }

    /// The factory NV image (unlocked device, default keys).
    pub const fn factory() -> Self {
        Nv::from_pages(FACTORY_CONFIG_PAGE, FACTORY_USER_PAGE)
    }

    /// Raw bytes of a page.
    pub fn page(&self, page: NvPage) -> &[u8; PAGE_LEN] {
        match page {
            NvPage::Config => &self.config,
            NvPage::User => &self.user,
        }
    }

    /// Replaces a page image after a successful flash program.
    pub(crate) fn set_page(&mut self, page: NvPage, data: &[u8; PAGE_LEN]) {
        match page {
            NvPage::Config => self.config = *data,
            NvPage::User => self.user = *data,
        }
    }

    /// Whether the device is in the unlocked lifecycle state.
    pub fn is_unlocked(&self) -> bool {
        self.unlock_marker() == UNLOCK_MARKER
    }

    /// The raw unlock marker word.
    pub fn unlock_marker(&self) -> u32 {
        read_u32(&self.config, UNLOCK_MARKER_OFFSET)
    }

    /// The raw system configuration word. Bits 0..=6 are the I2C address,
    /// the remaining bits are reserved and must be zero.
    pub fn sys_config(&self) -> u32 {
        read_u32(&self.config, SYS_CFG_OFFSET)
    }

    /// The configured 7-bit I2C slave address.
    pub fn i2c_addr(&self) -> u8 {
        (self.sys_config() & 0x7F) as u8
    }

    /// Power-on value for the volatile bits.
    pub fn volatile_bits_init(&self) -> u32 {
        read_u32(&self.config, VOLATILE_BITS_INIT_OFFSET)
    }

    /// Power-on value for the volatile lock mask.
    pub fn volatile_locks_init(&self) -> u32 {
        read_u32(&self.config, VOLATILE_LOCKS_INIT_OFFSET)
    }

    /// Seed for storage key derivation.
    pub fn hkdf_seed(&self) -> [u8; 8] {
        read_array8(&self.config, HKDF_SEED_OFFSET)
    }

    /// Seed for quote key derivation.
    pub fn quote_seed(&self) -> [u8; 8] {
        read_array8(&self.config, QUOTE_SEED_OFFSET)
    }

    /// The device root key.
    pub fn root_key(&self) -> [u8; 32] {
        read_array32(&self.config, ROOT_KEY_OFFSET)
    }

    /// The persisted user data area.
    pub fn user_data(&self) -> [u8; 32] {
        read_array32(&self.user, USER_DATA_OFFSET)
    }

    /// SHA-256 hash of the user-data write password.
    pub fn user_auth(&self) -> [u8; 32] {
        read_array32(&self.user, USER_AUTH_OFFSET)
    }
}

impl Default for Nv {
    fn default() -> Self {
        Nv::factory()
    }
}

fn read_u32(page: &[u8; PAGE_LEN], offset: usize) -> u32 {
    u32::from_le_bytes([
        page[offset],
        page[offset + 1],
        page[offset + 2],
        page[offset + 3],
    ])
}

fn read_array8(page: &[u8; PAGE_LEN], offset: usize) -> [u8; 8] {
    let mut out = [0u8; 8];
    out.copy_from_slice(&page[offset..offset + 8]);
    out
}

fn read_array32(page: &[u8; PAGE_LEN], offset: usize) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&page[offset..offset + 32]);
    out
}
