//! Software SHA-256 and HMAC-SHA-256 engine
//!
//! One [`Sha256`] context serves every operation of the device: PCR
//! extension, quote generation, key derivation and the NV write password
//! check. The context is therefore designed to be reused: [`finalize`]
//! re-initialises it, and the HMAC pad survives between the inner and outer
//! hash so that a single context is sufficient for HMAC as well.
//!
//! The message schedule is evaluated on the fly in a 16-word ring instead of
//! the 64-word table, keeping the working set small enough for the original
//! hardware target. Digests are bit-exact with FIPS 180-4 and HMAC with
//! RFC 2104 / RFC 4231.
//!
//! [`finalize`]: Sha256::finalize

use core::cmp;

/// Length of a SHA-256 digest in bytes.
pub const DIGEST_LEN: usize = 32;

/// Length of a SHA-256 message block in bytes.
pub const BLOCK_LEN: usize = 64;

/// FIPS 180-4 initial hash value.
const IV: [u32; 8] = [
    0x6a09_e667, 0xbb67_ae85, 0x3c6e_f372, 0xa54f_f53a,
    0x510e_527f, 0x9b05_688c, 0x1f83_d9ab, 0x5be0_cd19,
];

/// FIPS 180-4 round constants.
const K: [u32; 64] = [
    0x428a_2f98, 0x7137_4491, 0xb5c0_fbcf, 0xe9b5_dba5,
    0x3956_c25b, 0x59f1_11f1, 0x923f_82a4, 0xab1c_5ed5,
    0xd807_aa98, 0x1283_5b01, 0x2431_85be, 0x550c_7dc3,
    0x72be_5d74, 0x80de_b1fe, 0x9bdc_06a7, 0xc19b_f174,
    0xe49b_69c1, 0xefbe_4786, 0x0fc1_9dc6, 0x240c_a1cc,
    0x2de9_2c6f, 0x4a74_84aa, 0x5cb0_a9dc, 0x76f9_88da,
    0x983e_5152, 0xa831_c66d, 0xb003_27c8, 0xbf59_7fc7,
    0xc6e0_0bf3, 0xd5a7_9147, 0x06ca_6351, 0x1429_2967,
    0x27b7_0a85, 0x2e1b_2138, 0x4d2c_6dfc, 0x5338_0d13,
    0x650a_7354, 0x766a_0abb, 0x81c2_c92e, 0x9272_2c85,
    0xa2bf_e8a1, 0xa81a_664b, 0xc24b_8b70, 0xc76c_51a3,
    0xd192_e819, 0xd699_0624, 0xf40e_3585, 0x106a_a070,
    0x19a4_c116, 0x1e37_6c08, 0x2748_774c, 0x34b0_bcb5,
    0x391c_0cb3, 0x4ed8_aa4a, 0x5b9c_ca4f, 0x682e_6ff3,
    0x748f_82ee, 0x78a5_636f, 0x84c8_7814, 0x8cc7_0208,
    0x90be_fffa, 0xa450_6ceb, 0xbef9_a3f7, 0xc671_78f2,
];

/// SHA-256 / HMAC-SHA-256 calculation context.
#[allow(missing_copy_implementations, missing_debug_implementations)]
pub struct Sha256 {
    /// Hash state variables.
    h: [u32; 8],
    /// Current message block. Bytes past the fill offset are always zero
    /// (cleared by every compression), which makes the final-block zero
    /// padding automatic.
    block: [u8; BLOCK_LEN],
    /// Total message length in bytes.
    len: u64,
    /// Holding area for the ipad/opad values during HMAC calculations.
    pad: [u8; BLOCK_LEN],
}

impl Sha256 {
    /// Creates a context, ready for the first message.
    pub const fn new() -> Self {
        Sha256 {
            h: IV,
            block: [0; BLOCK_LEN],
            len: 0,
            pad: [0; BLOCK_LEN],
        }
    }

    /// Re-initialises the hash state for a new message.
    pub fn reset(&mut self) {
        self.h = IV;
        self.block = [0; BLOCK_LEN];
        self.len = 0;
    }

    /// Appends message bytes.
    pub fn update(&mut self, mut data: &[u8]) {
        while !data.is_empty() {
            // Remaining capacity of the block buffer. The fill offset is
            // always strictly less than BLOCK_LEN here.
            let offset = (self.len % BLOCK_LEN as u64) as usize;
            let take = cmp::min(BLOCK_LEN - offset, data.len());

            self.block[offset..offset + take].copy_from_slice(&data[..take]);
            self.len += take as u64;

            if offset + take == BLOCK_LEN {
                self.compress();
            }

            data = &data[take..];
        }
    }

    /// Finalises the message and writes the digest.
    ///
    /// The context is re-initialised afterwards and may be reused for the
    /// next message immediately.
    pub fn finalize(&mut self, digest: &mut [u8; DIGEST_LEN]) {
        let bit_len = self.len << 3;

        // Padding byte, then flush if the 64-bit length no longer fits in
        // this block. Either way the tail of the block is already zero.
        self.update(&[0x80]);
        if (self.len % BLOCK_LEN as u64) as usize > BLOCK_LEN - 8 {
            self.compress();
        }

        self.block[BLOCK_LEN - 8..].copy_from_slice(&bit_len.to_be_bytes());
        self.compress();

        for (i, chunk) in digest.chunks_exact_mut(4).enumerate() {
            chunk.copy_from_slice(&self.h[i].to_be_bytes());
        }

        self.reset();
    }

    /// Starts an HMAC calculation with the given key.
    ///
    /// Message data is then fed through [`update`](Sha256::update) and the
    /// tag collected with [`hmac_finalize`](Sha256::hmac_finalize).
    pub fn hmac_init(&mut self, key: &[u8]) {
        self.reset();
        self.pad = [0; BLOCK_LEN];

        if key.len() > BLOCK_LEN {
            // Key longer than the block size is hashed once first.
            let mut digest = [0u8; DIGEST_LEN];
            self.update(key);
            self.finalize(&mut digest);
            self.pad[..DIGEST_LEN].copy_from_slice(&digest);
        } else {
            self.pad[..key.len()].copy_from_slice(key);
        }

        for byte in self.pad.iter_mut() {
            *byte ^= 0x36;
        }

        // Start the inner hash with the ipad, then leave the opad value
        // behind for hmac_finalize.
        let ipad = self.pad;
        self.update(&ipad);

        for byte in self.pad.iter_mut() {
            *byte ^= 0x36 ^ 0x5c;
        }
    }

    /// Finalises an HMAC calculation and writes the tag.
    pub fn hmac_finalize(&mut self, digest: &mut [u8; DIGEST_LEN]) {
        // Inner digest, then the outer hash over opad || inner.
        self.finalize(digest);

        let opad = self.pad;
        self.update(&opad);
        self.update(&digest[..]);
        self.finalize(digest);

        self.pad = [0; BLOCK_LEN];
    }

    /// Standard SHA-256 compression of the current block.
    fn compress(&mut self) {
        let mut w = [0u32; 16];

        let mut a = self.h[0];
        let mut b = self.h[1];
        let mut c = self.h[2];
        let mut d = self.h[3];
        let mut e = self.h[4];
        let mut f = self.h[5];
        let mut g = self.h[6];
        let mut h = self.h[7];

        for i in 0..64 {
            // Message word schedule over the 16-word ring: the first 16
            // rounds load the block directly (big-endian), later rounds
            // rewrite the slot they consume.
            let w_i = if i < 16 {
                u32::from_be_bytes([
                    self.block[4 * i],
                    self.block[4 * i + 1],
                    self.block[4 * i + 2],
                    self.block[4 * i + 3],
                ])
            } else {
                let w15 = w[(i + 1) % 16];
                let s0 = w15.rotate_right(7) ^ w15.rotate_right(18) ^ (w15 >> 3);
                let w2 = w[(i + 14) % 16];
                let s1 = w2.rotate_right(17) ^ w2.rotate_right(19) ^ (w2 >> 10);

                w[i % 16]
                    .wrapping_add(s0)
                    .wrapping_add(w[(i + 9) % 16])
                    .wrapping_add(s1)
            };
            w[i % 16] = w_i;

            let s1 = e.rotate_right(6) ^ e.rotate_right(11) ^ e.rotate_right(25);
            let ch = (e & f) ^ (!e & g);
            let tmp1 = h
                .wrapping_add(s1)
                .wrapping_add(ch)
                .wrapping_add(K[i])
                .wrapping_add(w_i);
            let s0 = a.rotate_right(2) ^ a.rotate_right(13) ^ a.rotate_right(22);
            let maj = (a & b) ^ (a & c) ^ (b & c);
            let tmp2 = s0.wrapping_add(maj);

            h = g;
            g = f;
            f = e;
            e = d.wrapping_add(tmp1);
            d = c;
            c = b;
            b = a;
            a = tmp1.wrapping_add(tmp2);
        }

        self.h[0] = self.h[0].wrapping_add(a);
        self.h[1] = self.h[1].wrapping_add(b);
        self.h[2] = self.h[2].wrapping_add(c);
        self.h[3] = self.h[3].wrapping_add(d);
        self.h[4] = self.h[4].wrapping_add(e);
        self.h[5] = self.h[5].wrapping_add(f);
        self.h[6] = self.h[6].wrapping_add(g);
        self.h[7] = self.h[7].wrapping_add(h);

        // Keeps the zero-beyond-offset invariant and avoids leaving message
        // bytes behind between operations.
        self.block = [0; BLOCK_LEN];
    }
}
