//! SimpleSerial v1.1 wire framing for UART transports
//!
//! Maps the register window onto ChipWhisperer's "SimpleSerial v1.1"
//! protocol so a plain UART can stand in for the I2C bus:
//!
//! - Write to device registers:
//!   - Cmd: `['W', addr, cnt, data..., '\n']`
//!   - Rsp: `['z', status, '\n']`
//! - Read from device registers:
//!   - Cmd: `['R', addr, cnt, '\n']`
//!   - Rsp: `['r', data..., '\n']` followed by `['z', status, '\n']`
//!
//! `addr`, `cnt` and every data byte travel as two-digit uppercase hex;
//! the acknowledge status is a raw byte (0x00 ok, 0x01 malformed frame).
//! Register addresses auto-increment and wrap at the end of the window,
//! exactly as the I2C front-end does.

use embedded_hal::serial::{Read, Write};
use nb::block;

use crate::iomem::IoWindow;

/// Acknowledge status for a well-formed frame.
const FRAME_OK: u8 = 0x00;

/// Acknowledge status for a malformed or unknown frame.
const FRAME_INVALID: u8 = 0x01;

/// SimpleSerial front-end over the shared window, generic over any UART
/// implementing the `embedded-hal` serial traits.
#[allow(missing_debug_implementations)]
pub struct SimpleSerial<'a, UART> {
    win: &'a IoWindow,
    uart: UART,
}

impl<'a, UART, E> SimpleSerial<'a, UART>
where
    UART: Read<u8, Error = E> + Write<u8, Error = E>,
{
    /// Creates the framing layer over a window and a UART.
    pub fn new(win: &'a IoWindow, uart: UART) -> Self {
        SimpleSerial { win, uart }
    }

    /// Releases the UART.
    pub fn release(self) -> UART {
        self.uart
    }

    /// Processes one frame and sends the acknowledge.
    ///
    /// Call when receive data is pending; the remaining frame bytes are
    /// read blocking, mirroring the byte-at-a-time wire pace. UART-level
    /// errors abort the frame and surface to the caller.
    pub fn service(&mut self) -> Result<(), E> {
        let status = match self.rx()? {
            b'W' => self.write_frame()?,
            b'R' => self.read_frame()?,
            _ => FRAME_INVALID,
        };

        self.ack(status)
    }

    fn write_frame(&mut self) -> Result<u8, E> {
        let addr = match self.rx_hex_byte()? {
            Some(value) => value,
            None => return Ok(FRAME_INVALID),
        };
        let count = match self.rx_hex_byte()? {
            Some(value) => value,
            None => return Ok(FRAME_INVALID),
        };

        for i in 0..count {
            let data = match self.rx_hex_byte()? {
                Some(value) => value,
                None => return Ok(FRAME_INVALID),
            };
            self.win.host_write(addr.wrapping_add(i), data);
        }

        if self.rx()? != b'\n' {
            return Ok(FRAME_INVALID);
        }

        Ok(FRAME_OK)
    }

    fn read_frame(&mut self) -> Result<u8, E> {
        let addr = match self.rx_hex_byte()? {
            Some(value) => value,
            None => return Ok(FRAME_INVALID),
        };
        let count = match self.rx_hex_byte()? {
            Some(value) => value,
            None => return Ok(FRAME_INVALID),
        };

        if self.rx()? != b'\n' {
            return Ok(FRAME_INVALID);
        }

        self.tx(b'r')?;
        for i in 0..count {
            let data = self.win.host_read(addr.wrapping_add(i));
            self.tx_hex_byte(data)?;
        }
        self.tx(b'\n')?;

        Ok(FRAME_OK)
    }

    fn ack(&mut self, status: u8) -> Result<(), E> {
        self.tx(b'z')?;
        self.tx(status)?;
        self.tx(b'\n')
    }

    fn rx(&mut self) -> Result<u8, E> {
        block!(self.uart.read())
    }

    fn tx(&mut self, byte: u8) -> Result<(), E> {
        block!(self.uart.write(byte))
    }

    fn rx_hex_byte(&mut self) -> Result<Option<u8>, E> {
        let hi = hex_nibble(self.rx()?);
        let lo = hex_nibble(self.rx()?);

        match (hi, lo) {
            (Some(hi), Some(lo)) => Ok(Some(hi << 4 | lo)),
            _ => Ok(None),
        }
    }

    fn tx_hex_byte(&mut self, value: u8) -> Result<(), E> {
        const XDIGIT: &[u8; 16] = b"0123456789ABCDEF";

        self.tx(XDIGIT[usize::from(value >> 4)])?;
        self.tx(XDIGIT[usize::from(value & 0x0F)])
    }
}

fn hex_nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'A'..=b'F' => Some(c - b'A' + 0xA),
        b'a'..=b'f' => Some(c - b'a' + 0xA),
        _ => None,
    }
}
