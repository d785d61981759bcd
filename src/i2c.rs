//! AT24Cxx-style I2C slave state machine
//!
//! Classic serial EEPROMs expose a byte address pointer: the first byte
//! written after an address match sets the pointer, further writes store
//! data at the auto-incrementing pointer, and reads stream bytes from it.
//! This module keeps that protocol state and reduces controller events to
//! [`host_read`]/[`host_write`] calls on the shared window; the board's
//! interrupt handler decodes its controller's status register into
//! [`I2cSlaveEvent`]s and forwards them here.
//!
//! [`host_read`]: crate::IoWindow::host_read
//! [`host_write`]: crate::IoWindow::host_write

use crate::iomem::IoWindow;

/// Events from the I2C slave controller, as decoded by the board's
/// interrupt handler.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum I2cSlaveEvent {
    /// Our slave address matched; a transaction begins.
    AddressMatched,
    /// One data byte arrived from the controller.
    ByteReceived(u8),
    /// The controller is clocking a read and needs the next data byte.
    ByteRequested,
    /// Stop condition / slave deselect.
    Deselected,
    /// The controller reported a state the slave cannot resume from, e.g. a
    /// reserved status encoding or a bus lockup.
    ControllerFault,
}

/// Returned for [`I2cSlaveEvent::ControllerFault`]. Device operation cannot
/// safely continue; the caller should route this to
/// [`Platform::halt`](crate::Platform::halt).
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlaveFault;

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    /// No transaction in progress.
    Ready,
    /// Address matched; the next received byte sets the register pointer.
    Addressed,
    /// Register pointer latched; received bytes are data writes.
    Writing,
}

/// EEPROM-style I2C slave front-end over the shared window.
#[allow(missing_copy_implementations, missing_debug_implementations)]
pub struct I2cSlave<'a> {
    win: &'a IoWindow,
    state: State,
    reg_addr: u8,
}

impl<'a> I2cSlave<'a> {
    /// Creates the slave state machine over a window.
    pub fn new(win: &'a IoWindow) -> Self {
        I2cSlave {
            win,
            state: State::Ready,
            reg_addr: 0,
        }
    }

    /// Resets the protocol state, e.g. when the transport is stopped.
    pub fn reset(&mut self) {
        self.state = State::Ready;
        self.reg_addr = 0;
    }

    /// Feeds one controller event through the state machine.
    ///
    /// Returns the byte to transmit for [`I2cSlaveEvent::ByteRequested`],
    /// `None` for the other events, or [`SlaveFault`] when the controller
    /// reported an unrecoverable state.
    pub fn on_event(&mut self, event: I2cSlaveEvent) -> Result<Option<u8>, SlaveFault> {
        match event {
            I2cSlaveEvent::AddressMatched => {
                self.state = State::Addressed;
                Ok(None)
            }

            I2cSlaveEvent::ByteReceived(data) => {
                if self.state == State::Addressed {
                    // First write after the address match sets the pointer.
                    self.reg_addr = data;
                } else {
                    let addr = self.reg_addr;
                    self.reg_addr = self.reg_addr.wrapping_add(1);
                    self.win.host_write(addr, data);
                }
                self.state = State::Writing;
                Ok(None)
            }

            I2cSlaveEvent::ByteRequested => {
                let addr = self.reg_addr;
                self.reg_addr = self.reg_addr.wrapping_add(1);
                Ok(Some(self.win.host_read(addr)))
            }

            I2cSlaveEvent::Deselected => {
                // The register pointer survives the stop condition, so a
                // plain read continues where the last access left off.
                self.state = State::Ready;
                Ok(None)
            }

            I2cSlaveEvent::ControllerFault => {
                cmem_trace!("i2c controller fault");
                Err(SlaveFault)
            }
        }
    }
}
