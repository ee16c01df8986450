//! Classic CAN frame with an 11-bit identifier.

use core::fmt;

use embedded_can::{Id, StandardId};

use crate::error::FrameError;

/// Highest standard (11-bit) identifier.
pub const MAX_STANDARD_ID: u16 = 0x7FF;

/// An 11-bit CAN data frame carrying 0 to 8 bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanFrame {
    id: u16,
    len: u8,
    data: [u8; 8],
}

impl CanFrame {
    /// Build a frame.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError`] when `id` needs more than 11 bits or `data` is
    /// longer than 8 bytes.
    pub fn new(id: u16, data: &[u8]) -> Result<Self, FrameError> {
        if id > MAX_STANDARD_ID {
            return Err(FrameError::IdentifierOutOfRange(u32::from(id)));
        }
        let len = u8::try_from(data.len())
            .ok()
            .filter(|len| *len <= 8)
            .ok_or(FrameError::PayloadTooLong(data.len()))?;
        let mut buf = [0u8; 8];
        buf[..data.len()].copy_from_slice(data);
        Ok(Self { id, len, data: buf })
    }

    pub fn raw_id(&self) -> u16 {
        self.id
    }

    pub fn data(&self) -> &[u8] {
        &self.data[..usize::from(self.len)]
    }

    pub fn dlc(&self) -> usize {
        usize::from(self.len)
    }
}

impl fmt::Debug for CanFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CanFrame({self})")
    }
}

/// candump compact form, `1A1#C0000081`.
impl fmt::Display for CanFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03X}#", self.id)?;
        for byte in self.data() {
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

impl embedded_can::Frame for CanFrame {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        match id.into() {
            Id::Standard(id) => CanFrame::new(id.as_raw(), data).ok(),
            Id::Extended(_) => None,
        }
    }

    fn new_remote(_id: impl Into<Id>, _dlc: usize) -> Option<Self> {
        None
    }

    fn is_extended(&self) -> bool {
        false
    }

    fn is_remote_frame(&self) -> bool {
        false
    }

    fn id(&self) -> Id {
        StandardId::new(self.id)
            .map(Id::Standard)
            .unwrap_or(Id::Standard(StandardId::ZERO))
    }

    fn dlc(&self) -> usize {
        CanFrame::dlc(self)
    }

    fn data(&self) -> &[u8] {
        CanFrame::data(self)
    }
}
