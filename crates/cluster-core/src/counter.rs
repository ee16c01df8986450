//! Rolling counters embedded in cluster frames.
//!
//! Wrap thresholds are part of each bus protocol; a cluster that sees an
//! unexpected value raises a fault, so the limit is fixed per counter.

/// Counter that returns to zero once it reaches `limit`.
///
/// The value is always in `0..limit`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RollingCounter {
    value: u8,
    limit: u8,
}

impl RollingCounter {
    /// A counter starting at 0. A `limit` of 0 behaves like 1.
    pub const fn new(limit: u8) -> Self {
        Self::starting_at(0, limit)
    }

    /// A counter starting at `value`, reduced into range.
    pub const fn starting_at(value: u8, limit: u8) -> Self {
        let limit = if limit == 0 { 1 } else { limit };
        Self {
            value: value % limit,
            limit,
        }
    }

    /// 0..=15, the usual frame sequence nibble.
    pub const fn nibble() -> Self {
        Self::new(16)
    }

    pub const fn value(&self) -> u8 {
        self.value
    }

    pub const fn limit(&self) -> u8 {
        self.limit
    }

    /// Advance by one and return the new value.
    pub fn advance(&mut self) -> u8 {
        let next = u16::from(self.value) + 1;
        self.value = if next >= u16::from(self.limit) {
            0
        } else {
            next as u8
        };
        self.value
    }
}

/// Length of one blink cycle in slow ticks: 9 on, 7 off.
const FLASH_PERIOD: u8 = 16;
const FLASH_ON_TICKS: u8 = 9;

/// Software blink generator for clusters that need the lamp toggled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlashPhase {
    ticks: u8,
}

impl FlashPhase {
    pub const fn new() -> Self {
        Self { ticks: 0 }
    }

    /// Advance one tick and report whether the lamp is lit.
    pub fn advance(&mut self) -> bool {
        self.ticks += 1;
        if self.ticks >= FLASH_PERIOD {
            self.ticks = 0;
        }
        self.ticks < FLASH_ON_TICKS
    }

    pub fn reset(&mut self) {
        self.ticks = 0;
    }
}
