//! OAM DMA: the `$4014` burst copy of one CPU page into sprite memory.
//!
//! While a transfer runs the CPU is off the bus. The burst costs 513 CPU
//! cycles, or 514 when the triggering write lands on an odd CPU cycle; the
//! extra cycle realigns the engine to an even read slot.

/// What the DMA engine does with the CPU cycle it has claimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaCycle {
    /// Alignment cycle; nothing on the bus.
    Align,
    /// Read the next source byte from the CPU bus.
    Read(u16),
    /// Write the previously read byte into OAM at `OAMADDR + offset`.
    Write { offset: u8, data: u8 },
}

/// DMA engine state, owned by the console and triggered through the bus.
#[derive(Debug, Default)]
pub struct OamDma {
    page: u8,
    offset: u16,
    latch: u8,
    align: u8,
    reading: bool,
    active: bool,
}

impl OamDma {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latches a transfer of page `page`. `odd_cycle` is the parity of the
    /// CPU cycle the `$4014` write occurred on.
    pub fn begin(&mut self, page: u8, odd_cycle: bool) {
        self.page = page;
        self.offset = 0;
        self.align = if odd_cycle { 2 } else { 1 };
        self.reading = true;
        self.active = true;
    }

    /// Source page latched by the last `$4014` write; reading the register
    /// back sees this value.
    pub fn page(&self) -> u8 {
        self.page
    }

    /// Returns `true` while the engine holds the CPU bus.
    pub fn active(&self) -> bool {
        self.active
    }

    /// Claims one CPU cycle and reports the bus action to perform.
    pub fn step(&mut self) -> DmaCycle {
        if self.align > 0 {
            self.align -= 1;
            return DmaCycle::Align;
        }
        if self.reading {
            self.reading = false;
            DmaCycle::Read((self.page as u16) << 8 | self.offset)
        } else {
            self.reading = true;
            let cycle = DmaCycle::Write {
                offset: self.offset as u8,
                data: self.latch,
            };
            self.offset += 1;
            if self.offset == 0x100 {
                self.active = false;
            }
            cycle
        }
    }

    /// Stores the byte produced by a [`DmaCycle::Read`].
    pub fn set_latch(&mut self, data: u8) {
        self.latch = data;
    }
}
