//! Cartridge mapper interface.
//!
//! A mapper translates CPU- and PPU-space addresses into offsets within the
//! cartridge chips, and may latch an IRQ from rendering progress. Chips stay
//! owned by the [`Cartridge`](crate::cartridge::Cartridge); the mapper
//! borrows them per access so banking state is all a mapper carries itself.

use crate::cartridge::Chips;
use crate::cartridge::header::Mirroring;
use crate::error::Result;

/// The two address spaces a cartridge decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Space {
    /// CPU bus, `$4020-$FFFF` is available to the cartridge.
    Cpu,
    /// PPU bus, the cartridge serves the pattern tables.
    Ppu,
}

/// Board-specific address decoding implemented by every cartridge mapper.
pub trait Mapper {
    /// Mapper identifier as used in the iNES header.
    fn id(&self) -> u16;

    /// Human readable board name.
    fn name(&self) -> &'static str;

    /// Returns `true` when the mapper decodes `addr` in `space`.
    fn contains(&self, space: Space, addr: u16) -> bool;

    fn read(&self, chips: &Chips, space: Space, addr: u16) -> Result<u8>;

    fn write(&mut self, chips: &mut Chips, space: Space, addr: u16, value: u8) -> Result<()>;

    /// Current nametable layout. Fixed by a solder pad on simple boards,
    /// runtime-switchable on banked ones.
    fn mirroring(&self) -> Mirroring;

    /// Returns `true` while the mapper asserts the CPU IRQ line.
    fn irq_pending(&self) -> bool {
        false
    }

    /// Acknowledges a pending mapper IRQ.
    fn clear_irq(&mut self) {}

    /// Hook invoked by the PPU at the end of each rendered scanline.
    fn end_of_scanline(&mut self) {}
}
