//! CPU-visible PPU registers and the internal scroll/address latches.
//!
//! The `$2000-$2007` window decodes to eight registers; most of the real
//! state lives in the internal `v`/`t` address pair, the fine-X latch, and
//! the shared write toggle gating `$2005`/`$2006`.

use bitflags::bitflags;

use crate::bitfield::BitField;
use crate::memory::ppu as ppu_mem;

bitflags! {
    /// PPU control register (`$2000`).
    ///
    /// Bit layout:
    /// ```text
    /// 7 6 5 4 3 2 1 0
    /// N M S B s I n n
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub(crate) struct Control: u8 {
        /// Base nametable select (bits 0-1), copied into T on write.
        const NAMETABLE = 0b0000_0011;

        /// `$2007` address increment: 0 adds 1, 1 adds 32.
        const INCREMENT_32 = 0b0000_0100;

        /// Pattern table for 8x8 sprites.
        const SPRITE_TABLE = 0b0000_1000;

        /// Pattern table for the background.
        const BACKGROUND_TABLE = 0b0001_0000;

        /// Sprite size: 0 renders 8x8, 1 renders 8x16.
        const SPRITE_SIZE_16 = 0b0010_0000;

        /// Master/slave select; unused on a stock console.
        const MASTER_SLAVE = 0b0100_0000;

        /// Raise NMI at vblank entry.
        const NMI_ENABLE = 0b1000_0000;
    }
}

impl Control {
    pub(crate) fn vram_increment(self) -> u16 {
        if self.contains(Control::INCREMENT_32) { 32 } else { 1 }
    }

    pub(crate) fn sprite_pattern_table(self) -> u16 {
        if self.contains(Control::SPRITE_TABLE) {
            ppu_mem::PATTERN_TABLE_1
        } else {
            0
        }
    }

    pub(crate) fn background_pattern_table(self) -> u16 {
        if self.contains(Control::BACKGROUND_TABLE) {
            ppu_mem::PATTERN_TABLE_1
        } else {
            0
        }
    }

    pub(crate) fn sprite_height(self) -> i16 {
        if self.contains(Control::SPRITE_SIZE_16) { 16 } else { 8 }
    }

    pub(crate) fn nmi_enabled(self) -> bool {
        self.contains(Control::NMI_ENABLE)
    }
}

bitflags! {
    /// PPU mask register (`$2001`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub(crate) struct Mask: u8 {
        const GRAYSCALE = 0b0000_0001;
        const SHOW_BACKGROUND_LEFT = 0b0000_0010;
        const SHOW_SPRITES_LEFT = 0b0000_0100;
        const SHOW_BACKGROUND = 0b0000_1000;
        const SHOW_SPRITES = 0b0001_0000;
        const EMPHASIZE_RED = 0b0010_0000;
        const EMPHASIZE_GREEN = 0b0100_0000;
        const EMPHASIZE_BLUE = 0b1000_0000;
    }
}

impl Mask {
    /// `true` when either layer is enabled.
    pub(crate) fn rendering_enabled(self) -> bool {
        self.intersects(Mask::SHOW_BACKGROUND | Mask::SHOW_SPRITES)
    }

    /// The three emphasis bits as an index into the palette tables.
    pub(crate) fn emphasis(self) -> u8 {
        self.bits() >> 5
    }
}

bitflags! {
    /// PPU status register (`$2002`). Only the top three bits are driven.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub(crate) struct PpuStatus: u8 {
        const SPRITE_OVERFLOW = 0b0010_0000;
        const SPRITE_ZERO_HIT = 0b0100_0000;
        const VERTICAL_BLANK = 0b1000_0000;
    }
}

// v/t layout (bits 0-14):
//  14 12 11 10 9      5 4      0
//  [fine_y][NN][coarse_y][coarse_x]
type CoarseX = BitField<0, 5>;
type CoarseY = BitField<5, 5>;
type NametableX = BitField<10, 1>;
type NametableY = BitField<11, 1>;
type FineY = BitField<12, 3>;

const VRAM_ADDR_MASK: u16 = 0x7FFF;

/// One of the PPU's internal 15-bit address registers (`v` or `t`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct VramAddr(u16);

impl VramAddr {
    pub(crate) fn raw(self) -> u16 {
        self.0
    }

    pub(crate) fn set_raw(&mut self, value: u16) {
        self.0 = value & VRAM_ADDR_MASK;
    }

    pub(crate) fn coarse_x(self) -> u16 {
        CoarseX::get(self.0)
    }

    pub(crate) fn set_coarse_x(&mut self, value: u16) {
        CoarseX::set(&mut self.0, value);
    }

    pub(crate) fn coarse_y(self) -> u16 {
        CoarseY::get(self.0)
    }

    pub(crate) fn set_coarse_y(&mut self, value: u16) {
        CoarseY::set(&mut self.0, value);
    }

    pub(crate) fn fine_y(self) -> u16 {
        FineY::get(self.0)
    }

    pub(crate) fn set_fine_y(&mut self, value: u16) {
        FineY::set(&mut self.0, value);
    }

    pub(crate) fn set_nametable(&mut self, value: u16) {
        NametableX::set(&mut self.0, value & 0x1);
        NametableY::set(&mut self.0, value >> 1 & 0x1);
    }

    /// `$2006` first write: bits 8-13 from the low six bits of `value`;
    /// bit 14 is cleared.
    pub(crate) fn set_addr_hi(&mut self, value: u8) {
        self.0 = (self.0 & 0x00FF) | ((value as u16 & 0x3F) << 8);
    }

    /// `$2006` second write: the low address byte.
    pub(crate) fn set_addr_lo(&mut self, value: u8) {
        self.0 = (self.0 & 0x7F00) | value as u16;
    }

    /// `$2007` post-access increment.
    pub(crate) fn increment(&mut self, step: u16) {
        self.0 = self.0.wrapping_add(step) & VRAM_ADDR_MASK;
    }

    /// Nametable byte address for the tile under this scroll position.
    pub(crate) fn tile_addr(self) -> u16 {
        ppu_mem::NAMETABLE_START | (self.0 & 0x0FFF)
    }

    /// Attribute byte address for the tile under this scroll position.
    pub(crate) fn attribute_addr(self) -> u16 {
        ppu_mem::ATTRIBUTE_BASE
            | (NametableY::get(self.0) << 11)
            | (NametableX::get(self.0) << 10)
            | ((self.coarse_y() >> 2) << 3)
            | (self.coarse_x() >> 2)
    }

    /// Coarse X increment with the nametable-X toggle at tile 31.
    pub(crate) fn increment_x(&mut self) {
        if self.coarse_x() == 31 {
            self.set_coarse_x(0);
            NametableX::xor(&mut self.0, 1);
        } else {
            CoarseX::incr(&mut self.0);
        }
    }

    /// Fine Y increment, rolling into coarse Y with the nametable-Y toggle
    /// at row 29 (rows 30-31 hold the attribute tables and wrap silently).
    pub(crate) fn increment_y(&mut self) {
        if self.fine_y() < 7 {
            FineY::incr(&mut self.0);
            return;
        }
        self.set_fine_y(0);
        match self.coarse_y() {
            29 => {
                self.set_coarse_y(0);
                NametableY::xor(&mut self.0, 1);
            }
            31 => self.set_coarse_y(0),
            _ => {
                CoarseY::incr(&mut self.0);
            }
        }
    }

    /// Copies the horizontal bits (coarse X, nametable X) from `other`.
    pub(crate) fn copy_horizontal(&mut self, other: VramAddr) {
        CoarseX::set(&mut self.0, other.coarse_x());
        NametableX::set(&mut self.0, NametableX::get(other.0));
    }

    /// Copies the vertical bits (fine Y, coarse Y, nametable Y) from `other`.
    pub(crate) fn copy_vertical(&mut self, other: VramAddr) {
        FineY::set(&mut self.0, other.fine_y());
        CoarseY::set(&mut self.0, other.coarse_y());
        NametableY::set(&mut self.0, NametableY::get(other.0));
    }
}

/// Register file plus the internal latches behind the CPU window.
#[derive(Debug)]
pub(crate) struct Registers {
    pub(crate) control: Control,
    pub(crate) mask: Mask,
    pub(crate) status: PpuStatus,
    pub(crate) oam_addr: u8,
    /// Internal VRAM address (`v`).
    pub(crate) vram: VramAddr,
    /// Staging address (`t`), written through `$2005`/`$2006`.
    pub(crate) tram: VramAddr,
    /// Fine X scroll (3 bits).
    pub(crate) fine_x: u8,
    /// Shared first/second write toggle for `$2005`/`$2006`.
    pub(crate) write_toggle: bool,
    /// Delayed `$2007` read buffer.
    pub(crate) read_buffer: u8,
    /// Last value driven on the register bus; feeds open-bus reads.
    pub(crate) open_bus: u8,
}

impl Registers {
    pub(crate) fn new() -> Self {
        Self {
            control: Control::empty(),
            mask: Mask::empty(),
            status: PpuStatus::empty(),
            oam_addr: 0,
            vram: VramAddr::default(),
            tram: VramAddr::default(),
            fine_x: 0,
            write_toggle: false,
            read_buffer: 0,
            open_bus: 0,
        }
    }

    /// `$2000` write: store control and copy the nametable bits into T.
    pub(crate) fn write_control(&mut self, value: u8) {
        self.control = Control::from_bits_retain(value);
        self.tram.set_nametable((value & 0b11) as u16);
    }

    /// `$2005` write pair: X scroll first, Y scroll second.
    pub(crate) fn write_scroll(&mut self, value: u8) {
        if !self.write_toggle {
            self.fine_x = value & 0x07;
            self.tram.set_coarse_x((value >> 3) as u16);
        } else {
            self.tram.set_fine_y((value & 0x07) as u16);
            self.tram.set_coarse_y((value >> 3) as u16);
        }
        self.write_toggle = !self.write_toggle;
    }

    /// `$2006` write pair: high six bits first, low byte second. The second
    /// write commits T into V.
    pub(crate) fn write_addr(&mut self, value: u8) {
        if !self.write_toggle {
            self.tram.set_addr_hi(value);
        } else {
            self.tram.set_addr_lo(value);
            self.vram = self.tram;
        }
        self.write_toggle = !self.write_toggle;
    }

    /// `$2002` read: latched high bits over open bus, clearing the vblank
    /// flag and the write toggle.
    pub(crate) fn read_status(&mut self) -> u8 {
        let value = (self.open_bus & 0x1F) | (self.status.bits() & 0xE0);
        self.status.remove(PpuStatus::VERTICAL_BLANK);
        self.write_toggle = false;
        self.open_bus = value;
        value
    }
}
