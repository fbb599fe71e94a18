//! Address-map constants for the CPU and PPU buses.

/// 8 KiB, the iNES CHR and PRG-RAM unit size.
pub const K8: usize = 8 * 1024;

/// 16 KiB, the iNES PRG-ROM unit size.
pub const K16: usize = 16 * 1024;

/// CPU address space.
pub mod cpu {
    /// Internal RAM plus its mirrors (`$0000-$1FFF`).
    pub const RAM_START: u16 = 0x0000;
    pub const RAM_MIRROR_END: u16 = 0x1FFF;
    /// Physical internal RAM size (2 KiB, mirrored four times).
    pub const RAM_SIZE: usize = 0x0800;

    /// PPU register window, mirrored every 8 bytes (`$2000-$3FFF`).
    pub const PPU_REGISTER_START: u16 = 0x2000;
    pub const PPU_REGISTER_END: u16 = 0x3FFF;
    pub const PPU_REGISTER_COUNT: usize = 0x8;

    /// APU and I/O registers (`$4000-$4017`).
    pub const IO_START: u16 = 0x4000;
    pub const IO_END: u16 = 0x4017;
    pub const IO_SIZE: usize = 0x18;

    /// OAM DMA trigger.
    pub const OAM_DMA: u16 = 0x4014;

    /// Controller ports.
    pub const CONTROLLER_1: u16 = 0x4016;
    pub const CONTROLLER_2: u16 = 0x4017;

    /// Normally-disabled APU/I-O test registers (`$4018-$401F`).
    pub const TEST_MODE_START: u16 = 0x4018;
    pub const TEST_MODE_END: u16 = 0x401F;
    pub const TEST_MODE_SIZE: usize = 0x8;

    /// Cartridge space (`$4020-$FFFF`), mapper mediated.
    pub const CARTRIDGE_START: u16 = 0x4020;
    pub const PRG_RAM_START: u16 = 0x6000;
    pub const PRG_RAM_END: u16 = 0x7FFF;
    pub const PRG_ROM_START: u16 = 0x8000;
    pub const ADDR_END: u16 = 0xFFFF;

    /// Stack page base; S indexes into page `$01`.
    pub const STACK_BASE: u16 = 0x0100;

    /// Interrupt vectors.
    pub const NMI_VECTOR: u16 = 0xFFFA;
    pub const RST_VECTOR: u16 = 0xFFFC;
    pub const IRQ_VECTOR: u16 = 0xFFFE;
}

/// PPU address space.
pub mod ppu {
    /// Pattern tables, served by the cartridge CHR chip (`$0000-$1FFF`).
    pub const PATTERN_START: u16 = 0x0000;
    pub const PATTERN_END: u16 = 0x1FFF;
    pub const PATTERN_TABLE_1: u16 = 0x1000;

    /// Nametable region including mirrors (`$2000-$3EFF`).
    pub const NAMETABLE_START: u16 = 0x2000;
    pub const NAMETABLE_END: u16 = 0x3EFF;
    /// One nametable page (32x30 tiles plus the attribute table).
    pub const NAMETABLE_SIZE: usize = 0x0400;
    /// Attribute table offset within the nametable region.
    pub const ATTRIBUTE_BASE: u16 = 0x23C0;

    /// Palette RAM and its mirrors (`$3F00-$3FFF`).
    pub const PALETTE_START: u16 = 0x3F00;
    pub const PALETTE_END: u16 = 0x3FFF;
    pub const PALETTE_SIZE: usize = 0x20;

    /// The PPU address bus is 14 bits wide.
    pub const ADDR_MASK: u16 = 0x3FFF;
}
