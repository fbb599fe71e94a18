//! iNES header parsing.
//!
//! The first 16 bytes of every `.nes` image describe how much PRG/CHR data
//! the cartridge carries, which mapper decodes it, and a handful of
//! compatibility flags. The parser understands the original iNES 1.0 layout
//! and the NES 2.0 extension marker; everything else surfaces as
//! [`Error::InvalidHeader`].

use crate::bitfield::BitField;
use crate::error::{Error, Result};
use crate::memory::{K8, K16};

const MAGIC: [u8; 4] = *b"NES\x1A";

/// Size of the fixed iNES header in bytes.
pub const HEADER_LEN: usize = 16;

/// Size of the optional trainer section preceding PRG-ROM.
pub const TRAINER_LEN: usize = 512;

// Flags 6: mirroring, battery, trainer, four-screen, mapper low nibble.
type MirroringBit = BitField<0, 1>;
type BatteryBit = BitField<1, 1>;
type TrainerBit = BitField<2, 1>;
type FourScreenBit = BitField<3, 1>;
type MapperLo = BitField<4, 4>;

// Flags 7: console type, NES 2.0 marker, mapper high nibble.
type VsUnisystemBit = BitField<0, 1>;
type PlayChoiceBit = BitField<1, 1>;
type FormatBits = BitField<2, 2>;
type MapperHi = BitField<4, 4>;

// Flags 9 (NES 2.0): PRG/CHR ROM size upper bits.
type PrgRomHi = BitField<0, 4>;
type ChrRomHi = BitField<4, 4>;

// Flags 9/10 (iNES 1.0): TV system and PRG-RAM presence.
type TvBit = BitField<0, 1>;
type TvBits10 = BitField<0, 2>;
type NoPrgRamBit = BitField<4, 1>;
type BusConflictBit = BitField<5, 1>;

/// Nametable layout requested by the cartridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mirroring {
    /// Two nametables stacked vertically; addresses mirror horizontally.
    Horizontal,
    /// Two nametables side by side; addresses mirror vertically.
    Vertical,
    /// Cartridge supplies all four nametables.
    FourScreen,
}

/// Header flavour encountered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RomFormat {
    /// The original iNES 1.0 layout.
    INes,
    /// NES 2.0 with extended size fields.
    Nes20,
}

/// Video timing hint embedded in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TvSystem {
    Ntsc,
    Pal,
    /// Cartridge runs on either timing.
    Dual,
}

/// Parsed iNES header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Header {
    pub format: RomFormat,
    /// PRG-ROM size in 16 KiB units.
    pub prg_rom_units: u16,
    /// CHR-ROM size in 8 KiB units; `0` means the cartridge has CHR-RAM.
    pub chr_rom_units: u16,
    /// PRG-RAM size in 8 KiB units (`0` in the file is treated as one unit).
    pub prg_ram_units: u8,
    pub mirroring: Mirroring,
    pub battery: bool,
    pub trainer: bool,
    pub mapper: u16,
    pub vs_unisystem: bool,
    pub playchoice_10: bool,
    pub tv_system: TvSystem,
    pub prg_ram_present: bool,
    pub bus_conflicts: bool,
}

impl Header {
    /// Parses the leading 16 bytes of an iNES image.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::InvalidHeader("fewer than 16 bytes"));
        }
        if bytes[0..4] != MAGIC {
            return Err(Error::InvalidHeader("missing NES magic"));
        }

        let flags6 = bytes[6];
        let flags7 = bytes[7];
        let format = if FormatBits::get(flags7) == 0b10 {
            RomFormat::Nes20
        } else {
            RomFormat::INes
        };

        // NES 2.0 stores bits 8..11 of the ROM unit counts in byte 9: the low
        // nibble extends PRG, the high nibble extends CHR.
        let (prg_rom_units, chr_rom_units) = match format {
            RomFormat::INes => (bytes[4] as u16, bytes[5] as u16),
            RomFormat::Nes20 => (
                PrgRomHi::get(bytes[9]) << 8 | bytes[4] as u16,
                ChrRomHi::get(bytes[9]) << 8 | bytes[5] as u16,
            ),
        };
        if prg_rom_units == 0 {
            return Err(Error::InvalidHeader("header advertises no PRG-ROM"));
        }

        let mirroring = if FourScreenBit::is_set(flags6) {
            Mirroring::FourScreen
        } else if MirroringBit::is_set(flags6) {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        };

        let tv_system = match format {
            // Byte 9 bit 0 and byte 10 bits 0-1 both carry TV hints; byte 10
            // wins when it names the dual-compatible encodings.
            RomFormat::INes => match (TvBits10::get(bytes[10]), TvBit::get(bytes[9])) {
                (1, _) | (3, _) => TvSystem::Dual,
                (2, _) | (_, 1) => TvSystem::Pal,
                _ => TvSystem::Ntsc,
            },
            RomFormat::Nes20 => match bytes[12] & 0b11 {
                1 => TvSystem::Pal,
                2 => TvSystem::Dual,
                _ => TvSystem::Ntsc,
            },
        };

        let prg_ram_units = if bytes[8] == 0 { 1 } else { bytes[8] };

        let header = Self {
            format,
            prg_rom_units,
            chr_rom_units,
            prg_ram_units,
            mirroring,
            battery: BatteryBit::is_set(flags6),
            trainer: TrainerBit::is_set(flags6),
            mapper: MapperHi::get(flags7) << 4 | MapperLo::get(flags6),
            vs_unisystem: VsUnisystemBit::is_set(flags7),
            playchoice_10: PlayChoiceBit::is_set(flags7),
            tv_system,
            prg_ram_present: !NoPrgRamBit::is_set(bytes[10]),
            bus_conflicts: BusConflictBit::is_set(bytes[10]),
        };
        tracing::debug!(
            mapper = header.mapper,
            prg_units = header.prg_rom_units,
            chr_units = header.chr_rom_units,
            mirroring = ?header.mirroring,
            "parsed iNES header"
        );
        Ok(header)
    }

    /// PRG-ROM size in bytes.
    pub fn prg_rom_size(&self) -> usize {
        self.prg_rom_units as usize * K16
    }

    /// CHR-ROM size in bytes; zero for CHR-RAM cartridges.
    pub fn chr_rom_size(&self) -> usize {
        self.chr_rom_units as usize * K8
    }

    /// PRG-RAM size in bytes (at least one 8 KiB unit).
    pub fn prg_ram_size(&self) -> usize {
        self.prg_ram_units as usize * K8
    }

    /// `true` when the cartridge has writable CHR storage.
    pub fn has_chr_ram(&self) -> bool {
        self.chr_rom_units == 0
    }

    /// CHR-RAM size in bytes; one 8 KiB bank when no CHR-ROM is present.
    pub fn chr_ram_size(&self) -> usize {
        if self.has_chr_ram() { K8 } else { 0 }
    }
}
