//! Mapper 0 (NROM), the bankless launch-era board.
//!
//! - PRG-ROM: 16 KiB or 32 KiB at `$8000-$FFFF`; a 16 KiB image is mirrored
//!   into the upper half.
//! - PRG-RAM: `$6000-$7FFF`, mirrored across the window when smaller.
//! - CHR: 8 KiB ROM or RAM at PPU `$0000-$1FFF`; only CHR-RAM accepts writes.

use crate::cartridge::Chips;
use crate::cartridge::header::{Header, Mirroring};
use crate::cartridge::mapper::{Mapper, Space};
use crate::error::{Error, Result};
use crate::memory::{cpu as cpu_mem, ppu as ppu_mem};

/// Mapper 0 state: NROM has no banking registers, only wiring choices.
#[derive(Debug, Clone)]
pub struct Nrom {
    mirroring: Mirroring,
    chr_writable: bool,
}

impl Nrom {
    pub fn new(header: &Header) -> Result<Self> {
        if header.mirroring == Mirroring::FourScreen {
            return Err(Error::InvalidRom(
                "NROM boards cannot provide four-screen mirroring".into(),
            ));
        }
        Ok(Self {
            mirroring: header.mirroring,
            chr_writable: header.has_chr_ram(),
        })
    }
}

impl Mapper for Nrom {
    fn id(&self) -> u16 {
        0
    }

    fn name(&self) -> &'static str {
        "NROM"
    }

    fn contains(&self, space: Space, addr: u16) -> bool {
        match space {
            Space::Cpu => addr >= cpu_mem::PRG_RAM_START,
            Space::Ppu => addr <= ppu_mem::PATTERN_END,
        }
    }

    fn read(&self, chips: &Chips, space: Space, addr: u16) -> Result<u8> {
        match space {
            Space::Cpu if addr >= cpu_mem::PRG_ROM_START => {
                // Indexing modulo the chip size mirrors a 16 KiB image into
                // both halves of the window.
                let offset = (addr - cpu_mem::PRG_ROM_START) as usize;
                Ok(chips.prg_rom[offset % chips.prg_rom.len()])
            }
            Space::Cpu if addr >= cpu_mem::PRG_RAM_START => {
                let offset = (addr - cpu_mem::PRG_RAM_START) as usize;
                Ok(chips.prg_ram[offset % chips.prg_ram.len()])
            }
            Space::Ppu if addr <= ppu_mem::PATTERN_END => {
                Ok(chips.chr.as_slice()[addr as usize % chips.chr.len()])
            }
            _ => Err(Error::InvalidAddress { addr }),
        }
    }

    fn write(&mut self, chips: &mut Chips, space: Space, addr: u16, value: u8) -> Result<()> {
        match space {
            Space::Cpu if (cpu_mem::PRG_RAM_START..=cpu_mem::PRG_RAM_END).contains(&addr) => {
                let offset = (addr - cpu_mem::PRG_RAM_START) as usize;
                let len = chips.prg_ram.len();
                chips.prg_ram[offset % len] = value;
                Ok(())
            }
            Space::Cpu if addr >= cpu_mem::PRG_ROM_START => {
                // PRG-ROM writes are silently ignored, matching the mask ROM.
                Ok(())
            }
            Space::Ppu if addr <= ppu_mem::PATTERN_END && self.chr_writable => {
                let len = chips.chr.len();
                chips.chr.as_mut_slice()[addr as usize % len] = value;
                Ok(())
            }
            Space::Ppu if addr <= ppu_mem::PATTERN_END => {
                // CHR-ROM carts drop the write on the floor.
                Ok(())
            }
            _ => Err(Error::InvalidAddress { addr }),
        }
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::ChrStorage;

    fn header(prg_units: u8, chr_units: u8) -> Header {
        let mut bytes = [0u8; 16];
        bytes[0..4].copy_from_slice(b"NES\x1A");
        bytes[4] = prg_units;
        bytes[5] = chr_units;
        Header::parse(&bytes).expect("header")
    }

    fn chips(header: &Header) -> Chips {
        let prg_rom = (0..header.prg_rom_size())
            .map(|value| (value & 0xFF) as u8)
            .collect::<Vec<_>>();
        Chips::new(header, prg_rom, vec![0; header.chr_rom_size()])
    }

    #[test]
    fn mirrors_16k_prg_rom() {
        let header = header(1, 1);
        let chips = chips(&header);
        let nrom = Nrom::new(&header).expect("mapper");
        let lo = nrom.read(&chips, Space::Cpu, 0x8123).expect("read");
        let hi = nrom.read(&chips, Space::Cpu, 0xC123).expect("read");
        assert_eq!(lo, hi);
    }

    #[test]
    fn prg_ram_round_trips() {
        let header = header(2, 1);
        let mut chips = chips(&header);
        let mut nrom = Nrom::new(&header).expect("mapper");
        nrom.write(&mut chips, Space::Cpu, 0x6010, 0xAB).expect("write");
        assert_eq!(nrom.read(&chips, Space::Cpu, 0x6010).expect("read"), 0xAB);
    }

    #[test]
    fn chr_rom_ignores_writes_but_chr_ram_accepts_them() {
        let rom_header = header(1, 1);
        let mut rom_chips = chips(&rom_header);
        let mut rom = Nrom::new(&rom_header).expect("mapper");
        rom.write(&mut rom_chips, Space::Ppu, 0x0004, 0x55).expect("write");
        assert_eq!(rom.read(&rom_chips, Space::Ppu, 0x0004).expect("read"), 0);

        let ram_header = header(1, 0);
        let mut ram_chips = chips(&ram_header);
        assert!(matches!(ram_chips.chr, ChrStorage::Ram(_)));
        let mut ram = Nrom::new(&ram_header).expect("mapper");
        ram.write(&mut ram_chips, Space::Ppu, 0x0004, 0x55).expect("write");
        assert_eq!(ram.read(&ram_chips, Space::Ppu, 0x0004).expect("read"), 0x55);
    }

    #[test]
    fn cpu_window_starts_at_prg_ram() {
        let header = header(1, 1);
        let nrom = Nrom::new(&header).expect("mapper");
        assert!(!nrom.contains(Space::Cpu, 0x5FFF));
        assert!(nrom.contains(Space::Cpu, 0x6000));
        assert!(nrom.contains(Space::Cpu, 0xFFFF));
        assert!(nrom.contains(Space::Ppu, 0x1FFF));
        assert!(!nrom.contains(Space::Ppu, 0x2000));
    }
}
