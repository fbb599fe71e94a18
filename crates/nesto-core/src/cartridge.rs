//! Cartridge model: header, chips, and the mapper that wires them together.

pub mod header;
pub mod mapper;
pub mod nrom;

use crate::error::{Error, Result};
use crate::memory::K8;
use header::{HEADER_LEN, Header, Mirroring, TRAINER_LEN};
use mapper::{Mapper, Space};
use nrom::Nrom;

/// CHR storage is either mask ROM or 8 KiB of cartridge RAM, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChrStorage {
    Rom(Vec<u8>),
    Ram(Vec<u8>),
}

impl ChrStorage {
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        match self {
            Self::Rom(data) | Self::Ram(data) => data,
        }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        match self {
            Self::Rom(data) | Self::Ram(data) => data,
        }
    }
}

/// The physical memory chips soldered to the board.
#[derive(Debug, Clone)]
pub struct Chips {
    pub prg_rom: Vec<u8>,
    pub prg_ram: Vec<u8>,
    pub chr: ChrStorage,
}

impl Chips {
    /// Allocates chips according to the header: PRG-RAM is zero-filled and
    /// CHR-RAM is substituted when the image carries no CHR-ROM.
    pub fn new(header: &Header, prg_rom: Vec<u8>, chr_rom: Vec<u8>) -> Self {
        let chr = if header.has_chr_ram() {
            ChrStorage::Ram(vec![0; header.chr_ram_size()])
        } else {
            ChrStorage::Rom(chr_rom)
        };
        Self {
            prg_rom,
            prg_ram: vec![0; header.prg_ram_size()],
            chr,
        }
    }
}

/// A loaded cartridge: parsed header, chip contents, and the decoding mapper.
pub struct Cartridge {
    header: Header,
    chips: Chips,
    mapper: Box<dyn Mapper>,
}

impl Cartridge {
    /// Parses a complete iNES image: 16-byte header, optional 512-byte
    /// trainer, PRG-ROM, then CHR-ROM.
    pub fn from_ines(bytes: &[u8]) -> Result<Self> {
        let header = Header::parse(bytes)?;

        let mut cursor = HEADER_LEN;
        if header.trainer {
            // Trainers patched long-dead copiers; skip the blob.
            cursor += TRAINER_LEN;
        }

        let prg_len = header.prg_rom_size();
        let prg_end = cursor + prg_len;
        if bytes.len() < prg_end {
            return Err(Error::InvalidRom(format!(
                "PRG-ROM section expected {prg_len} bytes, got {}",
                bytes.len().saturating_sub(cursor)
            )));
        }
        let prg_rom = bytes[cursor..prg_end].to_vec();
        cursor = prg_end;

        let chr_len = header.chr_rom_size();
        let chr_end = cursor + chr_len;
        if bytes.len() < chr_end {
            return Err(Error::InvalidRom(format!(
                "CHR-ROM section expected {chr_len} bytes, got {}",
                bytes.len().saturating_sub(cursor)
            )));
        }
        let chr_rom = bytes[cursor..chr_end].to_vec();

        let chips = Chips::new(&header, prg_rom, chr_rom);
        let mapper: Box<dyn Mapper> = match header.mapper {
            0 => Box::new(Nrom::new(&header)?),
            id => return Err(Error::InvalidRom(format!("mapper {id} is not implemented"))),
        };
        tracing::debug!(mapper = mapper.name(), "cartridge ready");

        Ok(Self {
            header,
            chips,
            mapper,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Returns `true` when the mapper decodes `addr` in `space`.
    pub fn contains(&self, space: Space, addr: u16) -> bool {
        self.mapper.contains(space, addr)
    }

    pub fn read(&self, space: Space, addr: u16) -> Result<u8> {
        self.mapper.read(&self.chips, space, addr)
    }

    pub fn write(&mut self, space: Space, addr: u16, value: u8) -> Result<()> {
        self.mapper.write(&mut self.chips, space, addr, value)
    }

    /// Nametable layout currently selected by the mapper.
    pub fn mirroring(&self) -> Mirroring {
        self.mapper.mirroring()
    }

    pub fn irq_pending(&self) -> bool {
        self.mapper.irq_pending()
    }

    pub fn clear_irq(&mut self) {
        self.mapper.clear_irq();
    }

    /// Forwarded from the PPU at the end of each rendered scanline.
    pub fn end_of_scanline(&mut self) {
        self.mapper.end_of_scanline();
    }
}

impl std::fmt::Debug for Cartridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cartridge")
            .field("header", &self.header)
            .field("mapper", &self.mapper.name())
            .finish()
    }
}

/// Builds a minimal headered NROM image for tests and examples.
#[cfg(test)]
pub(crate) fn test_rom(prg_units: u8, chr_units: u8, patch: &[(usize, u8)]) -> Vec<u8> {
    let mut bytes = vec![0u8; HEADER_LEN + prg_units as usize * 2 * K8 + chr_units as usize * K8];
    bytes[0..4].copy_from_slice(b"NES\x1A");
    bytes[4] = prg_units;
    bytes[5] = chr_units;
    for &(offset, value) in patch {
        bytes[HEADER_LEN + offset] = value;
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_prg_and_chr_sections() {
        let mut image = test_rom(1, 1, &[(0x0000, 0xA9), (0x4000, 0x3C)]);
        let len = image.len();
        image[len - 1] = 0x77;
        let cartridge = Cartridge::from_ines(&image).expect("load");
        assert_eq!(cartridge.read(Space::Cpu, 0x8000).expect("read"), 0xA9);
        assert_eq!(cartridge.read(Space::Ppu, 0x0000).expect("read"), 0x3C);
        assert_eq!(cartridge.read(Space::Ppu, 0x1FFF).expect("read"), 0x77);
    }

    #[test]
    fn trainer_offsets_the_prg_section() {
        let mut image = test_rom(1, 1, &[]);
        image[6] = 0b0000_0100;
        image.splice(HEADER_LEN..HEADER_LEN, std::iter::repeat_n(0xEE, TRAINER_LEN));
        image[HEADER_LEN + TRAINER_LEN] = 0x42;
        let cartridge = Cartridge::from_ines(&image).expect("load");
        assert_eq!(cartridge.read(Space::Cpu, 0x8000).expect("read"), 0x42);
    }

    #[test]
    fn short_sections_are_rejected() {
        let image = test_rom(2, 1, &[]);
        assert!(matches!(
            Cartridge::from_ines(&image[..image.len() - 1]),
            Err(Error::InvalidRom(_))
        ));
        assert!(matches!(
            Cartridge::from_ines(&image[..HEADER_LEN + 100]),
            Err(Error::InvalidRom(_))
        ));
    }

    #[test]
    fn unsupported_mapper_is_rejected() {
        let mut image = test_rom(1, 1, &[]);
        image[6] = 0b0001_0000;
        assert!(matches!(
            Cartridge::from_ines(&image),
            Err(Error::InvalidRom(_))
        ));
    }
}
