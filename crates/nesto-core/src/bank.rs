//! Memory banks: the building blocks both buses are assembled from.
//!
//! Every bank answers `contains` for an address window and serves byte reads
//! and writes inside it. The set of bank shapes is closed, so they live in a
//! single sum type rather than behind a trait object:
//!
//! - [`Chip`]: an owned buffer indexed modulo its size, which is exactly how
//!   hardware mirrors a small RAM across a larger window.
//! - [`Forward`]: delegates to caller-supplied closures; used for register
//!   windows that belong to another device.
//! - mapper adapters: route into the cartridge in CPU or PPU space.
//! - [`Nametables`]: CIRAM pages resolved through the cartridge's mirroring.
//! - [`PaletteRam`]: 32 bytes with the `$3F10/$3F14/$3F18/$3F1C` aliases.
//! - [`Void`]: claims a window but rejects every access.

use std::cell::RefCell;
use std::rc::Rc;

use crate::cartridge::Cartridge;
use crate::cartridge::header::Mirroring;
use crate::cartridge::mapper::Space;
use crate::error::{Error, Result};
use crate::memory::ppu as ppu_mem;

/// Read half of a [`Forward`] bank.
pub type Reader = Box<dyn FnMut(u16) -> Result<u8>>;

/// Write half of a [`Forward`] bank.
pub type Writer = Box<dyn FnMut(u16, u8) -> Result<()>>;

/// A contiguous buffer mapped into `[from, to]`, indexed modulo its size.
pub struct Chip {
    from: u16,
    to: u16,
    data: Vec<u8>,
}

impl Chip {
    fn index(&self, addr: u16) -> usize {
        addr as usize % self.data.len()
    }
}

/// Forwards accesses to closures owned by another device.
pub struct Forward {
    from: u16,
    to: u16,
    size: usize,
    reader: Reader,
    writer: Writer,
}

/// Routes a window into the cartridge mapper for one address space.
pub struct MapperAdapter {
    space: Space,
    cartridge: Rc<RefCell<Cartridge>>,
}

/// The PPU's internal nametable RAM, laid out through the cartridge's
/// mirroring. Four pages are kept so four-screen boards need no special
/// casing; horizontal and vertical wiring simply alias pairs of them.
pub struct Nametables {
    pages: [[u8; ppu_mem::NAMETABLE_SIZE]; 4],
    cartridge: Rc<RefCell<Cartridge>>,
}

impl Nametables {
    /// Maps a bus address to `(page, offset)` under the current mirroring.
    fn resolve(&self, addr: u16) -> (usize, usize) {
        let addr = addr as usize % 0x1000;
        let quadrant = addr / ppu_mem::NAMETABLE_SIZE;
        let page = match self.cartridge.borrow().mirroring() {
            Mirroring::Horizontal => quadrant >> 1,
            Mirroring::Vertical => quadrant & 1,
            Mirroring::FourScreen => quadrant,
        };
        (page, addr % ppu_mem::NAMETABLE_SIZE)
    }
}

/// Palette RAM with its canonical mirrors.
pub struct PaletteRam {
    data: [u8; ppu_mem::PALETTE_SIZE],
}

impl PaletteRam {
    /// Sprite palette slots 0 of each group alias the background slots.
    fn index(addr: u16) -> usize {
        let index = addr as usize % ppu_mem::PALETTE_SIZE;
        match index {
            0x10 | 0x14 | 0x18 | 0x1C => index - 0x10,
            _ => index,
        }
    }
}

/// Claims a window and fails every access inside it.
pub struct Void {
    from: u16,
    to: u16,
}

pub enum MemoryBank {
    Chip(Chip),
    Forward(Forward),
    Mapper(MapperAdapter),
    Nametables(Nametables),
    PaletteRam(PaletteRam),
    Void(Void),
}

impl MemoryBank {
    /// A RAM chip of `size` bytes mirrored across `[from, to]`.
    ///
    /// The window length must be a multiple of the chip size, otherwise the
    /// mirroring arithmetic would tear at the wrap point.
    pub fn chip(from: u16, to: u16, size: usize) -> Result<Self> {
        debug_assert!(from <= to);
        let window = to as usize - from as usize + 1;
        if size == 0 || window % size != 0 {
            return Err(Error::InvalidRom(format!(
                "chip size {size:#X} does not divide window {from:#06X}..={to:#06X}"
            )));
        }
        Ok(Self::Chip(Chip {
            from,
            to,
            data: vec![0; size],
        }))
    }

    /// A forwarding bank over `[from, to]` backed by `reader`/`writer`.
    pub fn forward(from: u16, to: u16, size: usize, reader: Reader, writer: Writer) -> Self {
        debug_assert!(from <= to);
        Self::Forward(Forward {
            from,
            to,
            size,
            reader,
            writer,
        })
    }

    /// Adapter into the cartridge for CPU-space accesses.
    pub fn cpu_mapper(cartridge: Rc<RefCell<Cartridge>>) -> Self {
        Self::Mapper(MapperAdapter {
            space: Space::Cpu,
            cartridge,
        })
    }

    /// Adapter into the cartridge for PPU-space accesses.
    pub fn ppu_mapper(cartridge: Rc<RefCell<Cartridge>>) -> Self {
        Self::Mapper(MapperAdapter {
            space: Space::Ppu,
            cartridge,
        })
    }

    /// The nametable region, mirrored through the cartridge.
    pub fn nametables(cartridge: Rc<RefCell<Cartridge>>) -> Self {
        Self::Nametables(Nametables {
            pages: [[0; ppu_mem::NAMETABLE_SIZE]; 4],
            cartridge,
        })
    }

    /// The 32-byte palette file with its mirrors.
    pub fn palette_ram() -> Self {
        Self::PaletteRam(PaletteRam {
            data: [0; ppu_mem::PALETTE_SIZE],
        })
    }

    /// A window that rejects all accesses.
    pub fn void(from: u16, to: u16) -> Self {
        debug_assert!(from <= to);
        Self::Void(Void { from, to })
    }

    /// Returns `true` when this bank claims `addr`.
    pub fn contains(&self, addr: u16) -> bool {
        match self {
            Self::Chip(chip) => (chip.from..=chip.to).contains(&addr),
            Self::Forward(fwd) => (fwd.from..=fwd.to).contains(&addr),
            Self::Mapper(adapter) => adapter.cartridge.borrow().contains(adapter.space, addr),
            Self::Nametables(_) => {
                (ppu_mem::NAMETABLE_START..=ppu_mem::NAMETABLE_END).contains(&addr)
            }
            Self::PaletteRam(_) => (ppu_mem::PALETTE_START..=ppu_mem::PALETTE_END).contains(&addr),
            Self::Void(void) => (void.from..=void.to).contains(&addr),
        }
    }

    pub fn read(&mut self, addr: u16) -> Result<u8> {
        match self {
            Self::Chip(chip) => Ok(chip.data[chip.index(addr)]),
            Self::Forward(fwd) => (fwd.reader)(addr),
            Self::Mapper(adapter) => adapter.cartridge.borrow().read(adapter.space, addr),
            Self::Nametables(nt) => {
                let (page, offset) = nt.resolve(addr);
                Ok(nt.pages[page][offset])
            }
            Self::PaletteRam(palette) => Ok(palette.data[PaletteRam::index(addr)]),
            Self::Void(_) => Err(Error::InvalidAddress { addr }),
        }
    }

    pub fn write(&mut self, addr: u16, value: u8) -> Result<()> {
        match self {
            Self::Chip(chip) => {
                let index = chip.index(addr);
                chip.data[index] = value;
                Ok(())
            }
            Self::Forward(fwd) => (fwd.writer)(addr, value),
            Self::Mapper(adapter) => adapter
                .cartridge
                .borrow_mut()
                .write(adapter.space, addr, value),
            Self::Nametables(nt) => {
                let (page, offset) = nt.resolve(addr);
                nt.pages[page][offset] = value;
                Ok(())
            }
            Self::PaletteRam(palette) => {
                palette.data[PaletteRam::index(addr)] = value;
                Ok(())
            }
            Self::Void(_) => Err(Error::InvalidAddress { addr }),
        }
    }

    /// Physical size of the backing storage.
    pub fn size(&self) -> usize {
        match self {
            Self::Chip(chip) => chip.data.len(),
            Self::Forward(fwd) => fwd.size,
            Self::Mapper(_) => 0,
            Self::Nametables(_) => 4 * ppu_mem::NAMETABLE_SIZE,
            Self::PaletteRam(_) => ppu_mem::PALETTE_SIZE,
            Self::Void(_) => 0,
        }
    }

    /// Raw view of the backing buffer; synthetic banks have none.
    pub fn data(&self) -> Result<&[u8]> {
        match self {
            Self::Chip(chip) => Ok(&chip.data),
            Self::PaletteRam(palette) => Ok(&palette.data),
            Self::Forward(_) => Err(Error::NotImplemented("forwarding banks expose no data")),
            Self::Mapper(_) => Err(Error::NotImplemented("mapper adapters expose no data")),
            Self::Nametables(_) => Err(Error::NotImplemented("nametables expose no flat data")),
            Self::Void(_) => Err(Error::NotImplemented("void banks hold no data")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::test_rom;
    use proptest::prelude::*;

    fn cartridge(mirroring_bit: u8) -> Rc<RefCell<Cartridge>> {
        let mut image = test_rom(1, 1, &[]);
        image[6] = mirroring_bit;
        Rc::new(RefCell::new(Cartridge::from_ines(&image).expect("load")))
    }

    #[test]
    fn chip_mirrors_across_its_window() {
        let mut ram = MemoryBank::chip(0x0000, 0x1FFF, 0x0800).expect("chip");
        ram.write(0x0123, 0xAB).expect("write");
        assert_eq!(ram.read(0x0923).expect("read"), 0xAB);
        assert_eq!(ram.read(0x1923).expect("read"), 0xAB);
        assert_eq!(ram.size(), 0x0800);
        assert_eq!(ram.data().expect("data")[0x123], 0xAB);
    }

    #[test]
    fn chip_rejects_non_dividing_sizes() {
        assert!(MemoryBank::chip(0x0000, 0x1FFF, 0x0300).is_err());
        assert!(MemoryBank::chip(0x0000, 0x1FFF, 0).is_err());
    }

    #[test]
    fn forward_delegates_to_closures() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let mut bank = MemoryBank::forward(
            0x2000,
            0x3FFF,
            8,
            Box::new(|addr| Ok((addr % 8) as u8)),
            Box::new(move |addr, value| {
                log.borrow_mut().push((addr, value));
                Ok(())
            }),
        );
        assert_eq!(bank.read(0x2005).expect("read"), 5);
        bank.write(0x3456, 0x77).expect("write");
        assert_eq!(seen.borrow()[0], (0x3456, 0x77));
        assert!(matches!(bank.data(), Err(Error::NotImplemented(_))));
    }

    #[test]
    fn nametables_mirror_horizontally_and_vertically() {
        let mut horizontal = MemoryBank::nametables(cartridge(0));
        horizontal.write(0x2005, 0x11).expect("write");
        assert_eq!(horizontal.read(0x2405).expect("read"), 0x11);
        assert_eq!(horizontal.read(0x2805).expect("read"), 0x00);
        horizontal.write(0x2C05, 0x22).expect("write");
        assert_eq!(horizontal.read(0x2805).expect("read"), 0x22);

        let mut vertical = MemoryBank::nametables(cartridge(1));
        vertical.write(0x2005, 0x33).expect("write");
        assert_eq!(vertical.read(0x2805).expect("read"), 0x33);
        assert_eq!(vertical.read(0x2405).expect("read"), 0x00);
        // The whole region mirrors again above $3000.
        assert_eq!(vertical.read(0x3005).expect("read"), 0x33);
    }

    #[test]
    fn palette_aliases_sprite_zero_entries() {
        let mut palette = MemoryBank::palette_ram();
        palette.write(0x3F00, 0x0F).expect("write");
        assert_eq!(palette.read(0x3F10).expect("read"), 0x0F);
        palette.write(0x3F14, 0x2A).expect("write");
        assert_eq!(palette.read(0x3F04).expect("read"), 0x2A);
        // Non-zero entries stay distinct.
        palette.write(0x3F01, 0x01).expect("write");
        palette.write(0x3F11, 0x02).expect("write");
        assert_eq!(palette.read(0x3F01).expect("read"), 0x01);
        assert_eq!(palette.read(0x3F11).expect("read"), 0x02);
        // And the region mirrors every 32 bytes.
        assert_eq!(palette.read(0x3FE1).expect("read"), 0x01);
    }

    #[test]
    fn void_rejects_everything() {
        let mut void = MemoryBank::void(0x4018, 0x401F);
        assert!(void.contains(0x4018));
        assert!(matches!(
            void.read(0x4018),
            Err(Error::InvalidAddress { addr: 0x4018 })
        ));
        assert!(matches!(void.write(0x401F, 0), Err(Error::InvalidAddress { .. })));
    }

    proptest! {
        #[test]
        fn ram_mirror_invariant(addr in 0x0000u16..=0x1FFF, value: u8) {
            let mut ram = MemoryBank::chip(0x0000, 0x1FFF, 0x0800).expect("chip");
            ram.write(addr, value).expect("write");
            prop_assert_eq!(ram.read(addr % 0x0800).expect("read"), value);
        }
    }
}
