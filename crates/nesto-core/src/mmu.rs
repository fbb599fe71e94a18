//! Address demultiplexer over an ordered list of memory banks.

use crate::bank::MemoryBank;
use crate::error::{Error, Result};

/// Routes bus accesses to the first registered bank that claims the address.
///
/// Insertion order is the tie-break when windows overlap: narrower banks must
/// be registered before broader ones.
#[derive(Default)]
pub struct Mmu {
    banks: Vec<MemoryBank>,
}

impl Mmu {
    pub fn new() -> Self {
        Self { banks: Vec::new() }
    }

    /// Registers a bank behind all previously registered ones.
    pub fn add(&mut self, bank: MemoryBank) {
        self.banks.push(bank);
    }

    fn select(&mut self, addr: u16) -> Result<&mut MemoryBank> {
        self.banks
            .iter_mut()
            .find(|bank| bank.contains(addr))
            .ok_or(Error::InvalidAddress { addr })
    }

    pub fn read(&mut self, addr: u16) -> Result<u8> {
        self.select(addr)?.read(addr)
    }

    pub fn write(&mut self, addr: u16, value: u8) -> Result<()> {
        self.select(addr)?.write(addr, value)
    }

    /// Reads a little-endian word, wrapping at the end of the address space.
    pub fn read_word(&mut self, addr: u16) -> Result<u16> {
        let lo = self.read(addr)? as u16;
        let hi = self.read(addr.wrapping_add(1))? as u16;
        Ok(hi << 8 | lo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub(from: u16, to: u16, size: usize) -> MemoryBank {
        MemoryBank::chip(from, to, size).expect("chip")
    }

    #[test]
    fn dispatches_to_first_claiming_bank() {
        let mut mmu = Mmu::new();
        mmu.add(stub(0x0000, 0x1FFF, 0x0800));
        mmu.add(stub(0x2000, 0x3FFF, 0x0008));
        mmu.write(0x0042, 0xAA).expect("write");
        mmu.write(0x2042, 0xBB).expect("write");
        assert_eq!(mmu.read(0x0042).expect("read"), 0xAA);
        assert_eq!(mmu.read(0x2042).expect("read"), 0xBB);
    }

    #[test]
    fn insertion_order_breaks_overlaps() {
        let mut mmu = Mmu::new();
        // A narrow one-byte window registered before a broad one that also
        // claims it; the narrow bank must win.
        mmu.add(stub(0x4014, 0x4014, 1));
        mmu.add(stub(0x4000, 0x4017, 0x18));
        mmu.write(0x4014, 0x12).expect("write");
        mmu.write(0x4015, 0x34).expect("write");
        assert_eq!(mmu.read(0x4014).expect("read"), 0x12);
        assert_eq!(mmu.read(0x4015).expect("read"), 0x34);
        // The broad bank never saw the $4014 write.
        let mut broad = Mmu::new();
        broad.add(stub(0x4000, 0x4017, 0x18));
        assert_eq!(broad.read(0x4014).expect("read"), 0x00);
    }

    #[test]
    fn unclaimed_addresses_fail() {
        let mut mmu = Mmu::new();
        mmu.add(stub(0x0000, 0x1FFF, 0x0800));
        assert!(matches!(
            mmu.read(0x8000),
            Err(Error::InvalidAddress { addr: 0x8000 })
        ));
        assert!(matches!(
            mmu.write(0x8000, 0),
            Err(Error::InvalidAddress { addr: 0x8000 })
        ));
    }

    #[test]
    fn read_word_is_little_endian() {
        let mut mmu = Mmu::new();
        mmu.add(stub(0x0000, 0x1FFF, 0x0800));
        mmu.write(0x0010, 0x34).expect("write");
        mmu.write(0x0011, 0x12).expect("write");
        assert_eq!(mmu.read_word(0x0010).expect("read"), 0x1234);
    }
}
