use bitflags::bitflags;

bitflags! {
    /// The 6502 processor status register (P).
    ///
    /// Bit layout:
    /// 7 6 5 4 3 2 1 0
    /// N V U B D I Z C
    ///
    /// B and U are not physical flag latches; they only exist in the byte
    /// pushed to the stack. D is decoded but has no effect on the 2A03.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Status: u8 {
        /// Carry flag (C).
        const CARRY = 0b0000_0001;

        /// Zero flag (Z).
        const ZERO = 0b0000_0010;

        /// Interrupt disable flag (I). Masks IRQ while set.
        const INTERRUPT = 0b0000_0100;

        /// Decimal mode flag (D); storable but inert on the NES CPU.
        const DECIMAL = 0b0000_1000;

        /// Break flag (B), set in the byte pushed by BRK/PHP.
        const BREAK = 0b0001_0000;

        /// Unused bit, always reads back as 1.
        const UNUSED = 0b0010_0000;

        /// Overflow flag (V).
        const OVERFLOW = 0b0100_0000;

        /// Negative flag (N), mirrors bit 7 of the last result.
        const NEGATIVE = 0b1000_0000;
    }
}

impl Status {
    /// Power-up value observed on hardware.
    pub fn power_on() -> Self {
        Status::from_bits_retain(0x34)
    }

    /// Updates Z from a result byte.
    pub fn update_zero(&mut self, value: u8) {
        self.set(Status::ZERO, value == 0);
    }

    /// Updates N from bit 7 of a result byte.
    pub fn update_negative(&mut self, value: u8) {
        self.set(Status::NEGATIVE, value & 0x80 != 0);
    }
}
