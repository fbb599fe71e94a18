//! The 256-entry opcode decode table.
//!
//! Each entry names the instruction, its addressing mode, and how it touches
//! memory; the micro-step stager derives the exact cycle sequence from the
//! triple. Undocumented opcodes decode as NOP under the addressing mode of
//! their slot, which reproduces the canonical timing without the side
//! effects.

/// Instruction mnemonics of the documented MOS6502 set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Instruction {
    Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk, Bvc, Bvs,
    Clc, Cld, Cli, Clv, Cmp, Cpx, Cpy, Dec, Dex, Dey, Eor, Inc, Inx,
    Iny, Jmp, Jsr, Lda, Ldx, Ldy, Lsr, Nop, Ora, Pha, Php, Pla, Plp,
    Rol, Ror, Rti, Rts, Sbc, Sec, Sed, Sei, Sta, Stx, Sty, Tax, Tay,
    Tsx, Txa, Txs, Tya,
}

/// The twelve addressing modes (plus accumulator addressing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum AddressingMode {
    /// Operate on the accumulator.
    Acc,
    /// Implied; no operand.
    Imp,
    /// Immediate; the operand follows the opcode.
    Imm,
    /// Relative; branch offset follows the opcode.
    Rel,
    /// Zero page.
    Zp0,
    /// Zero page indexed by X (wraps inside page zero).
    Zpx,
    /// Zero page indexed by Y.
    Zpy,
    /// Absolute.
    Abs,
    /// Absolute indexed by X.
    Abx,
    /// Absolute indexed by Y.
    Aby,
    /// Indirect (JMP only, with the page-wrap quirk).
    Ind,
    /// Indexed indirect: (zp + X).
    Izx,
    /// Indirect indexed: (zp) + Y.
    Izy,
}

/// Bus behaviour class of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum MemoryAccess {
    /// Reads the operand (or touches no memory at all).
    Read,
    /// Reads, writes the unmodified value back, then writes the result.
    ReadModifyWrite,
    /// Writes a register to the effective address.
    Write,
}

/// One decode-table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Opcode {
    pub(crate) instruction: Instruction,
    pub(crate) mode: AddressingMode,
    pub(crate) access: MemoryAccess,
}

const fn r(instruction: Instruction, mode: AddressingMode) -> Opcode {
    Opcode {
        instruction,
        mode,
        access: MemoryAccess::Read,
    }
}

const fn w(instruction: Instruction, mode: AddressingMode) -> Opcode {
    Opcode {
        instruction,
        mode,
        access: MemoryAccess::Write,
    }
}

const fn m(instruction: Instruction, mode: AddressingMode) -> Opcode {
    Opcode {
        instruction,
        mode,
        access: MemoryAccess::ReadModifyWrite,
    }
}

use AddressingMode as A;
use Instruction as I;

#[rustfmt::skip]
pub(crate) static OPCODE_TABLE: [Opcode; 256] = [
    // 0x00
    r(I::Brk, A::Imp), r(I::Ora, A::Izx), r(I::Nop, A::Imp), r(I::Nop, A::Izx),
    r(I::Nop, A::Zp0), r(I::Ora, A::Zp0), m(I::Asl, A::Zp0), r(I::Nop, A::Zp0),
    r(I::Php, A::Imp), r(I::Ora, A::Imm), m(I::Asl, A::Acc), r(I::Nop, A::Imm),
    r(I::Nop, A::Abs), r(I::Ora, A::Abs), m(I::Asl, A::Abs), r(I::Nop, A::Abs),
    // 0x10
    r(I::Bpl, A::Rel), r(I::Ora, A::Izy), r(I::Nop, A::Imp), r(I::Nop, A::Izy),
    r(I::Nop, A::Zpx), r(I::Ora, A::Zpx), m(I::Asl, A::Zpx), r(I::Nop, A::Zpx),
    r(I::Clc, A::Imp), r(I::Ora, A::Aby), r(I::Nop, A::Imp), r(I::Nop, A::Aby),
    r(I::Nop, A::Abx), r(I::Ora, A::Abx), m(I::Asl, A::Abx), r(I::Nop, A::Abx),
    // 0x20
    r(I::Jsr, A::Abs), r(I::And, A::Izx), r(I::Nop, A::Imp), r(I::Nop, A::Izx),
    r(I::Bit, A::Zp0), r(I::And, A::Zp0), m(I::Rol, A::Zp0), r(I::Nop, A::Zp0),
    r(I::Plp, A::Imp), r(I::And, A::Imm), m(I::Rol, A::Acc), r(I::Nop, A::Imm),
    r(I::Bit, A::Abs), r(I::And, A::Abs), m(I::Rol, A::Abs), r(I::Nop, A::Abs),
    // 0x30
    r(I::Bmi, A::Rel), r(I::And, A::Izy), r(I::Nop, A::Imp), r(I::Nop, A::Izy),
    r(I::Nop, A::Zpx), r(I::And, A::Zpx), m(I::Rol, A::Zpx), r(I::Nop, A::Zpx),
    r(I::Sec, A::Imp), r(I::And, A::Aby), r(I::Nop, A::Imp), r(I::Nop, A::Aby),
    r(I::Nop, A::Abx), r(I::And, A::Abx), m(I::Rol, A::Abx), r(I::Nop, A::Abx),
    // 0x40
    r(I::Rti, A::Imp), r(I::Eor, A::Izx), r(I::Nop, A::Imp), r(I::Nop, A::Izx),
    r(I::Nop, A::Zp0), r(I::Eor, A::Zp0), m(I::Lsr, A::Zp0), r(I::Nop, A::Zp0),
    r(I::Pha, A::Imp), r(I::Eor, A::Imm), m(I::Lsr, A::Acc), r(I::Nop, A::Imm),
    r(I::Jmp, A::Abs), r(I::Eor, A::Abs), m(I::Lsr, A::Abs), r(I::Nop, A::Abs),
    // 0x50
    r(I::Bvc, A::Rel), r(I::Eor, A::Izy), r(I::Nop, A::Imp), r(I::Nop, A::Izy),
    r(I::Nop, A::Zpx), r(I::Eor, A::Zpx), m(I::Lsr, A::Zpx), r(I::Nop, A::Zpx),
    r(I::Cli, A::Imp), r(I::Eor, A::Aby), r(I::Nop, A::Imp), r(I::Nop, A::Aby),
    r(I::Nop, A::Abx), r(I::Eor, A::Abx), m(I::Lsr, A::Abx), r(I::Nop, A::Abx),
    // 0x60
    r(I::Rts, A::Imp), r(I::Adc, A::Izx), r(I::Nop, A::Imp), r(I::Nop, A::Izx),
    r(I::Nop, A::Zp0), r(I::Adc, A::Zp0), m(I::Ror, A::Zp0), r(I::Nop, A::Zp0),
    r(I::Pla, A::Imp), r(I::Adc, A::Imm), m(I::Ror, A::Acc), r(I::Nop, A::Imm),
    r(I::Jmp, A::Ind), r(I::Adc, A::Abs), m(I::Ror, A::Abs), r(I::Nop, A::Abs),
    // 0x70
    r(I::Bvs, A::Rel), r(I::Adc, A::Izy), r(I::Nop, A::Imp), r(I::Nop, A::Izy),
    r(I::Nop, A::Zpx), r(I::Adc, A::Zpx), m(I::Ror, A::Zpx), r(I::Nop, A::Zpx),
    r(I::Sei, A::Imp), r(I::Adc, A::Aby), r(I::Nop, A::Imp), r(I::Nop, A::Aby),
    r(I::Nop, A::Abx), r(I::Adc, A::Abx), m(I::Ror, A::Abx), r(I::Nop, A::Abx),
    // 0x80
    r(I::Nop, A::Imm), w(I::Sta, A::Izx), r(I::Nop, A::Imm), r(I::Nop, A::Izx),
    w(I::Sty, A::Zp0), w(I::Sta, A::Zp0), w(I::Stx, A::Zp0), r(I::Nop, A::Zp0),
    r(I::Dey, A::Imp), r(I::Nop, A::Imm), r(I::Txa, A::Imp), r(I::Nop, A::Imm),
    w(I::Sty, A::Abs), w(I::Sta, A::Abs), w(I::Stx, A::Abs), r(I::Nop, A::Abs),
    // 0x90
    r(I::Bcc, A::Rel), w(I::Sta, A::Izy), r(I::Nop, A::Imp), r(I::Nop, A::Izy),
    w(I::Sty, A::Zpx), w(I::Sta, A::Zpx), w(I::Stx, A::Zpy), r(I::Nop, A::Zpy),
    r(I::Tya, A::Imp), w(I::Sta, A::Aby), r(I::Txs, A::Imp), r(I::Nop, A::Aby),
    r(I::Nop, A::Abx), w(I::Sta, A::Abx), r(I::Nop, A::Aby), r(I::Nop, A::Aby),
    // 0xA0
    r(I::Ldy, A::Imm), r(I::Lda, A::Izx), r(I::Ldx, A::Imm), r(I::Nop, A::Izx),
    r(I::Ldy, A::Zp0), r(I::Lda, A::Zp0), r(I::Ldx, A::Zp0), r(I::Nop, A::Zp0),
    r(I::Tay, A::Imp), r(I::Lda, A::Imm), r(I::Tax, A::Imp), r(I::Nop, A::Imm),
    r(I::Ldy, A::Abs), r(I::Lda, A::Abs), r(I::Ldx, A::Abs), r(I::Nop, A::Abs),
    // 0xB0
    r(I::Bcs, A::Rel), r(I::Lda, A::Izy), r(I::Nop, A::Imp), r(I::Nop, A::Izy),
    r(I::Ldy, A::Zpx), r(I::Lda, A::Zpx), r(I::Ldx, A::Zpy), r(I::Nop, A::Zpy),
    r(I::Clv, A::Imp), r(I::Lda, A::Aby), r(I::Tsx, A::Imp), r(I::Nop, A::Aby),
    r(I::Ldy, A::Abx), r(I::Lda, A::Abx), r(I::Ldx, A::Aby), r(I::Nop, A::Aby),
    // 0xC0
    r(I::Cpy, A::Imm), r(I::Cmp, A::Izx), r(I::Nop, A::Imm), r(I::Nop, A::Izx),
    r(I::Cpy, A::Zp0), r(I::Cmp, A::Zp0), m(I::Dec, A::Zp0), r(I::Nop, A::Zp0),
    r(I::Iny, A::Imp), r(I::Cmp, A::Imm), r(I::Dex, A::Imp), r(I::Nop, A::Imm),
    r(I::Cpy, A::Abs), r(I::Cmp, A::Abs), m(I::Dec, A::Abs), r(I::Nop, A::Abs),
    // 0xD0
    r(I::Bne, A::Rel), r(I::Cmp, A::Izy), r(I::Nop, A::Imp), r(I::Nop, A::Izy),
    r(I::Nop, A::Zpx), r(I::Cmp, A::Zpx), m(I::Dec, A::Zpx), r(I::Nop, A::Zpx),
    r(I::Cld, A::Imp), r(I::Cmp, A::Aby), r(I::Nop, A::Imp), r(I::Nop, A::Aby),
    r(I::Nop, A::Abx), r(I::Cmp, A::Abx), m(I::Dec, A::Abx), r(I::Nop, A::Abx),
    // 0xE0
    r(I::Cpx, A::Imm), r(I::Sbc, A::Izx), r(I::Nop, A::Imm), r(I::Nop, A::Izx),
    r(I::Cpx, A::Zp0), r(I::Sbc, A::Zp0), m(I::Inc, A::Zp0), r(I::Nop, A::Zp0),
    r(I::Inx, A::Imp), r(I::Sbc, A::Imm), r(I::Nop, A::Imp), r(I::Nop, A::Imm),
    r(I::Cpx, A::Abs), r(I::Sbc, A::Abs), m(I::Inc, A::Abs), r(I::Nop, A::Abs),
    // 0xF0
    r(I::Beq, A::Rel), r(I::Sbc, A::Izy), r(I::Nop, A::Imp), r(I::Nop, A::Izy),
    r(I::Nop, A::Zpx), r(I::Sbc, A::Zpx), m(I::Inc, A::Zpx), r(I::Nop, A::Zpx),
    r(I::Sed, A::Imp), r(I::Sbc, A::Aby), r(I::Nop, A::Imp), r(I::Nop, A::Aby),
    r(I::Nop, A::Abx), r(I::Sbc, A::Abx), m(I::Inc, A::Abx), r(I::Nop, A::Abx),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documented_rows_decode_as_expected() {
        assert_eq!(OPCODE_TABLE[0x00], r(I::Brk, A::Imp));
        assert_eq!(OPCODE_TABLE[0xA9], r(I::Lda, A::Imm));
        assert_eq!(OPCODE_TABLE[0x8D], w(I::Sta, A::Abs));
        assert_eq!(OPCODE_TABLE[0x6C], r(I::Jmp, A::Ind));
        assert_eq!(OPCODE_TABLE[0xFE], m(I::Inc, A::Abx));
        assert_eq!(OPCODE_TABLE[0x96], w(I::Stx, A::Zpy));
    }

    #[test]
    fn undocumented_slots_fall_back_to_nop() {
        for opcode in [0x02u8, 0x3F, 0x5B, 0x83, 0xDB, 0xFF] {
            let entry = OPCODE_TABLE[opcode as usize];
            assert_eq!(entry.instruction, I::Nop, "opcode {opcode:#04X}");
            assert_eq!(entry.access, MemoryAccess::Read);
        }
    }

    #[test]
    fn only_stores_write_and_only_shifts_modify() {
        for entry in OPCODE_TABLE.iter() {
            match entry.access {
                MemoryAccess::Write => {
                    assert!(matches!(entry.instruction, I::Sta | I::Stx | I::Sty))
                }
                MemoryAccess::ReadModifyWrite => assert!(matches!(
                    entry.instruction,
                    I::Asl | I::Lsr | I::Rol | I::Ror | I::Inc | I::Dec
                )),
                MemoryAccess::Read => {}
            }
        }
    }
}
