//! Micro-steps: the per-cycle actions instructions are staged into.
//!
//! Decoding an opcode pushes a fixed sequence of [`MicroOp`]s derived from
//! `(instruction, addressing mode, memory access)`; executing one step per
//! tick reproduces the documented cycle counts, including the page-cross
//! penalty (a [`StepStatus::Skip`]) and early branch completion (a
//! [`StepStatus::Stop`]).

use crate::cpu::Cpu;
use crate::cpu::alu;
use crate::cpu::opcodes::{AddressingMode, Instruction, MemoryAccess};
use crate::cpu::pipeline::StepStatus;
use crate::cpu::status::Status;
use crate::error::Result;
use crate::mmu::Mmu;

/// One cycle's worth of CPU work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MicroOp {
    // Effective-address computation.
    FetchAddrLo,
    FetchAddrHi,
    /// Read the address high byte and jump there (JMP/JSR absolute).
    FetchAddrHiJump,
    FetchAddrHiIndexX,
    FetchAddrHiIndexY,
    /// Dummy read of the uncorrected address; free when no page was crossed.
    FixAddrHiRead,
    /// Dummy read that always burns the cycle (write and modify ops).
    FixAddrHiWrite,
    FetchAddrZp,
    ZpIndexX,
    ZpIndexY,
    FetchPtrLo,
    FetchPtrHi,
    ReadAddrLoAtPtr,
    /// Final JMP (ind) cycle, preserving the page-wrap bug of the 6502.
    IndirectJump,
    FetchPtrZp,
    DummyReadPtr,
    ReadAddrLoPtrX,
    ReadAddrHiPtrX,
    ReadAddrLoPtrZp,
    ReadAddrHiPtrY,
    // Read-modify-write plumbing.
    FetchData,
    WriteBack,
    // Branches.
    SkipOperand,
    BranchPad,
    TakeBranch,
    // Stack and interrupt sequences.
    JsrPad,
    DummyReadPc,
    StackPad,
    PushPch,
    PushPcl,
    PushA,
    PushPhp,
    PushPBrk,
    PushPInterrupt,
    PullA,
    PullStatus,
    PullPcl,
    PullPch,
    IncPc,
    BrkPad,
    VectorPcl,
    VectorPch,
    // Reset tail.
    RstRegA,
    RstRegX,
    RstRegY,
    RstRegS,
    RstRegP,
    /// Apply the decoded instruction's own effect.
    Execute,
}

/// Stages the addressing-mode cycles for the freshly decoded opcode.
pub(crate) fn stage_addressing(cpu: &mut Cpu) {
    use MicroOp::*;
    let mode = cpu.context.mode;
    let access = cpu.context.access;
    let rmw = access == MemoryAccess::ReadModifyWrite;
    match mode {
        AddressingMode::Acc | AddressingMode::Imp | AddressingMode::Imm | AddressingMode::Rel => {}
        AddressingMode::Abs => match cpu.context.instruction {
            Instruction::Jmp => {
                cpu.pipeline.push(FetchAddrLo);
                cpu.pipeline.push(FetchAddrHiJump);
            }
            Instruction::Jsr => {
                cpu.pipeline.push(FetchAddrLo);
                cpu.pipeline.push(JsrPad);
                cpu.pipeline.push(PushPch);
                cpu.pipeline.push(PushPcl);
                cpu.pipeline.push(FetchAddrHiJump);
            }
            _ => {
                cpu.pipeline.push(FetchAddrLo);
                cpu.pipeline.push(FetchAddrHi);
                if rmw {
                    cpu.pipeline.push(FetchData);
                    cpu.pipeline.push(WriteBack);
                }
            }
        },
        AddressingMode::Abx | AddressingMode::Aby => {
            cpu.pipeline.push(FetchAddrLo);
            cpu.pipeline.push(if mode == AddressingMode::Abx {
                FetchAddrHiIndexX
            } else {
                FetchAddrHiIndexY
            });
            cpu.pipeline.push(if access == MemoryAccess::Read {
                FixAddrHiRead
            } else {
                FixAddrHiWrite
            });
            if rmw {
                cpu.pipeline.push(FetchData);
                cpu.pipeline.push(WriteBack);
            }
        }
        AddressingMode::Zp0 => {
            cpu.pipeline.push(FetchAddrZp);
            if rmw {
                cpu.pipeline.push(FetchData);
                cpu.pipeline.push(WriteBack);
            }
        }
        AddressingMode::Zpx | AddressingMode::Zpy => {
            cpu.pipeline.push(FetchAddrZp);
            cpu.pipeline.push(if mode == AddressingMode::Zpx {
                ZpIndexX
            } else {
                ZpIndexY
            });
            if rmw {
                cpu.pipeline.push(FetchData);
                cpu.pipeline.push(WriteBack);
            }
        }
        AddressingMode::Ind => {
            cpu.pipeline.push(FetchPtrLo);
            cpu.pipeline.push(FetchPtrHi);
            cpu.pipeline.push(ReadAddrLoAtPtr);
            cpu.pipeline.push(IndirectJump);
        }
        AddressingMode::Izx => {
            cpu.pipeline.push(FetchPtrZp);
            cpu.pipeline.push(DummyReadPtr);
            cpu.pipeline.push(ReadAddrLoPtrX);
            cpu.pipeline.push(ReadAddrHiPtrX);
            if rmw {
                cpu.pipeline.push(FetchData);
                cpu.pipeline.push(WriteBack);
            }
        }
        AddressingMode::Izy => {
            cpu.pipeline.push(FetchPtrZp);
            cpu.pipeline.push(ReadAddrLoPtrZp);
            cpu.pipeline.push(ReadAddrHiPtrY);
            cpu.pipeline.push(if access == MemoryAccess::Read {
                FixAddrHiRead
            } else {
                FixAddrHiWrite
            });
            if rmw {
                cpu.pipeline.push(FetchData);
                cpu.pipeline.push(WriteBack);
            }
        }
    }
}

/// Stages the instruction's own cycles after the addressing-mode cycles.
pub(crate) fn stage_instruction(cpu: &mut Cpu) {
    use MicroOp::*;
    match cpu.context.instruction {
        // Control transfers are folded into the addressing stage.
        Instruction::Jmp | Instruction::Jsr => {}

        // Branch conditions are known at decode time; P cannot change
        // between decode and the staged steps of the same instruction.
        Instruction::Bcc => stage_branch(cpu, !cpu.p.contains(Status::CARRY)),
        Instruction::Bcs => stage_branch(cpu, cpu.p.contains(Status::CARRY)),
        Instruction::Bne => stage_branch(cpu, !cpu.p.contains(Status::ZERO)),
        Instruction::Beq => stage_branch(cpu, cpu.p.contains(Status::ZERO)),
        Instruction::Bpl => stage_branch(cpu, !cpu.p.contains(Status::NEGATIVE)),
        Instruction::Bmi => stage_branch(cpu, cpu.p.contains(Status::NEGATIVE)),
        Instruction::Bvc => stage_branch(cpu, !cpu.p.contains(Status::OVERFLOW)),
        Instruction::Bvs => stage_branch(cpu, cpu.p.contains(Status::OVERFLOW)),

        Instruction::Brk => {
            cpu.context.vector = crate::memory::cpu::IRQ_VECTOR;
            cpu.pipeline.push(BrkPad);
            cpu.pipeline.push(PushPch);
            cpu.pipeline.push(PushPcl);
            cpu.pipeline.push(PushPBrk);
            cpu.pipeline.push(VectorPcl);
            cpu.pipeline.push(VectorPch);
        }

        Instruction::Pha => {
            cpu.pipeline.push(DummyReadPc);
            cpu.pipeline.push(PushA);
        }
        Instruction::Php => {
            cpu.pipeline.push(DummyReadPc);
            cpu.pipeline.push(PushPhp);
        }
        Instruction::Pla => {
            cpu.pipeline.push(DummyReadPc);
            cpu.pipeline.push(StackPad);
            cpu.pipeline.push(PullA);
        }
        Instruction::Plp => {
            cpu.pipeline.push(DummyReadPc);
            cpu.pipeline.push(StackPad);
            cpu.pipeline.push(PullStatus);
        }
        Instruction::Rti => {
            cpu.pipeline.push(DummyReadPc);
            cpu.pipeline.push(StackPad);
            cpu.pipeline.push(PullStatus);
            cpu.pipeline.push(PullPcl);
            cpu.pipeline.push(PullPch);
        }
        Instruction::Rts => {
            cpu.pipeline.push(DummyReadPc);
            cpu.pipeline.push(StackPad);
            cpu.pipeline.push(PullPcl);
            cpu.pipeline.push(PullPch);
            cpu.pipeline.push(IncPc);
        }

        // Everything else retires in a single execute cycle.
        _ => cpu.pipeline.push(Execute),
    }
}

fn stage_branch(cpu: &mut Cpu, taken: bool) {
    use MicroOp::*;
    if taken {
        cpu.pipeline.push(BranchPad);
        cpu.pipeline.push(TakeBranch);
        cpu.pipeline.push(BranchPad);
    } else {
        cpu.pipeline.push(SkipOperand);
    }
}

impl MicroOp {
    pub(crate) fn exec(self, cpu: &mut Cpu, bus: &mut Mmu) -> Result<StepStatus> {
        use MicroOp::*;
        match self {
            FetchAddrLo => {
                let value = bus.read(cpu.pc)?;
                cpu.pc = cpu.pc.wrapping_add(1);
                cpu.set_addr_lo(value);
            }
            FetchAddrHi => {
                let value = bus.read(cpu.pc)?;
                cpu.pc = cpu.pc.wrapping_add(1);
                cpu.set_addr_hi(value);
            }
            FetchAddrHiJump => {
                let value = bus.read(cpu.pc)?;
                cpu.pc = cpu.pc.wrapping_add(1);
                cpu.set_addr_hi(value);
                cpu.pc = cpu.context.addr;
            }
            FetchAddrHiIndexX => {
                let value = bus.read(cpu.pc)?;
                cpu.pc = cpu.pc.wrapping_add(1);
                cpu.set_addr_hi(value);
                cpu.index_addr(cpu.x);
            }
            FetchAddrHiIndexY => {
                let value = bus.read(cpu.pc)?;
                cpu.pc = cpu.pc.wrapping_add(1);
                cpu.set_addr_hi(value);
                cpu.index_addr(cpu.y);
            }
            FixAddrHiRead => {
                // The uncorrected high byte was already driven onto the bus;
                // reading through it costs the extra cycle only on a cross.
                if cpu.context.crossed_page {
                    bus.read(cpu.context.addr.wrapping_sub(0x0100))?;
                } else {
                    return Ok(StepStatus::Skip);
                }
            }
            FixAddrHiWrite => {
                if cpu.context.crossed_page {
                    bus.read(cpu.context.addr.wrapping_sub(0x0100))?;
                } else {
                    bus.read(cpu.context.addr)?;
                }
            }
            FetchAddrZp => {
                cpu.context.addr = bus.read(cpu.pc)? as u16;
                cpu.pc = cpu.pc.wrapping_add(1);
            }
            ZpIndexX => {
                bus.read(cpu.pc)?;
                cpu.context.addr = (cpu.context.addr + cpu.x as u16) & 0x00FF;
            }
            ZpIndexY => {
                bus.read(cpu.pc)?;
                cpu.context.addr = (cpu.context.addr + cpu.y as u16) & 0x00FF;
            }
            FetchPtrLo => {
                let value = bus.read(cpu.pc)?;
                cpu.pc = cpu.pc.wrapping_add(1);
                cpu.set_ptr_lo(value);
            }
            FetchPtrHi => {
                let value = bus.read(cpu.pc)?;
                cpu.pc = cpu.pc.wrapping_add(1);
                cpu.set_ptr_hi(value);
            }
            ReadAddrLoAtPtr => {
                let value = bus.read(cpu.context.ptr)?;
                cpu.set_addr_lo(value);
            }
            IndirectJump => {
                // The pointer's high byte never increments, so a pointer at
                // $xxFF wraps to $xx00 for its own high half.
                let hi_at = if cpu.context.ptr & 0x00FF == 0x00FF {
                    cpu.context.ptr & 0xFF00
                } else {
                    cpu.context.ptr + 1
                };
                let value = bus.read(hi_at)?;
                cpu.set_addr_hi(value);
                cpu.pc = cpu.context.addr;
            }
            FetchPtrZp => {
                cpu.context.ptr = bus.read(cpu.pc)? as u16;
                cpu.pc = cpu.pc.wrapping_add(1);
            }
            DummyReadPtr => {
                bus.read(cpu.context.ptr)?;
            }
            ReadAddrLoPtrX => {
                let value = bus.read((cpu.context.ptr + cpu.x as u16) & 0x00FF)?;
                cpu.set_addr_lo(value);
            }
            ReadAddrHiPtrX => {
                let value = bus.read((cpu.context.ptr + cpu.x as u16 + 1) & 0x00FF)?;
                cpu.set_addr_hi(value);
            }
            ReadAddrLoPtrZp => {
                let value = bus.read(cpu.context.ptr & 0x00FF)?;
                cpu.set_addr_lo(value);
            }
            ReadAddrHiPtrY => {
                let value = bus.read((cpu.context.ptr + 1) & 0x00FF)?;
                cpu.set_addr_hi(value);
                cpu.index_addr(cpu.y);
            }
            FetchData => {
                cpu.context.fetched = bus.read(cpu.context.addr)?;
            }
            WriteBack => {
                // The 6502 writes the unmodified value back one cycle before
                // the modified one.
                bus.write(cpu.context.addr, cpu.context.fetched)?;
            }
            SkipOperand => {
                cpu.pc = cpu.pc.wrapping_add(1);
            }
            BranchPad => {}
            TakeBranch => {
                let offset = bus.read(cpu.pc)?;
                cpu.pc = cpu.pc.wrapping_add(1);
                let relative = offset as i8 as i16 as u16;
                let target = cpu.pc.wrapping_add(relative);
                cpu.context.crossed_page = target & 0xFF00 != cpu.pc & 0xFF00;
                cpu.pc = target;
                if !cpu.context.crossed_page {
                    return Ok(StepStatus::Stop);
                }
            }
            JsrPad | StackPad => {}
            DummyReadPc => {
                bus.read(cpu.pc)?;
            }
            PushPch => cpu.push(bus, (cpu.pc >> 8) as u8)?,
            PushPcl => cpu.push(bus, cpu.pc as u8)?,
            PushA => cpu.push(bus, cpu.a)?,
            PushPhp => {
                let value = cpu.p | Status::BREAK | Status::UNUSED;
                cpu.push(bus, value.bits())?;
            }
            PushPBrk => {
                let value = cpu.p | Status::BREAK | Status::UNUSED;
                cpu.push(bus, value.bits())?;
                cpu.p.insert(Status::INTERRUPT);
            }
            PushPInterrupt => {
                // Hardware interrupts push with B clear and U set.
                let value = (cpu.p - Status::BREAK) | Status::UNUSED;
                cpu.push(bus, value.bits())?;
                cpu.p.insert(Status::INTERRUPT);
            }
            PullA => {
                let value = cpu.pull(bus)?;
                cpu.a = alu::pass_through(&mut cpu.p, value);
            }
            PullStatus => {
                let value = cpu.pull(bus)?;
                cpu.p = Status::from_bits_retain(value);
                cpu.p.remove(Status::BREAK);
                cpu.p.insert(Status::UNUSED);
            }
            PullPcl => {
                let value = cpu.pull(bus)?;
                cpu.set_pc_lo(value);
            }
            PullPch => {
                let value = cpu.pull(bus)?;
                cpu.set_pc_hi(value);
            }
            IncPc => {
                cpu.pc = cpu.pc.wrapping_add(1);
            }
            BrkPad => {
                // BRK consumes a padding byte after the opcode.
                bus.read(cpu.pc)?;
                cpu.pc = cpu.pc.wrapping_add(1);
            }
            VectorPcl => {
                let value = bus.read(cpu.context.vector)?;
                cpu.set_pc_lo(value);
            }
            VectorPch => {
                let value = bus.read(cpu.context.vector.wrapping_add(1))?;
                cpu.set_pc_hi(value);
            }
            RstRegA => cpu.a = 0,
            RstRegX => cpu.x = 0,
            RstRegY => cpu.y = 0,
            RstRegS => cpu.s = 0xFD,
            RstRegP => cpu.p = Status::UNUSED,
            Execute => execute(cpu, bus)?,
        }
        Ok(StepStatus::Continue)
    }
}

/// Applies the decoded instruction once its operand plumbing has run.
fn execute(cpu: &mut Cpu, bus: &mut Mmu) -> Result<()> {
    let acc = cpu.context.mode == AddressingMode::Acc;
    match cpu.context.instruction {
        Instruction::Adc => {
            let operand = cpu.fetch(bus)?;
            cpu.a = alu::add(&mut cpu.p, cpu.a, operand);
        }
        Instruction::Sbc => {
            let operand = cpu.fetch(bus)?;
            cpu.a = alu::sub(&mut cpu.p, cpu.a, operand);
        }
        Instruction::And => {
            let operand = cpu.fetch(bus)?;
            cpu.a = alu::and(&mut cpu.p, cpu.a, operand);
        }
        Instruction::Ora => {
            let operand = cpu.fetch(bus)?;
            cpu.a = alu::or(&mut cpu.p, cpu.a, operand);
        }
        Instruction::Eor => {
            let operand = cpu.fetch(bus)?;
            cpu.a = alu::xor(&mut cpu.p, cpu.a, operand);
        }
        Instruction::Cmp => {
            let operand = cpu.fetch(bus)?;
            alu::compare(&mut cpu.p, cpu.a, operand);
        }
        Instruction::Cpx => {
            let operand = cpu.fetch(bus)?;
            alu::compare(&mut cpu.p, cpu.x, operand);
        }
        Instruction::Cpy => {
            let operand = cpu.fetch(bus)?;
            alu::compare(&mut cpu.p, cpu.y, operand);
        }
        Instruction::Bit => {
            let operand = cpu.fetch(bus)?;
            alu::bit_test(&mut cpu.p, cpu.a, operand);
        }
        Instruction::Lda => {
            let operand = cpu.fetch(bus)?;
            cpu.a = alu::pass_through(&mut cpu.p, operand);
        }
        Instruction::Ldx => {
            let operand = cpu.fetch(bus)?;
            cpu.x = alu::pass_through(&mut cpu.p, operand);
        }
        Instruction::Ldy => {
            let operand = cpu.fetch(bus)?;
            cpu.y = alu::pass_through(&mut cpu.p, operand);
        }
        Instruction::Sta => bus.write(cpu.context.addr, cpu.a)?,
        Instruction::Stx => bus.write(cpu.context.addr, cpu.x)?,
        Instruction::Sty => bus.write(cpu.context.addr, cpu.y)?,
        Instruction::Asl if acc => cpu.a = alu::shift_l(&mut cpu.p, cpu.a, false),
        Instruction::Asl => {
            let value = alu::shift_l(&mut cpu.p, cpu.context.fetched, false);
            bus.write(cpu.context.addr, value)?;
        }
        Instruction::Lsr if acc => cpu.a = alu::shift_r(&mut cpu.p, cpu.a, false),
        Instruction::Lsr => {
            let value = alu::shift_r(&mut cpu.p, cpu.context.fetched, false);
            bus.write(cpu.context.addr, value)?;
        }
        Instruction::Rol if acc => cpu.a = alu::shift_l(&mut cpu.p, cpu.a, true),
        Instruction::Rol => {
            let value = alu::shift_l(&mut cpu.p, cpu.context.fetched, true);
            bus.write(cpu.context.addr, value)?;
        }
        Instruction::Ror if acc => cpu.a = alu::shift_r(&mut cpu.p, cpu.a, true),
        Instruction::Ror => {
            let value = alu::shift_r(&mut cpu.p, cpu.context.fetched, true);
            bus.write(cpu.context.addr, value)?;
        }
        Instruction::Inc => {
            let value = alu::increment(&mut cpu.p, cpu.context.fetched);
            bus.write(cpu.context.addr, value)?;
        }
        Instruction::Dec => {
            let value = alu::decrement(&mut cpu.p, cpu.context.fetched);
            bus.write(cpu.context.addr, value)?;
        }
        Instruction::Inx => cpu.x = alu::increment(&mut cpu.p, cpu.x),
        Instruction::Iny => cpu.y = alu::increment(&mut cpu.p, cpu.y),
        Instruction::Dex => cpu.x = alu::decrement(&mut cpu.p, cpu.x),
        Instruction::Dey => cpu.y = alu::decrement(&mut cpu.p, cpu.y),
        Instruction::Tax => cpu.x = alu::pass_through(&mut cpu.p, cpu.a),
        Instruction::Tay => cpu.y = alu::pass_through(&mut cpu.p, cpu.a),
        Instruction::Tsx => cpu.x = alu::pass_through(&mut cpu.p, cpu.s),
        Instruction::Txa => cpu.a = alu::pass_through(&mut cpu.p, cpu.x),
        Instruction::Tya => cpu.a = alu::pass_through(&mut cpu.p, cpu.y),
        // TXS is the one transfer that leaves the flags alone.
        Instruction::Txs => cpu.s = cpu.x,
        Instruction::Clc => cpu.p.remove(Status::CARRY),
        Instruction::Cld => cpu.p.remove(Status::DECIMAL),
        Instruction::Cli => cpu.p.remove(Status::INTERRUPT),
        Instruction::Clv => cpu.p.remove(Status::OVERFLOW),
        Instruction::Sec => cpu.p.insert(Status::CARRY),
        Instruction::Sed => cpu.p.insert(Status::DECIMAL),
        Instruction::Sei => cpu.p.insert(Status::INTERRUPT),
        Instruction::Nop => {}
        // Multi-cycle instructions never stage an Execute step.
        _ => {}
    }
    Ok(())
}
