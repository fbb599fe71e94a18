//! Cycle-stepped MOS6502 core (the NES's 2A03, sans decimal mode).
//!
//! `tick()` advances exactly one CPU cycle. Decoding an opcode stages a
//! sequence of micro-steps; each subsequent tick retires one step, so the
//! documented per-instruction cycle counts fall out of the staging rather
//! than a side table. Interrupts are edge-latched and consumed at
//! instruction boundaries in the order RST, NMI, IRQ.

mod alu;
mod micro;
mod opcodes;
mod pipeline;
mod status;

pub use status::Status;

use crate::error::Result;
use crate::memory::cpu as cpu_mem;
use crate::mmu::Mmu;
use opcodes::{AddressingMode, Instruction, MemoryAccess, OPCODE_TABLE};
use pipeline::{Pipeline, StepStatus};

/// Working state shared by the micro-steps of the instruction in flight.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Context {
    pub(crate) opcode: u8,
    pub(crate) instruction: Instruction,
    pub(crate) mode: AddressingMode,
    pub(crate) access: MemoryAccess,
    /// Effective address under construction.
    pub(crate) addr: u16,
    /// Indirection pointer for the indirect modes.
    pub(crate) ptr: u16,
    /// Operand byte latched by the last fetch.
    pub(crate) fetched: u8,
    pub(crate) crossed_page: bool,
    /// Interrupt vector consumed by the vector micro-steps.
    pub(crate) vector: u16,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            opcode: 0,
            instruction: Instruction::Nop,
            mode: AddressingMode::Imp,
            access: MemoryAccess::Read,
            addr: 0,
            ptr: 0,
            fetched: 0,
            crossed_page: false,
            vector: cpu_mem::RST_VECTOR,
        }
    }
}

pub struct Cpu {
    pub(crate) a: u8,
    pub(crate) x: u8,
    pub(crate) y: u8,
    pub(crate) s: u8,
    pub(crate) pc: u16,
    pub(crate) p: Status,
    pub(crate) cycles: u64,
    pub(crate) context: Context,
    pub(crate) pipeline: Pipeline,
    rst_pending: bool,
    nmi_pending: bool,
    irq_pending: bool,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    /// Power-on state; the reset sequence runs at the first tick.
    pub fn new() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            s: 0xFD,
            pc: 0,
            p: Status::power_on(),
            cycles: 0,
            context: Context::default(),
            pipeline: Pipeline::default(),
            rst_pending: true,
            nmi_pending: false,
            irq_pending: false,
        }
    }

    /// Advances one CPU cycle over `bus`.
    ///
    /// When the previous instruction has retired, this cycle either begins a
    /// latched interrupt sequence or fetches and decodes the next opcode;
    /// otherwise it executes one staged micro-step.
    pub fn tick(&mut self, bus: &mut Mmu) -> Result<()> {
        if self.pipeline.done() {
            self.pipeline.clear();
            if self.rst_pending {
                self.stage_rst();
            } else if self.nmi_pending {
                self.stage_nmi();
            } else if self.irq_pending && !self.p.contains(Status::INTERRUPT) {
                self.stage_irq();
            } else {
                self.decode(bus)?;
            }
        } else {
            loop {
                let Some(op) = self.pipeline.pop() else { break };
                match op.exec(self, bus)? {
                    StepStatus::Continue => break,
                    // A free step: fall through to the next one this cycle.
                    StepStatus::Skip => continue,
                    StepStatus::Stop => {
                        self.pipeline.stop();
                        break;
                    }
                }
            }
        }
        self.cycles += 1;
        Ok(())
    }

    /// `true` between instructions, when no micro-step is staged.
    pub fn is_idle(&self) -> bool {
        self.pipeline.done()
    }

    /// Latches the reset line; consumed at the next instruction boundary.
    pub fn signal_rst(&mut self) {
        self.rst_pending = true;
    }

    /// Latches one NMI edge.
    pub fn signal_nmi(&mut self) {
        self.nmi_pending = true;
    }

    /// Latches an IRQ; honoured once the I flag is clear.
    pub fn signal_irq(&mut self) {
        self.irq_pending = true;
    }

    pub fn a(&self) -> u8 {
        self.a
    }

    pub fn x(&self) -> u8 {
        self.x
    }

    pub fn y(&self) -> u8 {
        self.y
    }

    pub fn s(&self) -> u8 {
        self.s
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn p(&self) -> Status {
        self.p
    }

    /// Total cycles executed since power-on.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    fn decode(&mut self, bus: &mut Mmu) -> Result<()> {
        let opcode = bus.read(self.pc)?;
        tracing::trace!(
            target: "nesto_core::cpu",
            "{:04X}  {:02X}        A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} CYC:{}",
            self.pc,
            opcode,
            self.a,
            self.x,
            self.y,
            self.p.bits(),
            self.s,
            self.cycles,
        );
        self.pc = self.pc.wrapping_add(1);
        let entry = &OPCODE_TABLE[opcode as usize];
        self.context.opcode = opcode;
        self.context.instruction = entry.instruction;
        self.context.mode = entry.mode;
        self.context.access = entry.access;
        self.context.crossed_page = false;
        micro::stage_addressing(self);
        micro::stage_instruction(self);
        Ok(())
    }

    fn stage_rst(&mut self) {
        use micro::MicroOp::*;
        self.context.vector = cpu_mem::RST_VECTOR;
        for op in [VectorPcl, VectorPch, RstRegA, RstRegX, RstRegY, RstRegS, RstRegP] {
            self.pipeline.push(op);
        }
        self.rst_pending = false;
    }

    fn stage_nmi(&mut self) {
        use micro::MicroOp::*;
        self.context.vector = cpu_mem::NMI_VECTOR;
        for op in [DummyReadPc, PushPch, PushPcl, PushPInterrupt, VectorPcl, VectorPch] {
            self.pipeline.push(op);
        }
        self.nmi_pending = false;
    }

    fn stage_irq(&mut self) {
        use micro::MicroOp::*;
        self.context.vector = cpu_mem::IRQ_VECTOR;
        for op in [DummyReadPc, PushPch, PushPcl, PushPInterrupt, VectorPcl, VectorPch] {
            self.pipeline.push(op);
        }
        self.irq_pending = false;
    }

    /// Pushes a byte: write at `$0100 + S`, then decrement S.
    pub(crate) fn push(&mut self, bus: &mut Mmu, value: u8) -> Result<()> {
        bus.write(cpu_mem::STACK_BASE + self.s as u16, value)?;
        self.s = self.s.wrapping_sub(1);
        Ok(())
    }

    /// Pulls a byte: increment S, then read at `$0100 + S`.
    pub(crate) fn pull(&mut self, bus: &mut Mmu) -> Result<u8> {
        self.s = self.s.wrapping_add(1);
        bus.read(cpu_mem::STACK_BASE + self.s as u16)
    }

    /// Reads the operand. Immediate mode takes it from the instruction
    /// stream; every other mode goes through the effective address.
    pub(crate) fn fetch(&mut self, bus: &mut Mmu) -> Result<u8> {
        if self.context.mode == AddressingMode::Imm {
            self.context.addr = self.pc;
            self.pc = self.pc.wrapping_add(1);
        }
        let value = bus.read(self.context.addr)?;
        self.context.fetched = value;
        Ok(value)
    }

    pub(crate) fn set_addr_lo(&mut self, value: u8) {
        self.context.addr = (self.context.addr & 0xFF00) | value as u16;
    }

    pub(crate) fn set_addr_hi(&mut self, value: u8) {
        self.context.addr = (value as u16) << 8 | (self.context.addr & 0x00FF);
    }

    pub(crate) fn set_ptr_lo(&mut self, value: u8) {
        self.context.ptr = (self.context.ptr & 0xFF00) | value as u16;
    }

    pub(crate) fn set_ptr_hi(&mut self, value: u8) {
        self.context.ptr = (value as u16) << 8 | (self.context.ptr & 0x00FF);
    }

    pub(crate) fn set_pc_lo(&mut self, value: u8) {
        self.pc = (self.pc & 0xFF00) | value as u16;
    }

    pub(crate) fn set_pc_hi(&mut self, value: u8) {
        self.pc = (value as u16) << 8 | (self.pc & 0x00FF);
    }

    /// Adds an index register to the effective address, recording whether
    /// the page boundary was crossed.
    pub(crate) fn index_addr(&mut self, index: u8) {
        let base = self.context.addr;
        self.context.addr = base.wrapping_add(index as u16);
        self.context.crossed_page = self.context.addr & 0xFF00 != base & 0xFF00;
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("a", &self.a)
            .field("x", &self.x)
            .field("y", &self.y)
            .field("s", &self.s)
            .field("pc", &format_args!("{:#06X}", self.pc))
            .field("p", &self.p)
            .field("cycles", &self.cycles)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::MemoryBank;

    /// Flat 64 KiB of RAM; interrupt vectors and programs are poked in.
    fn flat_bus() -> Mmu {
        let mut bus = Mmu::new();
        bus.add(MemoryBank::chip(0x0000, 0xFFFF, 0x10000).expect("chip"));
        bus
    }

    fn load(bus: &mut Mmu, base: u16, bytes: &[u8]) {
        for (i, byte) in bytes.iter().enumerate() {
            bus.write(base + i as u16, *byte).expect("write");
        }
    }

    /// CPU parked at `pc` with the reset sequence already consumed.
    fn cpu_at(pc: u16) -> Cpu {
        let mut cpu = Cpu::new();
        cpu.rst_pending = false;
        cpu.pc = pc;
        cpu.p = Status::UNUSED | Status::INTERRUPT;
        cpu
    }

    /// Runs one full instruction (or interrupt sequence), returning cycles.
    fn step(cpu: &mut Cpu, bus: &mut Mmu) -> u64 {
        let start = cpu.cycles;
        loop {
            cpu.tick(bus).expect("tick");
            if cpu.is_idle() {
                break;
            }
        }
        cpu.cycles - start
    }

    #[test]
    fn reset_sequence_loads_vector_and_clears_registers() {
        let mut bus = flat_bus();
        bus.write(0xFFFC, 0x00).expect("write");
        bus.write(0xFFFD, 0x80).expect("write");
        let mut cpu = Cpu::new();
        let cycles = step(&mut cpu, &mut bus);
        assert_eq!(cycles, 8);
        assert_eq!(cpu.pc(), 0x8000);
        assert_eq!(cpu.s(), 0xFD);
        assert_eq!(cpu.p(), Status::UNUSED);
        assert_eq!((cpu.a(), cpu.x(), cpu.y()), (0, 0, 0));
    }

    #[test]
    fn lda_imm_sets_flags_in_two_cycles() {
        let mut bus = flat_bus();
        load(&mut bus, 0x8000, &[0xA9, 0x80, 0xA9, 0x00]);
        let mut cpu = cpu_at(0x8000);
        assert_eq!(step(&mut cpu, &mut bus), 2);
        assert_eq!(cpu.a(), 0x80);
        assert!(cpu.p().contains(Status::NEGATIVE));
        assert_eq!(step(&mut cpu, &mut bus), 2);
        assert!(cpu.p().contains(Status::ZERO));
    }

    #[test]
    fn adc_overflow_case() {
        let mut bus = flat_bus();
        load(&mut bus, 0x8000, &[0xA9, 0x50, 0x69, 0x50]);
        let mut cpu = cpu_at(0x8000);
        step(&mut cpu, &mut bus);
        step(&mut cpu, &mut bus);
        assert_eq!(cpu.a(), 0xA0);
        assert!(cpu.p().contains(Status::NEGATIVE));
        assert!(cpu.p().contains(Status::OVERFLOW));
        assert!(!cpu.p().contains(Status::CARRY));
        assert!(!cpu.p().contains(Status::ZERO));
    }

    #[test]
    fn absolute_indexed_pays_for_page_cross_on_reads_only() {
        let mut bus = flat_bus();
        // LDA $80F0,X with X = 0x05: no cross, 4 cycles.
        load(&mut bus, 0x8000, &[0xBD, 0xF0, 0x80]);
        let mut cpu = cpu_at(0x8000);
        cpu.x = 0x05;
        assert_eq!(step(&mut cpu, &mut bus), 4);

        // LDA $80F0,X with X = 0x20 crosses into $8110: 5 cycles.
        let mut cpu = cpu_at(0x8000);
        cpu.x = 0x20;
        assert_eq!(step(&mut cpu, &mut bus), 5);

        // STA $80F0,X always takes 5, crossing or not.
        load(&mut bus, 0x9000, &[0x9D, 0xF0, 0x80]);
        let mut cpu = cpu_at(0x9000);
        cpu.x = 0x05;
        cpu.a = 0x42;
        assert_eq!(step(&mut cpu, &mut bus), 5);
        assert_eq!(bus.read(0x80F5).expect("read"), 0x42);
    }

    #[test]
    fn rmw_zero_page_takes_five_cycles_and_writes_result() {
        let mut bus = flat_bus();
        load(&mut bus, 0x8000, &[0x06, 0x10]);
        bus.write(0x0010, 0b0100_0001).expect("write");
        let mut cpu = cpu_at(0x8000);
        assert_eq!(step(&mut cpu, &mut bus), 5);
        assert_eq!(bus.read(0x0010).expect("read"), 0b1000_0010);
        assert!(cpu.p().contains(Status::NEGATIVE));
        assert!(!cpu.p().contains(Status::CARRY));
    }

    #[test]
    fn branch_cycle_counts() {
        let mut bus = flat_bus();
        // BNE +0x10 with Z set: not taken, 2 cycles.
        load(&mut bus, 0x8000, &[0xD0, 0x10]);
        let mut cpu = cpu_at(0x8000);
        cpu.p.insert(Status::ZERO);
        assert_eq!(step(&mut cpu, &mut bus), 2);
        assert_eq!(cpu.pc(), 0x8002);

        // Taken without crossing: 3 cycles.
        let mut cpu = cpu_at(0x8000);
        cpu.p.remove(Status::ZERO);
        assert_eq!(step(&mut cpu, &mut bus), 3);
        assert_eq!(cpu.pc(), 0x8012);

        // Taken across a page: 4 cycles. BNE at $80F0 with offset 0x20
        // lands at $8112.
        load(&mut bus, 0x80F0, &[0xD0, 0x20]);
        let mut cpu = cpu_at(0x80F0);
        assert_eq!(step(&mut cpu, &mut bus), 4);
        assert_eq!(cpu.pc(), 0x8112);

        // Backward branch: BNE -2 loops onto itself.
        load(&mut bus, 0x8200, &[0xD0, 0xFE]);
        let mut cpu = cpu_at(0x8200);
        step(&mut cpu, &mut bus);
        assert_eq!(cpu.pc(), 0x8200);
    }

    #[test]
    fn jmp_indirect_wraps_inside_the_pointer_page() {
        let mut bus = flat_bus();
        load(&mut bus, 0x8000, &[0x6C, 0xFF, 0x02]);
        bus.write(0x02FF, 0x34).expect("write");
        bus.write(0x0200, 0x12).expect("write");
        // The correct high byte at $0300 must be ignored.
        bus.write(0x0300, 0x99).expect("write");
        let mut cpu = cpu_at(0x8000);
        assert_eq!(step(&mut cpu, &mut bus), 5);
        assert_eq!(cpu.pc(), 0x1234);
    }

    #[test]
    fn indexed_indirect_wraps_in_zero_page() {
        let mut bus = flat_bus();
        // LDA ($FE,X) with X = 4: pointer bytes at $02 and $03.
        load(&mut bus, 0x8000, &[0xA1, 0xFE]);
        bus.write(0x0002, 0x34).expect("write");
        bus.write(0x0003, 0x12).expect("write");
        bus.write(0x1234, 0x5A).expect("write");
        let mut cpu = cpu_at(0x8000);
        cpu.x = 0x04;
        assert_eq!(step(&mut cpu, &mut bus), 6);
        assert_eq!(cpu.a(), 0x5A);
    }

    #[test]
    fn indirect_indexed_adds_y_after_the_pointer() {
        let mut bus = flat_bus();
        load(&mut bus, 0x8000, &[0xB1, 0x40]);
        bus.write(0x0040, 0xF0).expect("write");
        bus.write(0x0041, 0x12).expect("write");
        bus.write(0x1300, 0x77).expect("write");
        let mut cpu = cpu_at(0x8000);
        cpu.y = 0x10;
        // $12F0 + $10 crosses into $1300: 6 cycles.
        assert_eq!(step(&mut cpu, &mut bus), 6);
        assert_eq!(cpu.a(), 0x77);
    }

    #[test]
    fn jsr_rts_round_trip() {
        let mut bus = flat_bus();
        load(&mut bus, 0x8000, &[0x20, 0x00, 0x90]);
        load(&mut bus, 0x9000, &[0x60]);
        let mut cpu = cpu_at(0x8000);
        assert_eq!(step(&mut cpu, &mut bus), 6);
        assert_eq!(cpu.pc(), 0x9000);
        // The stacked return address is the last byte of the JSR.
        assert_eq!(bus.read(0x01FD).expect("read"), 0x80);
        assert_eq!(bus.read(0x01FC).expect("read"), 0x02);
        assert_eq!(step(&mut cpu, &mut bus), 6);
        assert_eq!(cpu.pc(), 0x8003);
        assert_eq!(cpu.s(), 0xFD);
    }

    #[test]
    fn brk_pushes_state_and_takes_the_irq_vector() {
        let mut bus = flat_bus();
        bus.write(0x8000, 0x00).expect("write");
        bus.write(0xFFFE, 0x34).expect("write");
        bus.write(0xFFFF, 0x12).expect("write");
        let mut cpu = cpu_at(0x8000);
        cpu.p = Status::from_bits_retain(0x24);
        assert_eq!(step(&mut cpu, &mut bus), 7);
        assert_eq!(cpu.pc(), 0x1234);
        assert!(cpu.p().contains(Status::INTERRUPT));
        // PC+2 high, PC+2 low, then P with B and U set.
        assert_eq!(bus.read(0x01FD).expect("read"), 0x80);
        assert_eq!(bus.read(0x01FC).expect("read"), 0x02);
        assert_eq!(bus.read(0x01FB).expect("read"), 0x34);
    }

    #[test]
    fn php_plp_mask_break_and_unused() {
        let mut bus = flat_bus();
        load(&mut bus, 0x8000, &[0x08, 0x28]);
        let mut cpu = cpu_at(0x8000);
        cpu.p = Status::CARRY | Status::UNUSED;
        assert_eq!(step(&mut cpu, &mut bus), 3);
        // The pushed byte carries B and U.
        assert_eq!(bus.read(0x01FD).expect("read"), 0x31);
        // Scribble B into the stacked byte; PLP must strip it and force U.
        bus.write(0x01FD, 0xDF).expect("write");
        assert_eq!(step(&mut cpu, &mut bus), 4);
        assert!(!cpu.p().contains(Status::BREAK));
        assert!(cpu.p().contains(Status::UNUSED));
        assert!(cpu.p().contains(Status::CARRY));
    }

    #[test]
    fn nmi_interrupts_between_instructions() {
        let mut bus = flat_bus();
        // A stream of NOPs, NMI handler at $9000.
        load(&mut bus, 0x8000, &[0xEA, 0xEA]);
        bus.write(0xFFFA, 0x00).expect("write");
        bus.write(0xFFFB, 0x90).expect("write");
        let mut cpu = cpu_at(0x8000);
        step(&mut cpu, &mut bus);
        cpu.signal_nmi();
        assert_eq!(step(&mut cpu, &mut bus), 7);
        assert_eq!(cpu.pc(), 0x9000);
        assert!(cpu.p().contains(Status::INTERRUPT));
        // Stacked status has B clear and U set.
        assert_eq!(bus.read(0x01FB).expect("read") & 0x30, 0x20);
    }

    #[test]
    fn irq_waits_for_the_i_flag() {
        let mut bus = flat_bus();
        // CLI; NOP; handler at $9000.
        load(&mut bus, 0x8000, &[0x58, 0xEA, 0xEA]);
        bus.write(0xFFFE, 0x00).expect("write");
        bus.write(0xFFFF, 0x90).expect("write");
        let mut cpu = cpu_at(0x8000);
        cpu.signal_irq();
        // I is set: the IRQ stays latched while NOP-alikes run.
        assert_eq!(step(&mut cpu, &mut bus), 2);
        assert_eq!(cpu.pc(), 0x8001);
        // CLI cleared I, so the next boundary services the IRQ.
        assert_eq!(step(&mut cpu, &mut bus), 7);
        assert_eq!(cpu.pc(), 0x9000);
    }

    #[test]
    fn sbc_borrows_through_carry() {
        let mut bus = flat_bus();
        load(&mut bus, 0x8000, &[0x38, 0xA9, 0x50, 0xE9, 0x20]);
        let mut cpu = cpu_at(0x8000);
        step(&mut cpu, &mut bus);
        step(&mut cpu, &mut bus);
        step(&mut cpu, &mut bus);
        assert_eq!(cpu.a(), 0x30);
        assert!(cpu.p().contains(Status::CARRY));
    }

    #[test]
    fn undocumented_opcodes_run_as_timed_nops() {
        let mut bus = flat_bus();
        // $1C: NOP abs,X. $80F0 + $20 crosses, so 5 cycles.
        load(&mut bus, 0x8000, &[0x1C, 0xF0, 0x80]);
        let mut cpu = cpu_at(0x8000);
        cpu.x = 0x20;
        let a = cpu.a();
        assert_eq!(step(&mut cpu, &mut bus), 5);
        assert_eq!(cpu.pc(), 0x8003);
        assert_eq!(cpu.a(), a);
    }

    #[test]
    fn zero_page_indexed_wraps() {
        let mut bus = flat_bus();
        // LDA $F0,X with X = $20 reads $10, not $110.
        load(&mut bus, 0x8000, &[0xB5, 0xF0]);
        bus.write(0x0010, 0xAB).expect("write");
        bus.write(0x0110, 0xCD).expect("write");
        let mut cpu = cpu_at(0x8000);
        cpu.x = 0x20;
        assert_eq!(step(&mut cpu, &mut bus), 4);
        assert_eq!(cpu.a(), 0xAB);
    }
}
