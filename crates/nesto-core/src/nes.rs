//! Console composition: chips, buses, CPU, PPU, DMA, and controllers.
//!
//! One master tick advances the PPU by a dot; every third tick the CPU runs
//! one cycle unless an OAM DMA burst holds its bus. PPU side effects land
//! before the CPU slot of the same triplet, so a vblank edge raised at
//! (241,1) is visible to the very next CPU cycle.

use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;

use crate::bank::MemoryBank;
use crate::cartridge::Cartridge;
use crate::controller::{ButtonPoll, Controller};
use crate::cpu::Cpu;
use crate::dma::{DmaCycle, OamDma};
use crate::error::Result;
use crate::memory::cpu as cpu_mem;
use crate::mmu::Mmu;
use crate::ppu::{Ppu, VideoSink};

/// NTSC master clock.
pub const MASTER_CLOCK_HZ: f64 = 21_477_272.0;

/// NTSC field rate targeted by the host loop.
pub const FRAMES_PER_SECOND: f64 = 60.0988;

/// Master cycles per PPU dot.
pub const MASTER_CYCLES_PER_DOT: u64 = 4;

/// Master cycles per CPU cycle.
pub const MASTER_CYCLES_PER_CPU_CYCLE: u64 = 12;

pub struct Nes {
    cartridge: Rc<RefCell<Cartridge>>,
    ppu: Rc<RefCell<Ppu>>,
    cpu: Cpu,
    cpu_bus: Mmu,
    dma: Rc<RefCell<OamDma>>,
    controllers: Rc<RefCell<[Controller; 2]>>,
    /// CPU cycle counter shared with the DMA trigger for parity checks.
    cpu_cycles: Rc<Cell<u64>>,
    master_cycle: u64,
}

impl Nes {
    /// Boots a console around a parsed iNES image. The CPU comes up with
    /// its reset sequence latched.
    pub fn new(rom: &[u8], sink: Box<dyn VideoSink>) -> Result<Self> {
        let cartridge = Rc::new(RefCell::new(Cartridge::from_ines(rom)?));
        let ppu = Rc::new(RefCell::new(Ppu::new(cartridge.clone(), sink)));
        let dma = Rc::new(RefCell::new(OamDma::new()));
        let controllers = Rc::new(RefCell::new([
            Controller::disconnected(),
            Controller::disconnected(),
        ]));
        let cpu_cycles = Rc::new(Cell::new(0));
        let cpu_bus = build_cpu_bus(
            cartridge.clone(),
            ppu.clone(),
            dma.clone(),
            controllers.clone(),
            cpu_cycles.clone(),
        )?;
        Ok(Self {
            cartridge,
            ppu,
            cpu: Cpu::new(),
            cpu_bus,
            dma,
            controllers,
            cpu_cycles,
            master_cycle: 0,
        })
    }

    /// Plugs a pad into `port` (0 or 1); the closure is polled at strobe.
    pub fn connect_controller(&mut self, port: usize, poll: ButtonPoll) {
        self.controllers.borrow_mut()[port] = Controller::new(poll);
    }

    /// Advances one master clock tick.
    pub fn tick(&mut self) -> Result<()> {
        self.ppu.borrow_mut().tick()?;

        if self.master_cycle % 3 == 0 {
            let claimed = {
                let mut dma = self.dma.borrow_mut();
                if dma.active() { Some(dma.step()) } else { None }
            };
            match claimed {
                Some(DmaCycle::Align) => {}
                Some(DmaCycle::Read(addr)) => {
                    let value = self.cpu_bus.read(addr)?;
                    self.dma.borrow_mut().set_latch(value);
                }
                Some(DmaCycle::Write { offset, data }) => {
                    self.ppu.borrow_mut().oam_dma_write(offset, data);
                }
                None => self.cpu.tick(&mut self.cpu_bus)?,
            }
            self.cpu_cycles.set(self.cpu_cycles.get() + 1);
        }

        if self.ppu.borrow_mut().take_nmi() {
            self.cpu.signal_nmi();
        }
        if self.cartridge.borrow().irq_pending() {
            self.cartridge.borrow_mut().clear_irq();
            self.cpu.signal_irq();
        }

        self.master_cycle += 1;
        Ok(())
    }

    /// Runs master ticks until the PPU finishes the current frame.
    pub fn run_frame(&mut self) -> Result<()> {
        let frame = self.ppu.borrow().frame();
        while self.ppu.borrow().frame() == frame {
            self.tick()?;
        }
        Ok(())
    }

    /// Latches the reset line; honoured at the next instruction boundary.
    pub fn reset(&mut self) {
        self.cpu.signal_rst();
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn ppu(&self) -> Ref<'_, Ppu> {
        self.ppu.borrow()
    }

    /// Debug read through the CPU bus.
    pub fn peek(&mut self, addr: u16) -> Result<u8> {
        self.cpu_bus.read(addr)
    }

    /// Debug write through the CPU bus.
    pub fn poke(&mut self, addr: u16, value: u8) -> Result<()> {
        self.cpu_bus.write(addr, value)
    }
}

impl std::fmt::Debug for Nes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Nes")
            .field("master_cycle", &self.master_cycle)
            .field("cpu", &self.cpu)
            .finish()
    }
}

/// Registers the CPU-space banks. Narrow windows (DMA trigger, controller
/// ports) go in before the broad I/O stub that also claims their addresses.
fn build_cpu_bus(
    cartridge: Rc<RefCell<Cartridge>>,
    ppu: Rc<RefCell<Ppu>>,
    dma: Rc<RefCell<OamDma>>,
    controllers: Rc<RefCell<[Controller; 2]>>,
    cpu_cycles: Rc<Cell<u64>>,
) -> Result<Mmu> {
    let mut bus = Mmu::new();

    // Cartridge space, whatever windows the mapper decodes.
    bus.add(MemoryBank::cpu_mapper(cartridge));

    // 2 KiB internal RAM mirrored across $0000-$1FFF.
    bus.add(MemoryBank::chip(
        cpu_mem::RAM_START,
        cpu_mem::RAM_MIRROR_END,
        cpu_mem::RAM_SIZE,
    )?);

    // PPU registers, mirrored every eight bytes.
    let reader = {
        let ppu = ppu.clone();
        Box::new(move |addr: u16| ppu.borrow_mut().cpu_read(addr))
    };
    let writer = Box::new(move |addr: u16, value: u8| ppu.borrow_mut().cpu_write(addr, value));
    bus.add(MemoryBank::forward(
        cpu_mem::PPU_REGISTER_START,
        cpu_mem::PPU_REGISTER_END,
        cpu_mem::PPU_REGISTER_COUNT,
        reader,
        writer,
    ));

    // OAM DMA trigger; reading the port sees the latched page.
    let reader = {
        let dma = dma.clone();
        Box::new(move |_: u16| Ok(dma.borrow().page()))
    };
    let writer = Box::new(move |_: u16, value: u8| {
        let odd = cpu_cycles.get() % 2 == 1;
        dma.borrow_mut().begin(value, odd);
        Ok(())
    });
    bus.add(MemoryBank::forward(
        cpu_mem::OAM_DMA,
        cpu_mem::OAM_DMA,
        1,
        reader,
        writer,
    ));

    // Controller ports. Only $4016 drives the strobe; $4017 writes belong
    // to the (out of scope) APU frame counter.
    let reader = {
        let controllers = controllers.clone();
        Box::new(move |addr: u16| {
            let port = (addr - cpu_mem::CONTROLLER_1) as usize;
            Ok(controllers.borrow_mut()[port].read())
        })
    };
    let writer = Box::new(move |addr: u16, value: u8| {
        if addr == cpu_mem::CONTROLLER_1 {
            for pad in controllers.borrow_mut().iter_mut() {
                pad.write_strobe(value);
            }
        }
        Ok(())
    });
    bus.add(MemoryBank::forward(
        cpu_mem::CONTROLLER_1,
        cpu_mem::CONTROLLER_2,
        2,
        reader,
        writer,
    ));

    // APU and I/O registers: out of scope, but games write them freely.
    // The RAM-backed stub keeps the last driven value on the bus.
    bus.add(MemoryBank::chip(
        cpu_mem::IO_START,
        cpu_mem::IO_END,
        cpu_mem::IO_SIZE,
    )?);

    // Normally-disabled test-mode registers.
    bus.add(MemoryBank::chip(
        cpu_mem::TEST_MODE_START,
        cpu_mem::TEST_MODE_END,
        cpu_mem::TEST_MODE_SIZE,
    )?);

    Ok(bus)
}
