//! Cycle-accurate Nintendo Entertainment System emulation core.
//!
//! The crate wires a cycle-stepped 6502 interpreter, a dot-accurate NTSC
//! PPU, and a bank-based bus substrate into a [`Nes`] console driven one
//! master tick at a time. The host supplies a [`ppu::VideoSink`] for pixels
//! and poll closures for the controller ports; everything else lives here.

pub mod bank;
pub mod bitfield;
pub mod cartridge;
pub mod controller;
pub mod cpu;
pub mod dma;
pub mod error;
pub mod memory;
pub mod mmu;
pub mod nes;
pub mod ppu;

pub use cartridge::Cartridge;
pub use controller::Button;
pub use error::{Error, Result};
pub use nes::Nes;
pub use ppu::{Framebuffer, VideoSink};

#[cfg(test)]
mod tests {
    use ctor::ctor;
    use tracing::Level;
    use tracing_subscriber::FmtSubscriber;

    #[ctor]
    fn init_tracing() {
        let subscriber = FmtSubscriber::builder()
            .with_file(true)
            .with_line_number(true)
            .with_max_level(Level::DEBUG)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}
