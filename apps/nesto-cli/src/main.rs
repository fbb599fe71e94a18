use std::cell::RefCell;
use std::fs;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::Context;
use clap::Parser;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use nesto_core::ppu::video::{HEIGHT, WIDTH};
use nesto_core::{Framebuffer, Nes};

/// Headless NES emulator driver
#[derive(Parser, Debug)]
#[command(name = "nesto")]
#[command(about = "Cycle-accurate NES emulator, headless example driver", long_about = None)]
struct Args {
    /// iNES ROM image to run
    rom: PathBuf,

    /// Log every retired CPU instruction (very verbose)
    #[arg(short = 't', long)]
    trace: bool,

    /// Number of frames to emulate before exiting
    #[arg(short, long, default_value = "60")]
    frames: u64,

    /// Write the final frame to a PNG file
    #[arg(short, long)]
    screenshot: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: Level,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = if args.trace { Level::TRACE } else { args.log_level };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let rom = fs::read(&args.rom)
        .with_context(|| format!("reading ROM image {}", args.rom.display()))?;
    let framebuffer = Rc::new(RefCell::new(Framebuffer::new()));
    let mut nes = Nes::new(&rom, Box::new(framebuffer.clone()))
        .with_context(|| format!("loading {}", args.rom.display()))?;

    info!(frames = args.frames, "starting emulation");
    for _ in 0..args.frames {
        nes.run_frame()?;
    }
    info!(cpu_cycles = nes.cpu().cycles(), "emulation finished");

    if let Some(path) = args.screenshot {
        write_png(&path, &framebuffer.borrow())?;
        info!("wrote screenshot to {}", path.display());
    }

    Ok(())
}

/// Encodes the frame as an 8-bit RGBA PNG.
fn write_png(path: &Path, frame: &Framebuffer) -> anyhow::Result<()> {
    let file = File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), WIDTH as u32, HEIGHT as u32);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;

    let mut data = Vec::with_capacity(WIDTH * HEIGHT * 4);
    for argb in frame.as_slice() {
        data.push((argb >> 16) as u8);
        data.push((argb >> 8) as u8);
        data.push(*argb as u8);
        data.push(0xFF);
    }
    writer.write_image_data(&data)?;
    Ok(())
}
