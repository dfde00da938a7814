use anyhow::{Context, Result};
use clap::Parser;
use emu_core::logging::{LogCategory, LogConfig, LogLevel};
use emu_core::System;
use emu_tunit::{RomProvider, TUnitConfig, TUnitSystem};
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser)]
struct Args {
    /// Directory holding the Mortal Kombat T-Unit ROM files
    rom_dir: PathBuf,

    /// Number of frames to run
    #[arg(long, default_value_t = 60)]
    frames: u32,

    /// Board configuration (JSON); defaults match the hardware
    #[arg(long)]
    config: Option<PathBuf>,

    /// Dump save-state to this file as JSON
    #[arg(long, default_value = "state.json")]
    save: PathBuf,

    /// CMOS image, loaded at start when present and written back at exit
    #[arg(long)]
    nvram: Option<PathBuf>,

    /// Core log level: off, error, warn, info, debug, trace
    #[arg(long, default_value = "off")]
    log_level: String,

    /// Write core logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Print the first pixels and register state of every frame
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// Suppress all per-frame output (still writes --save)
    #[arg(long, default_value_t = false)]
    quiet: bool,
}

/// Reads ROMs by file name from a directory.
struct DirectoryRoms {
    dir: PathBuf,
}

impl RomProvider for DirectoryRoms {
    fn rom(&mut self, name: &str) -> Option<Vec<u8>> {
        let path = self.dir.join(name);
        match fs::read(&path) {
            Ok(data) => Some(data),
            Err(e) => {
                log::error!("{}: {}", path.display(), e);
                None
            }
        }
    }
}

fn configure_logging(args: &Args) -> Result<()> {
    let level = LogLevel::from_str(&args.log_level)
        .with_context(|| format!("unknown log level '{}'", args.log_level))?;
    let logs = LogConfig::global();
    logs.set_global_level(level);
    for category in LogCategory::ALL {
        logs.set_level(category, level);
    }
    if let Some(path) = &args.log_file {
        logs.set_log_file(path.clone())
            .with_context(|| format!("opening log file {}", path.display()))?;
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    configure_logging(&args)?;

    let config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            TUnitConfig::from_json(&text)?
        }
        None => TUnitConfig::default(),
    };

    let mut sys = TUnitSystem::new(config)?;
    let mut roms = DirectoryRoms {
        dir: args.rom_dir.clone(),
    };
    sys.load_rom_set(&mut roms)
        .with_context(|| format!("loading ROMs from {}", args.rom_dir.display()))?;

    if let Some(path) = args.nvram.as_ref().filter(|p| p.exists()) {
        sys.load_nvram(&fs::read(path)?)?;
        log::info!("Loaded CMOS from {}", path.display());
    }

    for fnum in 1..=args.frames {
        let frame = sys.step_frame()?;
        if args.quiet {
            continue;
        }

        if args.debug {
            println!("Frame {}: {}x{}", fnum, frame.width, frame.height);
            let dump_len = std::cmp::min(16, frame.pixels.len());
            let mut out = String::new();
            for px in &frame.pixels[..dump_len] {
                out.push_str(&format!("{:08X} ", px));
            }
            println!("First {} pixels: {}", dump_len, out);
            println!(
                "DEBUG STATE (frame {}):\n{}",
                fnum,
                serde_json::to_string_pretty(&sys.save_state())?
            );
        }
    }
    if !args.quiet {
        println!("Ran {} frames", sys.frame_count());
    }

    let state = sys.save_state();
    let mut f = File::create(&args.save)?;
    write!(f, "{}", serde_json::to_string_pretty(&state)?)?;

    if let Some(path) = &args.nvram {
        fs::write(path, sys.nvram())?;
        log::info!("Saved CMOS to {}", path.display());
    }

    LogConfig::global().clear_log_file();
    Ok(())
}
