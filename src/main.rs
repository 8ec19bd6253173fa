//! NES emulator entry point.
//!
//! Loads a cartridge and runs the console in a display window.
//! Usage: crema [--scale 1|2|4|8] [--log-level LEVEL] [--no-save] path/to/game.nes

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use ansi_term::Colour::{Red, Yellow};
use clap::{Parser, ValueEnum};
use crema::cartridge::Cartridge;
use crema::console::Console;
use crema::controller::Buttons;
use crema::error::{CartridgeError, EmulationError};
use crema::ppu::{HEIGHT, WIDTH, palette};
use minifb::{Key, Scale, Window, WindowOptions};
use thiserror::Error;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

/// NES runs at ~60.0988 Hz (NTSC). Target one frame per 16.67 ms for ~60 fps.
const FRAME_DURATION: Duration = Duration::from_nanos(16_666_667);

/// Keyboard layout for controller 1.
const KEYMAP: [(Key, Buttons); 8] = [
    (Key::Z, Buttons::A),
    (Key::X, Buttons::B),
    (Key::RightShift, Buttons::SELECT),
    (Key::Enter, Buttons::START),
    (Key::Up, Buttons::UP),
    (Key::Down, Buttons::DOWN),
    (Key::Left, Buttons::LEFT),
    (Key::Right, Buttons::RIGHT),
];

/// Cycle-stepped NES emulator
#[derive(Parser, Debug)]
#[command(name = "crema", version, about, long_about = None)]
struct Args {
    /// iNES (.nes) image to run
    rom: PathBuf,

    /// Window scale factor
    #[arg(long, value_enum, default_value_t = WindowScale::X2)]
    scale: WindowScale,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: Level,

    /// Do not read or write the .sav file for battery-backed cartridges
    #[arg(long)]
    no_save: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum WindowScale {
    #[value(name = "1")]
    X1,
    #[value(name = "2")]
    X2,
    #[value(name = "4")]
    X4,
    #[value(name = "8")]
    X8,
}

impl From<WindowScale> for Scale {
    fn from(scale: WindowScale) -> Self {
        match scale {
            WindowScale::X1 => Scale::X1,
            WindowScale::X2 => Scale::X2,
            WindowScale::X4 => Scale::X4,
            WindowScale::X8 => Scale::X8,
        }
    }
}

#[derive(Debug, Error)]
enum AppError {
    #[error("failed to load ROM: {0}")]
    Cartridge(#[from] CartridgeError),
    #[error("emulation stopped: {0}")]
    Emulation(#[from] EmulationError),
    #[error("window error: {0}")]
    Window(#[from] minifb::Error),
}

fn main() -> ExitCode {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .compact()
        .finish();
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("{} could not install logger: {err}", Yellow.bold().paint("WARN"));
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err}", Red.bold().paint("ERROR"));
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), AppError> {
    let cart = Cartridge::load(&args.rom)?;
    let mut console = Console::new(cart)?;

    let save_path = args.rom.with_extension("sav");
    if !args.no_save {
        load_save(&mut console, &save_path);
    }

    let mut window = Window::new(
        "Crema",
        WIDTH,
        HEIGHT,
        WindowOptions {
            resize: true,
            scale: args.scale.into(),
            ..WindowOptions::default()
        },
    )?;
    window.set_target_fps(60);

    let mut buffer = vec![0u32; WIDTH * HEIGHT];
    let result = frame_loop(&mut console, &mut window, &mut buffer);

    // Persist even when emulation stopped with an error.
    if !args.no_save {
        write_save(&console, &save_path);
    }
    result
}

fn frame_loop(console: &mut Console, window: &mut Window, buffer: &mut [u32]) -> Result<(), AppError> {
    while window.is_open() && !window.is_key_down(Key::Escape) {
        let frame_start = Instant::now();

        let mut buttons = Buttons::empty();
        for (key, button) in KEYMAP {
            buttons.set(button, window.is_key_down(key));
        }
        if let Some(controller) = console.controller_mut(0) {
            controller.set_buttons(buttons);
        }

        let frame = console.run_frame()?;
        palette::to_rgb(&frame[..], buffer);
        window.update_with_buffer(buffer, WIDTH, HEIGHT)?;

        // Pace to ~60 fps so we don't burn CPU (emulation is far faster than real NES)
        let elapsed = frame_start.elapsed();
        if elapsed < FRAME_DURATION {
            std::thread::sleep(FRAME_DURATION - elapsed);
        }
    }
    info!("quit after {} frames", console.frame_count());
    Ok(())
}

fn load_save(console: &mut Console, path: &Path) {
    if console.battery_ram().is_none() || !path.exists() {
        return;
    }
    match fs::read(path) {
        Ok(data) => {
            console.load_battery_ram(&data);
            info!("loaded {}", path.display());
        }
        Err(err) => warn!("could not read {}: {err}", path.display()),
    }
}

fn write_save(console: &Console, path: &Path) {
    let Some(ram) = console.battery_ram() else {
        return;
    };
    match fs::write(path, ram) {
        Ok(()) => info!("saved {}", path.display()),
        Err(err) => warn!("could not write {}: {err}", path.display()),
    }
}
