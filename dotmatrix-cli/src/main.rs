use clap::Parser;
use dotmatrix_core::RunConfig;
use env_logger::Env;
use std::error::Error;
use std::path::PathBuf;

#[derive(Parser)]
#[command(about = "A Game Boy (DMG) emulator")]
struct Cli {
    /// Path to a Game Boy ROM image
    rom_path: String,
    /// Log the CPU state for every executed instruction (very slow)
    #[arg(long = "debug", default_value_t = false)]
    debug: bool,
    /// Append bytes sent out the serial port to this file
    #[arg(long = "serial")]
    serial_out_path: Option<PathBuf>,
    #[arg(long = "window-width", default_value_t = 640)]
    window_width: u32,
    #[arg(long = "window-height", default_value_t = 576)]
    window_height: u32,
    #[arg(long = "no-vsync", default_value_t = true, action = clap::ArgAction::SetFalse)]
    vsync_enabled: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Cli::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();

    let run_config = RunConfig {
        rom_file_path: args.rom_path,
        debug_logging: args.debug,
        serial_out_path: args.serial_out_path,
        window_width: args.window_width,
        window_height: args.window_height,
        vsync_enabled: args.vsync_enabled,
    };

    dotmatrix_core::run(run_config)
}
