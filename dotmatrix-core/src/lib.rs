mod config;
mod cpu;
mod debug;
mod eventloop;
mod graphics;
mod input;
mod memory;
mod ppu;
mod serial;
mod startup;
mod timer;

use std::error::Error;

pub use config::RunConfig;

/// Load the configured ROM, open a window, and run the emulator until it is
/// closed. Returns an error if the ROM fails to load or SDL initialization
/// fails.
pub fn run(run_config: RunConfig) -> Result<(), Box<dyn Error>> {
    let emulation_state = startup::init_emulation_state(&run_config)?;
    let sdl_state = startup::init_sdl_state(&run_config)?;

    eventloop::run(emulation_state, sdl_state, &run_config)?;

    Ok(())
}
