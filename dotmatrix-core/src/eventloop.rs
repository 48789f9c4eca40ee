use crate::config::RunConfig;
use crate::cpu::CpuRegisters;
use crate::debug::FileSerialSink;
use crate::graphics::{GraphicsError, SdlVideoSink};
use crate::input::JoypadState;
use crate::memory::AddressSpace;
use crate::ppu::{PpuMode, PpuState, VideoSink};
use crate::serial::{NullSerialSink, SerialSink};
use crate::startup::{EmulationState, SdlState};
use crate::timer::TimerCounter;
use crate::{cpu, debug, input, ppu, serial, timer};
use sdl2::event::Event;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunError {
    #[error("rendering error: {source}")]
    Rendering {
        #[from]
        source: GraphicsError,
    },
    #[error("error opening serial output file: {source}")]
    SerialSinkInit {
        #[source]
        source: io::Error,
    },
    #[error("error writing cartridge RAM to sav file: {source}")]
    RamPersist {
        #[source]
        source: io::Error,
    },
}

// Flush battery-backed RAM roughly once per second
const SAV_FLUSH_FRAME_INTERVAL: u64 = 60;

/// Run the emulator until the window is closed.
pub fn run(
    emulation_state: EmulationState,
    sdl_state: SdlState,
    run_config: &RunConfig,
) -> Result<(), RunError> {
    log::info!("Running with config:\n{run_config}");

    let EmulationState { mut address_space, mut cpu_registers, mut ppu_state } = emulation_state;

    // Subsystem handles are kept alive for the duration of the loop
    let SdlState { sdl: _sdl, video: _video, mut canvas, mut event_pump } = sdl_state;

    let texture_creator = canvas.texture_creator();
    let mut video_sink = SdlVideoSink::new(&mut canvas, &texture_creator)?;

    let mut serial_sink: Box<dyn SerialSink> = match &run_config.serial_out_path {
        Some(path) => Box::new(
            FileSerialSink::new(path).map_err(|err| RunError::SerialSinkInit { source: err })?,
        ),
        None => Box::new(NullSerialSink),
    };

    let mut joypad_state = JoypadState::new();
    let mut timer_counter = TimerCounter::new();

    let mut total_frames = 0_u64;

    loop {
        input::update_joyp_register(&joypad_state, address_space.get_io_registers_mut());

        // Latch TMA before executing in case the instruction also writes it
        let timer_modulo = timer::read_timer_modulo(address_space.get_io_registers());

        let cycles_elapsed = tick_cpu(
            &mut address_space,
            &mut cpu_registers,
            &ppu_state,
            run_config.debug_logging,
        );

        timer::update_timer_registers(
            address_space.get_io_registers_mut(),
            &mut timer_counter,
            timer_modulo,
            cycles_elapsed.into(),
        );

        serial::process_transfer(address_space.get_io_registers_mut(), serial_sink.as_mut());

        let prev_mode = ppu_state.mode();
        for _ in (0..cycles_elapsed).step_by(4) {
            ppu::progress_oam_dma_transfer(&mut ppu_state, &mut address_space);
            ppu::tick_m_cycle(&mut ppu_state, &mut address_space);
        }

        // The PPU entering vblank means the frame is complete
        if prev_mode != PpuMode::VBlank && ppu_state.mode() == PpuMode::VBlank {
            video_sink.swap(ppu_state.frame_buffer());

            total_frames += 1;
            if total_frames % SAV_FLUSH_FRAME_INTERVAL == 0 {
                address_space
                    .persist_cartridge_ram()
                    .map_err(|err| RunError::RamPersist { source: err })?;
            }

            for event in event_pump.poll_iter() {
                match event {
                    Event::Quit { .. } => {
                        log::info!("Quit event received, exiting");
                        address_space
                            .persist_cartridge_ram()
                            .map_err(|err| RunError::RamPersist { source: err })?;
                        return Ok(());
                    }
                    Event::KeyDown { keycode: Some(keycode), .. } => {
                        joypad_state.key_down(keycode);
                    }
                    Event::KeyUp { keycode: Some(keycode), .. } => {
                        joypad_state.key_up(keycode);
                    }
                    _ => {}
                }
            }
        }
    }
}

/// Advance the CPU by one step: dispatch a pending interrupt, execute one
/// instruction, or idle for one M-cycle while halted. Returns the T-cycles
/// consumed.
fn tick_cpu(
    address_space: &mut AddressSpace,
    cpu_registers: &mut CpuRegisters,
    ppu_state: &PpuState,
    debug_logging: bool,
) -> u32 {
    if cpu::interrupt_triggered(cpu_registers, address_space) {
        cpu::execute_interrupt_service_routine(cpu_registers, address_space, ppu_state);
        return cpu::ISR_CYCLES_REQUIRED;
    }

    if cpu_registers.halted && !cpu::interrupt_triggered_no_ime_check(address_space) {
        // Halted with nothing pending: let the other units run an M-cycle
        return 4;
    }
    cpu_registers.halted = false;

    if debug_logging {
        log::debug!("{}", debug::cpu_state_line(cpu_registers, address_space, ppu_state));
    }

    let (instruction, pc) = cpu::instructions::parse_next_instruction(
        address_space,
        cpu_registers.pc,
        ppu_state,
        cpu_registers.halt_bug_triggered,
    );
    cpu_registers.halt_bug_triggered = false;
    cpu_registers.pc = pc;

    let cycles_required = instruction.cycles_required(cpu_registers);
    log::trace!("Executing {instruction:02X?} ({cycles_required} cycles)");

    instruction.execute(address_space, cpu_registers, ppu_state);

    cycles_required
}
