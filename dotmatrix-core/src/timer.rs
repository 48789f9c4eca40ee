use crate::cpu::InterruptType;
use crate::memory::ioregisters::{IoRegister, IoRegisters};

/// Running count of elapsed T-cycles, used to detect DIV and TIMA period
/// boundaries. Writing DIV resets the visible register but not this counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerCounter(u64);

impl TimerCounter {
    pub fn new() -> Self {
        Self(0)
    }
}

// DIV ticks at 16384 Hz, one increment per 256 cycles of the 4 MiHz clock
const DIV_PERIOD_CYCLES: u64 = 256;

// The largest cycle count a single call may cover; one instruction or ISR
// never exceeds this, and it keeps the TIMA catch-up loop trivially bounded
const MAX_CYCLES_PER_UPDATE: u64 = DIV_PERIOD_CYCLES;

/// TIMA period in cycles for the frequency selected by TAC bits 0-1.
fn tima_period_cycles(timer_control: u8) -> u64 {
    match timer_control & 0x03 {
        0x00 => 1024, // 4096 Hz
        0x01 => 16,   // 262144 Hz
        0x02 => 64,   // 65536 Hz
        0x03 => 256,  // 16384 Hz
        _ => unreachable!("value & 0x03 is always 0x00-0x03"),
    }
}

/// Read TMA. The emulation loop latches this before executing an instruction
/// so that an instruction which overflows TIMA *and* writes TMA reloads from
/// the pre-instruction value.
pub fn read_timer_modulo(io_registers: &IoRegisters) -> u8 {
    io_registers.read_register(IoRegister::TMA)
}

/// Advance the timer unit by the given number of T-cycles: tick DIV at
/// 16384 Hz and, when enabled by TAC, tick TIMA at the selected frequency,
/// reloading from `timer_modulo` and raising the Timer interrupt on overflow.
///
/// # Panics
///
/// Panics if `cycles` exceeds 256; callers advance at most one instruction at
/// a time.
pub fn update_timer_registers(
    io_registers: &mut IoRegisters,
    counter: &mut TimerCounter,
    timer_modulo: u8,
    cycles: u64,
) {
    assert!(
        cycles <= MAX_CYCLES_PER_UPDATE,
        "timer update must cover at most {MAX_CYCLES_PER_UPDATE} cycles, got {cycles}"
    );

    let old_count = counter.0;
    let new_count = old_count + cycles;
    counter.0 = new_count;

    if crossed_boundary(old_count, new_count, DIV_PERIOD_CYCLES) > 0 {
        let div = io_registers.privileged_read_register(IoRegister::DIV);
        io_registers.privileged_set_register(IoRegister::DIV, div.wrapping_add(1));
    }

    let timer_control = io_registers.read_register(IoRegister::TAC);
    if timer_control & 0x04 == 0 {
        return;
    }

    let period = tima_period_cycles(timer_control);
    for _ in 0..crossed_boundary(old_count, new_count, period) {
        let tima = io_registers.read_register(IoRegister::TIMA);
        match tima.checked_add(1) {
            Some(new_tima) => {
                io_registers.privileged_set_register(IoRegister::TIMA, new_tima);
            }
            None => {
                io_registers.privileged_set_register(IoRegister::TIMA, timer_modulo);
                io_registers.interrupt_flags().set(InterruptType::Timer);
            }
        }
    }
}

/// How many multiples of `period` lie in the half-open interval
/// (old_count, new_count].
fn crossed_boundary(old_count: u64, new_count: u64, period: u64) -> u64 {
    new_count / period - old_count / period
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn div_ticks_every_256_cycles() {
        let mut io_registers = IoRegisters::new();
        let mut counter = TimerCounter::new();

        io_registers.write_register(IoRegister::DIV, 0xFF);
        assert_eq!(0x00, io_registers.read_register(IoRegister::DIV));

        update_timer_registers(&mut io_registers, &mut counter, 0, 252);
        assert_eq!(0x00, io_registers.read_register(IoRegister::DIV));

        update_timer_registers(&mut io_registers, &mut counter, 0, 4);
        assert_eq!(0x01, io_registers.read_register(IoRegister::DIV));

        for _ in 0..255 {
            update_timer_registers(&mut io_registers, &mut counter, 0, 256);
        }
        // DIV wraps after 256 increments
        assert_eq!(0x00, io_registers.read_register(IoRegister::DIV));
    }

    #[test]
    fn div_rate_across_window() {
        let mut io_registers = IoRegisters::new();
        let mut counter = TimerCounter::new();

        // 10000 cycles should produce floor(10000 / 256) = 39 increments
        for _ in 0..1000 {
            update_timer_registers(&mut io_registers, &mut counter, 0, 10);
        }
        assert_eq!(39, io_registers.read_register(IoRegister::DIV));
    }

    #[test]
    fn tima_disabled_when_tac_bit_2_clear() {
        let mut io_registers = IoRegisters::new();
        let mut counter = TimerCounter::new();

        io_registers.write_register(IoRegister::TAC, 0x01);
        io_registers.write_register(IoRegister::TIMA, 0x12);

        for _ in 0..100 {
            update_timer_registers(&mut io_registers, &mut counter, 0, 256);
        }
        assert_eq!(0x12, io_registers.read_register(IoRegister::TIMA));
    }

    #[test]
    fn tima_rates_for_each_tac_frequency() {
        for (tac, period) in [(0x04, 1024_u64), (0x05, 16), (0x06, 64), (0x07, 256)] {
            let mut io_registers = IoRegisters::new();
            let mut counter = TimerCounter::new();

            io_registers.write_register(IoRegister::TAC, tac);
            io_registers.write_register(IoRegister::TIMA, 0);

            // Run exactly 8 periods in 16-cycle slices
            let total = 8 * period;
            let mut elapsed = 0;
            while elapsed < total {
                update_timer_registers(&mut io_registers, &mut counter, 0, 16);
                elapsed += 16;
            }

            assert_eq!(
                8,
                io_registers.read_register(IoRegister::TIMA),
                "TAC={tac:02X} period={period}"
            );
        }
    }

    #[test]
    fn tima_overflow_reloads_from_tma_and_raises_interrupt() {
        let mut io_registers = IoRegisters::new();
        let mut counter = TimerCounter::new();

        io_registers.privileged_set_register(IoRegister::IF, 0);
        // Enabled, fastest rate (16 cycles)
        io_registers.write_register(IoRegister::TAC, 0x05);
        io_registers.write_register(IoRegister::TIMA, 0xFE);
        let timer_modulo = 0x78;

        update_timer_registers(&mut io_registers, &mut counter, timer_modulo, 16);
        assert_eq!(0xFF, io_registers.read_register(IoRegister::TIMA));
        assert!(!io_registers.interrupt_flags().get(InterruptType::Timer));

        update_timer_registers(&mut io_registers, &mut counter, timer_modulo, 16);
        assert_eq!(0x78, io_registers.read_register(IoRegister::TIMA));
        assert!(io_registers.interrupt_flags().get(InterruptType::Timer));
    }

    #[test]
    fn div_write_does_not_stall_tima() {
        let mut io_registers = IoRegisters::new();
        let mut counter = TimerCounter::new();

        io_registers.write_register(IoRegister::TAC, 0x05);

        update_timer_registers(&mut io_registers, &mut counter, 0, 8);
        io_registers.write_register(IoRegister::DIV, 0x55);
        update_timer_registers(&mut io_registers, &mut counter, 0, 8);

        assert_eq!(0x00, io_registers.read_register(IoRegister::DIV));
        assert_eq!(0x01, io_registers.read_register(IoRegister::TIMA));
    }

    #[test]
    #[should_panic(expected = "timer update must cover at most 256 cycles")]
    fn cycle_limit_enforced() {
        let mut io_registers = IoRegisters::new();
        let mut counter = TimerCounter::new();

        update_timer_registers(&mut io_registers, &mut counter, 0, 257);
    }
}
