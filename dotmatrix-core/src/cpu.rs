pub(crate) mod instructions;
mod registers;

#[cfg(test)]
mod tests;

use crate::memory::ioregisters::IoRegister;
use crate::memory::AddressSpace;
use crate::ppu::PpuState;

pub use registers::CpuRegisters;

/// The five interrupt sources, in priority order (VBlank highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptType {
    VBlank,
    LcdStatus,
    Timer,
    Serial,
    Joypad,
}

impl InterruptType {
    pub fn handler_address(self) -> u16 {
        match self {
            Self::VBlank => 0x0040,
            Self::LcdStatus => 0x0048,
            Self::Timer => 0x0050,
            Self::Serial => 0x0058,
            Self::Joypad => 0x0060,
        }
    }

    /// This interrupt's bit in the IE and IF registers.
    pub fn bit(self) -> u8 {
        match self {
            Self::VBlank => 1 << 0,
            Self::LcdStatus => 1 << 1,
            Self::Timer => 1 << 2,
            Self::Serial => 1 << 3,
            Self::Joypad => 1 << 4,
        }
    }

    /// The highest-priority interrupt in the given IE & IF mask, which is the
    /// lowest set bit.
    fn highest_priority(pending_mask: u8) -> Option<Self> {
        [Self::VBlank, Self::LcdStatus, Self::Timer, Self::Serial, Self::Joypad]
            .into_iter()
            .find(|interrupt_type| pending_mask & interrupt_type.bit() != 0)
    }
}

/// Cycles charged for an interrupt service routine dispatch.
pub const ISR_CYCLES_REQUIRED: u32 = 20;

const PENDING_MASK: u8 = 0x1F;

fn pending_interrupts(address_space: &AddressSpace) -> u8 {
    let ie = address_space.get_ie_register();
    let iff = address_space.get_io_registers().privileged_read_register(IoRegister::IF);
    ie & iff & PENDING_MASK
}

/// Whether the CPU should dispatch to an interrupt handler at the start of
/// this step. EI enables interrupts only after the following instruction has
/// executed, which the interrupt_delay flag accounts for.
pub fn interrupt_triggered(cpu_registers: &CpuRegisters, address_space: &AddressSpace) -> bool {
    cpu_registers.ime && !cpu_registers.interrupt_delay && pending_interrupts(address_space) != 0
}

/// Whether an interrupt is pending regardless of IME. A pending interrupt
/// wakes the CPU from HALT even when IME is clear (without dispatching).
pub fn interrupt_triggered_no_ime_check(address_space: &AddressSpace) -> bool {
    pending_interrupts(address_space) != 0
}

/// Dispatch the highest-priority pending interrupt: acknowledge it in IF,
/// clear IME, push PC, and jump to the fixed handler vector.
///
/// # Panics
///
/// This function will panic if no interrupt is pending; callers must check
/// `interrupt_triggered` first.
pub fn execute_interrupt_service_routine(
    cpu_registers: &mut CpuRegisters,
    address_space: &mut AddressSpace,
    ppu_state: &PpuState,
) {
    let interrupt_type = InterruptType::highest_priority(pending_interrupts(address_space))
        .expect("execute_interrupt_service_routine called with no pending interrupt");

    log::trace!("Dispatching {interrupt_type:?} interrupt from PC={:04X}", cpu_registers.pc);

    address_space.get_io_registers_mut().interrupt_flags().clear(interrupt_type);
    cpu_registers.ime = false;
    cpu_registers.halted = false;

    cpu_registers.sp = cpu_registers.sp.wrapping_sub(2);
    address_space.write_address_u16(cpu_registers.sp, cpu_registers.pc, ppu_state);
    cpu_registers.pc = interrupt_type.handler_address();
}
