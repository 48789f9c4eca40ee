use crate::cpu::InterruptType;
use crate::memory::ioregisters::{IoRegister, IoRegisters};

/// The far end of the link cable. The transferred byte is handed over and the
/// peer's byte comes back, clocked by this Game Boy.
pub trait SerialSink {
    fn swap(&mut self, out: u8) -> u8;
}

/// Acts like nothing is plugged into the link port: a disconnected line
/// reads as all ones.
pub struct NullSerialSink;

impl SerialSink for NullSerialSink {
    fn swap(&mut self, _out: u8) -> u8 {
        0xFF
    }
}

/// Complete any transfer the CPU started by writing SC with bits 7 and 0 set:
/// exchange SB with the sink, clear the transfer-in-progress bit, and raise
/// the Serial interrupt. Transfers are modeled as instantaneous.
pub fn process_transfer(io_registers: &mut IoRegisters, sink: &mut dyn SerialSink) {
    if !io_registers.take_serial_transfer_request() {
        return;
    }

    let out = io_registers.read_register(IoRegister::SB);
    let reply = sink.swap(out);
    log::trace!("Serial transfer: sent {out:02X}h, received {reply:02X}h");

    io_registers.privileged_set_register(IoRegister::SB, reply);

    let sc = io_registers.read_register(IoRegister::SC);
    io_registers.privileged_set_register(IoRegister::SC, sc & 0x7F);

    io_registers.interrupt_flags().set(InterruptType::Serial);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ComplementSink;

    impl SerialSink for ComplementSink {
        fn swap(&mut self, out: u8) -> u8 {
            !out
        }
    }

    struct RecordingSink(Vec<u8>);

    impl SerialSink for RecordingSink {
        fn swap(&mut self, out: u8) -> u8 {
            self.0.push(out);
            0xFF
        }
    }

    #[test]
    fn transfer_round_trip() {
        let mut io_registers = IoRegisters::new();
        io_registers.privileged_set_register(IoRegister::IF, 0);

        io_registers.write_register(IoRegister::SB, 0x5A);
        io_registers.write_register(IoRegister::SC, 0x81);

        process_transfer(&mut io_registers, &mut ComplementSink);

        assert_eq!(0xA5, io_registers.read_register(IoRegister::SB));
        assert!(io_registers.interrupt_flags().get(InterruptType::Serial));
        // Transfer-in-progress bit cleared
        assert_eq!(0, io_registers.read_register(IoRegister::SC) & 0x80);
    }

    #[test]
    fn no_transfer_without_start_bit() {
        let mut io_registers = IoRegisters::new();
        io_registers.privileged_set_register(IoRegister::IF, 0);

        io_registers.write_register(IoRegister::SB, 0x42);
        // Bit 0 only: external clock, nothing drives the exchange
        io_registers.write_register(IoRegister::SC, 0x01);

        let mut sink = RecordingSink(Vec::new());
        process_transfer(&mut io_registers, &mut sink);

        assert!(sink.0.is_empty());
        assert_eq!(0x42, io_registers.read_register(IoRegister::SB));
        assert!(!io_registers.interrupt_flags().get(InterruptType::Serial));
    }

    #[test]
    fn null_sink_returns_disconnected_line() {
        let mut io_registers = IoRegisters::new();

        io_registers.write_register(IoRegister::SB, 0x99);
        io_registers.write_register(IoRegister::SC, 0x81);

        process_transfer(&mut io_registers, &mut NullSerialSink);
        assert_eq!(0xFF, io_registers.read_register(IoRegister::SB));
    }

    #[test]
    fn each_write_transfers_once() {
        let mut io_registers = IoRegisters::new();
        let mut sink = RecordingSink(Vec::new());

        io_registers.write_register(IoRegister::SB, 0x01);
        io_registers.write_register(IoRegister::SC, 0x81);
        process_transfer(&mut io_registers, &mut sink);
        // No new request; stepping again must not re-send
        process_transfer(&mut io_registers, &mut sink);

        io_registers.write_register(IoRegister::SB, 0x02);
        io_registers.write_register(IoRegister::SC, 0x81);
        process_transfer(&mut io_registers, &mut sink);

        assert_eq!(vec![0x01, 0x02], sink.0);
    }
}
