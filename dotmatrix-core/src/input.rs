use crate::cpu::InterruptType;
use crate::memory::ioregisters::{IoRegister, IoRegisters};
use sdl2::keyboard::Keycode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Button {
    Up,
    Down,
    Left,
    Right,
    A,
    B,
    Start,
    Select,
}

fn button_for_keycode(keycode: Keycode) -> Option<Button> {
    let button = match keycode {
        Keycode::Up => Button::Up,
        Keycode::Down => Button::Down,
        Keycode::Left => Button::Left,
        Keycode::Right => Button::Right,
        Keycode::Z => Button::A,
        Keycode::X => Button::B,
        Keycode::Return => Button::Start,
        Keycode::RShift => Button::Select,
        _ => return None,
    };
    Some(button)
}

/// Which of the eight buttons are currently held. The driver swaps in a new
/// snapshot between steps; the joypad register is derived from it on the next
/// loop iteration.
#[derive(Debug, Clone, Default)]
pub struct JoypadState {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub a: bool,
    pub b: bool,
    pub start: bool,
    pub select: bool,
}

impl JoypadState {
    pub fn new() -> Self {
        Self::default()
    }

    fn field_mut(&mut self, button: Button) -> &mut bool {
        match button {
            Button::Up => &mut self.up,
            Button::Down => &mut self.down,
            Button::Left => &mut self.left,
            Button::Right => &mut self.right,
            Button::A => &mut self.a,
            Button::B => &mut self.b,
            Button::Start => &mut self.start,
            Button::Select => &mut self.select,
        }
    }

    pub fn key_down(&mut self, keycode: Keycode) {
        if let Some(button) = button_for_keycode(keycode) {
            *self.field_mut(button) = true;
            log::debug!("Key pressed: {keycode}, current state: {self:?}");
        }
    }

    pub fn key_up(&mut self, keycode: Keycode) {
        if let Some(button) = button_for_keycode(keycode) {
            *self.field_mut(button) = false;
            log::debug!("Key released: {keycode}, current state: {self:?}");
        }
    }
}

/// Recompute the low nibble of the JOYP register from the current button
/// state and the row select bits, and raise the Joypad interrupt on any
/// 1 -> 0 transition of an input line.
///
/// Inputs are active low. Bit 4 low selects the d-pad row and bit 5 low
/// selects the action row; when both are selected a press in either row
/// pulls the shared line low.
pub fn update_joyp_register(joypad_state: &JoypadState, io_registers: &mut IoRegisters) {
    let joyp = io_registers.read_register(IoRegister::JOYP);
    let dpad_selected = joyp & 0x10 == 0;
    let actions_selected = joyp & 0x20 == 0;

    let bit_3 =
        !((dpad_selected && joypad_state.down) || (actions_selected && joypad_state.start));
    let bit_2 =
        !((dpad_selected && joypad_state.up) || (actions_selected && joypad_state.select));
    let bit_1 = !((dpad_selected && joypad_state.left) || (actions_selected && joypad_state.b));
    let bit_0 = !((dpad_selected && joypad_state.right) || (actions_selected && joypad_state.a));

    let new_joyp = (joyp & 0x30)
        | (u8::from(bit_3) << 3)
        | (u8::from(bit_2) << 2)
        | (u8::from(bit_1) << 1)
        | u8::from(bit_0);
    io_registers.privileged_set_register(IoRegister::JOYP, new_joyp);

    if joyp & !new_joyp & 0x0F != 0 {
        io_registers.interrupt_flags().set(InterruptType::Joypad);
    }
}
