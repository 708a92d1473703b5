//! Keyboard, joystick and console key input.
//!
//! Several host sources (keyboard, gamepad, on screen controls) may hold the same logical key.
//! The [PressTable] counts who holds which key so that the machine only sees the first press
//! and the last release.
use std::collections::BTreeSet;
use std::collections::HashMap;

use log::debug;

use crate::common::constants::IRQ_BREAK_KEY_PRESSED;
use crate::common::constants::IRQ_OTHER_KEY_PRESSED;
use crate::components::cpu::Cpu;
use crate::components::gtia::CONSOL_OPTION;
use crate::components::gtia::CONSOL_SELECT;
use crate::components::gtia::CONSOL_START;
use crate::machine_state::MachineState;

/// SKSTAT: a key is held (active low).
const SKSTAT_KEY_DOWN: u8 = 0x04;
/// SKSTAT: shift is held (active low).
const SKSTAT_SHIFT: u8 = 0x08;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, strum::Display, strum::EnumString,
)]
pub enum KeySymbol {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,
    Digit0,
    Digit1,
    Digit2,
    Digit3,
    Digit4,
    Digit5,
    Digit6,
    Digit7,
    Digit8,
    Digit9,
    Comma,
    Minus,
    Period,
    Slash,
    Semicolon,
    Equals,
    LeftBracket,
    Backslash,
    RightBracket,
    Quote,
    /// Has no Atari counterpart.
    Backquote,
    Space,
    Return,
    Backspace,
    Tab,
    Escape,
    Help,
    Caps,
    Inverse,
    JoystickUp,
    JoystickDown,
    JoystickLeft,
    JoystickRight,
    Trigger0,
    Trigger2,
    Trigger3,
    Option,
    Select,
    Start,
    Reset,
    Break,
    Shift,
    Control,
}

/// What a key is wired to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
    /// PORTA direction line
    Joystick(u8),
    /// GTIA trigger input
    Trigger(usize),
    /// CONSOL line
    Console(u8),
    Reset,
    Break,
    Shift,
    /// Only used as a modifier for other keys.
    Control,
    /// POKEY keyboard matrix
    Keyboard(u8),
    Unmapped,
}

impl KeySymbol {
    pub fn action(self) -> KeyAction {
        use KeyAction::Keyboard;
        match self {
            Self::A => Keyboard(63),
            Self::B => Keyboard(21),
            Self::C => Keyboard(18),
            Self::D => Keyboard(58),
            Self::E => Keyboard(42),
            Self::F => Keyboard(56),
            Self::G => Keyboard(61),
            Self::H => Keyboard(57),
            Self::I => Keyboard(13),
            Self::J => Keyboard(1),
            Self::K => Keyboard(5),
            Self::L => Keyboard(0),
            Self::M => Keyboard(37),
            Self::N => Keyboard(35),
            Self::O => Keyboard(8),
            Self::P => Keyboard(10),
            Self::Q => Keyboard(47),
            Self::R => Keyboard(40),
            Self::S => Keyboard(62),
            Self::T => Keyboard(45),
            Self::U => Keyboard(11),
            Self::V => Keyboard(16),
            Self::W => Keyboard(46),
            Self::X => Keyboard(22),
            Self::Y => Keyboard(43),
            Self::Z => Keyboard(23),
            Self::Digit0 => Keyboard(50),
            Self::Digit1 => Keyboard(31),
            Self::Digit2 => Keyboard(30),
            Self::Digit3 => Keyboard(26),
            Self::Digit4 => Keyboard(24),
            Self::Digit5 => Keyboard(29),
            Self::Digit6 => Keyboard(27),
            Self::Digit7 => Keyboard(51),
            Self::Digit8 => Keyboard(53),
            Self::Digit9 => Keyboard(48),
            Self::Comma => Keyboard(32),
            Self::Minus => Keyboard(54),
            Self::Period => Keyboard(34),
            Self::Slash => Keyboard(38),
            Self::Semicolon => Keyboard(2),
            Self::Equals => Keyboard(55),
            Self::LeftBracket => Keyboard(14),
            Self::Backslash => Keyboard(7),
            Self::RightBracket => Keyboard(15),
            Self::Quote => Keyboard(6),
            Self::Backquote => KeyAction::Unmapped,
            Self::Space => Keyboard(33),
            Self::Return => Keyboard(12),
            Self::Backspace => Keyboard(52),
            Self::Tab => Keyboard(44),
            Self::Escape => Keyboard(28),
            Self::Help => Keyboard(17),
            Self::Caps => Keyboard(60),
            Self::Inverse => Keyboard(39),
            Self::JoystickUp => KeyAction::Joystick(0x01),
            Self::JoystickDown => KeyAction::Joystick(0x02),
            Self::JoystickLeft => KeyAction::Joystick(0x04),
            Self::JoystickRight => KeyAction::Joystick(0x08),
            Self::Trigger0 => KeyAction::Trigger(0),
            Self::Trigger2 => KeyAction::Trigger(2),
            Self::Trigger3 => KeyAction::Trigger(3),
            Self::Option => KeyAction::Console(CONSOL_OPTION),
            Self::Select => KeyAction::Console(CONSOL_SELECT),
            Self::Start => KeyAction::Console(CONSOL_START),
            Self::Reset => KeyAction::Reset,
            Self::Break => KeyAction::Break,
            Self::Shift => KeyAction::Shift,
            Self::Control => KeyAction::Control,
        }
    }

    /// KBCODE of keys on the keyboard matrix, without modifiers.
    pub fn kbcode(self) -> Option<u8> {
        match self.action() {
            KeyAction::Keyboard(code) => Some(code),
            _ => None,
        }
    }
}

/// Modifier state accompanying a key press.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub control: bool,
}

/// Opaque identifier of an input source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(pub u32);

#[derive(Default, Debug)]
struct PressState {
    anonymous: u32,
    sources: BTreeSet<SourceId>,
}

impl PressState {
    fn is_down(&self) -> bool {
        self.anonymous > 0 || !self.sources.is_empty()
    }
}

/// Reference counted press state of each key.
#[derive(Default, Debug)]
pub struct PressTable {
    keys: HashMap<KeySymbol, PressState>,
}

impl PressTable {
    /// Records a press. Returns true if the key went from up to down.
    ///
    /// A source pressing a key it already holds is ignored. Presses without a source (and
    /// auto repeats) only count while the key is up.
    pub fn press(&mut self, key: KeySymbol, source: Option<SourceId>, repeat: bool) -> bool {
        let state = self.keys.entry(key).or_default();
        let was_down = state.is_down();
        match source {
            Some(source) => state.sources.insert(source) && !was_down,
            None if repeat || was_down => false,
            None => {
                state.anonymous += 1;
                true
            }
        }
    }

    /// Records a release. Returns None if the key was not held by `source`, otherwise whether
    /// the key went from down to up.
    pub fn release(&mut self, key: KeySymbol, source: Option<SourceId>) -> Option<bool> {
        let state = self.keys.get_mut(&key)?;
        match source {
            Some(source) => {
                if !state.sources.remove(&source) {
                    return None;
                }
            }
            None => {
                if state.anonymous == 0 {
                    return None;
                }
                state.anonymous -= 1;
            }
        }
        if state.is_down() {
            return Some(false);
        }
        self.keys.remove(&key);
        Some(true)
    }

    pub fn is_down(&self, key: KeySymbol) -> bool {
        self.keys.get(&key).is_some_and(PressState::is_down)
    }

    pub fn release_all(&mut self) {
        self.keys.clear();
    }
}

/// Applies key presses to the machine.
#[derive(Default)]
pub struct Keyboard {
    table: PressTable,
    /// Keyboard matrix keys currently held.
    held_keys: u32,
}

impl Keyboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press_table(&self) -> &PressTable {
        &self.table
    }

    /// Returns false if the key is not handled by the machine.
    pub fn key_down(
        &mut self,
        cpu: &mut Cpu<MachineState>,
        key: KeySymbol,
        modifiers: Modifiers,
        source: Option<SourceId>,
        repeat: bool,
    ) -> bool {
        if !self.table.press(key, source, repeat) {
            return true;
        }
        if key.action() == KeyAction::Reset {
            debug!("Reset key");
            cpu.reset();
            return true;
        }
        let machine = &mut cpu.bus;
        match key.action() {
            KeyAction::Joystick(mask) => machine.pia.set_porta_line(mask, true),
            KeyAction::Trigger(index) => machine.gtia.set_trigger(index, true),
            KeyAction::Console(mask) => machine.gtia.set_console_keys(mask, true),
            KeyAction::Break => machine.request_irq(IRQ_BREAK_KEY_PRESSED),
            KeyAction::Shift => machine.pokey.set_skstat_bits(SKSTAT_SHIFT, false),
            KeyAction::Reset | KeyAction::Control => (),
            KeyAction::Keyboard(code) => {
                let mut kbcode = code;
                if modifiers.control {
                    kbcode |= 0x80;
                }
                if modifiers.shift {
                    kbcode |= 0x40;
                }
                machine.pokey.key_pressed(kbcode);
                machine.request_irq(IRQ_OTHER_KEY_PRESSED);
                machine.pokey.set_skstat_bits(SKSTAT_KEY_DOWN, false);
                self.held_keys += 1;
            }
            KeyAction::Unmapped => {
                self.table.release(key, source);
                return false;
            }
        }
        true
    }

    /// Returns false if the key was not held by `source`.
    pub fn key_up(
        &mut self,
        cpu: &mut Cpu<MachineState>,
        key: KeySymbol,
        source: Option<SourceId>,
    ) -> bool {
        match self.table.release(key, source) {
            None => return false,
            Some(false) => return true,
            Some(true) => (),
        }
        let machine = &mut cpu.bus;
        match key.action() {
            KeyAction::Joystick(mask) => machine.pia.set_porta_line(mask, false),
            KeyAction::Trigger(index) => machine.gtia.set_trigger(index, false),
            KeyAction::Console(mask) => machine.gtia.set_console_keys(mask, false),
            KeyAction::Shift => machine.pokey.set_skstat_bits(SKSTAT_SHIFT, true),
            KeyAction::Reset | KeyAction::Break | KeyAction::Control => (),
            KeyAction::Keyboard(_) => {
                self.held_keys = self.held_keys.saturating_sub(1);
                if self.held_keys == 0 {
                    machine.pokey.set_skstat_bits(SKSTAT_KEY_DOWN, true);
                }
            }
            KeyAction::Unmapped => return false,
        }
        true
    }

    /// Releases everything, e.g. when the host window loses focus.
    pub fn release_all(&mut self, machine: &mut MachineState) {
        self.table.release_all();
        self.held_keys = 0;
        machine.pia.set_porta_line(0x0F, false);
        for trigger in 0..4 {
            machine.gtia.set_trigger(trigger, false);
        }
        machine
            .gtia
            .set_console_keys(CONSOL_OPTION | CONSOL_SELECT | CONSOL_START, false);
        machine
            .pokey
            .set_skstat_bits(SKSTAT_KEY_DOWN | SKSTAT_SHIFT, true);
    }
}
