use std::fmt;

use crate::registers::Registers;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    K0,
    K1,
    K2,
    K3,
    K4,
    K5,
    K6,
    K7,
    K8,
    K9,
    KA,
    KB,
    KC,
    KD,
    KE,
    KF,
}

impl Key {
    pub const ALL: [Key; 16] = [
        Key::K0,
        Key::K1,
        Key::K2,
        Key::K3,
        Key::K4,
        Key::K5,
        Key::K6,
        Key::K7,
        Key::K8,
        Key::K9,
        Key::KA,
        Key::KB,
        Key::KC,
        Key::KD,
        Key::KE,
        Key::KF,
    ];

    pub fn value(self) -> u8 {
        self as u8
    }

    /// Key numbered by the low nibble of `n`.
    pub fn from_value(n: u8) -> Self {
        Self::ALL[(n & 0xF) as usize]
    }
}

/// Classic layout: the left-hand 4x4 block of a QWERTY keyboard.
///
/// ```text
/// 1 2 3 4      1 2 3 C
/// q w e r  ->  4 5 6 D
/// a s d f      7 8 9 E
/// z x c v      A 0 B F
/// ```
pub fn classic_keymap(key: char) -> Option<Key> {
    match key.to_ascii_lowercase() {
        '1' => Some(Key::K1),
        '2' => Some(Key::K2),
        '3' => Some(Key::K3),
        '4' => Some(Key::KC),
        'q' => Some(Key::K4),
        'w' => Some(Key::K5),
        'e' => Some(Key::K6),
        'r' => Some(Key::KD),
        'a' => Some(Key::K7),
        's' => Some(Key::K8),
        'd' => Some(Key::K9),
        'f' => Some(Key::KE),
        'z' => Some(Key::KA),
        'x' => Some(Key::K0),
        'c' => Some(Key::KB),
        'v' => Some(Key::KF),
        _ => None,
    }
}

pub type KeyCallback = Box<dyn FnOnce(Key, &mut Registers) + Send>;

/// At most one outstanding "wait for the next key release".
#[derive(Default)]
pub enum FutureInput {
    #[default]
    Inactive,
    Pending(KeyCallback),
}

impl FutureInput {
    pub fn on_next_key_ready(&mut self, on_key_ready: impl FnOnce(Key, &mut Registers) + Send + 'static) {
        if self.is_pending() {
            log::warn!("key wait already pending, replacing it");
        }
        *self = FutureInput::Pending(Box::new(on_key_ready));
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, FutureInput::Pending(_))
    }
}

impl fmt::Debug for FutureInput {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FutureInput::Inactive => write!(f, "Inactive"),
            FutureInput::Pending(_) => write!(f, "Pending"),
        }
    }
}

#[derive(Debug, Default)]
pub struct Keypad {
    keys: [bool; 16],
    previous: [bool; 16],
    pub future_input: FutureInput,
}

impl Keypad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.keys = [false; 16];
        self.previous = [false; 16];
        self.future_input = FutureInput::Inactive;
    }

    /// Remembers the key's prior state, then overwrites it.
    pub fn set(&mut self, key: Key, down: bool) {
        let i = key.value() as usize;
        self.previous[i] = self.keys[i];
        self.keys[i] = down;
    }

    pub fn on_down(&mut self, key: Key) {
        self.set(key, true);
    }

    pub fn on_up(&mut self, key: Key) {
        self.set(key, false);
    }

    pub fn is_down(&self, key: Key) -> bool {
        self.keys[key.value() as usize]
    }

    /// First key, in key order, that was down and is now up.
    pub fn key_released(&self) -> Option<Key> {
        Key::ALL
            .into_iter()
            .find(|key| {
                let i = key.value() as usize;
                self.previous[i] && !self.keys[i]
            })
    }

    pub fn clear_previous(&mut self) {
        self.previous = [false; 16];
    }

    /// Resolves a pending key wait if a release edge is available. Returns
    /// the key that satisfied it.
    pub fn check_input(&mut self, registers: &mut Registers) -> Option<Key> {
        if !self.future_input.is_pending() {
            return None;
        }
        let key = self.key_released()?;
        if let FutureInput::Pending(on_key_ready) = std::mem::take(&mut self.future_input) {
            on_key_ready(key, registers);
        }
        Some(key)
    }
}
