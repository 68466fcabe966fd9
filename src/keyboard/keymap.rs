//! Key code definition and capture-source normalization
//!
//! Codes follow the Windows virtual-key numbering so that sessions recorded on
//! different platforms line up (`A` = 65, `Space` = 32). They identify a key
//! position only and are never turned back into characters.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a physical/virtual key
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyCode(pub u32);

impl KeyCode {
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl From<u32> for KeyCode {
    fn from(code: u32) -> Self {
        Self(code)
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Normalize a `device_query` key into a [`KeyCode`].
///
/// Returns `None` for keys without a stable virtual-key number; the capture
/// source drops those before they reach the recorder.
pub fn key_code(key: &device_query::Keycode) -> Option<KeyCode> {
    use device_query::Keycode as DK;
    let code = match key {
        DK::A => 0x41,
        DK::B => 0x42,
        DK::C => 0x43,
        DK::D => 0x44,
        DK::E => 0x45,
        DK::F => 0x46,
        DK::G => 0x47,
        DK::H => 0x48,
        DK::I => 0x49,
        DK::J => 0x4A,
        DK::K => 0x4B,
        DK::L => 0x4C,
        DK::M => 0x4D,
        DK::N => 0x4E,
        DK::O => 0x4F,
        DK::P => 0x50,
        DK::Q => 0x51,
        DK::R => 0x52,
        DK::S => 0x53,
        DK::T => 0x54,
        DK::U => 0x55,
        DK::V => 0x56,
        DK::W => 0x57,
        DK::X => 0x58,
        DK::Y => 0x59,
        DK::Z => 0x5A,
        DK::Key0 => 0x30,
        DK::Key1 => 0x31,
        DK::Key2 => 0x32,
        DK::Key3 => 0x33,
        DK::Key4 => 0x34,
        DK::Key5 => 0x35,
        DK::Key6 => 0x36,
        DK::Key7 => 0x37,
        DK::Key8 => 0x38,
        DK::Key9 => 0x39,
        DK::F1 => 0x70,
        DK::F2 => 0x71,
        DK::F3 => 0x72,
        DK::F4 => 0x73,
        DK::F5 => 0x74,
        DK::F6 => 0x75,
        DK::F7 => 0x76,
        DK::F8 => 0x77,
        DK::F9 => 0x78,
        DK::F10 => 0x79,
        DK::F11 => 0x7A,
        DK::F12 => 0x7B,
        DK::Backspace => 0x08,
        DK::Tab => 0x09,
        DK::Enter => 0x0D,
        DK::CapsLock => 0x14,
        DK::Escape => 0x1B,
        DK::Space => 0x20,
        DK::PageUp => 0x21,
        DK::PageDown => 0x22,
        DK::End => 0x23,
        DK::Home => 0x24,
        DK::Left => 0x25,
        DK::Up => 0x26,
        DK::Right => 0x27,
        DK::Down => 0x28,
        DK::Insert => 0x2D,
        DK::Delete => 0x2E,
        DK::LMeta => 0x5B,
        DK::RMeta => 0x5C,
        DK::Numpad0 => 0x60,
        DK::Numpad1 => 0x61,
        DK::Numpad2 => 0x62,
        DK::Numpad3 => 0x63,
        DK::Numpad4 => 0x64,
        DK::Numpad5 => 0x65,
        DK::Numpad6 => 0x66,
        DK::Numpad7 => 0x67,
        DK::Numpad8 => 0x68,
        DK::Numpad9 => 0x69,
        DK::NumpadMultiply => 0x6A,
        DK::NumpadAdd => 0x6B,
        DK::NumpadSubtract => 0x6D,
        DK::NumpadDivide => 0x6F,
        DK::LShift => 0xA0,
        DK::RShift => 0xA1,
        DK::LControl => 0xA2,
        DK::RControl => 0xA3,
        DK::LAlt => 0xA4,
        DK::RAlt => 0xA5,
        DK::Semicolon => 0xBA,
        DK::Equal => 0xBB,
        DK::Comma => 0xBC,
        DK::Minus => 0xBD,
        DK::Dot => 0xBE,
        DK::Slash => 0xBF,
        DK::Grave => 0xC0,
        DK::LeftBracket => 0xDB,
        DK::BackSlash => 0xDC,
        DK::RightBracket => 0xDD,
        DK::Apostrophe => 0xDE,
        _ => return None,
    };
    Some(KeyCode(code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use device_query::Keycode as DK;

    #[test]
    fn letters_use_virtual_key_numbers() {
        assert_eq!(key_code(&DK::A), Some(KeyCode(65)));
        assert_eq!(key_code(&DK::Z), Some(KeyCode(90)));
    }

    #[test]
    fn common_keys_are_mapped() {
        assert_eq!(key_code(&DK::Space), Some(KeyCode(32)));
        assert_eq!(key_code(&DK::Enter), Some(KeyCode(13)));
        assert_eq!(key_code(&DK::Key0), Some(KeyCode(48)));
    }

    #[test]
    fn key_codes_order_numerically() {
        let mut codes = vec![KeyCode(90), KeyCode(32), KeyCode(65)];
        codes.sort();
        assert_eq!(codes, vec![KeyCode(32), KeyCode(65), KeyCode(90)]);
    }

    #[test]
    fn key_code_serializes_as_plain_integer() {
        let json = serde_json::to_string(&KeyCode(65)).unwrap();
        assert_eq!(json, "65");
    }
}
