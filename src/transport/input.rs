pub const WM_SETFOCUS: u32 = 0x0007;
pub const WM_KEYDOWN: u32 = 0x0100;
pub const WM_KEYUP: u32 = 0x0101;
pub const WM_MOUSEWHEEL: u32 = 0x020A;
pub const VK_RETURN: u32 = 0x0D;

const WHEEL_DELTA: i16 = 120;
const KEY_UP_FLAGS: usize = 0xC000_0001;

pub(crate) const KEY_UNBLANK: u32 = b'A' as u32;
pub(crate) const KEY_BLANK: u32 = b'B' as u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireMessage {
    pub code: u32,
    pub wparam: isize,
    pub lparam: usize,
}

/// Low-level input understood by the viewer window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMessage {
    SetFocus,
    KeyDown(u32),
    KeyUp(u32),
    /// Positive deltas scroll back, negative deltas scroll forward.
    Wheel(i16),
}

impl InputMessage {
    pub fn step_back() -> Self {
        Self::Wheel(WHEEL_DELTA)
    }

    pub fn step_forward() -> Self {
        Self::Wheel(-WHEEL_DELTA)
    }

    pub fn key_press(key: u32) -> [Self; 2] {
        [Self::KeyDown(key), Self::KeyUp(key)]
    }

    pub fn encode(self) -> WireMessage {
        match self {
            Self::SetFocus => WireMessage {
                code: WM_SETFOCUS,
                wparam: 0,
                lparam: 0,
            },
            Self::KeyDown(key) => WireMessage {
                code: WM_KEYDOWN,
                wparam: key as isize,
                lparam: 0,
            },
            Self::KeyUp(key) => WireMessage {
                code: WM_KEYUP,
                wparam: key as isize,
                lparam: KEY_UP_FLAGS,
            },
            // high word carries the signed wheel delta
            Self::Wheel(delta) => WireMessage {
                code: WM_MOUSEWHEEL,
                wparam: (delta as isize) << 16,
                lparam: 0,
            },
        }
    }

    pub fn decode(wire: WireMessage) -> Option<Self> {
        match wire.code {
            WM_SETFOCUS => Some(Self::SetFocus),
            WM_KEYDOWN => Some(Self::KeyDown(wire.wparam as u32)),
            WM_KEYUP => Some(Self::KeyUp(wire.wparam as u32)),
            WM_MOUSEWHEEL => Some(Self::Wheel((wire.wparam >> 16) as i16)),
            _ => None,
        }
    }
}

/// Key codes typing the 1-based number of the 0-based `slide`.
pub fn slide_number_keys(slide: usize) -> Vec<u32> {
    (slide + 1).to_string().bytes().map(u32::from).collect()
}

#[cfg(test)]
mod tests {
    use super::{InputMessage, WM_KEYUP, WM_MOUSEWHEEL, slide_number_keys};

    #[test]
    fn wheel_steps_encode_delta_in_high_word() {
        let back = InputMessage::step_back().encode();
        assert_eq!(back.code, WM_MOUSEWHEEL);
        assert_eq!(back.wparam, 120 * 65536);

        let forward = InputMessage::step_forward().encode();
        assert_eq!(forward.wparam, -120 * 65536);
        assert_eq!(
            InputMessage::decode(forward),
            Some(InputMessage::step_forward())
        );
    }

    #[test]
    fn key_up_carries_release_flags() {
        let [down, up] = InputMessage::key_press(u32::from(b'7'));
        assert_eq!(down.encode().lparam, 0);
        let up = up.encode();
        assert_eq!(up.code, WM_KEYUP);
        assert_eq!(up.wparam, 0x37);
        assert_eq!(up.lparam, 0xC000_0001);
    }

    #[test]
    fn slide_number_keys_are_one_based_digits() {
        assert_eq!(slide_number_keys(4), vec![u32::from(b'5')]);
        assert_eq!(
            slide_number_keys(11),
            vec![u32::from(b'1'), u32::from(b'2')]
        );
    }
}
