/// Characters that are not allowed anywhere in a stream name.
pub const RESERVED_CHARS: [char; 9] = ['"', '*', '/', ':', '<', '>', '?', '\\', '|'];

/// Why a stream name was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("name is empty")]
    Empty,

    #[error("control character 0x{0:02x}")]
    ControlChar(u8),

    #[error("reserved character {0:?}")]
    ReservedChar(char),
}

/// Check that `name` is safe to use as a file name stem.
///
/// Rejects the empty name, ASCII control characters (0x00-0x1F, 0x7F) and
/// the characters `" * / : < > ? \ |`.
pub fn validate_name(name: &str) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    for ch in name.chars() {
        if ch.is_ascii_control() {
            return Err(NameError::ControlChar(ch as u8));
        }
        if RESERVED_CHARS.contains(&ch) {
            return Err(NameError::ReservedChar(ch));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_names() {
        for name in ["sensor", "accel_x", "Microphone 1", "imu.raw", "données"] {
            assert_eq!(validate_name(name), Ok(()), "{name}");
        }
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(validate_name(""), Err(NameError::Empty));
    }

    #[test]
    fn rejects_reserved_characters() {
        for ch in RESERVED_CHARS {
            let name = format!("bad{ch}name");
            assert_eq!(validate_name(&name), Err(NameError::ReservedChar(ch)));
        }
    }

    #[test]
    fn rejects_control_characters() {
        assert_eq!(validate_name("a\0b"), Err(NameError::ControlChar(0)));
        assert_eq!(validate_name("tab\there"), Err(NameError::ControlChar(0x09)));
        assert_eq!(validate_name("line\n"), Err(NameError::ControlChar(0x0a)));
        assert_eq!(validate_name("esc\x1b"), Err(NameError::ControlChar(0x1b)));
        assert_eq!(validate_name("del\x7f"), Err(NameError::ControlChar(0x7f)));
    }
}
