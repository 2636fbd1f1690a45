//! Command classification for framed pipe lines
//!
//! A line is split on its first space. The first token selects the command,
//! the remainder (verbatim, spaces included) is its argument.

/// Command keywords
pub const CMD_MSG: &[u8] = b"MSG";
pub const CMD_PROGRESS: &[u8] = b"PROGRESS";
pub const CMD_QUIT: &[u8] = b"QUIT";

/// A command parsed from one pipe line
///
/// Borrows its payload from the line buffer, so it must be applied before
/// the buffer is touched again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    /// Replace the status message
    Message(&'a str),
    /// Move the progress bar; negative values fill from the right
    Progress(i32),
    /// Stop processing commands
    Quit,
    /// Unrecognized command, ignored by the renderer
    Unknown,
}

impl<'a> Command<'a> {
    /// Parse a command from a line (terminator already stripped)
    ///
    /// Returns `None` for lines that carry no command at all: a `MSG`
    /// without text.
    pub fn parse(line: &'a [u8]) -> Option<Self> {
        if line == CMD_QUIT {
            return Some(Command::Quit);
        }

        let (keyword, argument) = match line.iter().position(|&b| b == b' ') {
            Some(space) => (&line[..space], Some(&line[space + 1..])),
            None => (line, None),
        };

        match keyword {
            CMD_MSG => argument
                .filter(|text| !text.is_empty())
                .map(|text| Command::Message(utf8_prefix(text))),
            CMD_PROGRESS => Some(Command::Progress(argument.map_or(0, parse_int))),
            CMD_QUIT => Some(Command::Quit),
            _ => Some(Command::Unknown),
        }
    }

    /// Returns true if this command ends the session
    pub fn is_quit(&self) -> bool {
        matches!(self, Command::Quit)
    }
}

/// Longest valid UTF-8 prefix of `bytes`
fn utf8_prefix(bytes: &[u8]) -> &str {
    match core::str::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            // valid_up_to() always marks a char boundary
            core::str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or("")
        }
    }
}

/// Parse a signed decimal the way C `atoi` does
///
/// Leading whitespace and one sign are accepted, parsing stops at the first
/// non-digit, and text without digits yields 0. Out-of-range values
/// saturate instead of wrapping.
pub fn parse_int(text: &[u8]) -> i32 {
    let mut rest = text;
    while let [b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c, tail @ ..] = rest {
        rest = tail;
    }

    let negative = match rest {
        [b'-', tail @ ..] => {
            rest = tail;
            true
        }
        [b'+', tail @ ..] => {
            rest = tail;
            false
        }
        _ => false,
    };

    let mut value: i32 = 0;
    for &byte in rest.iter().take_while(|b| b.is_ascii_digit()) {
        let digit = i32::from(byte - b'0');
        value = if negative {
            value.saturating_mul(10).saturating_sub(digit)
        } else {
            value.saturating_mul(10).saturating_add(digit)
        };
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quit() {
        assert_eq!(Command::parse(b"QUIT"), Some(Command::Quit));
        // First-token match also stops, like the second check in the C parser
        assert_eq!(Command::parse(b"QUIT now"), Some(Command::Quit));
        assert_eq!(Command::parse(b"QUITTING"), Some(Command::Unknown));
    }

    #[test]
    fn test_message_keeps_spaces() {
        assert_eq!(
            Command::parse(b"MSG Starting  network services "),
            Some(Command::Message("Starting  network services "))
        );
    }

    #[test]
    fn test_message_without_text() {
        assert_eq!(Command::parse(b"MSG"), None);
        assert_eq!(Command::parse(b"MSG "), None);
    }

    #[test]
    fn test_message_invalid_utf8_is_truncated() {
        assert_eq!(
            Command::parse(b"MSG ok\xff\xfebad"),
            Some(Command::Message("ok"))
        );
    }

    #[test]
    fn test_progress_values() {
        assert_eq!(Command::parse(b"PROGRESS 42"), Some(Command::Progress(42)));
        assert_eq!(Command::parse(b"PROGRESS -10"), Some(Command::Progress(-10)));
        assert_eq!(Command::parse(b"PROGRESS 250"), Some(Command::Progress(250)));
    }

    #[test]
    fn test_progress_garbage_is_zero() {
        assert_eq!(Command::parse(b"PROGRESS abc"), Some(Command::Progress(0)));
        assert_eq!(Command::parse(b"PROGRESS"), Some(Command::Progress(0)));
        assert_eq!(Command::parse(b"PROGRESS "), Some(Command::Progress(0)));
    }

    #[test]
    fn test_unknown() {
        assert_eq!(Command::parse(b"HELLO world"), Some(Command::Unknown));
        assert_eq!(Command::parse(b"msg lowercase"), Some(Command::Unknown));
        assert_eq!(Command::parse(b" MSG leading space"), Some(Command::Unknown));
    }

    #[test]
    fn test_parse_int_like_atoi() {
        assert_eq!(parse_int(b"  +17"), 17);
        assert_eq!(parse_int(b"\t-5%"), -5);
        assert_eq!(parse_int(b"12abc"), 12);
        assert_eq!(parse_int(b"- 3"), 0);
        assert_eq!(parse_int(b"99999999999"), i32::MAX);
        assert_eq!(parse_int(b"-99999999999"), i32::MIN);
    }
}
