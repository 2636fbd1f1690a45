//! Font selection
//!
//! Maps configuration names to the monospace ASCII fonts shipped with
//! embedded-graphics.

use embedded_graphics::mono_font::ascii::{FONT_10X20, FONT_6X10, FONT_8X13, FONT_9X15};
use embedded_graphics::mono_font::MonoFont;

/// Font used when none is configured
pub const DEFAULT_FONT: &str = "9x15";

/// Names accepted by [`font_by_name`]
pub const FONT_NAMES: [&str; 4] = ["6x10", "8x13", "9x15", "10x20"];

/// Look up a font by its `WxH` name
pub fn font_by_name(name: &str) -> Option<&'static MonoFont<'static>> {
    match name {
        "6x10" => Some(&FONT_6X10),
        "8x13" => Some(&FONT_8X13),
        "9x15" => Some(&FONT_9X15),
        "10x20" => Some(&FONT_10X20),
        _ => None,
    }
}

/// The font used when none is configured
pub fn default_font() -> &'static MonoFont<'static> {
    &FONT_9X15
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_listed_name_resolves() {
        for name in FONT_NAMES {
            let font = font_by_name(name).unwrap();
            let size = font.character_size;
            assert_eq!(name, alloc::format!("{}x{}", size.width, size.height));
        }
    }

    #[test]
    fn test_unknown_name() {
        assert!(font_by_name("12x24").is_none());
        assert!(font_by_name("").is_none());
    }

    #[test]
    fn test_default_is_listed() {
        let named = font_by_name(DEFAULT_FONT).unwrap();
        assert_eq!(named.character_size, default_font().character_size);
    }
}
