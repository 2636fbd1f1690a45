//! Build script for splashd
//!
//! Validates the embedded splashd.toml at compile time, so a broken default
//! configuration never reaches a device.

use std::fs;
use std::path::Path;

const TOP_LEVEL_KEYS: &[&str] = &[
    "fifo_dir",
    "fifo_name",
    "fbdev",
    "angle",
    "console_switch",
    "wait_timeout_s",
    "flip_policy",
    "scene",
    "colors",
    "logo",
];

const SCENE_KEYS: &[&str] = &[
    "startup_message",
    "fullscreen_logo",
    "show_progress_bar",
    "split_numerator",
    "split_denominator",
    "font",
    "bar_width",
    "bar_height",
];

const COLOR_KEYS: &[&str] = &["background", "text", "bar", "bar_background"];

const LOGO_KEYS: &[&str] = &["path", "width", "height", "bytes_per_pixel", "rowstride"];

const FONTS: &[&str] = &["6x10", "8x13", "9x15", "10x20"];

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    validate_config();
}

/// Validate splashd.toml at compile time
fn validate_config() {
    println!("cargo:rerun-if-changed=splashd.toml");

    let config_path = Path::new("splashd.toml");
    let content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => fail("Failed to read splashd.toml", &[e.to_string()]),
    };

    let config: toml::Value = match toml::from_str(&content) {
        Ok(value) => value,
        Err(e) => fail(
            "Invalid TOML syntax in splashd.toml",
            &e.to_string().lines().map(String::from).collect::<Vec<_>>(),
        ),
    };

    let mut errors = Vec::new();
    check_keys(&config, "", TOP_LEVEL_KEYS, &mut errors);
    validate_top_level(&config, &mut errors);
    validate_scene(&config, &mut errors);
    validate_colors(&config, &mut errors);
    if let Some(logo) = config.get("logo") {
        check_keys(logo, "logo", LOGO_KEYS, &mut errors);
    }

    if !errors.is_empty() {
        fail("Invalid configuration in splashd.toml", &errors);
    }
}

/// Abort the build with a boxed error report
fn fail(title: &str, lines: &[String]) -> ! {
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title,
        lines
            .iter()
            .map(|line| {
                let truncated = if line.chars().count() > 62 {
                    format!("{}...", line.chars().take(59).collect::<String>())
                } else {
                    line.clone()
                };
                format!("║  • {:<62} ║", truncated)
            })
            .collect::<Vec<_>>()
            .join("\n")
    );
}

/// Flag keys that the daemon would reject
fn check_keys(table: &toml::Value, section: &str, known: &[&str], errors: &mut Vec<String>) {
    let Some(table) = table.as_table() else {
        errors.push(format!("[{}] must be a table", section));
        return;
    };
    for key in table.keys() {
        if !known.contains(&key.as_str()) {
            if section.is_empty() {
                errors.push(format!("unknown key '{}'", key));
            } else {
                errors.push(format!("[{}] unknown key '{}'", section, key));
            }
        }
    }
}

fn validate_top_level(config: &toml::Value, errors: &mut Vec<String>) {
    if let Some(angle) = config.get("angle") {
        if !matches!(angle.as_integer(), Some(0 | 90 | 180 | 270)) {
            errors.push("angle must be 0, 90, 180 or 270".to_string());
        }
    }

    if let Some(fbdev) = config.get("fbdev") {
        if !matches!(fbdev.as_integer(), Some(0..=9)) {
            errors.push("fbdev must be 0-9".to_string());
        }
    }

    if let Some(policy) = config.get("flip_policy") {
        if !matches!(policy.as_str(), Some("always" | "on-draw")) {
            errors.push("flip_policy must be 'always' or 'on-draw'".to_string());
        }
    }

    if let Some(timeout) = config.get("wait_timeout_s") {
        if !matches!(timeout.as_integer(), Some(t) if t >= 0) {
            errors.push("wait_timeout_s must be a non-negative integer".to_string());
        }
    }
}

fn validate_scene(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(scene) = config.get("scene") else {
        return;
    };
    check_keys(scene, "scene", SCENE_KEYS, errors);

    if let Some(font) = scene.get("font") {
        if !font.as_str().is_some_and(|f| FONTS.contains(&f)) {
            errors.push(format!("[scene] font must be one of {}", FONTS.join(", ")));
        }
    }

    let numerator = scene.get("split_numerator").and_then(|v| v.as_integer());
    let denominator = scene.get("split_denominator").and_then(|v| v.as_integer());
    if let (Some(num), Some(den)) = (numerator, denominator) {
        if den <= 0 || den > 1000 || num < 0 || num > den {
            errors.push(
                "[scene] split must satisfy 0 <= numerator <= denominator <= 1000".to_string(),
            );
        }
    }
}

fn validate_colors(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(colors) = config.get("colors") else {
        return;
    };
    check_keys(colors, "colors", COLOR_KEYS, errors);

    for key in COLOR_KEYS {
        if let Some(value) = colors.get(*key) {
            if !matches!(value.as_integer(), Some(0..=0xffffff)) {
                errors.push(format!("[colors] {} must be 0x000000-0xffffff", key));
            }
        }
    }
}
