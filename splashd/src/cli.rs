//! Command line options

use std::path::PathBuf;

use clap::Parser;

use crate::config::SplashConfig;

/// Boot splashscreen daemon
#[derive(Debug, Parser)]
#[command(name = "splashd", version, about)]
pub struct Cli {
    /// Do not switch the console to graphics mode
    #[arg(short = 'n', long = "no-console-switch")]
    pub no_console_switch: bool,

    /// Rotate the display
    #[arg(short = 'a', long = "angle", value_parser = parse_angle)]
    pub angle: Option<u16>,

    /// Framebuffer index, /dev/fbN
    #[arg(short = 'f', long = "fbdev", value_parser = clap::value_parser!(u8).range(0..=9))]
    pub fbdev: Option<u8>,

    /// Configuration file [default: /etc/splashd.toml]
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
}

fn parse_angle(text: &str) -> Result<u16, String> {
    match text.parse::<u16>() {
        Ok(angle @ (0 | 90 | 180 | 270)) => Ok(angle),
        _ => Err("must be 0, 90, 180 or 270".to_string()),
    }
}

impl Cli {
    /// Apply options on top of a loaded configuration
    pub fn apply(&self, config: &mut SplashConfig) {
        if self.no_console_switch {
            config.console_switch = false;
        }
        if let Some(angle) = self.angle {
            config.angle = angle;
        }
        if let Some(fbdev) = self.fbdev {
            config.fbdev = fbdev;
        }
    }
}
