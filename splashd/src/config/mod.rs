//! Daemon configuration
//!
//! Settings come from three layers, later ones winning:
//! - the default splashd.toml compiled into the binary
//! - a configuration file (`/etc/splashd.toml` or `--config`)
//! - command line options and `PSPLASH_FIFO_DIR`

pub mod loader;

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use splash_display::font::font_by_name;
use splash_display::layout::MAX_SPLIT_DENOMINATOR;
use splash_display::rle::MAX_DIMENSION;
use splash_display::{FlipPolicy, Image, ImageError, Palette, Rotation, Scene, Size};
use splash_hal_linux::fifo::FIFO_NAME;

pub use loader::{load, ConfigError};

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SplashConfig {
    /// Pipe directory; `PSPLASH_FIFO_DIR` takes precedence
    pub fifo_dir: Option<PathBuf>,
    pub fifo_name: String,
    /// Framebuffer index, `/dev/fbN`
    pub fbdev: u8,
    /// Rotation in degrees
    pub angle: u16,
    pub console_switch: bool,
    /// Seconds without input before giving up; 0 waits forever
    pub wait_timeout_s: u64,
    pub flip_policy: FlipMode,
    pub scene: SceneConfig,
    pub colors: ColorConfig,
    pub logo: Option<LogoConfig>,
}

impl Default for SplashConfig {
    fn default() -> Self {
        Self {
            fifo_dir: None,
            fifo_name: FIFO_NAME.to_string(),
            fbdev: 0,
            angle: 0,
            console_switch: true,
            wait_timeout_s: 0,
            flip_policy: FlipMode::Always,
            scene: SceneConfig::default(),
            colors: ColorConfig::default(),
            logo: None,
        }
    }
}

/// Flip behavior as written in the config file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlipMode {
    #[default]
    Always,
    OnDraw,
}

impl From<FlipMode> for FlipPolicy {
    fn from(mode: FlipMode) -> Self {
        match mode {
            FlipMode::Always => FlipPolicy::Always,
            FlipMode::OnDraw => FlipPolicy::OnDraw,
        }
    }
}

/// `[scene]` section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SceneConfig {
    pub startup_message: Option<String>,
    pub fullscreen_logo: bool,
    pub show_progress_bar: bool,
    pub split_numerator: u32,
    pub split_denominator: u32,
    pub font: String,
    pub bar_width: u32,
    pub bar_height: u32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            startup_message: None,
            fullscreen_logo: false,
            show_progress_bar: true,
            split_numerator: 5,
            split_denominator: 6,
            font: "9x15".to_string(),
            bar_width: 460,
            bar_height: 36,
        }
    }
}

/// `[colors]` section, `0xRRGGBB` values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorConfig {
    pub background: u32,
    pub text: u32,
    pub bar: u32,
    pub bar_background: u32,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            background: 0xecece1,
            text: 0x6d6d70,
            bar: 0x6d6d70,
            bar_background: 0xecece1,
        }
    }
}

impl From<ColorConfig> for Palette {
    fn from(colors: ColorConfig) -> Self {
        Palette {
            background: Palette::from_rgb(colors.background),
            text: Palette::from_rgb(colors.text),
            bar: Palette::from_rgb(colors.bar),
            bar_background: Palette::from_rgb(colors.bar_background),
        }
    }
}

/// `[logo]` section: raw RLE artwork on disk
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogoConfig {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_bytes_per_pixel")]
    pub bytes_per_pixel: u8,
    /// Defaults to `width * bytes_per_pixel`
    pub rowstride: Option<u32>,
}

fn default_bytes_per_pixel() -> u8 {
    4
}

impl SplashConfig {
    /// Check values that the types alone cannot rule out
    pub fn validate(&self) -> Result<(), ConfigError> {
        if Rotation::from_degrees(self.angle).is_none() {
            return Err(ConfigError::Invalid(format!(
                "angle must be 0, 90, 180 or 270, not {}",
                self.angle
            )));
        }
        if self.fbdev > 9 {
            return Err(ConfigError::Invalid(format!(
                "fbdev must be 0-9, not {}",
                self.fbdev
            )));
        }
        if self.fifo_name.is_empty() || self.fifo_name.contains('/') {
            return Err(ConfigError::Invalid(format!(
                "fifo_name must be a plain file name, not {:?}",
                self.fifo_name
            )));
        }

        let scene = &self.scene;
        if font_by_name(&scene.font).is_none() {
            return Err(ConfigError::Invalid(format!(
                "unknown font {:?}",
                scene.font
            )));
        }
        if scene.split_denominator == 0
            || scene.split_denominator > MAX_SPLIT_DENOMINATOR
            || scene.split_numerator > scene.split_denominator
        {
            return Err(ConfigError::Invalid(format!(
                "split {}/{} must satisfy 0 <= numerator <= denominator <= {}",
                scene.split_numerator, scene.split_denominator, MAX_SPLIT_DENOMINATOR
            )));
        }
        if scene.bar_width > MAX_DIMENSION || scene.bar_height > MAX_DIMENSION {
            return Err(ConfigError::Invalid(format!(
                "bar {}x{} exceeds {} pixels",
                scene.bar_width, scene.bar_height, MAX_DIMENSION
            )));
        }

        for (name, value) in [
            ("background", self.colors.background),
            ("text", self.colors.text),
            ("bar", self.colors.bar),
            ("bar_background", self.colors.bar_background),
        ] {
            if value > 0xffffff {
                return Err(ConfigError::Invalid(format!(
                    "color {name} {value:#x} is not 0xRRGGBB"
                )));
            }
        }
        Ok(())
    }

    /// Display rotation
    pub fn rotation(&self) -> Rotation {
        Rotation::from_degrees(self.angle).unwrap_or_default()
    }

    /// Wait timeout, `None` meaning forever
    pub fn wait_timeout(&self) -> Option<Duration> {
        (self.wait_timeout_s > 0).then(|| Duration::from_secs(self.wait_timeout_s))
    }

    /// Build the scene, loading logo artwork from disk
    pub fn scene(&self) -> Result<Scene, ConfigError> {
        let logo = self.logo.as_ref().map(load_logo).transpose()?;
        let font = font_by_name(&self.scene.font)
            .ok_or_else(|| ConfigError::Invalid(format!("unknown font {:?}", self.scene.font)))?;

        let scene = Scene {
            palette: self.colors.into(),
            font,
            logo,
            startup_message: self.scene.startup_message.clone(),
            show_progress_bar: self.scene.show_progress_bar,
            split_numerator: self.scene.split_numerator,
            split_denominator: self.scene.split_denominator,
            fullscreen_logo: self.scene.fullscreen_logo,
            ..Scene::default()
        };
        Ok(scene.with_bar_size(Size::new(self.scene.bar_width, self.scene.bar_height)))
    }
}

fn load_logo(logo: &LogoConfig) -> Result<Image, ConfigError> {
    let data = std::fs::read(&logo.path).map_err(|source| ConfigError::Read {
        path: logo.path.clone(),
        source,
    })?;
    let rowstride = logo
        .rowstride
        .unwrap_or(logo.width.saturating_mul(u32::from(logo.bytes_per_pixel)));

    Image::new(logo.width, logo.height, logo.bytes_per_pixel, rowstride, data).map_err(
        |reason: ImageError| ConfigError::Logo {
            path: logo.path.clone(),
            reason,
        },
    )
}
