//! Command dispatch
//!
//! Projects pipe commands onto the surface. Each command that does not stop
//! the session is followed by a lightweight flip of the modified region.

use heapless::String;
use splash_protocol::Command;

use crate::layout::Layout;
use crate::scene::Scene;
use crate::surface::Surface;

/// Longest message kept in [`Status`]
pub const MAX_MESSAGE_LEN: usize = 128;

/// What the caller should do after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Keep reading commands
    Continue,
    /// End the session
    Stop,
}

/// When to flip after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlipPolicy {
    /// After every command except `Quit`, even if nothing was drawn
    #[default]
    Always,
    /// Only after commands that drew something
    OnDraw,
}

/// Last state shown on screen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Status {
    /// Last message, truncated to [`MAX_MESSAGE_LEN`] bytes
    pub message: String<MAX_MESSAGE_LEN>,
    /// Last progress value as received
    pub progress: i32,
}

impl Status {
    fn set_message(&mut self, text: &str) {
        self.message.clear();
        for c in text.chars() {
            if self.message.push(c).is_err() {
                break;
            }
        }
    }
}

/// Applies commands to a surface
pub struct Dispatcher<S> {
    surface: S,
    scene: Scene,
    layout: Layout,
    policy: FlipPolicy,
    status: Status,
}

impl<S: Surface> Dispatcher<S> {
    /// Create a dispatcher drawing `scene` on `surface`
    pub fn new(surface: S, scene: Scene, policy: FlipPolicy) -> Self {
        let layout = scene.layout(surface.size());
        Self {
            surface,
            scene,
            layout,
            policy,
            status: Status::default(),
        }
    }

    /// Paint the initial scene and sync every display page
    pub fn paint_scene(&mut self) -> Result<(), S::Error> {
        let size = self.surface.size();
        let background = self.scene.palette.background;
        self.surface
            .draw_rect(0, 0, size.width, size.height, background);

        if let Some(logo) = &self.scene.logo {
            let origin = self.layout.logo_origin(logo.size());
            self.surface.draw_image(origin.x, origin.y, logo);
        }

        if self.scene.show_progress_bar {
            if let Some(bar) = &self.scene.bar {
                let origin = self.layout.bar_origin();
                self.surface.draw_image(origin.x, origin.y, bar);
            }
        }
        self.draw_progress(0);

        if let Some(message) = self.scene.startup_message.take() {
            self.draw_message(&message);
            self.scene.startup_message = Some(message);
        }

        self.surface.flip(true)
    }

    /// Apply one command
    ///
    /// `Quit` returns [`Outcome::Stop`] without touching the display.
    pub fn apply(&mut self, command: Command<'_>) -> Result<Outcome, S::Error> {
        let drawn = match command {
            Command::Quit => return Ok(Outcome::Stop),
            Command::Message(text) => {
                self.draw_message(text);
                true
            }
            Command::Progress(value) => self.draw_progress(value),
            Command::Unknown => false,
        };

        if drawn || self.policy == FlipPolicy::Always {
            self.surface.flip(false)?;
        }
        Ok(Outcome::Continue)
    }

    /// Replace the status message
    pub fn draw_message(&mut self, text: &str) {
        let font = self.scene.font;
        let size = self.surface.measure_text(font, text);

        let band = self.layout.message_band(size.height);
        self.surface.draw_rect(
            band.top_left.x,
            band.top_left.y,
            band.size.width,
            band.size.height,
            self.scene.palette.background,
        );

        let origin = self.layout.message_origin(size);
        self.surface
            .draw_text(origin.x, origin.y, self.scene.palette.text, font, text);
        self.status.set_message(text);
    }

    /// Redraw the progress track
    ///
    /// Returns false when the bar is hidden and nothing was drawn.
    pub fn draw_progress(&mut self, value: i32) -> bool {
        self.status.progress = value;
        if !self.scene.show_progress_bar {
            return false;
        }

        let split = self.layout.progress_split(value);
        let palette = self.scene.palette;
        // Empty part first, so a zero-width fill never leaves stale pixels
        for (area, color) in [
            (split.empty, palette.bar_background),
            (split.filled, palette.bar),
        ] {
            self.surface.draw_rect(
                area.top_left.x,
                area.top_left.y,
                area.size.width,
                area.size.height,
                color,
            );
        }
        true
    }

    /// Last shown state
    pub fn status(&self) -> &Status {
        &self.status
    }

    /// Geometry in use
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Surface being drawn on
    pub fn surface(&self) -> &S {
        &self.surface
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::MemoryPanel;
    use crate::scene::Palette;
    use crate::surface::BufferedSurface;
    use embedded_graphics::mono_font::ascii::FONT_6X10;
    use embedded_graphics::pixelcolor::Rgb888;
    use embedded_graphics::prelude::*;
    use embedded_graphics::primitives::Rectangle;

    type TestDispatcher = Dispatcher<BufferedSurface<MemoryPanel>>;

    const SCREEN: Size = Size::new(160, 240);

    fn scene() -> Scene {
        Scene {
            font: &FONT_6X10,
            palette: Palette {
                background: Rgb888::WHITE,
                text: Rgb888::BLACK,
                bar: Rgb888::RED,
                bar_background: Rgb888::BLUE,
            },
            ..Scene::default()
        }
        .with_bar_size(Size::new(100, 30))
    }

    fn dispatcher(policy: FlipPolicy) -> TestDispatcher {
        let surface = BufferedSurface::new(MemoryPanel::new(SCREEN));
        let mut dispatcher = Dispatcher::new(surface, scene(), policy);
        dispatcher.paint_scene().unwrap();
        dispatcher
    }

    fn flips(d: &TestDispatcher) -> usize {
        d.surface().panel().flips().len()
    }

    /// Committed picture, row by row
    fn committed(d: &TestDispatcher) -> alloc::vec::Vec<Option<Rgb888>> {
        let panel = d.surface().panel();
        Rectangle::new(Point::zero(), SCREEN)
            .points()
            .map(|p| panel.pixel(p))
            .collect()
    }

    #[test]
    fn test_initial_scene_full_sync() {
        let d = dispatcher(FlipPolicy::Always);
        let flip = d.surface().panel().flips()[0];
        assert!(flip.full_sync);

        let canvas = d.surface().canvas();
        assert_eq!(canvas.pixel(Point::zero()), Some(Rgb888::WHITE));
        // Progress 0: whole track in the bar background
        assert!(canvas.is_filled(&d.layout().bar_track(), Rgb888::BLUE));
    }

    #[test]
    fn test_progress_fill_and_reverse_leave_no_residue() {
        let mut d = dispatcher(FlipPolicy::Always);
        let track = d.layout().bar_track();

        d.apply(Command::Progress(100)).unwrap();
        assert!(d.surface().canvas().is_filled(&track, Rgb888::RED));

        d.apply(Command::Progress(-100)).unwrap();
        assert!(d.surface().canvas().is_filled(&track, Rgb888::RED));

        d.apply(Command::Progress(0)).unwrap();
        assert!(d.surface().canvas().is_filled(&track, Rgb888::BLUE));
        assert_eq!(d.status().progress, 0);
    }

    #[test]
    fn test_progress_shrinks_cleanly() {
        let mut d = dispatcher(FlipPolicy::Always);
        let track = d.layout().bar_track();

        d.apply(Command::Progress(80)).unwrap();
        d.apply(Command::Progress(25)).unwrap();

        let split = d.layout().progress_split(25);
        let canvas = d.surface().canvas();
        assert!(canvas.is_filled(&split.filled, Rgb888::RED));
        assert!(canvas.is_filled(&split.empty, Rgb888::BLUE));
        assert_eq!(split.filled.size.width + split.empty.size.width, track.size.width);
    }

    #[test]
    fn test_second_message_replaces_first() {
        let mut d = dispatcher(FlipPolicy::Always);
        d.apply(Command::Message("hello")).unwrap();
        d.apply(Command::Message("hi")).unwrap();

        let mut only_hi = dispatcher(FlipPolicy::Always);
        only_hi.apply(Command::Message("hi")).unwrap();

        assert_eq!(committed(&d), committed(&only_hi));
        assert_eq!(d.status().message.as_str(), "hi");
    }

    #[test]
    fn test_message_is_centered_above_split() {
        let mut d = dispatcher(FlipPolicy::Always);
        d.apply(Command::Message("hello")).unwrap();

        let canvas = d.surface().canvas();
        let split = d.layout().split_line();
        // 5 glyphs of 6x10, centered: x in 65..95, y in split-10..split
        let text = Rectangle::new(Point::new(65, split - 10), Size::new(30, 10));
        assert!(text.points().any(|p| canvas.pixel(p) == Some(Rgb888::BLACK)));

        let outside = Rectangle::new(Point::new(0, split - 10), Size::new(65, 10));
        assert!(canvas.is_filled(&outside, Rgb888::WHITE));
    }

    #[test]
    fn test_flip_after_each_command() {
        let mut d = dispatcher(FlipPolicy::Always);
        let before = flips(&d);

        d.apply(Command::Message("a")).unwrap();
        d.apply(Command::Progress(10)).unwrap();
        d.apply(Command::Unknown).unwrap();

        assert_eq!(flips(&d), before + 3);
        let last = *d.surface().panel().flips().last().unwrap();
        assert!(!last.full_sync);
        assert_eq!(last.region, None);
    }

    #[test]
    fn test_unknown_skips_flip_on_draw_policy() {
        let mut d = dispatcher(FlipPolicy::OnDraw);
        let before = flips(&d);

        assert_eq!(d.apply(Command::Unknown).unwrap(), Outcome::Continue);
        assert_eq!(flips(&d), before);

        d.apply(Command::Progress(50)).unwrap();
        assert_eq!(flips(&d), before + 1);
    }

    #[test]
    fn test_quit_stops_without_flip() {
        let mut d = dispatcher(FlipPolicy::Always);
        let before = flips(&d);

        assert_eq!(d.apply(Command::Quit).unwrap(), Outcome::Stop);
        assert_eq!(flips(&d), before);
    }

    #[test]
    fn test_hidden_bar_draws_nothing() {
        let surface = BufferedSurface::new(MemoryPanel::new(SCREEN));
        let scene = Scene {
            show_progress_bar: false,
            ..scene()
        };
        let mut d = Dispatcher::new(surface, scene, FlipPolicy::OnDraw);
        d.paint_scene().unwrap();
        let before = flips(&d);

        d.apply(Command::Progress(100)).unwrap();
        assert_eq!(flips(&d), before);
        assert_eq!(d.status().progress, 100);
        assert!(d
            .surface()
            .canvas()
            .is_filled(&d.layout().bar_track(), Rgb888::WHITE));
    }

    #[test]
    fn test_startup_message_painted() {
        let surface = BufferedSurface::new(MemoryPanel::new(SCREEN));
        let scene = Scene {
            startup_message: Some("boot".into()),
            ..scene()
        };
        let mut d = Dispatcher::new(surface, scene, FlipPolicy::Always);
        d.paint_scene().unwrap();

        assert_eq!(d.status().message.as_str(), "boot");
    }

    #[test]
    fn test_status_message_truncated_at_char_boundary() {
        let mut status = Status::default();
        let long: alloc::string::String = core::iter::repeat('é').take(100).collect();
        status.set_message(&long);
        assert_eq!(status.message.len(), MAX_MESSAGE_LEN);
        assert!(status.message.chars().all(|c| c == 'é'));
    }
}
