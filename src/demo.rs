//! The panning demo as seen by the host loop

use crate::config::{SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::error::Result;
use crate::host::{FrameInfo, Game, Screen};
use crate::panning::{PanningController, PlaybackBackend};

pub struct PanDemo<B: PlaybackBackend> {
    controller: PanningController<B>,
    marker_width: f64,
}

impl<B: PlaybackBackend> PanDemo<B> {
    pub fn new(controller: PanningController<B>, marker_width: u32) -> Self {
        Self {
            controller,
            marker_width: marker_width as f64,
        }
    }

    pub fn controller(&self) -> &PanningController<B> {
        &self.controller
    }

    /// Overlay text for one frame
    pub fn overlay_text(&self, frame: &FrameInfo) -> String {
        format!(
            "TPS: {:0.2}\nThis is an example using\nstereo audio panning (2 players).\nCurrent: {:0.2}[s]\nPanning: {:.2}",
            frame.actual_tps,
            self.controller.position().as_secs_f64(),
            self.controller.pan()
        )
    }
}

impl<B: PlaybackBackend> Game for PanDemo<B> {
    fn update(&mut self) -> Result<()> {
        self.controller.update()
    }

    fn draw(&self, screen: &mut Screen, frame: &FrameInfo) {
        screen.debug_print(&self.overlay_text(frame));

        // Marker centred on where the sound is
        let x = self.controller.x_position() - self.marker_width / 2.0;
        let y = screen.height() as f64 / 2.0;
        screen.draw_marker(x, y, self.marker_width);
    }

    fn layout(&self) -> (u32, u32) {
        (SCREEN_WIDTH, SCREEN_HEIGHT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::decode::EncodedAudio;
    use crate::audio::testing::wav_bytes;
    use crate::panning::{IsolatedStream, PanOscillator, PlaybackHandle};
    use std::time::Duration;

    struct Silent;

    impl PlaybackHandle for Silent {
        fn set_volume(&self, _: f64) {}
        fn position(&self) -> Duration {
            Duration::from_millis(250)
        }
    }

    struct SilentBackend;

    impl PlaybackBackend for SilentBackend {
        type Player = Silent;

        fn sample_rate(&self) -> u32 {
            8000
        }

        fn new_player(&self, _: IsolatedStream, _: &str) -> Result<Silent> {
            Ok(Silent)
        }

        fn start_together(&self, _: &[&Silent]) {}
    }

    fn demo() -> PanDemo<SilentBackend> {
        let samples = vec![0i16; 16000];
        let source = EncodedAudio::from_bytes(wav_bytes(2, 8000, &samples), Some("wav"));
        let controller = PanningController::new(
            SilentBackend,
            source,
            PanOscillator::new(60.0, 10.0, SCREEN_WIDTH as f64),
        );
        PanDemo::new(controller, 66)
    }

    #[test]
    fn test_overlay_reports_tps_position_and_pan() {
        let mut demo = demo();
        for _ in 0..150 {
            demo.update().unwrap();
        }
        let text = demo.overlay_text(&FrameInfo {
            actual_tps: 59.94,
            ticks: 150,
        });
        assert!(text.starts_with("TPS: 59.94\n"));
        assert!(text.contains("Current: 0.25[s]"));
        assert!(text.ends_with("Panning: 0.00") || text.ends_with("Panning: -0.00"));
    }

    #[test]
    fn test_marker_is_centred_on_sound_position() {
        let mut demo = demo();
        demo.update().unwrap();

        let mut screen = Screen::new(SCREEN_WIDTH, SCREEN_HEIGHT);
        demo.draw(
            &mut screen,
            &FrameInfo {
                actual_tps: 60.0,
                ticks: 1,
            },
        );

        let marker = screen.markers()[0];
        assert_eq!(marker.width, 66.0);
        assert_eq!(marker.y, 240.0);
        assert!((marker.x + 33.0 - demo.controller().x_position()).abs() < 1e-9);
    }

    #[test]
    fn test_layout_is_fixed() {
        assert_eq!(demo().layout(), (640, 480));
    }
}
