//! Fixed-timestep host loop and a terminal presenter
//!
//! The loop calls [`Game::update`] once per tick and [`Game::draw`] once per
//! frame, update first. Drawing goes to a [`Screen`] which a [`Presenter`]
//! turns into output.

use std::io::{self, Write};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::Result;

/// Most updates run back to back before a frame is forced
const MAX_UPDATES_PER_FRAME: u32 = 5;

/// Window over which the actual tick rate is measured
const TPS_WINDOW: Duration = Duration::from_secs(1);

pub trait Game {
    /// Advance the simulation one tick
    fn update(&mut self) -> Result<()>;

    /// Render the current state
    fn draw(&self, screen: &mut Screen, frame: &FrameInfo);

    /// Logical screen size
    fn layout(&self) -> (u32, u32);
}

/// Per-frame loop statistics handed to [`Game::draw`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    pub actual_tps: f64,
    pub ticks: u64,
}

/// An image drawn at a screen position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marker {
    pub x: f64,
    pub y: f64,
    pub width: f64,
}

/// Logical screen for one frame: debug text plus markers
#[derive(Debug, Clone, PartialEq)]
pub struct Screen {
    width: u32,
    height: u32,
    text: String,
    markers: Vec<Marker>,
}

impl Screen {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            text: String::new(),
            markers: Vec::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Append debug text in the top-left corner
    pub fn debug_print(&mut self, text: &str) {
        self.text.push_str(text);
    }

    /// Draw a marker whose left edge is at `x`
    pub fn draw_marker(&mut self, x: f64, y: f64, width: f64) {
        self.markers.push(Marker { x, y, width });
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }
}

/// Turns a finished [`Screen`] into visible output
pub trait Presenter {
    fn present(&mut self, screen: &Screen) -> io::Result<()>;
}

/// Renders each frame as one rewritten terminal line:
/// a track with the marker on it followed by the debug text
pub struct TerminalPresenter<W: Write> {
    out: W,
    columns: usize,
    last_line: String,
}

impl TerminalPresenter<io::Stdout> {
    pub fn stdout(columns: usize) -> Self {
        Self::new(io::stdout(), columns)
    }
}

impl<W: Write> TerminalPresenter<W> {
    pub fn new(out: W, columns: usize) -> Self {
        Self {
            out,
            columns: columns.max(2),
            last_line: String::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Single-line rendition of a screen
    pub fn render_line(&self, screen: &Screen) -> String {
        let mut track = vec!['-'; self.columns];
        let width = screen.width().max(1) as f64;
        for marker in screen.markers() {
            let centre = marker.x + marker.width / 2.0;
            let column = ((centre / width) * (self.columns - 1) as f64).round();
            let column = column.clamp(0.0, (self.columns - 1) as f64) as usize;
            track[column] = 'o';
        }

        let text = screen
            .text()
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join(" | ");

        format!("[{}] {}", track.into_iter().collect::<String>(), text)
    }
}

impl<W: Write> Presenter for TerminalPresenter<W> {
    fn present(&mut self, screen: &Screen) -> io::Result<()> {
        let line = self.render_line(screen);
        if line == self.last_line {
            return Ok(());
        }

        // Pad so a shorter line fully covers the previous one
        let pad = self.last_line.chars().count().saturating_sub(line.chars().count());
        write!(self.out, "\r{}{}", line, " ".repeat(pad))?;
        self.out.flush()?;
        self.last_line = line;
        Ok(())
    }
}

/// Measures ticks per second over a sliding one-second window
#[derive(Debug, Clone)]
pub struct TpsCounter {
    window_start: Instant,
    ticks_in_window: u32,
    tps: f64,
}

impl TpsCounter {
    pub fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            ticks_in_window: 0,
            tps: 0.0,
        }
    }

    pub fn record_tick(&mut self, now: Instant) {
        self.ticks_in_window += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed >= TPS_WINDOW {
            self.tps = self.ticks_in_window as f64 / elapsed.as_secs_f64();
            self.ticks_in_window = 0;
            self.window_start = now;
        }
    }

    pub fn tps(&self) -> f64 {
        self.tps
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunOptions {
    pub ticks_per_second: u32,
    /// Return after this many ticks; run until an error when absent
    pub max_ticks: Option<u64>,
}

/// Drive `game` at a fixed tick rate until it fails or `max_ticks` is reached
///
/// When the loop falls behind it runs up to a few updates back to back and
/// then drops the remaining backlog rather than spiralling.
pub fn run_game<G, P>(game: &mut G, options: &RunOptions, presenter: &mut P) -> Result<()>
where
    G: Game + ?Sized,
    P: Presenter + ?Sized,
{
    let tick = Duration::from_secs_f64(1.0 / options.ticks_per_second.max(1) as f64);
    let start = Instant::now();
    let mut next_tick = start;
    let mut counter = TpsCounter::new(start);
    let mut ticks: u64 = 0;

    log::info!("Host: running at {} TPS", options.ticks_per_second);

    loop {
        let now = Instant::now();
        if now < next_tick {
            thread::sleep(next_tick - now);
        }

        let mut updates = 0;
        while Instant::now() >= next_tick && updates < MAX_UPDATES_PER_FRAME {
            game.update()?;
            ticks += 1;
            updates += 1;
            counter.record_tick(Instant::now());
            next_tick += tick;

            if options.max_ticks.is_some_and(|max| ticks >= max) {
                break;
            }
        }

        if updates == MAX_UPDATES_PER_FRAME && Instant::now() >= next_tick {
            log::debug!("Host: falling behind, skipping backlog");
            next_tick = Instant::now() + tick;
        }

        let (width, height) = game.layout();
        let mut screen = Screen::new(width, height);
        game.draw(
            &mut screen,
            &FrameInfo {
                actual_tps: counter.tps(),
                ticks,
            },
        );
        presenter.present(&screen)?;

        if options.max_ticks.is_some_and(|max| ticks >= max) {
            log::info!("Host: stopping after {} ticks", ticks);
            return Ok(());
        }
    }
}
