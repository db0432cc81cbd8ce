use std::io::{self, Write};

use serde::{Deserialize, Serialize};

/// How an environment presents its state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// Draw every frame to the terminal, paced at the environment frame rate.
    #[default]
    Human,
    /// Return each frame as a string from `render()`.
    Ansi,
    /// Draw nothing.
    None,
}

pub const TRACK_WIDTH: usize = 41;

// Below this angle (rad) the pole is drawn upright.
const UPRIGHT_EPS: f64 = 0.02;

/// One-line ASCII picture of a cart on a track of half-width `x_threshold`.
pub fn ascii_frame(x: f64, theta: f64, x_threshold: f64) -> String {
    let span = (TRACK_WIDTH - 1) as f64;
    let pos = ((x + x_threshold) / (2.0 * x_threshold) * span).round();
    let pos = if pos.is_nan() { 0 } else { pos.clamp(0.0, span) as usize };

    let pole = if theta.abs() < UPRIGHT_EPS {
        '|'
    } else if theta > 0.0 {
        '/'
    } else {
        '\\'
    };

    let track: String = (0..TRACK_WIDTH)
        .map(|i| if i == pos { pole } else { '-' })
        .collect();

    format!("[{track}] x={x:+.3} theta={theta:+.3}")
}

/// Terminal sink for `RenderMode::Human`. Redraws a single line in place.
#[derive(Debug)]
pub struct HumanRenderer<W: Write = io::Stdout> {
    out: W,
    drawn: bool,
}

impl HumanRenderer {
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }
}

impl Default for HumanRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> HumanRenderer<W> {
    pub fn with_writer(out: W) -> Self {
        Self { out, drawn: false }
    }

    pub fn draw(&mut self, frame: &str) -> io::Result<()> {
        write!(self.out, "\r{frame}")?;
        self.out.flush()?;
        self.drawn = true;
        Ok(())
    }

    /// Ends the redrawn line so later output starts on a fresh one.
    pub fn finish(&mut self) -> io::Result<()> {
        if self.drawn {
            writeln!(self.out)?;
            self.out.flush()?;
            self.drawn = false;
        }
        Ok(())
    }
}
