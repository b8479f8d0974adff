//! Presentation of a [`DisplayState`] on an 8x8 matrix.
//!
//! Glyphs are stored as eight column bytes with the least significant bit at
//! the top row. The scroll text is what the matrix marquees after the icon.

use picoweather_weather::{DisplayState, IconKey, Units};
use std::io::Write;

/// One 8x8 glyph, left column first
pub type Glyph = [u8; 8];

const DEGREE: char = '\u{7f}';
const PADDING: &str = "    ";

pub fn glyph(icon: IconKey) -> Glyph {
    match icon {
        IconKey::ClearDay => [0x91, 0x42, 0x18, 0x3d, 0xbc, 0x18, 0x42, 0x89],
        IconKey::ClearNight => [0x3C, 0x42, 0x81, 0xC3, 0xFF, 0xFF, 0x7E, 0x3C],
        // Light rain has no glyph of its own
        IconKey::Rain | IconKey::LightRain => [0x31, 0x7A, 0x78, 0xFA, 0xFC, 0xF9, 0x7A, 0x30],
        IconKey::Snow => [0x28, 0x92, 0x54, 0x38, 0x38, 0x54, 0x92, 0x28],
        IconKey::Sleet => [0x32, 0x7D, 0x7A, 0xFD, 0xFA, 0xFD, 0x7A, 0x35],
        IconKey::Wind => [0x28, 0x28, 0x28, 0x28, 0x28, 0xAA, 0xAA, 0x44],
        IconKey::Fog => [0xAA, 0x55, 0xAA, 0x55, 0xAA, 0x55, 0xAA, 0x55],
        IconKey::Cloudy => [0x30, 0x78, 0x78, 0xF8, 0xF8, 0xF8, 0x78, 0x30],
        IconKey::PartlyCloudy => [0x30, 0x48, 0x48, 0x88, 0x88, 0x88, 0x48, 0x30],
        IconKey::Thunderstorm => [0x00, 0x00, 0x00, 0x0F, 0x38, 0xE0, 0x00, 0x00],
        IconKey::Tornado => [0x00, 0x40, 0x6C, 0xBE, 0xBB, 0xB1, 0x60, 0x40],
        IconKey::None => [0x00, 0x00, 0x40, 0x9D, 0x90, 0x60, 0x00, 0x00],
    }
}

/// Render a glyph as eight rows of `#` and `.`, top row first.
pub fn glyph_rows(glyph: &Glyph) -> Vec<String> {
    (0..8)
        .map(|row| {
            glyph
                .iter()
                .map(|column| if (column >> row) & 1 == 1 { '#' } else { '.' })
                .collect()
        })
        .collect()
}

/// Text marqueed after the icon, e.g. `"    Rain  Out: 14.2\u{7f}c    "`
pub fn scroll_text(state: &DisplayState, units: Units) -> String {
    format!(
        "{PADDING}{}  Out: {:.1}{DEGREE}{}{PADDING}",
        capitalize(&state.label),
        state.temperature,
        units.symbol()
    )
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Anything that can show the current conditions.
///
/// Rendering never fails from the caller's point of view; devices log their
/// own problems.
pub trait DisplayDevice {
    fn render(&mut self, state: &DisplayState);

    /// Shown once at start-up before any forecast is available
    fn show_banner(&mut self, text: &str) {
        tracing::info!("{}", text);
    }
}

/// Draws the matrix as ASCII art on a text sink such as stdout.
pub struct TerminalMatrix<W: Write> {
    out: W,
    units: Units,
}

impl<W: Write> TerminalMatrix<W> {
    pub fn new(out: W, units: Units) -> Self {
        Self { out, units }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_frame(&mut self, state: &DisplayState) -> std::io::Result<()> {
        for row in glyph_rows(&glyph(state.icon_key)) {
            writeln!(self.out, "{}", row)?;
        }
        writeln!(self.out, "{}", scroll_text(state, self.units))?;
        self.out.flush()
    }
}

impl<W: Write> DisplayDevice for TerminalMatrix<W> {
    fn render(&mut self, state: &DisplayState) {
        tracing::debug!("Rendering {} ({})", state.label, state.icon_key);
        if let Err(e) = self.write_frame(state) {
            tracing::warn!("Failed to draw frame: {}", e);
        }
    }

    fn show_banner(&mut self, text: &str) {
        let result = writeln!(self.out, "{}", text).and_then(|_| self.out.flush());
        if let Err(e) = result {
            tracing::warn!("Failed to draw banner: {}", e);
        }
    }
}
