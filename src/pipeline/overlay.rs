//! Burn a short text label into a packed frame

use serde::{Deserialize, Serialize};

use crate::capture::Frame;
use crate::OverlayConfig;

const GLYPH_W: usize = 5;
const GLYPH_H: usize = 7;
/// Glyph cell size in pixels at font scale 1.0
const BASE_CELL: f64 = 3.0;

/// Largest accepted font scale; larger values are clamped when drawing
pub const MAX_FONT_SCALE: f64 = 16.0;
pub const MAX_THICKNESS: u32 = 32;
/// Digits beyond this carry no information for an f64 rate
pub const MAX_PRECISION: usize = 17;

/// How the label glyphs are rasterized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayFont {
    /// Built-in 5x7 bitmap glyphs
    Bitmap,
    /// OpenCV `putText` with `FONT_HERSHEY_SIMPLEX`. Drawn with the bitmap
    /// glyphs when built without the `opencv` feature.
    Hershey,
}

impl Default for OverlayFont {
    fn default() -> Self {
        if cfg!(feature = "opencv") {
            OverlayFont::Hershey
        } else {
            OverlayFont::Bitmap
        }
    }
}

/// Fixed anchor, scale, color and stroke for the rate label
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayStyle {
    /// Baseline-left corner of the first glyph
    pub anchor: (i32, i32),
    pub font_scale: f64,
    pub thickness: u32,
    /// Channel values in the frame's channel order
    pub color: [u8; 3],
    /// Digits after the decimal point
    pub precision: usize,
    pub font: OverlayFont,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            anchor: (30, 50),
            font_scale: 1.0,
            thickness: 2,
            color: [255, 255, 0],
            precision: 6,
            font: OverlayFont::default(),
        }
    }
}

impl OverlayStyle {
    /// Style for frames shown in a window
    pub fn for_window(config: &OverlayConfig) -> Self {
        Self::with_color(config, config.window_color)
    }

    /// Style for frames pushed into a GStreamer appsrc
    pub fn for_relay(config: &OverlayConfig) -> Self {
        Self::with_color(config, config.relay_color)
    }

    fn with_color(config: &OverlayConfig, color: [u8; 3]) -> Self {
        Self {
            anchor: (config.anchor_x, config.anchor_y),
            font_scale: config.font_scale,
            thickness: config.thickness,
            color,
            precision: config.precision,
            font: config.font,
        }
    }

    pub fn label(&self, rate: f64) -> String {
        format!("FPS:{:.*}", self.precision.min(MAX_PRECISION), rate)
    }

    /// Font scale bounded to `(0, MAX_FONT_SCALE]`; non-finite scales draw at 1.0
    pub(crate) fn effective_scale(&self) -> f64 {
        if self.font_scale.is_finite() && self.font_scale > 0.0 {
            self.font_scale.min(MAX_FONT_SCALE)
        } else {
            1.0
        }
    }

    pub(crate) fn effective_thickness(&self) -> u32 {
        self.thickness.clamp(1, MAX_THICKNESS)
    }

    fn cell(&self) -> i64 {
        ((self.effective_scale() * BASE_CELL).round() as i64).max(1)
    }
}

/// Draw `text` onto `frame` in place with the style's font. Pixels outside
/// the frame are clipped; geometry never changes.
pub fn draw_text(frame: &mut Frame, text: &str, style: &OverlayStyle) {
    match style.font {
        OverlayFont::Bitmap => draw_bitmap(frame, text, style),
        OverlayFont::Hershey => draw_hershey(frame, text, style),
    }
}

#[cfg(feature = "opencv")]
fn draw_hershey(frame: &mut Frame, text: &str, style: &OverlayStyle) {
    if let Err(e) = crate::pipeline::hershey::put_label(frame, text, style) {
        tracing::warn!("putText failed, using bitmap glyphs: {}", e);
        draw_bitmap(frame, text, style);
    }
}

#[cfg(not(feature = "opencv"))]
fn draw_hershey(frame: &mut Frame, text: &str, style: &OverlayStyle) {
    draw_bitmap(frame, text, style);
}

fn draw_bitmap(frame: &mut Frame, text: &str, style: &OverlayStyle) {
    let geometry = frame.geometry();
    let width = i64::from(geometry.width);
    let height = i64::from(geometry.height);
    let channels = geometry.channels as usize;
    let painted = channels.min(style.color.len());

    let cell = style.cell();
    let advance = cell * (GLYPH_W as i64 + 1);
    let grow = i64::from(style.effective_thickness() - 1);
    let pad_before = grow / 2;
    let side = cell + grow;

    let top = i64::from(style.anchor.1) - cell * GLYPH_H as i64;
    let mut left = i64::from(style.anchor.0);
    let data = frame.data_mut();

    for ch in text.chars() {
        if left >= width {
            break;
        }

        let rows = glyph(ch);
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_W {
                if bits & (1 << (GLYPH_W - 1 - col)) == 0 {
                    continue;
                }

                let x0 = (left + col as i64 * cell - pad_before).max(0);
                let y0 = (top + row as i64 * cell - pad_before).max(0);
                let x1 = (left + col as i64 * cell - pad_before + side).min(width);
                let y1 = (top + row as i64 * cell - pad_before + side).min(height);

                for y in y0..y1 {
                    for x in x0..x1 {
                        let offset = (y as usize * width as usize + x as usize) * channels;
                        data[offset..offset + painted].copy_from_slice(&style.color[..painted]);
                    }
                }
            }
        }
        left += advance;
    }
}

/// Stamp the rate label with the given style
pub fn draw_rate(frame: &mut Frame, rate: f64, style: &OverlayStyle) {
    draw_text(frame, &style.label(rate), style);
}

/// 5x7 bitmaps, MSB is the leftmost column. Unknown characters are blank.
fn glyph(ch: char) -> [u8; GLYPH_H] {
    match ch {
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        'F' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        ':' => [0b00000, 0b01100, 0b01100, 0b00000, 0b01100, 0b01100, 0b00000],
        '.' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b01100, 0b01100],
        '-' => [0b00000, 0b00000, 0b00000, 0b11111, 0b00000, 0b00000, 0b00000],
        _ => [0; GLYPH_H],
    }
}
