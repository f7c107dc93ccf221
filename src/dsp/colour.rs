// src/dsp/colour.rs

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn grey(level: u8) -> Self {
        Self::new(level, level, level)
    }
}

/// Mid grey, used wherever a range carries no band energy.
pub const DEFAULT_SCOPE_COLOUR: Rgb = Rgb::grey(128);

/// Bass drives red, mids green, highs blue. The loudest band is pushed to
/// full intensity and the others follow proportionally; silence falls back
/// to `default`.
pub fn band_colour(bass: f32, mid: f32, high: f32, default: Rgb) -> Rgb {
    let head = bass.max(mid).max(high);
    if head > 0.0 {
        let scale = 255.0 / head;
        Rgb::new(
            to_channel(bass * scale),
            to_channel(mid * scale),
            to_channel(high * scale),
        )
    } else {
        default
    }
}

#[inline]
fn to_channel(v: f32) -> u8 {
    // NaN casts to 0
    v.round().clamp(0.0, 255.0) as u8
}
