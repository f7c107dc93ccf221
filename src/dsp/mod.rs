// src/dsp/mod.rs

pub mod colour;
pub mod crossover;

pub use colour::{band_colour, Rgb, DEFAULT_SCOPE_COLOUR};
pub use crossover::{Bands, Crossover, DEFAULT_HIGH_CROSSOVER, DEFAULT_LOW_CROSSOVER, MIN_CUTOFF};

#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0f32.powf(db / 20.0)
}

#[inline]
pub fn mix_to_mono(left: f32, right: f32) -> f32 {
    0.5 * (left + right)
}
