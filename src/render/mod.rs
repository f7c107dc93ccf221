// src/render/mod.rs

pub mod terminal;

use serde::{Deserialize, Serialize};

use crate::dsp::Rgb;
use crate::scope::ScopeSource;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Placement of the outline and how sinks should paint it. The renderer
/// only reads the placement; the paint options are for whoever draws the
/// frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeStyle {
    /// Column 0 shows the end of the source range instead of its start.
    /// With a live source that puts the newest audio on the right edge.
    pub reverse: bool,
    /// Zero line, as a fraction of the height from the top.
    pub vertical_mid_point: f32,
    /// Full scale amplitude, as a fraction of the height.
    pub vertical_scale: f32,
    /// Paint the area between the edges with the colour strip.
    pub fill: bool,
    /// Paint only the top and bottom edges.
    pub stroke: bool,
    /// Draw the zero line over the shape.
    pub centre_line: bool,
    pub centre_colour: Rgb,
    /// `None` leaves the area behind the shape untouched.
    pub background: Option<Rgb>,
}

impl Default for ScopeStyle {
    fn default() -> Self {
        Self {
            reverse: true,
            vertical_mid_point: 0.5,
            vertical_scale: 0.5,
            fill: true,
            stroke: false,
            centre_line: true,
            centre_colour: Rgb::grey(70),
            background: None,
        }
    }
}

/// What one render pass hands to whoever paints it: a closed outline and a
/// one-pixel-high strip of column colours to tile underneath it as the fill.
/// All coordinates are device pixels.
#[derive(Debug, Clone, Default)]
pub struct ScopeFrame {
    pub width: usize,
    pub height: f32,
    pub centre_y: f32,
    /// Maxima left to right, then minima right to left. The last point
    /// connects back to the first.
    pub outline: Vec<Point>,
    pub colours: Vec<Rgb>,
}

impl ScopeFrame {
    pub fn is_empty(&self) -> bool {
        self.outline.is_empty()
    }

    /// `(top, bottom)` y coordinates of a column.
    pub fn column_span(&self, column: usize) -> Option<(f32, f32)> {
        if self.outline.len() != self.width * 2 || column >= self.width {
            return None;
        }
        let top = self.outline[column].y;
        let bottom = self.outline[2 * self.width - 1 - column].y;
        Some((top, bottom))
    }
}

/// Source range `[first, last)` binned into output column `column` of
/// `width`, for a source of `len` samples. When there are fewer samples than
/// columns every column still gets one sample.
pub fn column_range(column: usize, width: usize, len: usize, reverse: bool) -> (usize, usize) {
    if width == 0 {
        return (0, 0);
    }
    let s_index = if reverse { width - 1 - column.min(width - 1) } else { column };
    let bin_edge = |i: usize| ((i as u128 * len as u128) / width as u128) as usize;

    let first = bin_edge(s_index);
    let last = if len < width {
        first + 1
    } else {
        bin_edge(s_index + 1)
    };
    (first, last)
}

/// Turns a scope source into a coloured outline one device pixel per column.
/// Every update recomputes the whole frame.
#[derive(Debug, Clone, Default)]
pub struct ColouredScope {
    pub style: ScopeStyle,
    minimums: Vec<f32>,
    frame: ScopeFrame,
}

impl ColouredScope {
    pub fn new(style: ScopeStyle) -> Self {
        Self {
            style,
            ..Default::default()
        }
    }

    pub fn frame(&self) -> &ScopeFrame {
        &self.frame
    }

    /// Size internal buffers for a logical width at a display scale.
    /// `update` at the same size afterwards does not allocate, so this is
    /// the call to make before taking a lock.
    pub fn prepare(&mut self, width: f32, scale_factor: f32) -> usize {
        let columns = device_columns(width, scale_factor);
        if columns != self.frame.width {
            self.minimums.resize(columns, 0.0);
            self.frame.colours.resize(columns, Rgb::BLACK);
            self.frame.width = columns;
        }
        let needed = columns * 2;
        if self.frame.outline.capacity() < needed {
            self.frame.outline.reserve(needed - self.frame.outline.len());
        }
        columns
    }

    pub fn update(
        &mut self,
        source: Option<&dyn ScopeSource>,
        width: f32,
        height: f32,
        scale_factor: f32,
    ) {
        let columns = self.prepare(width, scale_factor);
        let height = (height * scale_factor).max(0.0);
        let mid = self.style.vertical_mid_point * height;
        let scale = self.style.vertical_scale * height;

        self.frame.outline.clear();
        self.frame.height = height;
        self.frame.centre_y = mid;

        let Some(source) = source else {
            return;
        };
        if columns == 0 {
            return;
        }

        let len = source.range_size();
        for i in 0..columns {
            let (first, last) = column_range(i, columns, len, self.style.reverse);
            let point = source.range(first as i64, last as i64);
            self.minimums[i] = point.min;
            self.frame.colours[i] = point.colour;
            self.frame.outline.push(Point {
                x: i as f32,
                y: mid - scale * point.max,
            });
        }

        for i in (0..columns).rev() {
            self.frame.outline.push(Point {
                x: i as f32,
                y: mid - scale * self.minimums[i],
            });
        }
    }
}

fn device_columns(width: f32, scale_factor: f32) -> usize {
    let px = (width * scale_factor).ceil();
    if px.is_finite() && px > 0.0 { px as usize } else { 0 }
}
