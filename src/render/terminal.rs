// src/render/terminal.rs

use crossterm::style::{style, Color, Stylize};

use super::{ScopeFrame, ScopeStyle};
use crate::dsp::Rgb;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Background(Rgb),
    Centre(Rgb),
    Shape(Rgb),
}

/// Scales the frame's outline onto `rows` text rows, one text column per
/// device column. Shape cells take their column's colour; the centre line
/// is laid over the shape.
pub fn rasterise(frame: &ScopeFrame, rows: usize, paint: &ScopeStyle) -> Vec<Vec<Cell>> {
    let rows = rows.max(1);
    let blank = paint.background.map_or(Cell::Empty, Cell::Background);
    let mut grid = vec![vec![blank; frame.width]; rows];
    if frame.height <= 0.0 {
        return grid;
    }

    let to_row = |y: f32| -> usize {
        let r = (y / frame.height * (rows as f32 - 1.0)).round();
        r.clamp(0.0, rows as f32 - 1.0) as usize
    };

    for x in 0..frame.width {
        let Some((top, bottom)) = frame.column_span(x) else {
            break;
        };
        let (a, b) = {
            let (a, b) = (to_row(top), to_row(bottom));
            if a <= b { (a, b) } else { (b, a) }
        };
        let colour = frame.colours.get(x).copied().unwrap_or(Rgb::BLACK);
        if paint.fill {
            for row in grid.iter_mut().take(b + 1).skip(a) {
                row[x] = Cell::Shape(colour);
            }
        } else if paint.stroke {
            grid[a][x] = Cell::Shape(colour);
            grid[b][x] = Cell::Shape(colour);
        }
    }

    if paint.centre_line {
        let centre = to_row(frame.centre_y);
        for cell in grid[centre].iter_mut() {
            *cell = Cell::Centre(paint.centre_colour);
        }
    }
    grid
}

/// ANSI coloured lines ready to print, one per row.
pub fn render_frame(frame: &ScopeFrame, rows: usize, paint: &ScopeStyle) -> Vec<String> {
    rasterise(frame, rows, paint)
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|cell| match cell {
                    Cell::Empty => " ".to_string(),
                    Cell::Background(c) => style(' ').on(to_color(c)).to_string(),
                    Cell::Centre(c) => style('─').with(to_color(c)).to_string(),
                    Cell::Shape(c) => style('█').with(to_color(c)).to_string(),
                })
                .collect()
        })
        .collect()
}

fn to_color(c: Rgb) -> Color {
    Color::Rgb {
        r: c.r,
        g: c.g,
        b: c.b,
    }
}
