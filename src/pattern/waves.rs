use std::f64::consts::PI;

use rand::Rng;
use tiny_skia::PathBuilder;

use crate::canvas::LineStyle;

use super::PatternContext;

const HEX_DIVISIONS: f64 = 15.0;
const DRAW_THRESHOLD: f64 = 0.3;

pub(super) fn draw<R: Rng + ?Sized>(ctx: &mut PatternContext<'_>, rng: &mut R) {
    let geometry = ctx.geometry;
    let hex_size = geometry.min_side() / HEX_DIVISIONS;
    let hex_height = hex_size * 3.0_f64.sqrt();
    let row_limit = geometry.height / hex_height + 2.0;
    let col_limit = geometry.width / (hex_size * 1.5) + 2.0;

    let mut row: i32 = -1;
    while f64::from(row) < row_limit {
        let mut col: i32 = -1;
        while f64::from(col) < col_limit {
            let x = f64::from(col) * hex_size * 1.5;
            // odd columns shift by half a cell; column -1 shifts upward
            let y = f64::from(row) * hex_height + f64::from(col % 2) * hex_height / 2.0;
            let opacity = geometry.falloff(x, y, 0.7, 0.1);

            if rng.gen::<f64>() > DRAW_THRESHOLD {
                draw_hexagon(ctx, x, y, hex_size * 0.5, opacity);
            }
            col += 1;
        }
        row += 1;
    }
}

fn draw_hexagon(ctx: &mut PatternContext<'_>, x: f64, y: f64, radius: f64, opacity: f64) {
    let mut builder = PathBuilder::new();
    for i in 0..6 {
        let angle = PI / 3.0 * f64::from(i);
        let hx = (x + radius * angle.cos()) as f32;
        let hy = (y + radius * angle.sin()) as f32;
        if i == 0 {
            builder.move_to(hx, hy);
        } else {
            builder.line_to(hx, hy);
        }
    }
    builder.close();

    if let Some(path) = builder.finish() {
        let style = LineStyle::solid(ctx.colors.accent.with_alpha(opacity * 0.6), 1.5);
        ctx.canvas.stroke(&path, &style);
    }
}
