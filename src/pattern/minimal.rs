use crate::canvas::LineStyle;

use super::{seeded_fraction, stepped, PatternContext};

const GRID_DIVISIONS: f64 = 10.0;
const GRID_ORIGIN: f64 = 10.0;
const CROSSHAIR: f64 = 20.0;

pub(super) fn draw(ctx: &mut PatternContext<'_>) {
    let spacing = ctx.geometry.min_side() / GRID_DIVISIONS;
    draw_grid(ctx, spacing);
    draw_accent_lines(ctx, spacing * 4.0);
    draw_markers(ctx, spacing);
    draw_corner_brackets(ctx);
    draw_center(ctx);
}

fn draw_grid(ctx: &mut PatternContext<'_>, spacing: f64) {
    let geometry = ctx.geometry;
    let accent = ctx.colors.accent;

    for x in stepped(GRID_ORIGIN, geometry.width, spacing) {
        let dist = (x - geometry.center_x).abs() / geometry.center_x;
        let style = LineStyle::solid(accent.with_alpha(0.1 + (1.0 - dist) * 0.1), 1.0);
        ctx.canvas.stroke_line(x, 0.0, x, geometry.height, &style);
    }
    for y in stepped(GRID_ORIGIN, geometry.height, spacing) {
        let dist = (y - geometry.center_y).abs() / geometry.center_y;
        let style = LineStyle::solid(accent.with_alpha(0.04 + (1.0 - dist) * 0.06), 1.0);
        ctx.canvas.stroke_line(0.0, y, geometry.width, y, &style);
    }
}

fn draw_accent_lines(ctx: &mut PatternContext<'_>, spacing: f64) {
    let geometry = ctx.geometry;
    let style = LineStyle::solid(ctx.colors.accent.with_alpha(0.15), 2.0);
    for x in stepped(0.0, geometry.width, spacing) {
        ctx.canvas.stroke_line(x, 0.0, x, geometry.height, &style);
    }
    for y in stepped(0.0, geometry.height, spacing) {
        ctx.canvas.stroke_line(0.0, y, geometry.width, y, &style);
    }
}

/// The sieve here is `frac(sin(seed))`, unscaled.
fn marker_value(x: f64, y: f64, spacing: f64) -> f64 {
    seeded_fraction((x / spacing) * 100.0 + y / spacing, 1.0)
}

fn draw_markers(ctx: &mut PatternContext<'_>, spacing: f64) {
    let geometry = ctx.geometry;
    let accent = ctx.colors.accent;

    for x in stepped(spacing, geometry.width, spacing) {
        for y in stepped(spacing, geometry.height, spacing) {
            let value = marker_value(x, y, spacing);
            let opacity = geometry.falloff(x, y, 0.7, 0.15);

            if value > 0.7 {
                ctx.canvas.fill_circle(x, y, 3.0, accent.with_alpha(opacity * 0.4));
                let ring = LineStyle::solid(accent.with_alpha(opacity * 0.25), 1.0);
                ctx.canvas.stroke_circle(x, y, 16.0, &ring);
            } else if value > 0.5 {
                ctx.canvas.fill_circle(x, y, 1.5, accent.with_alpha(opacity * 0.3));
            }
        }
    }
}

fn draw_corner_brackets(ctx: &mut PatternContext<'_>) {
    let (w, h) = (ctx.geometry.width, ctx.geometry.height);
    let arm = ctx.geometry.min_side() * 0.15;
    let style = LineStyle::solid(ctx.colors.accent.with_alpha(0.2), 2.0);

    let brackets = [
        [(0.0, arm), (0.0, 0.0), (arm, 0.0)],
        [(w - arm, 0.0), (w, 0.0), (w, arm)],
        [(0.0, h - arm), (0.0, h), (arm, h)],
        [(w - arm, h), (w, h), (w, h - arm)],
    ];
    for bracket in &brackets {
        ctx.canvas.stroke_polyline(bracket, &style);
    }
}

fn draw_center(ctx: &mut PatternContext<'_>) {
    let (cx, cy) = (ctx.geometry.center_x, ctx.geometry.center_y);
    let accent = ctx.colors.accent;
    ctx.canvas.stroke_segments(
        &[
            [cx - CROSSHAIR, cy, cx + CROSSHAIR, cy],
            [cx, cy - CROSSHAIR, cx, cy + CROSSHAIR],
        ],
        &LineStyle::solid(accent.with_alpha(0.15), 1.5),
    );
    ctx.canvas.fill_circle(cx, cy, 4.0, accent.with_alpha(0.4));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_sieve_is_unscaled_sine_fraction() {
        let value = marker_value(100.0, 200.0, 100.0);
        let expected = {
            let x = 102.0_f64.sin();
            x - x.floor()
        };
        assert_eq!(value, expected);
        assert!((0.0..1.0).contains(&value));
    }
}
