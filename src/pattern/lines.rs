use std::f64::consts::TAU;

use tiny_skia::PathBuilder;

use crate::canvas::LineStyle;

use super::{stepped, PatternContext};

const LINE_DIVISIONS: f64 = 12.0;
const RADIAL_COUNT: u32 = 24;

pub(super) fn draw(ctx: &mut PatternContext<'_>) {
    let spacing = ctx.geometry.min_side() / LINE_DIVISIONS;
    draw_horizontal_flow(ctx, spacing);
    draw_vertical_flow(ctx, spacing);
    draw_diagonals(ctx, spacing * 2.0);
    draw_radials(ctx);
    draw_nodes(ctx, spacing * 1.5);
}

/// Cubic from `start` to `end` through two control points.
fn stroke_curve(ctx: &mut PatternContext<'_>, points: [(f64, f64); 4], style: &LineStyle) {
    let [(x0, y0), (x1, y1), (x2, y2), (x3, y3)] = points.map(|(x, y)| (x as f32, y as f32));
    let mut builder = PathBuilder::new();
    builder.move_to(x0, y0);
    builder.cubic_to(x1, y1, x2, y2, x3, y3);
    if let Some(path) = builder.finish() {
        ctx.canvas.stroke(&path, style);
    }
}

fn draw_horizontal_flow(ctx: &mut PatternContext<'_>, spacing: f64) {
    let (width, height) = (ctx.geometry.width, ctx.geometry.height);
    let style = LineStyle::dashed(ctx.colors.accent.with_alpha(0.15), 2.0, &[15.0, 10.0]);

    for y in stepped(0.0, height, spacing) {
        let offset = (y * 0.01).sin() * 50.0;
        let sway = (y * 0.02).sin() * 30.0;
        stroke_curve(
            ctx,
            [
                (0.0, y),
                (width * 0.25 + offset, y + sway),
                (width * 0.75 - offset, y - sway),
                (width, y),
            ],
            &style,
        );
    }
}

fn draw_vertical_flow(ctx: &mut PatternContext<'_>, spacing: f64) {
    let (width, height) = (ctx.geometry.width, ctx.geometry.height);
    let style = LineStyle::dashed(ctx.colors.accent.with_alpha(0.1), 1.5, &[10.0, 15.0]);

    for x in stepped(0.0, width, spacing) {
        let offset = (x * 0.01).cos() * 50.0;
        let sway = (x * 0.02).cos() * 30.0;
        stroke_curve(
            ctx,
            [
                (x, 0.0),
                (x + sway, height * 0.25 + offset),
                (x - sway, height * 0.75 - offset),
                (x, height),
            ],
            &style,
        );
    }
}

fn diagonal_opacity(offset: f64) -> f64 {
    0.05 + (offset * 0.01).sin() * 0.03
}

fn draw_diagonals(ctx: &mut PatternContext<'_>, spacing: f64) {
    let (width, height) = (ctx.geometry.width, ctx.geometry.height);
    let accent = ctx.colors.accent;
    for i in stepped(-height, width + height, spacing) {
        let style = LineStyle::solid(accent.with_alpha(diagonal_opacity(i)), 1.0);
        ctx.canvas.stroke_line(i, 0.0, i + height, height, &style);
    }
}

fn draw_radials(ctx: &mut PatternContext<'_>) {
    let geometry = ctx.geometry;
    let accent = ctx.colors.accent;
    let (cx, cy, radius) = (geometry.center_x, geometry.center_y, geometry.max_radius);

    for i in 0..RADIAL_COUNT {
        let angle = TAU * f64::from(i) / f64::from(RADIAL_COUNT);
        let (cos, sin) = (angle.cos(), angle.sin());
        ctx.canvas.stroke_line_gradient(
            (cx + cos * radius * 0.3, cy + sin * radius * 0.3),
            (cx + cos * radius, cy + sin * radius),
            accent.with_alpha(0.2),
            accent.with_alpha(0.0),
            0.5,
            &[5.0, 10.0],
        );
    }
}

fn draw_nodes(ctx: &mut PatternContext<'_>, spacing: f64) {
    let geometry = ctx.geometry;
    let accent = ctx.colors.accent;

    for x in stepped(spacing, geometry.width, spacing) {
        for y in stepped(spacing, geometry.height, spacing) {
            let opacity = geometry.falloff(x, y, 0.8, 0.1);
            let ring = LineStyle::solid(accent.with_alpha(opacity * 0.3), 1.0);
            ctx.canvas.stroke_circle(x, y, 8.0, &ring);
            ctx.canvas.fill_circle(x, y, 3.0, accent.with_alpha(opacity * 0.5));
            ctx.canvas.stroke_segments(
                &[[x - 6.0, y, x + 6.0, y], [x, y - 6.0, x, y + 6.0]],
                &LineStyle::solid(accent.with_alpha(opacity * 0.4), 1.0),
            );
        }
    }
}
