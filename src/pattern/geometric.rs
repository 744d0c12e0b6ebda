use std::f64::consts::{PI, TAU};

use crate::canvas::LineStyle;
use crate::color::Rgb;

use super::{stepped, PatternContext};

const RAY_COUNT: u32 = 16;
const SPOKE_COUNT: u32 = 8;
const CORNER_ARM: f64 = 30.0;

/// Axis-aligned squares around the centre: `(scale, dash, width, opacity)`.
/// The solid one is drawn in neutral gray.
const CONCENTRIC: [(f64, &[f64], f64, f64); 6] = [
    (1.4, &[10.0, 5.0], 1.0, 0.3),
    (1.2, &[8.0, 8.0], 1.0, 0.4),
    (1.0, &[], 2.0, 0.8),
    (0.8, &[4.0, 4.0], 1.0, 0.5),
    (0.6, &[6.0, 3.0], 1.0, 0.4),
    (0.4, &[3.0, 6.0], 1.0, 0.3),
];
const NEUTRAL_SQUARE: usize = 2;

/// `(angle, scale, dash, opacity)`, stroked 1px wide.
const ROTATED: [(f64, f64, &[f64], f64); 6] = [
    (PI / 4.0, 1.3, &[8.0, 4.0], 0.25),
    (PI / 4.0, 0.9, &[5.0, 5.0], 0.3),
    (PI / 4.0, 0.5, &[3.0, 3.0], 0.25),
    (PI / 8.0, 1.5, &[10.0, 5.0], 0.2),
    (PI / 6.0, 1.1, &[6.0, 6.0], 0.25),
    (-PI / 8.0, 0.7, &[4.0, 4.0], 0.2),
];

/// `(width scale, height scale, dash, opacity)`.
const FRAMES: [(f64, f64, &[f64], f64); 3] = [
    (1.8, 1.3, &[8.0, 4.0], 0.25),
    (1.3, 1.8, &[6.0, 6.0], 0.25),
    (0.9, 0.6, &[4.0, 2.0], 0.2),
];

pub(super) fn draw(ctx: &mut PatternContext<'_>) {
    let geometry = ctx.geometry;
    let main = geometry.min_side() * 0.25;
    let ray_length = geometry.max_side() * 0.6;
    let grid = geometry.min_side() / 20.0;

    draw_grid(ctx, grid);
    draw_rays(ctx, main, ray_length);
    draw_concentric_squares(ctx, main);
    // the 45 degree set sits under the ray-end nodes, the rest above
    draw_rotated_squares(ctx, main, &ROTATED[..3]);
    draw_ray_nodes(ctx, ray_length);
    draw_rotated_squares(ctx, main, &ROTATED[3..]);

    let accent = ctx.colors.accent;
    let core = main * 0.15;
    ctx.canvas.fill_rect(
        geometry.center_x - core / 2.0,
        geometry.center_y - core / 2.0,
        core,
        core,
        accent.with_alpha(0.6),
    );

    draw_corners(ctx, main * 2.0);
    draw_frames(ctx, main);
    draw_spoke_squares(ctx, ray_length);
    draw_spoke_connectors(ctx, ray_length * 0.6);
    draw_markers(ctx, grid * 3.0, main * 0.8, ray_length * 0.9);
}

fn polar(ctx: &PatternContext<'_>, angle: f64, distance: f64) -> (f64, f64) {
    (
        ctx.geometry.center_x + angle.cos() * distance,
        ctx.geometry.center_y + angle.sin() * distance,
    )
}

fn ray_angle(index: u32, count: u32) -> f64 {
    TAU * f64::from(index) / f64::from(count)
}

fn draw_grid(ctx: &mut PatternContext<'_>, spacing: f64) {
    let (width, height) = (ctx.geometry.width, ctx.geometry.height);
    let style = LineStyle::solid(ctx.colors.accent.with_alpha(0.03), 0.5);
    for x in stepped(0.0, width, spacing) {
        ctx.canvas.stroke_line(x, 0.0, x, height, &style);
    }
    for y in stepped(0.0, height, spacing) {
        ctx.canvas.stroke_line(0.0, y, width, y, &style);
    }
}

fn draw_rays(ctx: &mut PatternContext<'_>, main: f64, length: f64) {
    let accent = ctx.colors.accent;
    let solid = LineStyle::solid(accent.with_alpha(0.5), 2.0);
    let dashed = LineStyle::dashed(accent.with_alpha(0.3), 1.0, &[5.0, 5.0]);

    for i in 0..RAY_COUNT {
        let angle = ray_angle(i, RAY_COUNT);
        let (x1, y1) = polar(ctx, angle, main * 0.7);
        let (x2, y2) = polar(ctx, angle, length);
        let style = if i % 2 == 0 { &solid } else { &dashed };
        ctx.canvas.stroke_line(x1, y1, x2, y2, style);
    }
}

fn draw_concentric_squares(ctx: &mut PatternContext<'_>, main: f64) {
    let (cx, cy) = (ctx.geometry.center_x, ctx.geometry.center_y);
    for (index, (scale, dash, width, opacity)) in CONCENTRIC.iter().enumerate() {
        let color = if index == NEUTRAL_SQUARE {
            ctx.gray(200, 100)
        } else {
            ctx.colors.accent
        };
        let size = main * scale;
        let style = LineStyle::dashed(color.with_alpha(*opacity), *width, dash);
        ctx.canvas.stroke_rect(cx - size / 2.0, cy - size / 2.0, size, size, &style);
    }
}

fn draw_rotated_squares(
    ctx: &mut PatternContext<'_>,
    main: f64,
    squares: &[(f64, f64, &[f64], f64)],
) {
    let (cx, cy) = (ctx.geometry.center_x, ctx.geometry.center_y);
    let accent = ctx.colors.accent;
    for (angle, scale, dash, opacity) in squares {
        let size = main * scale;
        let style = LineStyle::dashed(accent.with_alpha(*opacity), 1.0, dash);
        ctx.canvas.save();
        ctx.canvas.translate(cx, cy);
        ctx.canvas.rotate(*angle);
        ctx.canvas.stroke_rect(-size / 2.0, -size / 2.0, size, size, &style);
        ctx.canvas.restore();
    }
}

fn draw_ray_nodes(ctx: &mut PatternContext<'_>, length: f64) {
    let accent = ctx.colors.accent;
    let fill = if ctx.theme.is_dark() {
        Rgb::gray(50).with_alpha(0.9)
    } else {
        Rgb::gray(255).with_alpha(0.9)
    };
    let outline = LineStyle::solid(accent.with_alpha(0.7), 1.5);
    let cross = LineStyle::solid(accent.with_alpha(0.6), 1.0);

    for i in 0..RAY_COUNT {
        let (x, y) = polar(ctx, ray_angle(i, RAY_COUNT), length);
        let large = i % 4 == 0;
        let size = if large { 10.0 } else { 6.0 };
        let (left, top) = (x - size / 2.0, y - size / 2.0);
        ctx.canvas.fill_rect(left, top, size, size, fill);
        ctx.canvas.stroke_rect(left, top, size, size, &outline);
        if large {
            ctx.canvas.stroke_segments(
                &[[x - 3.0, y, x + 3.0, y], [x, y - 3.0, x, y + 3.0]],
                &cross,
            );
        }
    }
}

fn draw_corners(ctx: &mut PatternContext<'_>, distance: f64) {
    let (cx, cy) = (ctx.geometry.center_x, ctx.geometry.center_y);
    let accent = ctx.colors.accent;
    let style = LineStyle::dashed(accent.with_alpha(0.4), 1.5, &[6.0, 3.0]);
    let marker = accent.with_alpha(0.5);
    let c = CORNER_ARM;

    let corners = [
        (cx - distance, cy - distance, [(0.0, c), (0.0, 0.0), (c, 0.0)]),
        (cx + distance, cy - distance, [(-c, 0.0), (0.0, 0.0), (0.0, c)]),
        (cx + distance, cy + distance, [(0.0, -c), (0.0, 0.0), (-c, 0.0)]),
        (cx - distance, cy + distance, [(c, 0.0), (0.0, 0.0), (0.0, -c)]),
    ];
    for (x, y, offsets) in corners {
        let points = offsets.map(|(dx, dy)| (x + dx, y + dy));
        ctx.canvas.stroke_polyline(&points, &style);
        ctx.canvas.fill_rect(x - 3.0, y - 3.0, 6.0, 6.0, marker);
    }
}

fn draw_frames(ctx: &mut PatternContext<'_>, main: f64) {
    let (cx, cy) = (ctx.geometry.center_x, ctx.geometry.center_y);
    let accent = ctx.colors.accent;
    for (width_scale, height_scale, dash, opacity) in FRAMES {
        let (w, h) = (main * width_scale, main * height_scale);
        let style = LineStyle::dashed(accent.with_alpha(opacity), 1.0, dash);
        ctx.canvas.stroke_rect(cx - w / 2.0, cy - h / 2.0, w, h, &style);
    }
}

fn draw_spoke_squares(ctx: &mut PatternContext<'_>, length: f64) {
    const SIZE: f64 = 4.0;
    let accent = ctx.colors.accent;
    let fill = accent.with_alpha(0.4);
    let outline = LineStyle::solid(accent.with_alpha(0.6), 1.0);

    for ratio in [0.3, 0.5, 0.7] {
        for i in 0..SPOKE_COUNT {
            let (x, y) = polar(ctx, ray_angle(i, SPOKE_COUNT), length * ratio);
            let (left, top) = (x - SIZE / 2.0, y - SIZE / 2.0);
            ctx.canvas.fill_rect(left, top, SIZE, SIZE, fill);
            ctx.canvas.stroke_rect(left, top, SIZE, SIZE, &outline);
        }
    }
}

fn draw_spoke_connectors(ctx: &mut PatternContext<'_>, distance: f64) {
    let style = LineStyle::dashed(ctx.colors.accent.with_alpha(0.15), 1.0, &[3.0, 6.0]);
    for i in 0..SPOKE_COUNT {
        let (x1, y1) = polar(ctx, ray_angle(i, SPOKE_COUNT), distance);
        let (x2, y2) = polar(ctx, ray_angle(i + 1, SPOKE_COUNT), distance);
        ctx.canvas.stroke_line(x1, y1, x2, y2, &style);
    }
}

/// Small squares on a coarse lattice, only inside the ring `inner..outer`.
fn draw_markers(ctx: &mut PatternContext<'_>, spacing: f64, inner: f64, outer: f64) {
    const SIZE: f64 = 3.0;
    let geometry = ctx.geometry;
    let color = ctx.colors.accent.with_alpha(0.25);

    for x in stepped(spacing, geometry.width, spacing) {
        for y in stepped(spacing, geometry.height, spacing) {
            let distance = geometry.distance_from_center(x, y);
            if distance > inner && distance < outer {
                ctx.canvas.fill_rect(x - SIZE / 2.0, y - SIZE / 2.0, SIZE, SIZE, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ray_angles_cover_the_full_turn() {
        assert_eq!(ray_angle(0, RAY_COUNT), 0.0);
        assert!((ray_angle(4, RAY_COUNT) - PI / 2.0).abs() < 1e-12);
        assert!((ray_angle(SPOKE_COUNT, SPOKE_COUNT) - TAU).abs() < 1e-12);
    }

    #[test]
    fn only_the_main_square_is_solid() {
        for (index, (_, dash, _, _)) in CONCENTRIC.iter().enumerate() {
            assert_eq!(dash.is_empty(), index == NEUTRAL_SQUARE);
        }
    }
}
