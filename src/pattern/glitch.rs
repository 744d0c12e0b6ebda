use crate::canvas::LineStyle;

use super::{seeded_random, stepped, PatternContext};

const GRID_DIVISIONS: f64 = 5.0;
const NODE_THRESHOLD: f64 = 0.65;
const DOT_THRESHOLD: f64 = 0.3;
const CONNECTOR_THRESHOLD: f64 = 0.6;

struct GridSet {
    scale: f64,
    opacity: f64,
    width: f64,
    dash: [f64; 2],
}

const GRID_SETS: [GridSet; 3] = [
    GridSet {
        scale: 1.0,
        opacity: 0.08,
        width: 1.0,
        dash: [8.0, 8.0],
    },
    GridSet {
        scale: 2.0,
        opacity: 0.12,
        width: 1.5,
        dash: [12.0, 6.0],
    },
    GridSet {
        scale: 0.5,
        opacity: 0.05,
        width: 1.0,
        dash: [4.0, 4.0],
    },
];

pub(super) fn draw(ctx: &mut PatternContext<'_>) {
    let grid = ctx.geometry.min_side() / GRID_DIVISIONS;
    draw_grid_sets(ctx, grid);
    draw_diagonals(ctx, grid);
    draw_connectors(ctx, grid);
    draw_nodes(ctx, grid);
}

fn cell_seed(x: f64, y: f64, grid: f64) -> f64 {
    (x / grid) * 1000.0 + y / grid
}

fn draw_grid_sets(ctx: &mut PatternContext<'_>, grid: f64) {
    let (width, height) = (ctx.geometry.width, ctx.geometry.height);
    for set in &GRID_SETS {
        let size = grid * set.scale;
        let style = LineStyle::dashed(
            ctx.colors.accent.with_alpha(set.opacity),
            set.width,
            &set.dash,
        );
        for x in stepped(size, width, size) {
            ctx.canvas.stroke_line(x, 0.0, x, height, &style);
        }
        for y in stepped(size, height, size) {
            ctx.canvas.stroke_line(0.0, y, width, y, &style);
        }
    }
}

fn draw_diagonals(ctx: &mut PatternContext<'_>, grid: f64) {
    let (width, height) = (ctx.geometry.width, ctx.geometry.height);
    let style = LineStyle::dashed(ctx.colors.accent.with_alpha(0.04), 0.5, &[6.0, 12.0]);
    let step = grid * 1.5;

    for i in stepped(-height, width + height, step) {
        ctx.canvas.stroke_line(i, 0.0, i + height, height, &style);
    }
    for i in stepped(-width, width + height, step) {
        ctx.canvas.stroke_line(0.0, i, width, i + width, &style);
    }
}

fn draw_connectors(ctx: &mut PatternContext<'_>, grid: f64) {
    let (width, height) = (ctx.geometry.width, ctx.geometry.height);
    let style = LineStyle::solid(ctx.colors.accent.with_alpha(0.15), 1.5);

    for x in stepped(grid, width, grid) {
        for y in stepped(grid, height, grid) {
            let seed = cell_seed(x, y, grid);
            if seeded_random(seed) <= CONNECTOR_THRESHOLD {
                continue;
            }
            let mut segments = Vec::with_capacity(2);
            if x < width - grid && seeded_random(seed + 1.0) > 0.5 {
                segments.push([x, y, x + grid, y]);
            }
            if y < height - grid && seeded_random(seed + 2.0) > 0.5 {
                segments.push([x, y, x, y + grid]);
            }
            ctx.canvas.stroke_segments(&segments, &style);
        }
    }
}

fn draw_nodes(ctx: &mut PatternContext<'_>, grid: f64) {
    let (width, height) = (ctx.geometry.width, ctx.geometry.height);
    let dot = ctx.colors.accent.with_alpha(0.4);

    for x in stepped(grid, width, grid) {
        for y in stepped(grid, height, grid) {
            let seed = cell_seed(x, y, grid);
            let primary = seeded_random(seed);
            let secondary = seeded_random(seed + 100.0);

            if primary > NODE_THRESHOLD {
                let opacity = ctx.geometry.falloff(x, y, 0.6, 0.3);
                let size = grid * 0.4 * (0.8 + secondary * 0.4);
                draw_geometric_node(ctx, x, y, size, opacity);
            }
            if primary < DOT_THRESHOLD {
                ctx.canvas.fill_circle(x, y, 2.0, dot);
            }
        }
    }
}

/// Diagonal cross, inner square outline and four corner ticks.
fn draw_geometric_node(ctx: &mut PatternContext<'_>, x: f64, y: f64, size: f64, opacity: f64) {
    let arm = size / 2.5;
    let cross = LineStyle::solid(ctx.gray(180, 120).with_alpha(opacity * 0.3), 0.5);
    ctx.canvas.stroke_segments(
        &[
            [x - arm, y - arm, x + arm, y + arm],
            [x + arm, y - arm, x - arm, y + arm],
        ],
        &cross,
    );

    let inner = size * 0.45;
    let outline = LineStyle::solid(ctx.gray(200, 100).with_alpha(opacity * 0.35), 1.0);
    ctx.canvas.stroke_rect(x - inner / 2.0, y - inner / 2.0, inner, inner, &outline);

    const TICK: f64 = 3.0;
    let tick = ctx.gray(220, 80).with_alpha(opacity * 0.7);
    let half = size / 2.0;
    for (dx, dy) in [(-half, -half), (half, -half), (-half, half), (half, half)] {
        ctx.canvas.fill_rect(
            x + dx - TICK / 2.0,
            y + dy - TICK / 2.0,
            TICK,
            TICK,
            tick,
        );
    }
}
