//! A small immediate-mode drawing surface with HTML-canvas-like semantics
//! (`fill_rect`, dashed strokes, save/restore of the transform) on top of
//! `tiny-skia`. Coordinates are `f64` pixels with the origin at the top-left.

use tiny_skia::{
    FillRule, GradientStop, LinearGradient, Paint, Path, PathBuilder, Pixmap, Point, Rect,
    Shader, SpreadMode, Stroke, StrokeDash, Transform,
};

use crate::color::Rgba;

const CANVAS_MITER_LIMIT: f32 = 10.0;

/// Stroke parameters; an empty `dash` draws a solid line.
#[derive(Debug, Clone, PartialEq)]
pub struct LineStyle {
    pub color: Rgba,
    pub width: f64,
    pub dash: Vec<f64>,
}

impl LineStyle {
    pub fn solid(color: Rgba, width: f64) -> Self {
        Self {
            color,
            width,
            dash: Vec::new(),
        }
    }

    pub fn dashed(color: Rgba, width: f64, dash: &[f64]) -> Self {
        Self {
            color,
            width,
            dash: dash.to_vec(),
        }
    }

    fn to_stroke(&self) -> Stroke {
        Stroke {
            width: self.width as f32,
            miter_limit: CANVAS_MITER_LIMIT,
            dash: dash_pattern(&self.dash),
            ..Stroke::default()
        }
    }
}

fn dash_pattern(dash: &[f64]) -> Option<StrokeDash> {
    if dash.is_empty() {
        return None;
    }
    // Odd-length lists repeat once, as in a 2D canvas context.
    let mut intervals: Vec<f32> = dash.iter().map(|value| *value as f32).collect();
    if intervals.len() % 2 == 1 {
        intervals.extend_from_within(..);
    }
    StrokeDash::new(intervals, 0.0)
}

pub struct Canvas {
    pixmap: Pixmap,
    transform: Transform,
    saved: Vec<Transform>,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Option<Self> {
        Some(Self {
            pixmap: Pixmap::new(width, height)?,
            transform: Transform::identity(),
            saved: Vec::new(),
        })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn save(&mut self) {
        self.saved.push(self.transform);
    }

    pub fn restore(&mut self) {
        if let Some(transform) = self.saved.pop() {
            self.transform = transform;
        }
    }

    pub fn translate(&mut self, x: f64, y: f64) {
        self.transform = self.transform.pre_translate(x as f32, y as f32);
    }

    pub fn rotate(&mut self, radians: f64) {
        self.transform = self.transform.pre_rotate(radians.to_degrees() as f32);
    }

    pub fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: Rgba) {
        let Some(rect) = rect(x, y, width, height) else {
            return;
        };
        let paint = solid_paint(color);
        self.pixmap.fill_rect(rect, &paint, self.transform, None);
    }

    pub fn stroke_rect(&mut self, x: f64, y: f64, width: f64, height: f64, style: &LineStyle) {
        let Some(rect) = rect(x, y, width, height) else {
            return;
        };
        let path = PathBuilder::from_rect(rect);
        self.stroke(&path, style);
    }

    pub fn fill_circle(&mut self, cx: f64, cy: f64, radius: f64, color: Rgba) {
        let Some(path) = PathBuilder::from_circle(cx as f32, cy as f32, radius as f32) else {
            return;
        };
        let paint = solid_paint(color);
        self.pixmap
            .fill_path(&path, &paint, FillRule::Winding, self.transform, None);
    }

    pub fn stroke_circle(&mut self, cx: f64, cy: f64, radius: f64, style: &LineStyle) {
        if let Some(path) = PathBuilder::from_circle(cx as f32, cy as f32, radius as f32) {
            self.stroke(&path, style);
        }
    }

    pub fn fill_path(&mut self, path: &Path, color: Rgba) {
        let paint = solid_paint(color);
        self.pixmap
            .fill_path(path, &paint, FillRule::Winding, self.transform, None);
    }

    pub fn stroke_line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, style: &LineStyle) {
        let mut builder = PathBuilder::new();
        builder.move_to(x1 as f32, y1 as f32);
        builder.line_to(x2 as f32, y2 as f32);
        if let Some(path) = builder.finish() {
            self.stroke(&path, style);
        }
    }

    /// Strokes every segment in one path, like a single `stroke()` call after
    /// several `moveTo`/`lineTo` pairs.
    pub fn stroke_segments(&mut self, segments: &[[f64; 4]], style: &LineStyle) {
        let mut builder = PathBuilder::new();
        for [x1, y1, x2, y2] in segments {
            builder.move_to(*x1 as f32, *y1 as f32);
            builder.line_to(*x2 as f32, *y2 as f32);
        }
        if let Some(path) = builder.finish() {
            self.stroke(&path, style);
        }
    }

    pub fn stroke_polyline(&mut self, points: &[(f64, f64)], style: &LineStyle) {
        let Some(((x0, y0), rest)) = points.split_first() else {
            return;
        };
        let mut builder = PathBuilder::new();
        builder.move_to(*x0 as f32, *y0 as f32);
        for (x, y) in rest {
            builder.line_to(*x as f32, *y as f32);
        }
        if let Some(path) = builder.finish() {
            self.stroke(&path, style);
        }
    }

    pub fn stroke(&mut self, path: &Path, style: &LineStyle) {
        let paint = solid_paint(style.color);
        self.pixmap
            .stroke_path(path, &paint, &style.to_stroke(), self.transform, None);
    }

    /// Strokes a straight line whose color fades linearly from `from` at the
    /// start point to `to` at the end point.
    pub fn stroke_line_gradient(
        &mut self,
        start: (f64, f64),
        end: (f64, f64),
        from: Rgba,
        to: Rgba,
        width: f64,
        dash: &[f64],
    ) {
        let start_point = Point::from_xy(start.0 as f32, start.1 as f32);
        let end_point = Point::from_xy(end.0 as f32, end.1 as f32);
        let Some(shader) = LinearGradient::new(
            start_point,
            end_point,
            vec![
                GradientStop::new(0.0, from.to_skia()),
                GradientStop::new(1.0, to.to_skia()),
            ],
            SpreadMode::Pad,
            Transform::identity(),
        ) else {
            return;
        };

        let mut builder = PathBuilder::new();
        builder.move_to(start_point.x, start_point.y);
        builder.line_to(end_point.x, end_point.y);
        let Some(path) = builder.finish() else {
            return;
        };

        let paint = shader_paint(shader);
        let style = LineStyle::dashed(from, width, dash);
        self.pixmap
            .stroke_path(&path, &paint, &style.to_stroke(), self.transform, None);
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn into_pixmap(self) -> Pixmap {
        self.pixmap
    }
}

fn rect(x: f64, y: f64, width: f64, height: f64) -> Option<Rect> {
    Rect::from_xywh(x as f32, y as f32, width as f32, height as f32)
}

fn solid_paint(color: Rgba) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color.to_skia());
    paint.anti_alias = true;
    paint
}

fn shader_paint(shader: Shader<'_>) -> Paint<'_> {
    Paint {
        shader,
        anti_alias: true,
        ..Paint::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;

    fn pixel(canvas: &Canvas, x: u32, y: u32) -> [u8; 4] {
        let color = canvas
            .pixmap()
            .pixel(x, y)
            .expect("pixel should be in bounds");
        [color.red(), color.green(), color.blue(), color.alpha()]
    }

    #[test]
    fn fill_rect_covers_expected_pixels() {
        let mut canvas = Canvas::new(8, 8).expect("canvas");
        canvas.fill_rect(2.0, 2.0, 4.0, 4.0, Rgb::new(255, 0, 0).with_alpha(1.0));
        assert_eq!(pixel(&canvas, 3, 3), [255, 0, 0, 255]);
        assert_eq!(pixel(&canvas, 0, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn degenerate_shapes_are_ignored() {
        let mut canvas = Canvas::new(4, 4).expect("canvas");
        let color = Rgb::gray(255).with_alpha(1.0);
        canvas.fill_rect(1.0, 1.0, 0.0, 2.0, color);
        canvas.fill_circle(2.0, 2.0, 0.0, color);
        canvas.stroke_polyline(&[], &LineStyle::solid(color, 1.0));
        assert!(canvas.pixmap().data().iter().all(|byte| *byte == 0));
    }

    #[test]
    fn restore_pops_to_saved_transform() {
        let mut canvas = Canvas::new(4, 4).expect("canvas");
        canvas.save();
        canvas.translate(10.0, 0.0);
        canvas.rotate(std::f64::consts::FRAC_PI_4);
        canvas.restore();
        assert_eq!(canvas.transform, Transform::identity());
        // unbalanced restore is a no-op
        canvas.restore();
        assert_eq!(canvas.transform, Transform::identity());
    }

    #[test]
    fn odd_dash_lists_are_repeated() {
        assert!(dash_pattern(&[4.0]).is_some());
        assert!(dash_pattern(&[]).is_none());
        assert!(dash_pattern(&[5.0, 10.0]).is_some());
    }
}
