//! Viewport, orthographic camera and the background quad.
//!
//! World units follow the camera: the visible area spans `-aspect..aspect`
//! horizontally and `-1..1` vertically, so a quad of `aspect * 2` by `2`
//! covers the viewport exactly.

use anyhow::{anyhow, Result};
use serde_json::json;

use crate::error_codes::CodedError;

pub const CAMERA_NEAR: f64 = 0.1;
pub const CAMERA_FAR: f64 = 10.0;
pub const CAMERA_Z: f64 = 1.0;

/// CSS-pixel size of the host viewport plus its device pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    pub width: u32,
    pub height: u32,
    pub device_pixel_ratio: f64,
}

impl ViewportState {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            device_pixel_ratio: 1.0,
        }
    }

    /// Rejects empty viewports and unusable pixel ratios with `INVALID_VIEWPORT`.
    pub fn validated(width: u32, height: u32, device_pixel_ratio: f64) -> Result<Self> {
        if width == 0 || height == 0 || !device_pixel_ratio.is_finite() || device_pixel_ratio <= 0.0
        {
            return Err(anyhow!(CodedError::usage(
                "INVALID_VIEWPORT",
                format!("invalid viewport {width}x{height} @ {device_pixel_ratio}"),
            )
            .with_details(json!({
                "width": width,
                "height": height,
                "device_pixel_ratio": device_pixel_ratio,
            }))));
        }
        Ok(Self {
            width,
            height,
            device_pixel_ratio,
        })
    }

    pub fn with_device_pixel_ratio(mut self, device_pixel_ratio: f64) -> Self {
        self.device_pixel_ratio = device_pixel_ratio;
        self
    }

    /// `width / height`, with a zero height read as one.
    pub fn aspect_ratio(&self) -> f64 {
        f64::from(self.width) / f64::from(self.height.max(1))
    }

    /// The device pixel ratio capped at `max_pixel_ratio`.
    pub fn effective_pixel_ratio(&self, max_pixel_ratio: f64) -> f64 {
        let ratio = if self.device_pixel_ratio.is_finite() && self.device_pixel_ratio > 0.0 {
            self.device_pixel_ratio
        } else {
            1.0
        };
        ratio.min(max_pixel_ratio.max(f64::MIN_POSITIVE))
    }

    /// Physical size of the presentation surface, at least 1x1.
    pub fn drawing_buffer_size(&self, max_pixel_ratio: f64) -> (u32, u32) {
        let ratio = self.effective_pixel_ratio(max_pixel_ratio);
        let scale = |css: u32| ((f64::from(css) * ratio).floor() as u32).max(1);
        (scale(self.width), scale(self.height))
    }
}

impl Default for ViewportState {
    fn default() -> Self {
        Self::new(1280, 720)
    }
}

/// An orthographic camera looking down `-z` from `z = 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrthographicCamera {
    left: f64,
    right: f64,
    top: f64,
    bottom: f64,
    near: f64,
    far: f64,
    position_z: f64,
}

impl OrthographicCamera {
    pub fn new(aspect: f64) -> Self {
        Self {
            left: -aspect,
            right: aspect,
            top: 1.0,
            bottom: -1.0,
            near: CAMERA_NEAR,
            far: CAMERA_FAR,
            position_z: CAMERA_Z,
        }
    }

    /// Updates the horizontal bounds; top and bottom stay at `1` and `-1`.
    pub fn set_aspect(&mut self, aspect: f64) {
        self.left = -aspect;
        self.right = aspect;
    }

    pub fn left(&self) -> f64 {
        self.left
    }

    pub fn right(&self) -> f64 {
        self.right
    }

    pub fn top(&self) -> f64 {
        self.top
    }

    pub fn bottom(&self) -> f64 {
        self.bottom
    }

    /// Column-major projection * view for a `[0, 1]` depth range.
    pub fn view_projection(&self) -> [[f32; 4]; 4] {
        let (l, r, t, b, n, f) = (
            self.left,
            self.right,
            self.top,
            self.bottom,
            self.near,
            self.far,
        );
        let depth = f - n;
        // view translates by -position_z before the projection
        let z_offset = (self.position_z - n) / depth;
        [
            [(2.0 / (r - l)) as f32, 0.0, 0.0, 0.0],
            [0.0, (2.0 / (t - b)) as f32, 0.0, 0.0],
            [0.0, 0.0, (-1.0 / depth) as f32, 0.0],
            [
                (-(r + l) / (r - l)) as f32,
                (-(t + b) / (t - b)) as f32,
                z_offset as f32,
                1.0,
            ],
        ]
    }

    /// World point to normalized device coordinates.
    pub fn project(&self, x: f64, y: f64, z: f64) -> [f64; 3] {
        let ndc_x = (2.0 * x - (self.right + self.left)) / (self.right - self.left);
        let ndc_y = (2.0 * y - (self.top + self.bottom)) / (self.top - self.bottom);
        let ndc_z = (self.position_z - z - self.near) / (self.far - self.near);
        [ndc_x, ndc_y, ndc_z]
    }
}

/// A textured plane centred at the origin, never depth tested.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackgroundQuad {
    pub width: f64,
    pub height: f64,
    pub depth_test: bool,
    pub depth_write: bool,
}

/// One corner of the quad: world position and texture coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadCorner {
    pub position: [f64; 3],
    pub uv: [f64; 2],
}

impl BackgroundQuad {
    pub fn for_aspect(aspect: f64) -> Self {
        Self {
            width: aspect * 2.0,
            height: 2.0,
            depth_test: false,
            depth_write: false,
        }
    }

    /// Top-left, top-right, bottom-left, bottom-right. `uv (0, 0)` is the
    /// raster's first row.
    pub fn corners(&self) -> [QuadCorner; 4] {
        let (hw, hh) = (self.width / 2.0, self.height / 2.0);
        [
            QuadCorner {
                position: [-hw, hh, 0.0],
                uv: [0.0, 0.0],
            },
            QuadCorner {
                position: [hw, hh, 0.0],
                uv: [1.0, 0.0],
            },
            QuadCorner {
                position: [-hw, -hh, 0.0],
                uv: [0.0, 1.0],
            },
            QuadCorner {
                position: [hw, -hh, 0.0],
                uv: [1.0, 1.0],
            },
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    background: Option<BackgroundQuad>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swaps in a new background quad, dropping the old one.
    pub fn set_background(&mut self, quad: BackgroundQuad) {
        self.background = Some(quad);
    }

    pub fn background(&self) -> Option<&BackgroundQuad> {
        self.background.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.background.is_none()
    }
}

/// A scene with the camera that renders it.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenePair {
    pub scene: Scene,
    pub camera: OrthographicCamera,
}

impl ScenePair {
    pub fn new(aspect: f64) -> Self {
        Self {
            scene: Scene::new(),
            camera: OrthographicCamera::new(aspect),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mul(matrix: &[[f32; 4]; 4], point: [f32; 4]) -> [f32; 4] {
        let mut out = [0.0; 4];
        for (column, value) in matrix.iter().zip(point) {
            for row in 0..4 {
                out[row] += column[row] * value;
            }
        }
        out
    }

    #[test]
    fn aspect_ratio_treats_zero_height_as_one() {
        assert!((ViewportState::new(1600, 900).aspect_ratio() - 1.777_777).abs() < 1e-5);
        assert_eq!(ViewportState::new(640, 0).aspect_ratio(), 640.0);
    }

    #[test]
    fn drawing_buffer_caps_pixel_ratio() {
        let viewport = ViewportState::new(801, 600).with_device_pixel_ratio(3.0);
        assert_eq!(viewport.drawing_buffer_size(2.0), (1602, 1200));
        let viewport = ViewportState::new(801, 601).with_device_pixel_ratio(1.5);
        assert_eq!(viewport.drawing_buffer_size(2.0), (1201, 901));
        let viewport = ViewportState::new(0, 0).with_device_pixel_ratio(f64::NAN);
        assert_eq!(viewport.drawing_buffer_size(2.0), (1, 1));
    }

    #[test]
    fn validated_rejects_empty_viewports() {
        let error = ViewportState::validated(0, 10, 1.0).unwrap_err();
        let coded = crate::error_codes::find_coded_error(&error).expect("coded");
        assert_eq!(coded.code, "INVALID_VIEWPORT");
        assert!(ViewportState::validated(10, 10, 0.0).is_err());
        assert!(ViewportState::validated(10, 10, 2.0).is_ok());
    }

    #[test]
    fn camera_bounds_follow_aspect() {
        let mut camera = OrthographicCamera::new(1600.0 / 900.0);
        assert!((camera.left() + 1.778).abs() < 1e-3);
        assert!((camera.right() - 1.778).abs() < 1e-3);
        assert_eq!((camera.top(), camera.bottom()), (1.0, -1.0));

        camera.set_aspect(0.5625);
        assert_eq!((camera.left(), camera.right()), (-0.5625, 0.5625));
        assert_eq!((camera.top(), camera.bottom()), (1.0, -1.0));
    }

    #[test]
    fn quad_corners_land_on_clip_corners() {
        let aspect = 1.5;
        let camera = OrthographicCamera::new(aspect);
        let matrix = camera.view_projection();
        let quad = BackgroundQuad::for_aspect(aspect);
        let expected = [[-1.0, 1.0], [1.0, 1.0], [-1.0, -1.0], [1.0, -1.0]];

        for (corner, [ex, ey]) in quad.corners().iter().zip(expected) {
            let [x, y, z] = corner.position.map(|v| v as f32);
            let clip = mul(&matrix, [x, y, z, 1.0]);
            assert!((clip[0] - ex).abs() < 1e-6);
            assert!((clip[1] - ey).abs() < 1e-6);
            assert!((0.0..=1.0).contains(&clip[2]));

            let ndc = camera.project(corner.position[0], corner.position[1], 0.0);
            assert!((ndc[0] - f64::from(ex)).abs() < 1e-12);
            assert!((ndc[1] - f64::from(ey)).abs() < 1e-12);
        }
        assert!(!quad.depth_test && !quad.depth_write);
    }
}
