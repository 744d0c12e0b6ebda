use std::fmt;
use std::path::Path;
use std::sync::mpsc;

use anyhow::{anyhow, ensure, Context, Result};
use bytemuck::{Pod, Zeroable};
use image::RgbaImage;
use sha2::{Digest, Sha256};
use tiny_skia::{
    Color, FilterQuality, Paint, Pattern, Pixmap, PixmapPaint, Rect, SpreadMode, Transform,
};
use wgpu::util::DeviceExt;

use crate::scene::{BackgroundQuad, OrthographicCamera, Scene};
use crate::settings::BackendKind;
use crate::texture::TextureSurface;

const BACKGROUND_WGSL: &str = include_str!("../shaders/wgsl/background.wgsl");

pub(crate) const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Which of the renderer's two color targets a draw writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTarget {
    /// Intermediate target read by the composite pass.
    Offscreen,
    /// The presentation surface.
    Screen,
}

/// Straight-alpha RGBA8 pixels read back from the presentation target.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Frame {
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = (y as usize * self.width as usize + x as usize) * 4;
        let bytes = self.pixels.get(start..start + 4)?;
        Some([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    /// True when every pixel is fully transparent.
    pub fn is_blank(&self) -> bool {
        self.pixels.chunks_exact(4).all(|pixel| pixel[3] == 0)
    }

    pub fn digest(&self) -> String {
        let hash = Sha256::digest(&self.pixels);
        hash.iter().map(|byte| format!("{byte:02x}")).collect()
    }

    pub fn to_image(&self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
    }

    pub fn save_png(&self, path: &Path) -> Result<()> {
        let image = self
            .to_image()
            .context("frame buffer does not match its dimensions")?;
        image
            .save(path)
            .with_context(|| format!("failed writing {}", path.display()))
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// Render device with an offscreen and a screen target of the same size.
pub struct Renderer {
    backend: Backend,
}

enum Backend {
    Gpu(Box<GpuBackend>),
    Software(SoftwareBackend),
}

impl Renderer {
    /// `Auto` tries the GPU first and falls back to software.
    pub fn new(kind: BackendKind, width: u32, height: u32) -> Result<Self> {
        ensure!(
            width > 0 && height > 0,
            "render target must be at least 1x1, got {width}x{height}"
        );
        match kind {
            BackendKind::Gpu => Self::gpu(width, height),
            BackendKind::Software => Self::software(width, height),
            BackendKind::Auto => Self::gpu(width, height).or_else(|error| {
                log::warn!("GPU renderer unavailable ({error:#}), using software renderer");
                Self::software(width, height)
            }),
        }
    }

    pub fn gpu(width: u32, height: u32) -> Result<Self> {
        let backend = pollster::block_on(GpuBackend::new(width, height))?;
        Ok(Self {
            backend: Backend::Gpu(Box::new(backend)),
        })
    }

    pub fn software(width: u32, height: u32) -> Result<Self> {
        Ok(Self {
            backend: Backend::Software(SoftwareBackend::new(width, height)?),
        })
    }

    pub fn is_gpu_backend(&self) -> bool {
        matches!(self.backend, Backend::Gpu(_))
    }

    pub fn backend_name(&self) -> &'static str {
        match self.backend {
            Backend::Gpu(_) => "gpu",
            Backend::Software(_) => "software",
        }
    }

    pub fn size(&self) -> (u32, u32) {
        match &self.backend {
            Backend::Gpu(gpu) => (gpu.width, gpu.height),
            Backend::Software(software) => (software.screen.width(), software.screen.height()),
        }
    }

    /// Reallocates both targets; their previous contents are discarded.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        ensure!(
            width > 0 && height > 0,
            "render target must be at least 1x1, got {width}x{height}"
        );
        if self.size() == (width, height) {
            return Ok(());
        }
        match &mut self.backend {
            Backend::Gpu(gpu) => gpu.resize(width, height),
            Backend::Software(software) => software.resize(width, height),
        }
    }

    /// Clears `target` to transparent black.
    pub fn clear(&mut self, target: RenderTarget) {
        match &mut self.backend {
            Backend::Gpu(gpu) => gpu.clear(target),
            Backend::Software(software) => software.target_mut(target).fill(Color::TRANSPARENT),
        }
    }

    /// Draws `scene` through `camera` without clearing `target` first. A dirty
    /// texture is uploaded before drawing.
    pub fn render(
        &mut self,
        scene: &Scene,
        camera: &OrthographicCamera,
        texture: &mut TextureSurface,
        target: RenderTarget,
    ) -> Result<()> {
        if texture.needs_upload() {
            self.upload(texture)?;
        }
        match &mut self.backend {
            Backend::Gpu(gpu) => gpu.draw_scene(scene, camera, target),
            Backend::Software(software) => {
                software.draw_scene(scene, camera, target);
                Ok(())
            }
        }
    }

    fn upload(&mut self, texture: &mut TextureSurface) -> Result<()> {
        let Some(raster) = texture.raster() else {
            texture.mark_uploaded();
            return Ok(());
        };
        match &mut self.backend {
            Backend::Gpu(gpu) => gpu.upload(raster.width(), raster.height(), &raster.to_rgba())?,
            Backend::Software(software) => software.raster = Some(raster.pixmap().clone()),
        }
        log::debug!(
            "uploaded texture v{} ({}x{})",
            texture.version(),
            raster.width(),
            raster.height()
        );
        texture.mark_uploaded();
        Ok(())
    }

    /// Reads the screen target.
    pub fn read_frame(&mut self) -> Result<Frame> {
        match &mut self.backend {
            Backend::Gpu(gpu) => gpu.read_screen(),
            Backend::Software(software) => Ok(software.read_screen()),
        }
    }

    pub(crate) fn gpu_backend(&self) -> Option<&GpuBackend> {
        match &self.backend {
            Backend::Gpu(gpu) => Some(gpu.as_ref()),
            Backend::Software(_) => None,
        }
    }

    pub(crate) fn software_mut(&mut self) -> Option<&mut SoftwareBackend> {
        match &mut self.backend {
            Backend::Gpu(_) => None,
            Backend::Software(software) => Some(software),
        }
    }
}

// ---------------------------------------------------------------------------
// Software backend
// ---------------------------------------------------------------------------

pub(crate) struct SoftwareBackend {
    pub(crate) offscreen: Pixmap,
    pub(crate) screen: Pixmap,
    raster: Option<Pixmap>,
}

impl SoftwareBackend {
    fn new(width: u32, height: u32) -> Result<Self> {
        Ok(Self {
            offscreen: new_pixmap(width, height)?,
            screen: new_pixmap(width, height)?,
            raster: None,
        })
    }

    /// Allocates both targets before swapping either in.
    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        let offscreen = new_pixmap(width, height)?;
        let screen = new_pixmap(width, height)?;
        self.offscreen = offscreen;
        self.screen = screen;
        Ok(())
    }

    fn target_mut(&mut self, target: RenderTarget) -> &mut Pixmap {
        match target {
            RenderTarget::Offscreen => &mut self.offscreen,
            RenderTarget::Screen => &mut self.screen,
        }
    }

    fn draw_scene(&mut self, scene: &Scene, camera: &OrthographicCamera, target: RenderTarget) {
        let (Some(quad), Some(raster)) = (scene.background(), self.raster.as_ref()) else {
            return;
        };
        let pixmap = match target {
            RenderTarget::Offscreen => &mut self.offscreen,
            RenderTarget::Screen => &mut self.screen,
        };
        let Some(transform) = quad_transform(quad, camera, raster, pixmap) else {
            log::debug!("background quad has a degenerate projection, skipping draw");
            return;
        };
        let Some(rect) = Rect::from_xywh(0.0, 0.0, raster.width() as f32, raster.height() as f32)
        else {
            return;
        };

        let paint = Paint {
            shader: Pattern::new(
                raster.as_ref(),
                SpreadMode::Pad,
                FilterQuality::Bilinear,
                1.0,
                Transform::identity(),
            ),
            anti_alias: false,
            ..Paint::default()
        };
        pixmap.fill_rect(rect, &paint, transform, None);
    }

    /// Identity copy from the offscreen target to the screen.
    pub(crate) fn composite(&mut self) {
        let paint = PixmapPaint {
            blend_mode: tiny_skia::BlendMode::Source,
            quality: FilterQuality::Nearest,
            ..PixmapPaint::default()
        };
        self.screen.draw_pixmap(
            0,
            0,
            self.offscreen.as_ref(),
            &paint,
            Transform::identity(),
            None,
        );
    }

    fn read_screen(&self) -> Frame {
        let mut pixels = Vec::with_capacity(self.screen.data().len());
        for pixel in self.screen.pixels() {
            let color = pixel.demultiply();
            pixels.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
        }
        Frame {
            width: self.screen.width(),
            height: self.screen.height(),
            pixels,
        }
    }
}

fn new_pixmap(width: u32, height: u32) -> Result<Pixmap> {
    Pixmap::new(width, height)
        .ok_or_else(|| anyhow!("failed allocating {width}x{height} render target"))
}

/// Maps raster pixel space onto `target` pixel space through the camera.
fn quad_transform(
    quad: &BackgroundQuad,
    camera: &OrthographicCamera,
    raster: &Pixmap,
    target: &Pixmap,
) -> Option<Transform> {
    let (target_w, target_h) = (f64::from(target.width()), f64::from(target.height()));
    let to_pixels = |position: [f64; 3]| {
        let [x, y, _] = camera.project(position[0], position[1], position[2]);
        ((x + 1.0) / 2.0 * target_w, (1.0 - y) / 2.0 * target_h)
    };
    let [top_left, top_right, bottom_left, _] = quad.corners();
    let (x0, y0) = to_pixels(top_left.position);
    let (x1, y1) = to_pixels(top_right.position);
    let (x2, y2) = to_pixels(bottom_left.position);

    let (raster_w, raster_h) = (f64::from(raster.width()), f64::from(raster.height()));
    let row = [
        (x1 - x0) / raster_w,
        (y1 - y0) / raster_w,
        (x2 - x0) / raster_h,
        (y2 - y0) / raster_h,
        x0,
        y0,
    ];
    if row.iter().any(|value| !value.is_finite()) {
        return None;
    }
    let [sx, ky, kx, sy, tx, ty] = row.map(|value| value as f32);
    Some(Transform::from_row(sx, ky, kx, sy, tx, ty))
}

// ---------------------------------------------------------------------------
// GPU backend
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct QuadVertex {
    position: [f32; 3],
    uv: [f32; 2],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct CameraUniform {
    view_proj: [[f32; 4]; 4],
}

struct GpuTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

struct Readback {
    buffer: wgpu::Buffer,
    unpadded_bytes_per_row: u32,
    padded_bytes_per_row: u32,
}

struct UploadedRaster {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    width: u32,
    height: u32,
}

pub(crate) struct GpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    width: u32,
    height: u32,
    offscreen: GpuTarget,
    screen: GpuTarget,
    readback: Readback,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    camera_buffer: wgpu::Buffer,
    vertex_buffer: wgpu::Buffer,
    sampler: wgpu::Sampler,
    raster: Option<UploadedRaster>,
}

impl GpuBackend {
    async fn new(width: u32, height: u32) -> Result<Self> {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: None,
            })
            .await
            .ok_or_else(|| anyhow!("no suitable GPU adapter found"))?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("glassfx-device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .context("failed to request wgpu device")?;

        let offscreen = create_target(&device, "glassfx-offscreen-target", width, height);
        let screen = create_target(&device, "glassfx-screen-target", width, height);
        let readback = create_readback(&device, width, height)?;

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("glassfx-background-bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<CameraUniform>() as u64,
                        ),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("glassfx-background-shader"),
            source: wgpu::ShaderSource::Wgsl(BACKGROUND_WGSL.into()),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("glassfx-background-layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("glassfx-background-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2],
                }],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState::default(),
            // the background never reads or writes depth
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: TARGET_FORMAT,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
        });

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("glassfx-camera-uniform"),
            contents: bytemuck::bytes_of(&CameraUniform::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("glassfx-quad-vertices"),
            contents: bytemuck::cast_slice(&[QuadVertex::zeroed(); 6]),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        let sampler = create_linear_sampler(&device, "glassfx-background-sampler");

        log::info!("wgpu renderer ready ({})", adapter.get_info().name);
        Ok(Self {
            device,
            queue,
            width,
            height,
            offscreen,
            screen,
            readback,
            pipeline,
            bind_group_layout,
            camera_buffer,
            vertex_buffer,
            sampler,
            raster: None,
        })
    }

    pub(crate) fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub(crate) fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub(crate) fn view(&self, target: RenderTarget) -> &wgpu::TextureView {
        match target {
            RenderTarget::Offscreen => &self.offscreen.view,
            RenderTarget::Screen => &self.screen.view,
        }
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        let max = self.device.limits().max_texture_dimension_2d;
        ensure!(
            width <= max && height <= max,
            "render target {width}x{height} exceeds the device limit of {max}"
        );
        let readback = create_readback(&self.device, width, height)?;
        self.offscreen = create_target(&self.device, "glassfx-offscreen-target", width, height);
        self.screen = create_target(&self.device, "glassfx-screen-target", width, height);
        self.readback = readback;
        self.width = width;
        self.height = height;
        Ok(())
    }

    fn upload(&mut self, width: u32, height: u32, rgba: &[u8]) -> Result<()> {
        let reuse = self
            .raster
            .as_ref()
            .is_some_and(|raster| raster.width == width && raster.height == height);
        if !reuse {
            // the previous texture is dropped with the old bind group
            self.raster = Some(self.create_raster_texture(width, height));
        }
        let raster = self
            .raster
            .as_ref()
            .ok_or_else(|| anyhow!("raster texture missing after allocation"))?;

        let bytes_per_row = width
            .checked_mul(4)
            .ok_or_else(|| anyhow!("raster width overflow when computing row bytes"))?;
        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &raster.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    fn create_raster_texture(&self, width: u32, height: u32) -> UploadedRaster {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("glassfx-background-texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("glassfx-background-bg"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });
        UploadedRaster {
            texture,
            bind_group,
            width,
            height,
        }
    }

    fn clear(&mut self, target: RenderTarget) {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("glassfx-clear-encoder"),
            });
        {
            let _pass = begin_pass(
                &mut encoder,
                "glassfx-clear-pass",
                self.view(target),
                wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
            );
        }
        self.queue.submit(Some(encoder.finish()));
    }

    fn draw_scene(
        &mut self,
        scene: &Scene,
        camera: &OrthographicCamera,
        target: RenderTarget,
    ) -> Result<()> {
        let (Some(quad), Some(raster)) = (scene.background(), self.raster.as_ref()) else {
            return Ok(());
        };

        self.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::bytes_of(&CameraUniform {
                view_proj: camera.view_projection(),
            }),
        );
        self.queue
            .write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&quad_vertices(quad)));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("glassfx-scene-encoder"),
            });
        {
            let mut pass = begin_pass(
                &mut encoder,
                "glassfx-scene-pass",
                self.view(target),
                wgpu::LoadOp::Load,
            );
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &raster.bind_group, &[]);
            pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            pass.draw(0..6, 0..1);
        }
        self.queue.submit(Some(encoder.finish()));
        Ok(())
    }

    fn read_screen(&mut self) -> Result<Frame> {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("glassfx-readback-encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &self.screen.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &self.readback.buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(self.readback.padded_bytes_per_row),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(Some(encoder.finish()));

        let buffer_slice = self.readback.buffer.slice(..);
        let (sender, receiver) = mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);

        receiver
            .recv()
            .map_err(|_| anyhow!("failed receiving GPU map callback"))?
            .context("GPU buffer mapping failed")?;

        let unpadded = self.readback.unpadded_bytes_per_row as usize;
        let mapped = buffer_slice.get_mapped_range();
        let mut pixels = vec![0_u8; unpadded * self.height as usize];
        for (row_index, chunk) in mapped
            .chunks(self.readback.padded_bytes_per_row as usize)
            .take(self.height as usize)
            .enumerate()
        {
            let start = row_index * unpadded;
            pixels[start..start + unpadded].copy_from_slice(&chunk[..unpadded]);
        }
        drop(mapped);
        self.readback.buffer.unmap();

        Ok(Frame {
            width: self.width,
            height: self.height,
            pixels,
        })
    }
}

pub(crate) fn begin_pass<'a>(
    encoder: &'a mut wgpu::CommandEncoder,
    label: &'a str,
    view: &'a wgpu::TextureView,
    load: wgpu::LoadOp<wgpu::Color>,
) -> wgpu::RenderPass<'a> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load,
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        occlusion_query_set: None,
        timestamp_writes: None,
    })
}

pub(crate) fn create_linear_sampler(device: &wgpu::Device, label: &str) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

fn create_target(device: &wgpu::Device, label: &str, width: u32, height: u32) -> GpuTarget {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TARGET_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    GpuTarget { texture, view }
}

fn create_readback(device: &wgpu::Device, width: u32, height: u32) -> Result<Readback> {
    let unpadded_bytes_per_row = width
        .checked_mul(4)
        .ok_or_else(|| anyhow!("frame width overflow when computing row bytes"))?;
    let padded_bytes_per_row = align_to(unpadded_bytes_per_row, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("glassfx-readback-buffer"),
        size: u64::from(padded_bytes_per_row) * u64::from(height),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });
    Ok(Readback {
        buffer,
        unpadded_bytes_per_row,
        padded_bytes_per_row,
    })
}

/// Two triangles covering the quad.
fn quad_vertices(quad: &BackgroundQuad) -> [QuadVertex; 6] {
    let [top_left, top_right, bottom_left, bottom_right] = quad.corners().map(|corner| QuadVertex {
        position: corner.position.map(|value| value as f32),
        uv: corner.uv.map(|value| value as f32),
    });
    [
        top_left,
        bottom_left,
        top_right,
        top_right,
        bottom_left,
        bottom_right,
    ]
}

fn align_to(value: u32, alignment: u32) -> u32 {
    let mask = alignment - 1;
    (value + mask) & !mask
}
