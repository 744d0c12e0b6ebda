//! Two-pass effect composer.
//!
//! The render pass draws the background scene into the offscreen target; the
//! shader pass samples that target with a full-screen triangle and writes the
//! result to the screen target. The shipped shader is a pass-through, so the
//! presented frame equals the offscreen one.
//!
//!   - [`RenderPass`]: scene + camera into the offscreen target.
//!   - [`ShaderPass`]: one pipeline reading the offscreen target.
//!   - [`EffectComposer`]: runs both in order and tracks the target size.

use anyhow::{anyhow, ensure, Result};

use crate::renderer::{begin_pass, create_linear_sampler, RenderTarget, Renderer, TARGET_FORMAT};
use crate::scene::ScenePair;
use crate::texture::TextureSurface;

const PASSTHROUGH_WGSL: &str = include_str!("../shaders/wgsl/passthrough.wgsl");

/// Draws a scene into the offscreen target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderPass {
    /// Clear the offscreen target before drawing.
    pub clear: bool,
}

impl Default for RenderPass {
    fn default() -> Self {
        Self { clear: true }
    }
}

impl RenderPass {
    fn execute(
        &self,
        renderer: &mut Renderer,
        pair: &ScenePair,
        texture: &mut TextureSurface,
    ) -> Result<()> {
        if self.clear {
            renderer.clear(RenderTarget::Offscreen);
        }
        renderer.render(&pair.scene, &pair.camera, texture, RenderTarget::Offscreen)
    }
}

/// Full-screen shader pass from the offscreen target to the screen.
pub struct ShaderPass {
    pub label: String,
    kernel: ShaderKernel,
}

enum ShaderKernel {
    Gpu(GpuShaderPass),
    /// Identity copy on the CPU.
    Software,
}

struct GpuShaderPass {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
}

impl ShaderPass {
    pub fn passthrough(renderer: &Renderer) -> Result<Self> {
        Self::new(renderer, "composite-passthrough", PASSTHROUGH_WGSL)
    }

    /// Builds the pass for whichever backend `renderer` runs on. The software
    /// backend only supports the pass-through shader and ignores `wgsl_source`.
    pub fn new(renderer: &Renderer, label: &str, wgsl_source: &str) -> Result<Self> {
        let kernel = match renderer.gpu_backend() {
            Some(gpu) => ShaderKernel::Gpu(build_gpu_pass(gpu.device(), label, wgsl_source)),
            None => ShaderKernel::Software,
        };
        Ok(Self {
            label: label.to_owned(),
            kernel,
        })
    }

    fn execute(&self, renderer: &mut Renderer) -> Result<()> {
        match &self.kernel {
            ShaderKernel::Gpu(pass) => {
                let gpu = renderer
                    .gpu_backend()
                    .ok_or_else(|| anyhow!("shader pass '{}' needs a GPU renderer", self.label))?;
                let device = gpu.device();

                let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(&format!("{}-bg", self.label)),
                    layout: &pass.bind_group_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(
                                gpu.view(RenderTarget::Offscreen),
                            ),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::Sampler(&pass.sampler),
                        },
                    ],
                });

                let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some(&format!("{}-encoder", self.label)),
                });
                {
                    let label = format!("{}-pass", self.label);
                    let mut render_pass = begin_pass(
                        &mut encoder,
                        &label,
                        gpu.view(RenderTarget::Screen),
                        wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    );
                    render_pass.set_pipeline(&pass.pipeline);
                    render_pass.set_bind_group(0, &bind_group, &[]);
                    render_pass.draw(0..3, 0..1); // full-screen triangle
                }
                gpu.queue().submit(Some(encoder.finish()));
                Ok(())
            }
            ShaderKernel::Software => {
                let software = renderer.software_mut().ok_or_else(|| {
                    anyhow!("shader pass '{}' was built for the software renderer", self.label)
                })?;
                software.composite();
                Ok(())
            }
        }
    }
}

fn build_gpu_pass(device: &wgpu::Device, label: &str, wgsl_source: &str) -> GpuShaderPass {
    let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(wgsl_source.into()),
    });

    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(&format!("{label}-bgl")),
        entries: &[
            // @binding(0) offscreen target
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            // @binding(1) sampler
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(&format!("{label}-layout")),
        bind_group_layouts: &[&bind_group_layout],
        push_constant_ranges: &[],
    });

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&format!("{label}-pipeline")),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader_module,
            entry_point: "vs_main",
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            buffers: &[],
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader_module,
            entry_point: "fs_main",
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: TARGET_FORMAT,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    });

    GpuShaderPass {
        pipeline,
        bind_group_layout,
        sampler: create_linear_sampler(device, &format!("{label}-sampler")),
    }
}

/// Render pass followed by the composite shader pass.
pub struct EffectComposer {
    render_pass: RenderPass,
    shader_pass: ShaderPass,
    width: u32,
    height: u32,
}

impl EffectComposer {
    pub fn new(renderer: &Renderer) -> Result<Self> {
        let (width, height) = renderer.size();
        Ok(Self {
            render_pass: RenderPass::default(),
            shader_pass: ShaderPass::passthrough(renderer)?,
            width,
            height,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    pub fn shader_pass(&self) -> &ShaderPass {
        &self.shader_pass
    }

    pub fn render(
        &self,
        renderer: &mut Renderer,
        pair: &ScenePair,
        texture: &mut TextureSurface,
    ) -> Result<()> {
        ensure!(
            renderer.size() == self.size(),
            "composer size {}x{} does not match render targets {:?}",
            self.width,
            self.height,
            renderer.size()
        );
        self.render_pass.execute(renderer, pair, texture)?;
        self.shader_pass.execute(renderer)
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::pattern::draw_pattern;
    use crate::scene::BackgroundQuad;
    use crate::settings::{PatternStyle, Theme};

    fn scene_with_raster(aspect: f64) -> (ScenePair, TextureSurface) {
        let mut pair = ScenePair::new(aspect);
        pair.scene.set_background(BackgroundQuad::for_aspect(aspect));
        let mut texture = TextureSurface::new();
        let mut rng = StdRng::seed_from_u64(11);
        texture.replace(draw_pattern(
            aspect,
            &PatternStyle::Minimal.into(),
            Theme::Light,
            &mut rng,
        ));
        (pair, texture)
    }

    #[test]
    fn passthrough_wgsl_declares_entry_points() {
        assert!(PASSTHROUGH_WGSL.contains("fn vs_main"));
        assert!(PASSTHROUGH_WGSL.contains("fn fs_main"));
        assert!(PASSTHROUGH_WGSL.contains("source_tex"));
    }

    #[test]
    fn composite_matches_direct_render() {
        let (pair, mut texture) = scene_with_raster(1.5);

        let mut composed = Renderer::software(48, 32).expect("software renderer");
        let composer = EffectComposer::new(&composed).expect("composer");
        composer
            .render(&mut composed, &pair, &mut texture)
            .expect("composite render");
        let via_composer = composed.read_frame().expect("frame");

        let (pair, mut texture) = scene_with_raster(1.5);
        let mut direct = Renderer::software(48, 32).expect("software renderer");
        direct.clear(RenderTarget::Screen);
        direct
            .render(&pair.scene, &pair.camera, &mut texture, RenderTarget::Screen)
            .expect("direct render");

        assert_eq!(via_composer, direct.read_frame().expect("frame"));
    }

    #[test]
    fn render_rejects_stale_size() {
        let (pair, mut texture) = scene_with_raster(1.0);
        let mut renderer = Renderer::software(16, 16).expect("software renderer");
        let mut composer = EffectComposer::new(&renderer).expect("composer");
        renderer.resize(32, 16).expect("resize");
        assert!(composer.render(&mut renderer, &pair, &mut texture).is_err());

        composer.set_size(32, 16);
        composer
            .render(&mut renderer, &pair, &mut texture)
            .expect("render after set_size");
    }
}
