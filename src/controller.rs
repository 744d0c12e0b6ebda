use std::fmt;

use anyhow::{anyhow, Context, Result};
use serde_json::json;

use crate::error_codes::CodedError;
use crate::host::{HostPage, PresentationSurface};
use crate::pattern;
use crate::post_process::EffectComposer;
use crate::renderer::{Frame, RenderTarget, Renderer};
use crate::scene::{BackgroundQuad, ScenePair, ViewportState};
use crate::settings::{EffectOptions, EffectSettings};
use crate::texture::TextureSurface;

/// Id of the presentation surface the effect paints into.
pub const SURFACE_ID: &str = "glassCanvas";

/// Builds the render device for a drawing-buffer size.
pub type RendererFactory = Box<dyn FnMut(u32, u32) -> Result<Renderer>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectState {
    Uninitialized,
    Initializing,
    Ready,
}

/// Owns the backdrop: pattern, texture, scenes, render device and composer.
pub struct EffectController {
    state: EffectState,
    options: EffectOptions,
    factory: RendererFactory,
    renderer: Option<Renderer>,
    composer: Option<EffectComposer>,
    background: ScenePair,
    /// Kept in step with the background camera; nothing draws into it yet.
    foreground: ScenePair,
    texture: TextureSurface,
    viewport: ViewportState,
    settings: EffectSettings,
}

impl EffectController {
    pub fn new(options: EffectOptions) -> Self {
        let backend = options.backend;
        Self::with_renderer_factory(
            options,
            Box::new(move |width, height| Renderer::new(backend, width, height)),
        )
    }

    pub fn with_renderer_factory(options: EffectOptions, factory: RendererFactory) -> Self {
        Self {
            state: EffectState::Uninitialized,
            options,
            factory,
            renderer: None,
            composer: None,
            background: ScenePair::new(1.0),
            foreground: ScenePair::new(1.0),
            texture: TextureSurface::new(),
            viewport: ViewportState::default(),
            settings: EffectSettings::default(),
        }
    }

    pub fn state(&self) -> EffectState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == EffectState::Ready
    }

    pub fn options(&self) -> &EffectOptions {
        &self.options
    }

    pub fn settings(&self) -> &EffectSettings {
        &self.settings
    }

    pub fn viewport(&self) -> ViewportState {
        self.viewport
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.viewport.aspect_ratio()
    }

    pub fn background(&self) -> &ScenePair {
        &self.background
    }

    pub fn foreground(&self) -> &ScenePair {
        &self.foreground
    }

    pub fn texture(&self) -> &TextureSurface {
        &self.texture
    }

    pub fn renderer(&self) -> Option<&Renderer> {
        self.renderer.as_ref()
    }

    pub fn has_composer(&self) -> bool {
        self.composer.is_some()
    }

    /// Finds the presentation surface, builds the pipeline and presents the
    /// first frame.
    ///
    /// A missing surface or a failed renderer leaves the controller
    /// `Uninitialized`; in the second case the surface is still made visible.
    pub fn init(&mut self, page: &mut HostPage) -> Result<()> {
        if self.state != EffectState::Uninitialized {
            return Err(anyhow!(CodedError::init(
                "ALREADY_INITIALIZED",
                "glass effect is already initialized",
            )));
        }

        let viewport = page.viewport();
        let settings = EffectSettings::from_root(page.root());
        let Some(surface) = page.surface_mut(SURFACE_ID) else {
            log::error!("glass surface '{SURFACE_ID}' not found");
            return Err(anyhow!(CodedError::init(
                "SURFACE_NOT_FOUND",
                format!("no surface with id '{SURFACE_ID}'"),
            )));
        };

        self.state = EffectState::Initializing;
        let (width, height) = viewport.drawing_buffer_size(self.options.max_pixel_ratio);
        let renderer = match (self.factory)(width, height) {
            Ok(renderer) => renderer,
            Err(error) => {
                log::error!("failed to create renderer: {error:#}");
                surface.set_visible(true);
                self.state = EffectState::Uninitialized;
                return Err(anyhow!(CodedError::init(
                    "SURFACE_CREATION_FAILED",
                    format!("failed to create renderer: {error:#}"),
                )
                .with_details(json!({ "width": width, "height": height }))));
            }
        };
        surface.set_size(width, height);

        self.viewport = viewport;
        self.settings = settings;
        let aspect = viewport.aspect_ratio();
        self.background = ScenePair::new(aspect);
        self.foreground = ScenePair::new(aspect);
        self.regenerate();

        self.composer = if self.options.post_processing {
            match EffectComposer::new(&renderer) {
                Ok(composer) => Some(composer),
                Err(error) => {
                    log::warn!("post-processing unavailable, using direct render: {error:#}");
                    None
                }
            }
        } else {
            None
        };
        self.renderer = Some(renderer);
        self.state = EffectState::Ready;

        let rendered = self.render();
        surface.set_visible(true);
        rendered.context("first render failed")?;

        log::info!(
            "glass effect initialized ({} renderer, {width}x{height}, {})",
            self.renderer.as_ref().map_or("none", Renderer::backend_name),
            self.settings.theme
        );
        Ok(())
    }

    /// Resizes the render targets, then updates both cameras and the surface,
    /// regenerates and presents. Ignored before `init` succeeds.
    ///
    /// If the targets cannot be resized nothing else changes, so cameras,
    /// raster and surface stay at the previous aspect.
    pub fn on_resize(
        &mut self,
        viewport: ViewportState,
        surface: &mut PresentationSurface,
    ) -> Result<()> {
        if !self.is_ready() {
            return Ok(());
        }

        let (width, height) = viewport.drawing_buffer_size(self.options.max_pixel_ratio);
        if let Some(renderer) = self.renderer.as_mut() {
            renderer
                .resize(width, height)
                .with_context(|| format!("failed to resize render targets to {width}x{height}"))?;
        }
        if let Some(composer) = self.composer.as_mut() {
            composer.set_size(width, height);
        }
        surface.set_size(width, height);

        self.viewport = viewport;
        let aspect = viewport.aspect_ratio();
        self.background.camera.set_aspect(aspect);
        self.foreground.camera.set_aspect(aspect);

        self.regenerate();
        self.render()
    }

    /// Regenerates the pattern for new theme/style settings and presents it.
    /// Camera and surface sizes are left alone. Ignored before `init` succeeds.
    pub fn update(&mut self, settings: EffectSettings) -> Result<()> {
        if !self.is_ready() {
            log::debug!("glass effect not initialized, ignoring update");
            return Ok(());
        }
        self.settings = settings;
        self.regenerate();
        self.render()
    }

    /// Composer path when post-processing is on, otherwise a direct clear and
    /// draw to the screen.
    pub fn render(&mut self) -> Result<()> {
        let Some(renderer) = self.renderer.as_mut() else {
            return Ok(());
        };
        match &self.composer {
            Some(composer) => composer.render(renderer, &self.background, &mut self.texture),
            None => {
                renderer.clear(RenderTarget::Screen);
                renderer.render(
                    &self.background.scene,
                    &self.background.camera,
                    &mut self.texture,
                    RenderTarget::Screen,
                )
            }
        }
    }

    /// Reads back the presented frame.
    pub fn snapshot(&mut self) -> Result<Frame> {
        let renderer = self
            .renderer
            .as_mut()
            .ok_or_else(|| anyhow!("glass effect is not initialized"))?;
        renderer.read_frame()
    }

    fn regenerate(&mut self) {
        let aspect = self.viewport.aspect_ratio();
        let raster = pattern::generate(aspect, &self.settings.style, self.settings.theme);
        self.texture.replace(raster);
        self.background
            .scene
            .set_background(BackgroundQuad::for_aspect(aspect));
    }
}

impl fmt::Debug for EffectController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectController")
            .field("state", &self.state)
            .field("viewport", &self.viewport)
            .field("settings", &self.settings)
            .field("composer", &self.composer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_codes::find_coded_error;
    use crate::settings::{BackendKind, PreferenceStore};

    fn software_options() -> EffectOptions {
        EffectOptions {
            backend: BackendKind::Software,
            ..EffectOptions::default()
        }
    }

    #[test]
    fn missing_surface_keeps_controller_uninitialized() {
        let mut page = HostPage::new(PreferenceStore::in_memory(), ViewportState::new(40, 30));
        let mut controller = EffectController::new(software_options());

        let error = controller.init(&mut page).unwrap_err();
        assert_eq!(
            find_coded_error(&error).map(|coded| coded.code),
            Some("SURFACE_NOT_FOUND")
        );
        assert_eq!(controller.state(), EffectState::Uninitialized);
    }

    #[test]
    fn second_init_is_rejected() {
        let mut page = HostPage::boot(PreferenceStore::in_memory(), ViewportState::new(40, 30));
        let mut controller = EffectController::new(software_options());
        controller.init(&mut page).expect("first init");

        let error = controller.init(&mut page).unwrap_err();
        assert_eq!(
            find_coded_error(&error).map(|coded| coded.code),
            Some("ALREADY_INITIALIZED")
        );
        assert!(controller.is_ready());
    }

    #[test]
    fn update_before_init_is_ignored() {
        let mut controller = EffectController::new(software_options());
        controller
            .update(EffectSettings::default())
            .expect("no-op update");
        assert!(controller.texture().is_empty());
        assert!(controller.snapshot().is_err());
    }
}
