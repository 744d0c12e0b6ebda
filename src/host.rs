//! Headless model of the page that embeds the effect: presentation surfaces
//! by id, root attributes, the preference store, and the named update
//! registry the theme toggle and style picker call into.

use std::collections::BTreeMap;

use anyhow::Result;

use crate::controller::EffectController;
use crate::scene::ViewportState;
use crate::settings::{
    EffectSettings, PatternStyle, PreferenceStore, RootAttributes, Theme, STYLE_ATTRIBUTE,
    THEME_ATTRIBUTE,
};

/// Registry name of the backdrop effect.
pub const GLASS_EFFECT: &str = "glass";

/// A drawable element on the page. Hidden until an effect reveals it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentationSurface {
    id: String,
    width: u32,
    height: u32,
    visible: bool,
}

impl PresentationSurface {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            width: 0,
            height: 0,
            visible: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Drawing-buffer size in physical pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }
}

/// Effects reachable by name from the page's controls.
#[derive(Debug, Default)]
pub struct UpdateRegistry {
    effects: BTreeMap<String, EffectController>,
}

impl UpdateRegistry {
    /// Returns the controller previously registered under `name`.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        controller: EffectController,
    ) -> Option<EffectController> {
        self.effects.insert(name.into(), controller)
    }

    pub fn get(&self, name: &str) -> Option<&EffectController> {
        self.effects.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut EffectController> {
        self.effects.get_mut(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.effects.keys().map(String::as_str)
    }

    /// Forwards `settings` to the named effect. Returns `false` without doing
    /// anything when it is absent or not initialized.
    pub fn update(&mut self, name: &str, settings: &EffectSettings) -> Result<bool> {
        match self.effects.get_mut(name) {
            Some(controller) if controller.is_ready() => {
                controller.update(settings.clone())?;
                Ok(true)
            }
            _ => {
                log::debug!("no ready effect '{name}', skipping update");
                Ok(false)
            }
        }
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut EffectController)> {
        self.effects.iter_mut()
    }
}

pub struct HostPage {
    root: RootAttributes,
    store: PreferenceStore,
    viewport: ViewportState,
    surfaces: BTreeMap<String, PresentationSurface>,
    effects: UpdateRegistry,
}

impl HostPage {
    /// A page with no surfaces and empty root attributes.
    pub fn new(store: PreferenceStore, viewport: ViewportState) -> Self {
        Self {
            root: RootAttributes::default(),
            store,
            viewport,
            surfaces: BTreeMap::new(),
            effects: UpdateRegistry::default(),
        }
    }

    /// The standard page: the glass surface plus root attributes synced from
    /// the stored preferences.
    pub fn boot(store: PreferenceStore, viewport: ViewportState) -> Self {
        let mut page = Self::new(store, viewport);
        page.add_surface(crate::controller::SURFACE_ID);
        page.sync_root_attributes();
        page
    }

    /// Writes the stored theme and style onto the root element.
    pub fn sync_root_attributes(&mut self) {
        self.root.set(THEME_ATTRIBUTE, self.store.theme().keyword());
        self.root
            .set(STYLE_ATTRIBUTE, self.store.style().identifier());
    }

    pub fn add_surface(&mut self, id: &str) {
        self.surfaces
            .entry(id.to_owned())
            .or_insert_with(|| PresentationSurface::new(id));
    }

    pub fn remove_surface(&mut self, id: &str) -> Option<PresentationSurface> {
        self.surfaces.remove(id)
    }

    pub fn surface(&self, id: &str) -> Option<&PresentationSurface> {
        self.surfaces.get(id)
    }

    pub fn surface_mut(&mut self, id: &str) -> Option<&mut PresentationSurface> {
        self.surfaces.get_mut(id)
    }

    pub fn root(&self) -> &RootAttributes {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut RootAttributes {
        &mut self.root
    }

    pub fn store(&self) -> &PreferenceStore {
        &self.store
    }

    pub fn viewport(&self) -> ViewportState {
        self.viewport
    }

    pub fn effects(&self) -> &UpdateRegistry {
        &self.effects
    }

    pub fn effects_mut(&mut self) -> &mut UpdateRegistry {
        &mut self.effects
    }

    pub fn glass(&self) -> Option<&EffectController> {
        self.effects.get(GLASS_EFFECT)
    }

    pub fn glass_mut(&mut self) -> Option<&mut EffectController> {
        self.effects.get_mut(GLASS_EFFECT)
    }

    /// Initializes `controller` against this page and registers it under
    /// `name`. The controller is registered even when init fails so later
    /// updates resolve to a no-op.
    pub fn mount(&mut self, name: &str, mut controller: EffectController) -> Result<()> {
        let initialized = controller.init(self);
        self.effects.register(name, controller);
        initialized
    }

    /// The settings the effect should render with, read from the root element.
    pub fn effect_settings(&self) -> EffectSettings {
        EffectSettings::from_root(&self.root)
    }

    /// Flips the theme, persists it, updates the root attribute and asks the
    /// glass effect to regenerate. Returns the new theme.
    pub fn toggle_theme(&mut self) -> Result<Theme> {
        let theme = Theme::from_attribute(self.root.get(THEME_ATTRIBUTE)).toggled();
        self.store.set_theme(theme)?;
        self.root.set(THEME_ATTRIBUTE, theme.keyword());
        self.notify_glass();
        Ok(theme)
    }

    /// Persists `style`, updates the root attribute and asks the glass effect
    /// to regenerate.
    pub fn select_style(&mut self, style: PatternStyle) -> Result<()> {
        self.store.set_style(style)?;
        self.root.set(STYLE_ATTRIBUTE, style.identifier());
        self.notify_glass();
        Ok(())
    }

    /// Records the new viewport and forwards it to every mounted effect.
    /// Effect failures are logged and do not propagate.
    pub fn resize(&mut self, viewport: ViewportState) {
        self.viewport = viewport;
        for (name, controller) in self.effects.iter_mut() {
            let Some(surface) = self.surfaces.get_mut(crate::controller::SURFACE_ID) else {
                log::warn!("effect '{name}' has no surface, skipping resize");
                continue;
            };
            if let Err(error) = controller.on_resize(viewport, surface) {
                log::error!("effect '{name}' failed to resize: {error:#}");
            }
        }
    }

    fn notify_glass(&mut self) {
        let settings = self.effect_settings();
        if let Err(error) = self.effects.update(GLASS_EFFECT, &settings) {
            log::error!("glass effect update failed: {error:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boot_syncs_defaults_to_root() {
        let page = HostPage::boot(PreferenceStore::in_memory(), ViewportState::new(10, 10));
        assert_eq!(page.root().get(THEME_ATTRIBUTE), Some("dark"));
        assert_eq!(page.root().get(STYLE_ATTRIBUTE), Some("glitch"));
        let surface = page.surface("glassCanvas").expect("surface");
        assert!(!surface.is_visible());
    }

    #[test]
    fn update_on_absent_effect_is_noop() {
        let mut registry = UpdateRegistry::default();
        let updated = registry
            .update(GLASS_EFFECT, &EffectSettings::default())
            .expect("no-op");
        assert!(!updated);
        assert_eq!(registry.names().count(), 0);
    }

    #[test]
    fn toggle_without_effect_still_persists() {
        let mut page = HostPage::boot(PreferenceStore::in_memory(), ViewportState::new(10, 10));
        assert_eq!(page.toggle_theme().expect("toggle"), Theme::Light);
        assert_eq!(page.root().get(THEME_ATTRIBUTE), Some("light"));
        assert_eq!(page.store().theme(), Theme::Light);
        assert_eq!(page.toggle_theme().expect("toggle"), Theme::Dark);
    }
}
