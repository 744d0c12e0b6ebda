//! Procedural "glass" backdrops.
//!
//! [`pattern::generate`] draws a raster for an aspect ratio, style and theme.
//! [`controller::EffectController`] keeps that raster on a textured quad,
//! renders it through a two-pass composer and regenerates it on resize and on
//! theme/style changes coming from a [`host::HostPage`].

pub mod canvas;
pub mod color;
pub mod controller;
pub mod error_codes;
pub mod host;
pub mod pattern;
pub mod post_process;
pub mod renderer;
pub mod scene;
pub mod settings;
pub mod texture;

pub use controller::{EffectController, EffectState, SURFACE_ID};
pub use host::{HostPage, PresentationSurface, UpdateRegistry, GLASS_EFFECT};
pub use pattern::{generate, Raster};
pub use renderer::{Frame, RenderTarget, Renderer};
pub use scene::ViewportState;
pub use settings::{
    BackendKind, EffectOptions, EffectSettings, PatternStyle, PreferenceStore, StyleSelection,
    Theme,
};
