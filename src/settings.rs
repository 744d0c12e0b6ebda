use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error_codes::CodedError;

pub const THEME_ATTRIBUTE: &str = "theme";
pub const STYLE_ATTRIBUTE: &str = "data-style";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn from_keyword(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dark" => Ok(Self::Dark),
            "light" => Ok(Self::Light),
            _ => Err(anyhow!(CodedError::usage(
                "INVALID_THEME",
                format!("invalid theme '{value}'"),
            )
            .with_details(json!({
                "provided": value,
                "allowed": ["dark", "light"]
            })))),
        }
    }

    /// Only the exact attribute value `dark` selects the dark theme.
    pub fn from_attribute(value: Option<&str>) -> Self {
        match value {
            Some("dark") => Self::Dark,
            _ => Self::Light,
        }
    }

    /// Stored preference; absent or unknown values read as dark.
    pub fn from_preference(value: Option<&str>) -> Self {
        match value {
            Some("light") => Self::Light,
            _ => Self::Dark,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }

    pub fn is_dark(self) -> bool {
        self == Self::Dark
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternStyle {
    Cherokee,
    #[default]
    Glitch,
    Waves,
    Particles,
    Minimal,
    Geometric,
    Lines,
}

impl PatternStyle {
    pub const ALL: [PatternStyle; 7] = [
        Self::Cherokee,
        Self::Glitch,
        Self::Waves,
        Self::Particles,
        Self::Minimal,
        Self::Geometric,
        Self::Lines,
    ];

    /// Exact, case-sensitive identifier match.
    pub fn from_identifier(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|style| style.identifier() == value)
    }

    pub fn from_keyword(value: &str) -> Result<Self> {
        Self::from_identifier(value.trim()).ok_or_else(|| {
            anyhow!(CodedError::usage(
                "INVALID_STYLE",
                format!("invalid pattern style '{value}'"),
            )
            .with_details(json!({
                "provided": value,
                "allowed": Self::ALL.map(Self::identifier),
            })))
        })
    }

    /// Stored preference; absent or unknown values read as glitch.
    pub fn from_preference(value: Option<&str>) -> Self {
        value.and_then(Self::from_identifier).unwrap_or_default()
    }

    pub fn identifier(self) -> &'static str {
        match self {
            Self::Cherokee => "cherokee",
            Self::Glitch => "glitch",
            Self::Waves => "waves",
            Self::Particles => "particles",
            Self::Minimal => "minimal",
            Self::Geometric => "geometric",
            Self::Lines => "lines",
        }
    }

    /// Styles whose output depends only on their inputs (before noise).
    pub fn is_deterministic(self) -> bool {
        !matches!(self, Self::Waves | Self::Particles)
    }
}

impl fmt::Display for PatternStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

/// The style as read from the host's `data-style` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleSelection {
    Known(PatternStyle),
    /// Draws the base wash with no overlay.
    Unrecognized(String),
}

impl StyleSelection {
    /// Absent or empty means glitch.
    pub fn from_attribute(value: Option<&str>) -> Self {
        match value {
            None | Some("") => Self::Known(PatternStyle::Glitch),
            Some(raw) => match PatternStyle::from_identifier(raw) {
                Some(style) => Self::Known(style),
                None => Self::Unrecognized(raw.to_owned()),
            },
        }
    }

    pub fn style(&self) -> Option<PatternStyle> {
        match self {
            Self::Known(style) => Some(*style),
            Self::Unrecognized(_) => None,
        }
    }
}

impl Default for StyleSelection {
    fn default() -> Self {
        Self::Known(PatternStyle::Glitch)
    }
}

impl From<PatternStyle> for StyleSelection {
    fn from(style: PatternStyle) -> Self {
        Self::Known(style)
    }
}

/// Explicit inputs to a pattern regeneration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectSettings {
    pub theme: Theme,
    pub style: StyleSelection,
}

impl EffectSettings {
    pub fn new(theme: Theme, style: impl Into<StyleSelection>) -> Self {
        Self {
            theme,
            style: style.into(),
        }
    }

    pub fn from_root(root: &RootAttributes) -> Self {
        Self {
            theme: Theme::from_attribute(root.get(THEME_ATTRIBUTE)),
            style: StyleSelection::from_attribute(root.get(STYLE_ATTRIBUTE)),
        }
    }
}

/// Attributes on the host document's root element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootAttributes {
    values: BTreeMap<String, String>,
}

impl RootAttributes {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.values.insert(name.to_owned(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.values.remove(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// GPU when an adapter is available, otherwise software.
    #[default]
    Auto,
    Gpu,
    Software,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EffectOptions {
    pub backend: BackendKind,
    /// When false no composer is built and rendering uses the direct pass.
    pub post_processing: bool,
    pub max_pixel_ratio: f64,
}

impl Default for EffectOptions {
    fn default() -> Self {
        Self {
            backend: BackendKind::Auto,
            post_processing: true,
            max_pixel_ratio: 2.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(
        default,
        rename = "backgroundStyle",
        skip_serializing_if = "Option::is_none"
    )]
    pub background_style: Option<String>,
}

/// Persisted theme/style preferences, backed by a YAML file.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: Option<PathBuf>,
    values: StoredPreferences,
}

impl PreferenceStore {
    /// A store that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            values: StoredPreferences::default(),
        }
    }

    /// Loads `path`; a missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("failed reading preferences {}", path.display()))?;
            if raw.trim().is_empty() {
                StoredPreferences::default()
            } else {
                serde_yaml::from_str(&raw)
                    .with_context(|| format!("failed parsing preferences {}", path.display()))?
            }
        } else {
            StoredPreferences::default()
        };

        Ok(Self {
            path: Some(path),
            values,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn raw(&self) -> &StoredPreferences {
        &self.values
    }

    pub fn theme(&self) -> Theme {
        Theme::from_preference(self.values.theme.as_deref())
    }

    pub fn style(&self) -> PatternStyle {
        PatternStyle::from_preference(self.values.background_style.as_deref())
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<()> {
        self.values.theme = Some(theme.keyword().to_owned());
        self.save()
    }

    pub fn set_style(&mut self, style: PatternStyle) -> Result<()> {
        self.values.background_style = Some(style.identifier().to_owned());
        self.save()
    }

    fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed creating {}", parent.display()))?;
            }
        }
        let yaml = serde_yaml::to_string(&self.values).context("failed encoding preferences")?;
        fs::write(path, yaml)
            .with_context(|| format!("failed writing preferences {}", path.display()))
    }
}
