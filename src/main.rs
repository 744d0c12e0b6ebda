use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use serde_json::json;

use glassfx::error_codes::{exit_status, CodedError, ErrorEnvelope};
use glassfx::pattern::{self, draw_pattern, generate_with_rng};
use glassfx::settings::{STYLE_ATTRIBUTE, THEME_ATTRIBUTE};
use glassfx::{
    BackendKind, EffectController, EffectOptions, HostPage, PatternStyle, PreferenceStore,
    StyleSelection, Theme, ViewportState, GLASS_EFFECT,
};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GLASSFX_GIT_HASH"),
    ")"
);

#[derive(Debug, Parser)]
#[command(name = "glassfx")]
#[command(about = "Procedural glass backdrop generator and compositor")]
#[command(version, long_version = LONG_VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Boot a page, mount the glass effect and write the presented frame.
    Render(RenderArgs),
    /// Write the raw pattern raster without the render pipeline.
    Pattern(PatternArgs),
    /// Replay resize/theme/style events and write one frame per step.
    Session(SessionArgs),
    /// Show or change stored preferences.
    Prefs(PrefsArgs),
    /// List pattern style identifiers.
    Styles {
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    fn json(&self) -> bool {
        match self {
            Self::Render(args) => args.json,
            Self::Pattern(args) => args.json,
            Self::Session(args) => args.json,
            Self::Prefs(args) => args.json,
            Self::Styles { json } => *json,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackendArg {
    Auto,
    Gpu,
    Software,
}

impl From<BackendArg> for BackendKind {
    fn from(value: BackendArg) -> Self {
        match value {
            BackendArg::Auto => Self::Auto,
            BackendArg::Gpu => Self::Gpu,
            BackendArg::Software => Self::Software,
        }
    }
}

#[derive(Debug, clap::Args)]
struct RenderArgs {
    #[arg(long, default_value_t = 1280)]
    width: u32,
    #[arg(long, default_value_t = 720)]
    height: u32,
    #[arg(long = "pixel-ratio", default_value_t = 1.0)]
    pixel_ratio: f64,
    /// Overrides the stored theme for this render only.
    #[arg(long)]
    theme: Option<String>,
    /// Overrides the stored style for this render only.
    #[arg(long)]
    style: Option<String>,
    /// Preferences file the page boots from.
    #[arg(long)]
    settings: Option<PathBuf>,
    /// YAML effect options; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum)]
    backend: Option<BackendArg>,
    #[arg(long = "no-post")]
    no_post: bool,
    #[arg(short = 'o', long = "output")]
    output: PathBuf,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, clap::Args)]
struct PatternArgs {
    #[arg(long, default_value_t = 16.0 / 9.0)]
    aspect: f64,
    /// Unknown identifiers draw the base wash only.
    #[arg(long, default_value = "glitch")]
    style: String,
    #[arg(long, default_value = "dark")]
    theme: String,
    #[arg(long = "no-noise")]
    no_noise: bool,
    /// Seed for the noise and randomized styles.
    #[arg(long)]
    seed: Option<u64>,
    /// Print the SHA-256 of the raster.
    #[arg(long)]
    digest: bool,
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, clap::Args)]
struct SessionArgs {
    #[arg(long)]
    script: PathBuf,
    #[arg(long)]
    settings: Option<PathBuf>,
    #[arg(short = 'o', long = "output")]
    output: PathBuf,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, clap::Args)]
struct PrefsArgs {
    #[arg(long)]
    settings: PathBuf,
    #[arg(long)]
    theme: Option<String>,
    #[arg(long)]
    style: Option<String>,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SessionScript {
    #[serde(default)]
    viewport: ScriptViewport,
    #[serde(default)]
    options: EffectOptions,
    #[serde(default)]
    events: Vec<SessionEvent>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScriptViewport {
    width: u32,
    height: u32,
    #[serde(default = "default_pixel_ratio")]
    device_pixel_ratio: f64,
}

impl Default for ScriptViewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            device_pixel_ratio: 1.0,
        }
    }
}

impl ScriptViewport {
    fn validated(self) -> Result<ViewportState> {
        ViewportState::validated(self.width, self.height, self.device_pixel_ratio)
    }
}

fn default_pixel_ratio() -> f64 {
    1.0
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum SessionEvent {
    Resize {
        width: u32,
        height: u32,
        #[serde(default = "default_pixel_ratio")]
        device_pixel_ratio: f64,
    },
    ToggleTheme,
    SelectStyle {
        style: String,
    },
}

impl SessionEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::Resize { .. } => "resize",
            Self::ToggleTheme => "toggle-theme",
            Self::SelectStyle { .. } => "select-style",
        }
    }
}

#[derive(Debug, Serialize)]
struct SessionFrame {
    step: usize,
    event: &'static str,
    path: PathBuf,
    width: u32,
    height: u32,
    theme: Theme,
    style: String,
    digest: String,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let json = cli.command.json();

    let result = match cli.command {
        Commands::Render(args) => run_render(&args),
        Commands::Pattern(args) => run_pattern(&args),
        Commands::Session(args) => run_session(&args),
        Commands::Prefs(args) => run_prefs(&args),
        Commands::Styles { json } => run_styles(json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => report_error(&error, json),
    }
}

fn report_error(error: &anyhow::Error, json: bool) -> ExitCode {
    if json {
        match serde_json::to_string_pretty(&ErrorEnvelope::for_error(error)) {
            Ok(body) => println!("{body}"),
            Err(_) => eprintln!("error: {error:#}"),
        }
    } else {
        eprintln!("error: {error:#}");
    }
    ExitCode::from(exit_status(error))
}

fn open_store(path: Option<&Path>) -> Result<PreferenceStore> {
    match path {
        Some(path) => PreferenceStore::open(path),
        None => Ok(PreferenceStore::in_memory()),
    }
}

fn load_options(path: Option<&Path>) -> Result<EffectOptions> {
    let Some(path) = path else {
        return Ok(EffectOptions::default());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed reading options {}", path.display()))?;
    serde_yaml::from_str(&raw).with_context(|| format!("failed parsing options {}", path.display()))
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed creating {}", parent.display()))?;
        }
    }
    Ok(())
}

fn mounted_glass(page: &mut HostPage) -> Result<&mut EffectController> {
    page.glass_mut()
        .ok_or_else(|| anyhow!("glass effect is not mounted"))
}

fn run_render(args: &RenderArgs) -> Result<()> {
    let viewport = ViewportState::validated(args.width, args.height, args.pixel_ratio)?;
    let mut options = load_options(args.config.as_deref())?;
    if let Some(backend) = args.backend {
        options.backend = backend.into();
    }
    if args.no_post {
        options.post_processing = false;
    }

    let store = open_store(args.settings.as_deref())?;
    let mut page = HostPage::boot(store, viewport);
    if let Some(theme) = &args.theme {
        let theme = Theme::from_keyword(theme)?;
        page.root_mut().set(THEME_ATTRIBUTE, theme.keyword());
    }
    if let Some(style) = &args.style {
        let style = PatternStyle::from_keyword(style)?;
        page.root_mut().set(STYLE_ATTRIBUTE, style.identifier());
    }

    page.mount(GLASS_EFFECT, EffectController::new(options))
        .context("failed to start glass effect")?;
    let settings = page.effect_settings();
    let controller = mounted_glass(&mut page)?;
    let backend = controller
        .renderer()
        .map_or("none", |renderer| renderer.backend_name());
    let frame = controller.snapshot()?;

    ensure_parent(&args.output)?;
    frame.save_png(&args.output)?;

    if args.json {
        let body = json!({
            "ok": true,
            "output": args.output,
            "width": frame.width,
            "height": frame.height,
            "backend": backend,
            "theme": settings.theme,
            "style": style_label(&settings.style),
            "digest": frame.digest(),
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        println!(
            "Wrote {} ({}x{}, {} renderer, {} {})",
            args.output.display(),
            frame.width,
            frame.height,
            backend,
            settings.theme,
            style_label(&settings.style)
        );
    }
    Ok(())
}

fn run_pattern(args: &PatternArgs) -> Result<()> {
    if !args.aspect.is_finite() || args.aspect <= 0.0 {
        return Err(anyhow!(CodedError::usage(
            "INVALID_ASPECT",
            format!("aspect ratio must be positive, got {}", args.aspect),
        )));
    }
    let theme = Theme::from_keyword(&args.theme)?;
    let style = StyleSelection::from_attribute(Some(args.style.trim()));

    let raster = match (args.seed, args.no_noise) {
        (Some(seed), true) => {
            draw_pattern(args.aspect, &style, theme, &mut StdRng::seed_from_u64(seed))
        }
        (Some(seed), false) => {
            generate_with_rng(args.aspect, &style, theme, &mut StdRng::seed_from_u64(seed))
        }
        (None, true) => draw_pattern(args.aspect, &style, theme, &mut rand::thread_rng()),
        (None, false) => pattern::generate(args.aspect, &style, theme),
    };

    if let Some(output) = &args.output {
        ensure_parent(output)?;
        raster.save_png(output)?;
    }

    let digest = raster.digest();
    if args.json {
        let body = json!({
            "ok": true,
            "output": args.output,
            "width": raster.width(),
            "height": raster.height(),
            "theme": theme,
            "style": style_label(&style),
            "digest": digest,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }
    if let Some(output) = &args.output {
        println!(
            "Wrote {} ({}x{}, {} {})",
            output.display(),
            raster.width(),
            raster.height(),
            theme,
            style_label(&style)
        );
    }
    if args.digest {
        println!("{digest}");
    }
    Ok(())
}

fn run_session(args: &SessionArgs) -> Result<()> {
    let raw = fs::read_to_string(&args.script)
        .with_context(|| format!("failed reading session script {}", args.script.display()))?;
    let script: SessionScript = serde_yaml::from_str(&raw)
        .with_context(|| format!("failed parsing session script {}", args.script.display()))?;

    let viewport = script.viewport.validated()?;
    let store = open_store(args.settings.as_deref())?;
    let mut page = HostPage::boot(store, viewport);
    page.mount(GLASS_EFFECT, EffectController::new(script.options))
        .context("failed to start glass effect")?;

    fs::create_dir_all(&args.output)
        .with_context(|| format!("failed creating {}", args.output.display()))?;

    let mut frames = Vec::with_capacity(script.events.len() + 1);
    frames.push(capture_step(&mut page, &args.output, 0, "init")?);

    for (index, event) in script.events.iter().enumerate() {
        match event {
            SessionEvent::Resize {
                width,
                height,
                device_pixel_ratio,
            } => page.resize(ViewportState::validated(*width, *height, *device_pixel_ratio)?),
            SessionEvent::ToggleTheme => {
                page.toggle_theme()?;
            }
            SessionEvent::SelectStyle { style } => {
                page.select_style(PatternStyle::from_keyword(style)?)?;
            }
        }
        frames.push(capture_step(&mut page, &args.output, index + 1, event.name())?);
    }

    if args.json {
        let body = json!({ "ok": true, "frames": frames });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        for frame in &frames {
            println!(
                "{:>3} {:<13} {}x{} {} {} -> {}",
                frame.step,
                frame.event,
                frame.width,
                frame.height,
                frame.theme,
                frame.style,
                frame.path.display()
            );
        }
    }
    Ok(())
}

fn capture_step(
    page: &mut HostPage,
    output_dir: &Path,
    step: usize,
    event: &'static str,
) -> Result<SessionFrame> {
    let settings = page.effect_settings();
    let frame = mounted_glass(page)?.snapshot()?;
    let path = output_dir.join(format!("frame-{step:03}-{event}.png"));
    frame.save_png(&path)?;
    Ok(SessionFrame {
        step,
        event,
        path,
        width: frame.width,
        height: frame.height,
        theme: settings.theme,
        style: style_label(&settings.style),
        digest: frame.digest(),
    })
}

fn run_prefs(args: &PrefsArgs) -> Result<()> {
    let mut store = PreferenceStore::open(&args.settings)?;
    if let Some(theme) = &args.theme {
        store.set_theme(Theme::from_keyword(theme)?)?;
    }
    if let Some(style) = &args.style {
        store.set_style(PatternStyle::from_keyword(style)?)?;
    }

    if args.json {
        let body = json!({
            "ok": true,
            "path": args.settings,
            "theme": store.theme(),
            "backgroundStyle": store.style(),
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        println!("theme: {}", store.theme());
        println!("backgroundStyle: {}", store.style());
    }
    Ok(())
}

fn run_styles(json: bool) -> Result<()> {
    if json {
        let body = json!({
            "ok": true,
            "default": PatternStyle::default(),
            "styles": PatternStyle::ALL,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        for style in PatternStyle::ALL {
            let marker = if style == PatternStyle::default() { " (default)" } else { "" };
            println!("{style}{marker}");
        }
    }
    Ok(())
}

fn style_label(style: &StyleSelection) -> String {
    match style {
        StyleSelection::Known(style) => style.identifier().to_owned(),
        StyleSelection::Unrecognized(raw) => raw.clone(),
    }
}
