use std::fs;

use tempfile::tempdir;

use glassfx::error_codes::find_coded_error;
use glassfx::settings::{STYLE_ATTRIBUTE, THEME_ATTRIBUTE};
use glassfx::{
    BackendKind, EffectController, EffectOptions, EffectState, HostPage, PatternStyle,
    PreferenceStore, StyleSelection, Theme, ViewportState, GLASS_EFFECT, SURFACE_ID,
};

fn software() -> EffectController {
    EffectController::new(EffectOptions {
        backend: BackendKind::Software,
        ..EffectOptions::default()
    })
}

#[test]
fn boot_reads_stored_preferences() {
    let dir = tempdir().expect("tempdir should create");
    let path = dir.path().join("prefs.yaml");
    fs::write(&path, "theme: light\nbackgroundStyle: waves\n").expect("prefs should write");

    let page = HostPage::boot(
        PreferenceStore::open(&path).expect("store"),
        ViewportState::new(10, 10),
    );
    assert_eq!(page.root().get(THEME_ATTRIBUTE), Some("light"));
    assert_eq!(page.root().get(STYLE_ATTRIBUTE), Some("waves"));
}

#[test]
fn unknown_stored_values_fall_back_to_defaults() {
    let dir = tempdir().expect("tempdir should create");
    let path = dir.path().join("prefs.yaml");
    fs::write(&path, "theme: sepia\nbackgroundStyle: nonexistent\n").expect("prefs should write");

    let store = PreferenceStore::open(&path).expect("store");
    assert_eq!(store.theme(), Theme::Dark);
    assert_eq!(store.style(), PatternStyle::Glitch);
    // raw values survive until overwritten
    assert_eq!(store.raw().background_style.as_deref(), Some("nonexistent"));
}

#[test]
fn missing_and_empty_files_are_empty_stores() {
    let dir = tempdir().expect("tempdir should create");
    let missing = PreferenceStore::open(dir.path().join("absent.yaml")).expect("store");
    assert_eq!(missing.raw(), &Default::default());

    let empty_path = dir.path().join("empty.yaml");
    fs::write(&empty_path, "").expect("prefs should write");
    let empty = PreferenceStore::open(&empty_path).expect("store");
    assert_eq!(empty.theme(), Theme::Dark);
}

#[test]
fn controls_persist_across_sessions() {
    let dir = tempdir().expect("tempdir should create");
    let path = dir.path().join("nested").join("prefs.yaml");

    let mut page = HostPage::boot(
        PreferenceStore::open(&path).expect("store"),
        ViewportState::new(64, 36),
    );
    page.mount(GLASS_EFFECT, software()).expect("mount");
    assert_eq!(page.toggle_theme().expect("toggle"), Theme::Light);
    page.select_style(PatternStyle::Geometric).expect("select");

    let written = fs::read_to_string(&path).expect("prefs should exist");
    assert!(written.contains("theme: light"), "{written}");
    assert!(written.contains("backgroundStyle: geometric"), "{written}");

    let next = HostPage::boot(
        PreferenceStore::open(&path).expect("store"),
        ViewportState::new(64, 36),
    );
    assert_eq!(next.root().get(THEME_ATTRIBUTE), Some("light"));
    assert_eq!(next.root().get(STYLE_ATTRIBUTE), Some("geometric"));
}

#[test]
fn unknown_style_attribute_mounts_with_base_wash() {
    let mut page = HostPage::boot(PreferenceStore::in_memory(), ViewportState::new(32, 32));
    page.root_mut().set(STYLE_ATTRIBUTE, "nonexistent");
    page.mount(GLASS_EFFECT, software()).expect("mount");

    let controller = page.glass().expect("glass");
    assert!(controller.is_ready());
    assert_eq!(
        controller.settings().style,
        StyleSelection::Unrecognized("nonexistent".to_owned())
    );
}

#[test]
fn page_without_surface_keeps_controls_working() {
    let mut page = HostPage::boot(PreferenceStore::in_memory(), ViewportState::new(32, 32));
    page.remove_surface(SURFACE_ID);

    let error = page.mount(GLASS_EFFECT, software()).unwrap_err();
    assert_eq!(
        find_coded_error(&error).map(|coded| coded.code),
        Some("SURFACE_NOT_FOUND")
    );
    assert_eq!(
        page.glass().map(EffectController::state),
        Some(EffectState::Uninitialized)
    );

    assert_eq!(page.toggle_theme().expect("toggle"), Theme::Light);
    page.select_style(PatternStyle::Minimal).expect("select");
    page.resize(ViewportState::new(48, 48));
    assert_eq!(page.root().get(STYLE_ATTRIBUTE), Some("minimal"));
    assert_eq!(page.viewport(), ViewportState::new(48, 48));
}

#[test]
fn registry_skips_effects_that_never_started() {
    let mut page = HostPage::boot(PreferenceStore::in_memory(), ViewportState::new(32, 32));
    page.remove_surface(SURFACE_ID);
    let _ = page.mount(GLASS_EFFECT, software());

    let settings = page.effect_settings();
    let updated = page
        .effects_mut()
        .update(GLASS_EFFECT, &settings)
        .expect("update");
    assert!(!updated);
    assert_eq!(page.effects().names().collect::<Vec<_>>(), vec![GLASS_EFFECT]);
}
