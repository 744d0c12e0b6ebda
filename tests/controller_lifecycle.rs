use anyhow::anyhow;

use glassfx::error_codes::find_coded_error;
use glassfx::settings::STYLE_ATTRIBUTE;
use glassfx::{
    BackendKind, EffectController, EffectOptions, EffectState, Frame, HostPage, PatternStyle,
    PreferenceStore, StyleSelection, Theme, ViewportState, GLASS_EFFECT, SURFACE_ID,
};

fn software() -> EffectOptions {
    EffectOptions {
        backend: BackendKind::Software,
        ..EffectOptions::default()
    }
}

fn mounted_page(viewport: ViewportState, options: EffectOptions) -> HostPage {
    let mut page = HostPage::boot(PreferenceStore::in_memory(), viewport);
    page.mount(GLASS_EFFECT, EffectController::new(options))
        .expect("glass effect should mount");
    page
}

fn within(value: u8, expected: u8, tolerance: u8) -> bool {
    value.abs_diff(expected) <= tolerance
}

fn mean_red(frame: &Frame) -> f64 {
    let pixels = frame.pixels.chunks_exact(4);
    let count = pixels.len() as f64;
    pixels.map(|pixel| f64::from(pixel[0])).sum::<f64>() / count
}

#[test]
fn init_presents_the_backdrop() {
    let mut page = HostPage::boot(PreferenceStore::in_memory(), ViewportState::new(160, 90));
    page.root_mut()
        .set(STYLE_ATTRIBUTE, PatternStyle::Cherokee.identifier());
    page.mount(GLASS_EFFECT, EffectController::new(software()))
        .expect("glass effect should mount");

    let surface = page.surface(SURFACE_ID).expect("surface");
    assert!(surface.is_visible());
    assert_eq!(surface.size(), (160, 90));

    let controller = page.glass_mut().expect("registered");
    assert_eq!(controller.state(), EffectState::Ready);
    assert!(controller.has_composer());
    let raster = controller.texture().raster().expect("raster");
    assert_eq!((raster.width(), raster.height()), (2048, 1152));

    let frame = controller.snapshot().expect("frame");
    assert_eq!((frame.width, frame.height), (160, 90));
    let corner = frame.pixel(0, 0).expect("corner pixel");
    // dark primary background plus at most half the dark noise amplitude
    assert!(corner[..3].iter().all(|c| within(*c, 0x14, 8)), "{corner:?}");
    assert_eq!(corner[3], 255);
    assert!(frame.pixels.chunks_exact(4).all(|pixel| pixel[3] == 255));
}

#[test]
fn failing_renderer_leaves_page_usable() {
    let mut page = HostPage::boot(PreferenceStore::in_memory(), ViewportState::new(64, 64));
    let controller = EffectController::with_renderer_factory(
        software(),
        Box::new(|_, _| Err(anyhow!("context lost"))),
    );

    let error = page.mount(GLASS_EFFECT, controller).unwrap_err();
    let coded = find_coded_error(&error).expect("coded error");
    assert_eq!(coded.code, "SURFACE_CREATION_FAILED");
    assert!(coded.message.contains("context lost"));

    assert!(page.surface(SURFACE_ID).expect("surface").is_visible());
    let controller = page.glass().expect("registered despite failure");
    assert_eq!(controller.state(), EffectState::Uninitialized);

    // controls keep working and the effect ignores them
    assert_eq!(page.toggle_theme().expect("toggle"), Theme::Light);
    page.select_style(PatternStyle::Lines).expect("select");
    page.resize(ViewportState::new(32, 32));
    let controller = page.glass().expect("registered");
    assert!(controller.texture().is_empty());
    assert_eq!(page.store().style(), PatternStyle::Lines);
}

#[test]
fn resize_to_portrait_rebuilds_everything() {
    let mut page = mounted_page(ViewportState::new(1600, 900), software());
    let version = page.glass().expect("glass").texture().version();

    page.resize(ViewportState::new(900, 1600));

    let surface = page.surface(SURFACE_ID).expect("surface");
    assert_eq!(surface.size(), (900, 1600));

    let controller = page.glass_mut().expect("glass");
    assert_eq!(controller.texture().version(), version + 1);
    let camera = controller.background().camera;
    assert_eq!((camera.left(), camera.right()), (-0.5625, 0.5625));
    assert_eq!((camera.top(), camera.bottom()), (1.0, -1.0));
    assert_eq!(controller.foreground().camera, camera);

    let raster = controller.texture().raster().expect("raster");
    assert_eq!((raster.width(), raster.height()), (1152, 2048));
    let quad = controller
        .background()
        .scene
        .background()
        .copied()
        .expect("background quad");
    assert_eq!((quad.width, quad.height), (1.125, 2.0));

    let frame = controller.snapshot().expect("frame");
    assert_eq!((frame.width, frame.height), (900, 1600));
}

#[test]
fn failed_resize_keeps_camera_and_raster_in_step() {
    let mut page = mounted_page(ViewportState::new(160, 90), software());
    let version = page.glass().expect("glass").texture().version();

    // 600M pixels per row overflows the render target row stride
    page.resize(ViewportState::new(600_000_000, 1));

    assert_eq!(page.surface(SURFACE_ID).expect("surface").size(), (160, 90));
    let controller = page.glass_mut().expect("glass");
    assert_eq!(controller.state(), EffectState::Ready);
    assert_eq!(controller.viewport(), ViewportState::new(160, 90));
    assert_eq!(controller.texture().version(), version);
    let renderer = controller.renderer().expect("renderer");
    assert_eq!(renderer.size(), (160, 90));

    let raster = controller.texture().raster().expect("raster");
    let raster_aspect = f64::from(raster.width()) / f64::from(raster.height());
    let camera = controller.background().camera;
    assert!((camera.right() - raster_aspect).abs() < 1e-3, "{camera:?}");
    assert_eq!(controller.foreground().camera, camera);
    let quad = controller
        .background()
        .scene
        .background()
        .copied()
        .expect("background quad");
    assert!((quad.width - 2.0 * camera.right()).abs() < 1e-9);

    let frame = controller.snapshot().expect("frame");
    assert_eq!((frame.width, frame.height), (160, 90));

    // a later valid resize still goes through
    page.resize(ViewportState::new(90, 160));
    assert_eq!(page.surface(SURFACE_ID).expect("surface").size(), (90, 160));
    let controller = page.glass().expect("glass");
    assert_eq!(controller.renderer().expect("renderer").size(), (90, 160));
}

#[test]
fn pixel_ratio_is_capped() {
    let viewport = ViewportState::new(200, 100).with_device_pixel_ratio(3.0);
    let mut page = mounted_page(viewport, software());
    assert_eq!(page.surface(SURFACE_ID).expect("surface").size(), (400, 200));

    let frame = page.glass_mut().expect("glass").snapshot().expect("frame");
    assert_eq!((frame.width, frame.height), (400, 200));
}

#[test]
fn theme_toggle_regenerates_without_touching_the_camera() {
    let mut page = mounted_page(ViewportState::new(120, 80), software());
    let before = {
        let controller = page.glass_mut().expect("glass");
        (
            controller.texture().version(),
            controller.background().camera,
            controller.snapshot().expect("frame"),
        )
    };

    assert_eq!(page.toggle_theme().expect("toggle"), Theme::Light);

    let controller = page.glass_mut().expect("glass");
    assert_eq!(controller.settings().theme, Theme::Light);
    assert_eq!(controller.texture().version(), before.0 + 1);
    assert_eq!(controller.background().camera, before.1);
    let after = controller.snapshot().expect("frame");
    assert_eq!((after.width, after.height), (before.2.width, before.2.height));
    // light backdrops are far brighter than dark ones
    assert!(mean_red(&after) > 180.0);
    assert!(mean_red(&before.2) < 80.0);
    assert_ne!(after, before.2);
}

#[test]
fn style_selection_reaches_the_controller() {
    let mut page = mounted_page(ViewportState::new(96, 54), software());
    page.select_style(PatternStyle::Geometric).expect("select");
    let controller = page.glass().expect("glass");
    assert_eq!(
        controller.settings().style,
        StyleSelection::Known(PatternStyle::Geometric)
    );
    assert_eq!(controller.settings().theme, Theme::Dark);
}

#[test]
fn direct_render_without_post_processing() {
    let options = EffectOptions {
        post_processing: false,
        ..software()
    };
    let mut page = mounted_page(ViewportState::new(64, 48), options);
    let controller = page.glass_mut().expect("glass");
    assert!(!controller.has_composer());
    let frame = controller.snapshot().expect("frame");
    assert!(!frame.is_blank());
    assert!(frame.pixels.chunks_exact(4).all(|pixel| pixel[3] == 255));
}
