use glassfx::settings::STYLE_ATTRIBUTE;
use glassfx::{
    BackendKind, EffectController, EffectOptions, HostPage, PatternStyle, PreferenceStore,
    ViewportState, GLASS_EFFECT,
};

#[test]
fn gpu_backend_presents_opaque_backdrop() {
    let mut page = HostPage::boot(PreferenceStore::in_memory(), ViewportState::new(64, 36));
    page.root_mut()
        .set(STYLE_ATTRIBUTE, PatternStyle::Minimal.identifier());

    let controller = EffectController::new(EffectOptions {
        backend: BackendKind::Gpu,
        ..EffectOptions::default()
    });
    if let Err(error) = page.mount(GLASS_EFFECT, controller) {
        let message = format!("{error:#}");
        if message.contains("no suitable GPU adapter found") {
            eprintln!("Skipping test: no GPU adapter found");
            return;
        }
        panic!("gpu effect failed to initialize: {message}");
    }

    let controller = page.glass_mut().expect("glass");
    assert_eq!(
        controller.renderer().map(|renderer| renderer.backend_name()),
        Some("gpu")
    );
    let frame = controller.snapshot().expect("gpu frame");
    assert_eq!((frame.width, frame.height), (64, 36));
    assert!(
        frame.pixels.chunks_exact(4).all(|pixel| pixel[3] == 255),
        "background quad should cover every pixel"
    );

    page.resize(ViewportState::new(36, 64));
    let frame = page
        .glass_mut()
        .expect("glass")
        .snapshot()
        .expect("gpu frame after resize");
    assert_eq!((frame.width, frame.height), (36, 64));
    assert!(!frame.is_blank());
}
