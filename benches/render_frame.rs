use criterion::{criterion_group, criterion_main, Criterion};
use overlay_host::overlay::composite::draw_thick_segment;
use overlay_host::overlay::metrics::RenderMetrics;
use overlay_host::overlay::model::{PenStyle, Point, PointerState, Rgb};
use overlay_host::overlay::present::OverlayBackend;
use overlay_host::overlay::render::{Scene, SceneRenderer};
use overlay_host::overlay::session::{OverlaySession, PointerUpdate, StartParams};
use overlay_host::overlay::strokes::{StrokePolicy, StrokeStore};
use overlay_host::overlay::surface::PixelSurface;
use overlay_host::overlay::{HeadlessBackend, OverlayBounds};

const BOUNDS: OverlayBounds = OverlayBounds::new(0, 0, 1920, 1080);

fn busy_store() -> StrokeStore {
    let mut store = StrokeStore::new(StrokePolicy::default());
    for stroke in 0..64 {
        let y = 40 + stroke * 15;
        for step in 0..200 {
            store.begin_if_needed(Point::new(100 + step * 8, y), PenStyle::default(), 0);
        }
        store.end();
    }
    store
}

fn bench_compose(c: &mut Criterion) {
    let scene = Scene {
        bounds: BOUNDS,
        border_px: 4,
        recording: true,
        visual_scale: 1.0,
        pointer: PointerState {
            position: Point::new(960, 540),
            inside: true,
            down: false,
            draw_active: true,
        },
        pen: PenStyle::default(),
    };
    let mut renderer = SceneRenderer::new();
    let mut store = busy_store();

    c.bench_function("compose_1080p_64_strokes", |b| {
        b.iter(|| renderer.compose(&scene, &mut store, 500).expect("frame"))
    });
}

fn bench_session_frame(c: &mut Criterion) {
    let mut backend = HeadlessBackend::new(BOUNDS).without_capture();
    let mut session = OverlaySession::start(
        backend.create_presenter().expect("presenter"),
        StartParams::new(BOUNDS),
        PenStyle::default(),
        StrokePolicy::default(),
        RenderMetrics::default(),
        0,
    )
    .expect("session");
    for x in (200..1600).step_by(4) {
        session.set_pointer(
            PointerUpdate {
                x: Some(x),
                y: Some(500),
                inside: Some(true),
                down: Some(true),
                draw_active: Some(true),
            },
            0,
        );
    }

    c.bench_function("session_render_present_1080p", |b| {
        b.iter(|| session.render(0).expect("frame"))
    });
}

fn bench_thick_segment(c: &mut Criterion) {
    let mut surface = PixelSurface::new();
    surface.ensure(1920, 1080).expect("surface");

    c.bench_function("thick_segment_radius_8", |b| {
        b.iter(|| {
            draw_thick_segment(
                &mut surface,
                Point::new(10, 10),
                Point::new(1900, 1070),
                8,
                Rgb::new(255, 79, 112),
                200,
            )
        })
    });
}

criterion_group!(benches, bench_compose, bench_session_frame, bench_thick_segment);
criterion_main!(benches);
