use overlay_host::overlay::clock::ManualClock;
use overlay_host::overlay::{
    HeadlessBackend, HostCall, OverlayBounds, OverlayHost, OverlayRuntime, OverlaySettings,
};
use serde_json::json;

fn spawn_headless(screen: OverlayBounds) -> (OverlayRuntime, HeadlessBackend) {
    let backend = HeadlessBackend::new(screen);
    let thread_backend = backend.clone();
    let runtime = OverlayRuntime::spawn_with(move || {
        OverlayHost::with_clock(
            Box::new(thread_backend),
            Box::new(ManualClock::new(0)),
            OverlaySettings::default(),
        )
    })
    .expect("spawn overlay runtime");
    (runtime, backend)
}

#[test]
fn host_calls_round_trip_through_overlay_thread() {
    let (runtime, backend) = spawn_headless(OverlayBounds::new(0, 0, 800, 600));

    assert_eq!(runtime.call(HostCall::IsSupported).expect("call"), json!(true));

    let start = runtime
        .call(HostCall::Start(Some(json!({ "visualScale": "1.5" }))))
        .expect("start");
    assert_eq!(start["ok"], json!(true));
    assert_eq!(start["visualScaleMilli"], json!(1500));

    runtime
        .call(HostCall::SetPointer(Some(json!({
            "x": 100, "y": 100, "inside": true, "down": true, "drawActive": true
        }))))
        .expect("pointer down");
    let pointer = runtime
        .call(HostCall::SetPointer(Some(json!({ "x": 140 }))))
        .expect("pointer move");
    assert_eq!(pointer["x"], json!(140));
    assert_eq!(pointer["strokeCount"], json!(1));

    let pen = runtime
        .call(HostCall::SetPenStyle(Some(json!({ "color": "#0000ff", "size": 3 }))))
        .expect("pen");
    assert_eq!(pen, json!({ "ok": true, "size": 3, "color": "#0000ff", "colorBgr": 0x00ff0000u32 }));

    let metrics = runtime.call(HostCall::DebugMetrics).expect("metrics");
    assert_eq!(metrics["active"], json!(true));
    assert_eq!(metrics["pointCount"], json!(2));

    assert_eq!(
        runtime.call(HostCall::ClearStrokes).expect("clear"),
        json!({ "ok": true, "strokeCount": 0 })
    );
    assert_eq!(
        runtime.call(HostCall::Stop).expect("stop"),
        json!({ "ok": true, "stopped": true })
    );

    runtime.shutdown().expect("shutdown");
    let log = backend.snapshot();
    assert_eq!(log.presenters_created, 1);
    assert_eq!(log.releases, 1);
}

#[test]
fn dropping_runtime_stops_active_session() {
    let (runtime, backend) = spawn_headless(OverlayBounds::new(0, 0, 64, 64));
    runtime.call(HostCall::Start(None)).expect("start");
    drop(runtime);
    assert_eq!(backend.snapshot().releases, 1);
}

#[test]
fn pointer_without_payload_is_rejected() {
    let (runtime, _backend) = spawn_headless(OverlayBounds::new(0, 0, 64, 64));
    runtime.call(HostCall::Start(None)).expect("start");
    assert_eq!(
        runtime.call(HostCall::SetPointer(None)).expect("pointer"),
        json!({ "ok": false, "reason": "INVALID_PAYLOAD" })
    );
}
