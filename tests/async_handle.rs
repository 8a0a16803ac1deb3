use std::sync::{Arc, Mutex};
use std::time::Duration;

use oledframe::rendering::{LayoutManager, PlacementConfig};
use oledframe::sink::{MemorySink, MonochromeEncoder};
use oledframe::widget::Widget;
use oledframe::widgets::SolidWidget;
use oledframe::{Compositor, CompositorConfig, DisplayConfig, Error};

fn start(display: DisplayConfig, widgets: Vec<(Arc<dyn Widget>, PlacementConfig)>) -> Compositor {
    let mut layout = LayoutManager::new(display).unwrap();
    for (w, p) in widgets {
        layout.add_widget(w, p);
    }
    let c = Compositor::new(
        Arc::new(Mutex::new(layout)),
        Arc::new(MonochromeEncoder::default()),
        Arc::new(MemorySink::new()),
        CompositorConfig {
            refresh_rate_ms: 20,
            ..Default::default()
        },
    );
    c.start().unwrap();
    c
}

fn scrolling_display() -> DisplayConfig {
    DisplayConfig {
        virtual_width: Some(256),
        virtual_height: Some(80),
        ..Default::default()
    }
}

#[tokio::test]
async fn viewport_commands_run_on_the_render_thread() {
    let c = start(scrolling_display(), Vec::new());
    let handle = c.handle().unwrap();

    handle.scroll_to(100, 30).await.unwrap();
    handle.scroll_by(-20, 5).await.unwrap();
    let vp = handle.viewport().await.unwrap();
    assert_eq!((vp.offset_x, vp.offset_y), (80, 35));

    handle.center_on(128, 40).await.unwrap();
    let vp = handle.viewport().await.unwrap();
    assert_eq!((vp.offset_x, vp.offset_y), (64, 20));

    assert_eq!(handle.set_zoom(50.0).await.unwrap(), 10.0);
    let z = handle.zoom_out(0.5).await.unwrap();
    assert!((z - 9.5).abs() < 1e-4);
    let z = handle.zoom_in(0.25).await.unwrap();
    assert!((z - 9.75).abs() < 1e-4);

    handle.scroll_to(-40, 9000).await.unwrap();
    handle.constrain_viewport().await.unwrap();
    let vp = handle.viewport().await.unwrap();
    assert_eq!(vp.offset_x, 0);
    assert!(vp.offset_y > 0);

    handle.reset_viewport().await.unwrap();
    let vp = handle.viewport().await.unwrap();
    assert_eq!((vp.offset_x, vp.offset_y, vp.zoom()), (0, 0, 1.0));

    c.stop(Duration::from_secs(2));
}

#[tokio::test]
async fn snapshot_and_visibility() {
    let block: Arc<dyn Widget> = Arc::new(SolidWidget::new("block", 255));
    let c = start(
        scrolling_display(),
        vec![(block.clone(), PlacementConfig::at(200, 60).with_size(20, 10))],
    );
    let handle = c.handle().unwrap();

    let canvas = handle.snapshot(false).await.unwrap();
    assert_eq!(canvas.dimensions(), (256, 80));
    assert_eq!(canvas.get_pixel(205, 65).0[0], 255);

    let frame = handle.snapshot(true).await.unwrap();
    assert_eq!(frame.dimensions(), (128, 40));
    assert!(frame.pixels().all(|p| p.0[0] == 0));

    assert!(handle.set_visibility(block.clone(), false).await.unwrap());
    let canvas = handle.snapshot(false).await.unwrap();
    assert_eq!(canvas.get_pixel(205, 65).0[0], 0);

    let stranger: Arc<dyn Widget> = Arc::new(SolidWidget::new("stranger", 1));
    assert!(!handle.set_visibility(stranger, true).await.unwrap());

    c.stop(Duration::from_secs(2));
}

#[tokio::test]
async fn stats_reflect_the_running_loop() {
    let c = start(DisplayConfig::default(), Vec::new());
    let handle = c.handle().unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    let stats = handle.stats().await.unwrap();
    assert!(stats.running);
    assert!(stats.frame_count >= 1);
    assert_eq!(stats.interval_ms, 20);

    c.stop(Duration::from_secs(2));
}

#[tokio::test]
async fn viewport_commands_fail_in_basic_mode() {
    let c = start(DisplayConfig::default(), Vec::new());
    let handle = c.handle().unwrap();

    assert!(matches!(handle.scroll_to(1, 1).await, Err(Error::NoViewport)));
    assert!(matches!(handle.set_zoom(2.0).await, Err(Error::NoViewport)));
    assert!(matches!(handle.viewport().await, Err(Error::NoViewport)));
    assert!(handle.snapshot(true).await.is_ok());

    c.stop(Duration::from_secs(2));
}

#[tokio::test]
async fn handle_reports_not_running_after_stop() {
    let c = start(scrolling_display(), Vec::new());
    let handle = c.handle().unwrap();
    let cloned = handle.clone();
    c.stop(Duration::from_secs(2));

    assert!(matches!(handle.scroll_to(0, 0).await, Err(Error::NotRunning)));
    assert!(matches!(cloned.stats().await, Err(Error::NotRunning)));

    // A restarted loop hands out a fresh handle; old ones stay dead.
    c.start().unwrap();
    assert!(matches!(handle.stats().await, Err(Error::NotRunning)));
    assert!(c.handle().unwrap().stats().await.unwrap().running);
    c.stop(Duration::from_secs(2));
}
