use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

use oledframe::rendering::{LayoutManager, PlacementConfig};
use oledframe::sink::{FrameEncoder, MonochromeEncoder};
use oledframe::widget::Widget;
use oledframe::widgets::{ConstantSampler, GaugeWidget, SolidWidget};
use oledframe::DisplayConfig;

// Run with: cargo bench --bench composite_bench

fn dashboard(display: DisplayConfig) -> LayoutManager {
    let mut layout = LayoutManager::new(display).expect("valid layout");
    for i in 0..6 {
        let g = GaugeWidget::new(
            format!("gauge{}", i),
            Box::new(ConstantSampler(i as f32 / 6.0)),
            Duration::from_secs(1),
        );
        let _ = g.update();
        layout.add_widget(
            Arc::new(g),
            PlacementConfig::at((i % 2) * 128, (i / 2) * 26).with_size(120, 24),
        );
    }
    layout.add_widget(
        Arc::new(SolidWidget::new("overlay", 255).with_alpha(96)),
        PlacementConfig::at(40, 10).with_size(48, 20).with_z_order(10),
    );
    layout
}

/// Bench: composite a basic-mode frame
fn bench_composite_basic(c: &mut Criterion) {
    let layout = dashboard(DisplayConfig::default());
    c.bench_function("composite_basic", |b| {
        b.iter(|| black_box(layout.composite(true)))
    });
}

/// Bench: composite through a scrolled, zoomed viewport
fn bench_composite_viewport(c: &mut Criterion) {
    let mut layout = dashboard(DisplayConfig {
        virtual_width: Some(256),
        virtual_height: Some(80),
        ..Default::default()
    });
    if let Some(vp) = layout.viewport_mut() {
        vp.set_zoom(1.5);
        vp.scroll_to(60, 20);
    }
    c.bench_function("composite_viewport_zoomed", |b| {
        b.iter(|| black_box(layout.composite(true)))
    });
}

/// Bench: dither and pack one display frame
fn bench_encode(c: &mut Criterion) {
    let frame = dashboard(DisplayConfig::default()).composite(true);
    let encoder = MonochromeEncoder::default();
    c.bench_function("encode_monochrome", |b| {
        b.iter(|| black_box(encoder.encode(&frame).expect("encode")))
    });
}

criterion_group!(
    benches,
    bench_composite_basic,
    bench_composite_viewport,
    bench_encode
);
criterion_main!(benches);
