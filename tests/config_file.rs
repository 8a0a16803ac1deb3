use std::fs;

use oledframe::config::AppConfig;
use oledframe::rendering::LayoutManager;
use oledframe::widgets::build_widget;
use oledframe::{Error, Widget};

#[test]
fn missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::from_path(dir.path().join("nope.json")).unwrap();
    assert_eq!(config, AppConfig::default());
    assert_eq!(config.widgets[0].kind, "gauge");
}

#[test]
fn loads_file_and_builds_layout() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.json");
    fs::write(
        &path,
        r#"{
            "display": { "width": 128, "height": 40, "background_color": 0 },
            "layout": { "virtual_width": 256, "virtual_height": 80 },
            "refresh_rate_ms": 50,
            "event_name": "PANEL",
            "widgets": [
                { "type": "solid", "id": "backdrop", "position": { "w": 256, "h": 80 },
                  "properties": { "fill_color": 32 } },
                { "type": "gauge", "id": "load", "position": { "x": 150, "y": 50, "w": 64, "h": 20, "z_order": 2 },
                  "properties": { "sampler": "constant", "value": 1.0, "update_interval": 0.2 } },
                { "type": "gauge", "id": "off", "enabled": false }
            ]
        }"#,
    )?;

    let config = AppConfig::from_path(&path)?;
    assert_eq!(config.compositor_config().refresh_rate_ms, 50);
    assert_eq!(config.compositor_config().event_name, "PANEL");

    let mut layout = LayoutManager::new(config.display_config())?;
    assert!(layout.is_viewport_mode());
    for wc in config.enabled_widgets() {
        let widget = build_widget(wc)?;
        widget.update()?;
        layout.add_widget(widget, wc.placement());
    }
    assert_eq!(layout.len(), 2);

    let names: Vec<&str> = layout.placements().map(|p| p.widget().name()).collect();
    assert_eq!(names, vec!["backdrop", "load"]);

    let canvas = layout.composite(false);
    assert_eq!(canvas.get_pixel(5, 5).0[0], 32);
    assert_eq!(canvas.get_pixel(180, 60).0[0], 255);
    Ok(())
}

#[test]
fn malformed_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    fs::write(&path, "{ \"display\": ").unwrap();
    assert!(matches!(AppConfig::from_path(&path), Err(Error::Json(_))));
}

#[test]
fn config_round_trips_through_json() {
    let config = AppConfig::default();
    let text = serde_json::to_string_pretty(&config).unwrap();
    assert_eq!(AppConfig::from_json_str(&text).unwrap(), config);
}
