//! Built-in widgets and the config-driven factory

pub mod gauge;
pub mod solid;

pub use gauge::{ConstantSampler, GaugeStyle, GaugeWidget, Sampler, SecondsSampler};
pub use solid::SolidWidget;

use crate::config::WidgetConfig;
use crate::widget::Widget;
use crate::{Error, Result};
use std::sync::Arc;

/// Instantiate the widget described by `config`.
///
/// Known types: `"solid"` and `"gauge"` (samplers `"seconds"`, `"constant"`).
pub fn build_widget(config: &WidgetConfig) -> Result<Arc<dyn Widget>> {
    let props = &config.properties;
    let name = config.display_name().to_string();
    match config.kind.as_str() {
        "solid" => {
            let mut w = SolidWidget::new(name, props.fill_color);
            if let Some(alpha) = props.alpha {
                w = w.with_alpha(alpha);
            }
            Ok(Arc::new(w))
        }
        "gauge" => {
            let sampler: Box<dyn Sampler> = match props.sampler.as_str() {
                "seconds" => Box::new(SecondsSampler),
                "constant" => Box::new(ConstantSampler(props.value)),
                other => {
                    return Err(Error::Config(format!(
                        "unknown sampler '{}' for widget '{}'",
                        other, name
                    )))
                }
            };
            let style = GaugeStyle {
                fill: props.fill_color,
                background: props.background_color,
                border: props.border,
            };
            Ok(Arc::new(
                GaugeWidget::new(name, sampler, props.update_interval()).with_style(style),
            ))
        }
        other => Err(Error::Config(format!("unknown widget type: {}", other))),
    }
}
