use anyhow::Context;
use clap::Parser;
use log::{error, info};
use oledframe::config::AppConfig;
use oledframe::rendering::LayoutManager;
use oledframe::sink::{FrameSink, JsonLinesSink, MemorySink, MonochromeEncoder};
use oledframe::widgets::build_widget;
use oledframe::{Compositor, UpdateScheduler};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "oledframe", version, about = "Composite widgets onto a monochrome OLED frame stream")]
struct Args {
    /// JSON configuration file (defaults are used when it does not exist)
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// How long to run before shutting down
    #[arg(short, long, default_value_t = 10)]
    duration_secs: u64,

    /// Write frames as JSON lines to this file, or `-` for stdout
    #[arg(short, long)]
    output: Option<String>,

    /// Save the last composited frame (full virtual canvas) as PNG
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Print compositor statistics as JSON on exit
    #[arg(long)]
    stats: bool,
}

fn open_sink(output: Option<&str>) -> anyhow::Result<Arc<dyn FrameSink>> {
    let sink: Arc<dyn FrameSink> = match output {
        None => Arc::new(MemorySink::with_capacity(16)),
        Some("-") => Arc::new(JsonLinesSink::new(std::io::stdout())),
        Some(path) => {
            let file = File::create(path).with_context(|| format!("creating {}", path))?;
            Arc::new(JsonLinesSink::new(BufWriter::new(file)))
        }
    };
    Ok(sink)
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = AppConfig::from_path(&args.config)?;
    let display = config.display_config();

    let mut layout = LayoutManager::new(display.clone())?;
    let mut scheduler = UpdateScheduler::new();
    for wc in config.enabled_widgets() {
        let widget = match build_widget(wc) {
            Ok(w) => w,
            Err(e) => {
                error!("Failed to create widget {}: {}", wc.display_name(), e);
                continue;
            }
        };
        layout.add_widget(Arc::clone(&widget), wc.placement());
        scheduler.spawn(widget)?;
    }

    let layout = Arc::new(Mutex::new(layout));
    let compositor = Compositor::new(
        Arc::clone(&layout),
        Arc::new(MonochromeEncoder::new(display.width, display.height)),
        open_sink(args.output.as_deref())?,
        config.compositor_config(),
    );

    compositor.start()?;
    info!("oledframe is running for {}s", args.duration_secs);
    std::thread::sleep(Duration::from_secs(args.duration_secs));
    compositor.stop(Duration::from_secs(2));
    scheduler.stop(Duration::from_secs(1));

    if let Some(path) = &args.snapshot {
        let frame = layout
            .lock()
            .map_err(|_| anyhow::anyhow!("layout lock poisoned"))?
            .composite(false);
        frame
            .save(path)
            .with_context(|| format!("writing snapshot {}", path.display()))?;
        info!("Snapshot saved to {}", path.display());
    }

    if args.stats {
        eprintln!("{}", serde_json::to_string_pretty(&compositor.stats())?);
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Args::parse()) {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}
