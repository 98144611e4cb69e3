use anyhow::{anyhow, Context};
use clap::Parser;
use meme_svg::{DeviceClass, ExportHandle, Meme, MemeConfig, MemeProps};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

/// Caption an image and print the meme as SVG
#[derive(Parser, Debug)]
#[command(name = "meme-svg", version, about)]
struct Args {
    /// Image locator: path, file:// URL, http(s):// URL or data: URL
    image: String,

    /// Top caption
    #[arg(long, default_value = "")]
    top: String,

    /// Bottom caption
    #[arg(long, default_value = "")]
    bottom: String,

    /// Use the compact (mobile) width cap and text density
    #[arg(long)]
    compact: bool,

    /// Write the SVG to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the fetch timeout from the config
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Print the display size as JSON instead of the SVG
    #[arg(long)]
    size_only: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => MemeConfig::from_path(path)?,
        None => MemeConfig::default(),
    };
    if let Some(ms) = args.timeout_ms {
        config.timeout_ms = ms;
    }
    let timeout = Duration::from_millis(config.timeout_ms);

    let handle = ExportHandle::new();
    let props = MemeProps::new(args.image.clone())
        .top_label(args.top)
        .bottom_label(args.bottom)
        .device_class(DeviceClass::from_mobile(args.compact))
        .export_handle(handle.clone());

    let (err_tx, mut err_rx) = mpsc::unbounded_channel::<String>();
    let meme = Meme::builder(props)
        .config(config)
        .on_error(move |e| {
            let _ = err_tx.send(e.to_string());
        })
        .build()?;

    // The blocking HTTP client must live outside the runtime, so only the wait runs in it.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("failed to start runtime")?;
    let size = runtime.block_on(async {
        tokio::select! {
            size = meme.ready() => Ok(size),
            Some(msg) = err_rx.recv() => Err(anyhow!("{}: {}", args.image, msg)),
            _ = tokio::time::sleep(timeout) => {
                Err(anyhow!("{}: timed out after {}ms", args.image, timeout.as_millis()))
            }
        }
    })?;
    let size = size.context("loader shut down before the image resolved")?;
    log::info!("display size {}x{}", size.width, size.height);

    if args.size_only {
        println!("{}", serde_json::to_string(&size)?);
        return Ok(());
    }

    meme.render();
    let snapshot = handle
        .snapshot()
        .context("render did not publish a snapshot")?;
    match &args.output {
        Some(path) => {
            snapshot
                .save(path)
                .with_context(|| format!("writing {}", path.display()))?;
            log::info!("wrote {} ({})", path.display(), snapshot.digest());
        }
        None => println!("{}", snapshot.svg),
    }
    Ok(())
}
