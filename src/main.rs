use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use mapmeasure::config::MeasureConfig;
use mapmeasure::measure::handlers::MeasureController;
use mapmeasure::render::image as capture;
use mapmeasure::replay;
use mapmeasure::surface::memory::{MemoryCanvas, MemoryMap};

struct Args {
    script: PathBuf,
    png: Option<PathBuf>,
    background: Option<PathBuf>,
    extent: Option<String>,
    size: (u32, u32),
    config: Option<PathBuf>,
    json: bool,
}

fn print_help() {
    println!("Usage: mapmeasure <script.json> [options]");
    println!();
    println!("Options:");
    println!("  --png <file>                   write the measurements as a PNG");
    println!("  --background <file>            map snapshot to draw the measurements on");
    println!("  --extent <minx,miny,maxx,maxy> map extent of the PNG (default: selected area, else fit)");
    println!("  --size <WxH>                   PNG size without a background (default: 800x600)");
    println!("  --config <file>                config file instead of the user config");
    println!("  --json                         print the measurements as JSON");
}

fn parse_size(text: &str) -> Result<(u32, u32)> {
    let (w, h) = text
        .split_once('x')
        .with_context(|| format!("Invalid size '{}', expected WxH", text))?;
    Ok((
        w.trim().parse().context("Invalid width")?,
        h.trim().parse().context("Invalid height")?,
    ))
}

/// Returns `None` when only help was requested
fn parse_args(args: &[String]) -> Result<Option<Args>> {
    let mut script = None;
    let mut parsed = Args {
        script: PathBuf::new(),
        png: None,
        background: None,
        extent: None,
        size: (800, 600),
        config: None,
        json: false,
    };

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        let mut value = |name: &str| {
            iter.next()
                .cloned()
                .with_context(|| format!("{} needs a value", name))
        };
        match arg.as_str() {
            "-h" | "--help" => return Ok(None),
            "--png" => parsed.png = Some(PathBuf::from(value("--png")?)),
            "--background" => parsed.background = Some(PathBuf::from(value("--background")?)),
            "--extent" => parsed.extent = Some(value("--extent")?),
            "--size" => parsed.size = parse_size(&value("--size")?)?,
            "--config" => parsed.config = Some(PathBuf::from(value("--config")?)),
            "--json" => parsed.json = true,
            other if other.starts_with("--") => bail!("Unknown option {}", other),
            other => script = Some(PathBuf::from(other)),
        }
    }

    let Some(script) = script else {
        bail!("Missing script file");
    };
    parsed.script = script;
    Ok(Some(parsed))
}

fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => MeasureConfig::load_from(path)?,
        None => MeasureConfig::load(),
    };
    let text = std::fs::read_to_string(&args.script)
        .with_context(|| format!("Failed to read {}", args.script.display()))?;
    let steps = replay::parse_script(&text)?;

    let mut ctrl = MeasureController::new(MemoryMap::new(), MemoryCanvas::new(), config);
    replay::run_script(&mut ctrl, &steps);

    if args.json {
        let json = serde_json::to_string_pretty(ctrl.registry().entries())
            .context("Failed to serialize measurements")?;
        println!("{}", json);
    } else {
        for (_, popup) in ctrl.map().overlays() {
            println!("{}\t{}\t{}", popup.measurement, popup.title, popup.value);
        }
        if let Some(e) = ctrl.selected_extent() {
            println!("selection\t{},{},{},{}", e.min_x, e.min_y, e.max_x, e.max_y);
        }
    }

    if let Some(png) = &args.png {
        let entries = ctrl.registry().entries();
        let extent = match (&args.extent, ctrl.selected_extent()) {
            (Some(text), _) => replay::parse_extent(text)?,
            (None, Some(selected)) => selected,
            (None, None) => match capture::entries_extent(entries, 0.1) {
                Some(extent) => extent,
                None => bail!("Nothing to capture and no --extent given"),
            },
        };
        let style = &ctrl.config().style;
        let img = match &args.background {
            Some(path) => {
                let mut img = capture::load_background(path)?;
                capture::draw_measurements_on_image(&mut img, entries, &extent, style)?;
                img
            }
            None => {
                let (width, height) = args.size;
                capture::capture_extent(entries, &extent, width, height, style)?
            }
        };
        capture::save_png(&img, png)?;
        log::info!("Capture written to {}", png.display());
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = std::env::args().collect();
    match parse_args(&args)? {
        Some(args) => run(args),
        None => {
            print_help();
            Ok(())
        }
    }
}
