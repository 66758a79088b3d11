use anyhow::{bail, Context, Result};
use camscan::capture::{CameraHost, DeviceCatalog, NokhwaHost, ScriptedHost};
use camscan::decode::{BudgetedDecoder, QrDecoder};
use camscan::output::LogSurface;
use camscan::{
    CameraDevice, ReferenceCanvas, ResolutionOption, Scanner, ScannerConfig, Selection, TickOutcome,
};
use clap::Parser;
use image::RgbImage;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Camera index from --list-devices. Defaults to the first rear-facing camera.
    #[arg(short, long)]
    camera: Option<usize>,

    /// Resolution index of the chosen camera
    #[arg(short, long, default_value_t = 0)]
    resolution: usize,

    /// Seconds between decode attempts
    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    read_interval: f32,

    /// Reference canvas width
    #[arg(long, default_value_t = 1920.0, allow_negative_numbers = true)]
    canvas_width: f32,

    /// Reference canvas height
    #[arg(long, default_value_t = 1080.0, allow_negative_numbers = true)]
    canvas_height: f32,

    /// Display ticks per second
    #[arg(long, default_value_t = 60)]
    fps: u32,

    /// Longest a decode attempt may hold up a tick, in milliseconds
    #[arg(long, default_value_t = 50)]
    decode_budget_ms: u64,

    /// Frames with a longer side than this are downsized before decoding
    #[arg(long, default_value_t = 1280)]
    max_decode_dimension: u32,

    /// Print the available cameras and exit
    #[arg(long)]
    list_devices: bool,

    /// Use a simulated camera instead of a real one
    #[arg(long)]
    simulate: bool,

    /// Stop after this many ticks
    #[arg(long)]
    ticks: Option<u64>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

impl Args {
    fn config(&self) -> Result<ScannerConfig> {
        let reference_canvas = ReferenceCanvas::new(self.canvas_width, self.canvas_height);
        if !reference_canvas.is_valid() {
            bail!(
                "Canvas must be positive, got {}x{}",
                self.canvas_width,
                self.canvas_height
            );
        }

        let selection = match self.camera {
            Some(camera) => Selection::Explicit {
                camera,
                resolution: self.resolution,
            },
            None => Selection::Auto,
        };

        Ok(ScannerConfig {
            read_interval: self.read_interval,
            reference_canvas,
            target_framerate: Some(self.fps),
            selection,
            decode_budget: Duration::from_millis(self.decode_budget_ms),
            max_decode_dimension: self.max_decode_dimension,
        })
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    if args.simulate {
        run(simulated_host(), &args)
    } else {
        run(NokhwaHost::new(), &args)
    }
}

fn simulated_host() -> ScriptedHost {
    let mut host = ScriptedHost::new(vec![
        CameraDevice::new("Simulated front", true, vec![ResolutionOption::new(640, 480, 30)]),
        CameraDevice::new(
            "Simulated rear",
            false,
            vec![
                ResolutionOption::new(1280, 720, 30),
                ResolutionOption::new(1920, 1080, 30),
            ],
        ),
    ]);
    host.push_frame(RgbImage::from_pixel(1280, 720, image::Rgb([255, 255, 255])));
    host.set_continuous(true);
    host
}

fn run<H: CameraHost>(mut host: H, args: &Args) -> Result<()> {
    if args.list_devices {
        let devices = DeviceCatalog::enumerate(&mut host);
        for line in DeviceCatalog::describe(&devices) {
            println!("{}", line);
        }
        return Ok(());
    }

    let config = args.config()?;
    tracing::info!("camscan starting");
    tracing::info!(
        "Canvas: {}x{}",
        config.reference_canvas.width,
        config.reference_canvas.height
    );
    tracing::info!("Read interval: {}s", config.read_interval);
    tracing::info!("Target FPS: {}", args.fps);

    let decoder = BudgetedDecoder::new(
        QrDecoder::new(config.max_decode_dimension),
        config.decode_budget,
    )
    .context("Failed to start decoder")?;

    let mut scanner = Scanner::new(host, None, decoder, LogSurface::new(), config);
    run_loop(&mut scanner, args.fps, args.ticks);

    Ok(())
}

fn run_loop<H: CameraHost>(
    scanner: &mut Scanner<H, BudgetedDecoder, LogSurface>,
    target_fps: u32,
    max_ticks: Option<u64>,
) {
    let frame_duration = Duration::from_secs_f32(1.0 / target_fps.max(1) as f32);
    let mut last_tick = Instant::now();
    let mut total_tick_time = Duration::ZERO;

    tracing::info!("Press Ctrl+C to stop");

    loop {
        let loop_start = Instant::now();
        let delta = loop_start - last_tick;
        last_tick = loop_start;

        if scanner.tick(delta) == TickOutcome::Quit {
            break;
        }
        total_tick_time += loop_start.elapsed();

        let ticks = scanner.ticks();

        // Log stats every 5 seconds of ticks
        if ticks % (target_fps.max(1) as u64 * 5) == 0 {
            let avg_tick_ms = total_tick_time.as_secs_f64() * 1000.0 / ticks as f64;
            tracing::info!(
                "Tick {}: avg={:.2}ms, decode attempts={}",
                ticks,
                avg_tick_ms,
                scanner.decode_attempts()
            );
        }

        if max_ticks.is_some_and(|max| ticks >= max) {
            break;
        }

        // Frame rate limiting
        let elapsed = loop_start.elapsed();
        if elapsed < frame_duration {
            std::thread::sleep(frame_duration - elapsed);
        }
    }
}
