use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use viewloop_render::{DebugTextRenderer, Renderer};
use viewloop_viewport::{
    FixedStepClock, FrameClock, HeadlessContainer, ManualScheduler, RealtimeClock, StopReason,
    Variant, ViewerConfig, ViewportController, run_frames,
};

#[derive(Parser)]
#[command(name = "viewloop-cli", about = "Headless runner for the viewloop viewport")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// JSON viewer config; flags override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Run the frame loop headlessly and print debug frames
    Run {
        /// Sketch to run: rotating-cube or wireframe-cube
        #[arg(long)]
        variant: Option<Variant>,
        /// Container size as WIDTHxHEIGHT
        #[arg(long, default_value = "800x600", value_parser = parse_size)]
        size: (u32, u32),
        /// Device pixel ratio of the container
        #[arg(long, default_value = "1.0")]
        pixel_ratio: f64,
        /// Number of frames to step
        #[arg(short, long, default_value = "3")]
        frames: u64,
        /// Milliseconds between frame timestamps
        #[arg(long, default_value = "16.667", value_parser = parse_step)]
        step_ms: f64,
        /// Use wall-clock timestamps instead of fixed steps
        #[arg(long)]
        realtime: bool,
        /// Resize the container to WIDTHxHEIGHT halfway through the run
        #[arg(long, value_parser = parse_size)]
        resize: Option<(u32, u32)>,
        /// Print every frame instead of only the last
        #[arg(long)]
        all_frames: bool,
    },
    /// Print the effective viewer config as JSON
    Config {
        /// Override the configured variant
        #[arg(long)]
        variant: Option<Variant>,
    },
}

fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<u32>()
            .map_err(|e| format!("invalid dimension '{v}': {e}"))
    };
    Ok((parse(w)?, parse(h)?))
}

fn parse_step(s: &str) -> Result<f64, String> {
    let step: f64 = s
        .trim()
        .parse()
        .map_err(|e| format!("invalid step '{s}': {e}"))?;
    if !step.is_finite() || step < 0.0 {
        return Err(format!("step must be finite and non-negative, got '{s}'"));
    }
    Ok(step)
}

fn load_config(path: Option<&PathBuf>, variant: Option<Variant>) -> anyhow::Result<ViewerConfig> {
    let mut config = match path {
        Some(path) => ViewerConfig::from_json_file(path)?,
        None => ViewerConfig::default(),
    };
    if let Some(variant) = variant {
        config.variant = variant;
    }
    Ok(config)
}

type Headless = ViewportController<HeadlessContainer, DebugTextRenderer, ManualScheduler>;

struct RunPlan {
    frames: u64,
    resize: Option<(u32, u32)>,
    all_frames: bool,
}

fn drive(controller: &mut Headless, clock: &mut impl FrameClock, plan: &RunPlan) {
    let resize_at = plan.frames / 2;
    for i in 0..plan.frames {
        if let Some((w, h)) = plan.resize.filter(|_| i == resize_at) {
            controller.container_mut().set_size(w, h);
            let outcome = controller.resize();
            println!("resize to {w}x{h}: {outcome:?}");
        }

        let summary = run_frames(controller, clock, Some(1));
        if summary.stopped != StopReason::FrameLimit || summary.frames == 0 {
            println!("loop stopped early: {:?}", summary.stopped);
            break;
        }
        if plan.all_frames || i + 1 == plan.frames {
            print!("{}", controller.renderer().last_output());
        }
    }
    controller.cancel();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("viewloop-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", viewloop_common::crate_info());
            println!("render: {}", viewloop_render::crate_info());
            println!("viewport: {}", viewloop_viewport::crate_info());
            let names: Vec<&str> = Variant::ALL.iter().map(|v| v.name()).collect();
            println!("variants: {}", names.join(", "));
        }
        Commands::Run {
            variant,
            size: (width, height),
            pixel_ratio,
            frames,
            step_ms,
            realtime,
            resize,
            all_frames,
        } => {
            let config = load_config(cli.config.as_ref(), variant)?;
            println!(
                "Running {} at {width}x{height} for {frames} frames",
                config.variant
            );

            let mut controller = ViewportController::new(
                HeadlessContainer::new(width, height).with_pixel_ratio(pixel_ratio),
                DebugTextRenderer::new(),
                ManualScheduler::new(),
                &config,
            )?;

            let plan = RunPlan {
                frames,
                resize,
                all_frames,
            };
            if realtime {
                drive(&mut controller, &mut RealtimeClock::start(), &plan);
            } else {
                drive(&mut controller, &mut FixedStepClock::new(step_ms)?, &plan);
            }

            let (w, h) = controller.renderer().size();
            println!(
                "Done: frames={} surface={}x{} aspect={:.4} nodes={}",
                controller.frames_rendered(),
                w,
                h,
                controller.camera().aspect,
                controller.scene().node_count()
            );
        }
        Commands::Config { variant } => {
            let config = load_config(cli.config.as_ref(), variant)?;
            println!("{}", config.to_json_pretty()?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_size_accepts_both_separators() {
        assert_eq!(parse_size("800x600"), Ok((800, 600)));
        assert_eq!(parse_size("400X400"), Ok((400, 400)));
    }

    #[test]
    fn parse_size_rejects_garbage() {
        assert!(parse_size("800").is_err());
        assert!(parse_size("axb").is_err());
        assert!(parse_size("-1x5").is_err());
    }

    #[test]
    fn parse_step_rejects_decreasing_clocks() {
        assert_eq!(parse_step("16.667"), Ok(16.667));
        assert_eq!(parse_step("0"), Ok(0.0));
        assert!(parse_step("-16").is_err());
        assert!(parse_step("NaN").is_err());
        assert!(parse_step("inf").is_err());
    }

    #[test]
    fn cli_rejects_negative_step() {
        let parsed = Cli::try_parse_from(["viewloop-cli", "run", "--step-ms=-16"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn drive_applies_resize_halfway() {
        let mut controller = ViewportController::new(
            HeadlessContainer::new(800, 600),
            DebugTextRenderer::new(),
            ManualScheduler::new(),
            &ViewerConfig::default(),
        )
        .unwrap();
        let plan = RunPlan {
            frames: 4,
            resize: Some((400, 400)),
            all_frames: false,
        };
        drive(&mut controller, &mut FixedStepClock::new(10.0).unwrap(), &plan);

        assert_eq!(controller.frames_rendered(), 4);
        assert_eq!(controller.camera().aspect, 1.0);
        assert_eq!(controller.renderer().size(), (400, 400));
        assert!(!controller.is_running());
    }

    #[test]
    fn cli_parses_run_flags() {
        let cli = Cli::try_parse_from([
            "viewloop-cli",
            "run",
            "--variant",
            "wireframe-cube",
            "--size",
            "1024x768",
            "--frames",
            "10",
        ])
        .unwrap();
        match cli.command {
            Commands::Run {
                variant,
                size,
                frames,
                ..
            } => {
                assert_eq!(variant, Some(Variant::WireframeCube));
                assert_eq!(size, (1024, 768));
                assert_eq!(frames, 10);
            }
            _ => panic!("expected run command"),
        }
    }
}
