//! Command line tool to configure and record videos with a
//! machine-vision camera.
//!
//! Two subcommands: `infos` negotiates a configuration and prints it;
//! `record` negotiates, prints, and records until Enter or Ctrl-C.
//! Runs against the crate's simulated backend; a vendor driver binding
//! plugs in through `alvicam::device::DriverSystem`.

use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use alvicam::device::GeometryParam;
use alvicam::testing::{SimSpec, SimSystem};
use alvicam::{negotiate, Camera, CaptureRequest, NegotiatedConfig};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: alvicam <infos|record> [options]");
        eprintln!("  --shutter-speed, -ss <µs>   shutter speed (default 5000)");
        eprintln!("  --binning, -b <bool>        2x2 sensor binning (default false)");
        eprintln!("  --height <px>               image height (default 1248)");
        eprintln!("  --width, -w <px>            image width (default 1632)");
        eprintln!("  --output, -o <path>         output file, record only (default video.mp4)");
        eprintln!("  --json                      machine-readable output");
        std::process::exit(1);
    }

    match args[1].as_str() {
        "infos" => cmd_infos(&args[2..]),
        "record" => cmd_record(&args[2..]),
        other => {
            eprintln!("Unknown command: {}", other);
            std::process::exit(1);
        }
    }
}

struct CliArgs {
    request: CaptureRequest,
    output: PathBuf,
    json: bool,
}

fn parse_args(args: &[String]) -> Result<CliArgs> {
    let mut request = CaptureRequest::default();
    let mut output = PathBuf::from("video.mp4");
    let mut json = false;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--shutter-speed" | "-ss" => {
                i += 1;
                request.shutter_speed_us = next_value(args, i, "--shutter-speed")?
                    .parse()
                    .context("shutter speed must be a number (µs)")?;
            }
            "--binning" | "-b" => {
                i += 1;
                request.binning = parse_bool(next_value(args, i, "--binning")?)?;
            }
            "--height" => {
                i += 1;
                request.height = next_value(args, i, "--height")?
                    .parse()
                    .context("height must be an integer (px)")?;
            }
            "--width" | "-w" => {
                i += 1;
                request.width = next_value(args, i, "--width")?
                    .parse()
                    .context("width must be an integer (px)")?;
            }
            "--output" | "-o" => {
                i += 1;
                output = PathBuf::from(next_value(args, i, "--output")?);
            }
            "--json" => json = true,
            other => bail!("Unknown option: {}", other),
        }
        i += 1;
    }

    Ok(CliArgs {
        request,
        output,
        json,
    })
}

fn next_value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str> {
    args.get(i)
        .map(|s| s.as_str())
        .with_context(|| format!("missing value for {}", flag))
}

fn parse_bool(s: &str) -> Result<bool> {
    match s {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => bail!("Invalid bool value: {}", other),
    }
}

fn acquire_camera() -> Result<Camera> {
    Ok(Camera::acquire(Box::new(SimSystem::new(SimSpec::default())))?)
}

fn cmd_infos(args: &[String]) -> Result<()> {
    let cli = parse_args(args)?;
    let mut camera = acquire_camera()?;
    let config = negotiate(&mut camera, &cli.request)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        println!();
        print_infos(&mut camera, &config)?;
        println!();
    }
    Ok(())
}

fn print_infos(camera: &mut Camera, config: &NegotiatedConfig) -> Result<()> {
    println!("- Current camera configuration -");
    println!(
        "Pixels: {}",
        if camera.supports_color() {
            "Colored (Bayer)"
        } else {
            "Gray (Mono)"
        }
    );
    println!("Framerate: {:.2} fps", camera.frame_rate()?.current);
    println!("Shutter speed: {} µs", config.shutter_speed_us);
    println!(
        "Binning: {}",
        if config.binning {
            "Enabled (2x2) (Average)"
        } else {
            "Disabled"
        }
    );
    println!("Image size: {}x{} px", config.width, config.height);
    let offset_x = camera.geometry(GeometryParam::OffsetX)?.current;
    let offset_y = camera.geometry(GeometryParam::OffsetY)?.current;
    println!("Offsets: {}x{} px", offset_x, offset_y);
    Ok(())
}

#[cfg(feature = "recording")]
fn cmd_record(args: &[String]) -> Result<()> {
    use alvicam::recording::{Codec, Recorder};
    use alvicam::{RecordingOptions, RecordingSession};

    let cli = parse_args(args)?;
    let mut camera = acquire_camera()?;

    let mut session = RecordingSession::new();
    let config = session.negotiate(&mut camera, &cli.request)?;
    println!();
    print_infos(&mut camera, &config)?;
    println!();

    let codec = Codec::for_path(&cli.output);
    let frame_rate = camera.frame_rate()?.current;
    let sink = Box::new(Recorder::create(
        &cli.output,
        codec,
        frame_rate,
        config.width,
        config.height,
    )?);

    println!(
        "Press Enter (or Ctrl-C) to stop recording. The video will be saved to '{}'.",
        cli.output.display()
    );

    let stats = session.record(
        &mut camera,
        &config,
        sink,
        &RecordingOptions::new(&cli.output),
        wait_for_stop()?,
    )?;

    println!();
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print_summary(&stats);
    }
    Ok(())
}

#[cfg(not(feature = "recording"))]
fn cmd_record(_args: &[String]) -> Result<()> {
    bail!("this build has no video sink; rebuild with `--features recording`");
}

/// Stop signal: first of Ctrl-C or a newline on stdin.
#[cfg(feature = "recording")]
fn wait_for_stop() -> Result<impl FnOnce()> {
    let (ctrlc_tx, ctrlc_rx) = crossbeam_channel::bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = ctrlc_tx.try_send(());
    })
    .context("failed to install Ctrl-C handler")?;

    let (stdin_tx, stdin_rx) = crossbeam_channel::bounded::<()>(1);
    std::thread::spawn(move || {
        let mut line = String::new();
        let _ = std::io::stdin().read_line(&mut line);
        let _ = stdin_tx.try_send(());
    });

    Ok(move || {
        crossbeam_channel::select! {
            recv(ctrlc_rx) -> _ => {}
            recv(stdin_rx) -> _ => {}
        }
    })
}

#[cfg(feature = "recording")]
fn print_summary(stats: &alvicam::RecordingStats) {
    println!("Video saved successfully!");
    println!();
    println!("- Video details -");
    println!("Output file path: {}", stats.output_path);
    println!("Video codec: {}", stats.codec);
    println!("Video resolution: {}x{} px", stats.width, stats.height);
    println!("Video framerate: {:.2} fps", stats.frame_rate);
    println!("Video duration: {:.2} s", stats.duration_secs);
    println!("Total frames recorded: {}", stats.frames_written);
    if stats.write_failures > 0 {
        println!("Frames skipped on write errors: {}", stats.write_failures);
    }
}
