use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use noise_watch::audio::{AudioCapture, ScriptedCapture, WavCapture};
use noise_watch::calibration::{CalibrationStore, FileCalibrationStore};
use noise_watch::http::{run_http_server, ApiState};
use noise_watch::idw::{render, ColorLut, Viewport};
use noise_watch::measurement::{extract_points, FeatureCollection, InMemoryRepository, NoiseSource};
use noise_watch::session::SessionController;
use noise_watch::submission::{GeoPosition, MeasurementReport};
use noise_watch::{AppConfig, ErrorCode};
use serde::Serialize;

/// Overrides the configuration file location
const CONFIG_ENV: &str = "NOISE_WATCH_CONFIG";

#[derive(Parser, Debug)]
#[command(
    name = "noise_watch",
    about = "Noise measurement toolkit: API server, recorder, calibration and IDW renderer"
)]
struct Cli {
    /// Configuration file (defaults to $NOISE_WATCH_CONFIG, then assets/noise_watch.json)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the submission/retrieval API
    Serve {
        /// Overrides server.bind_addr
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Record one session and print its average
    Record {
        #[arg(long, value_enum, default_value_t = InputKind::Synthetic)]
        input: InputKind,
        /// WAV file for `--input wav`
        #[arg(long)]
        wav: Option<PathBuf>,
        /// Peak amplitude of the synthetic noise
        #[arg(long, default_value_t = 0.01)]
        amplitude: f32,
        /// Input device name for `--input mic`
        #[arg(long)]
        device: Option<String>,
        #[arg(long, default_value = "other")]
        source: NoiseSource,
        #[arg(long)]
        annoyance: Option<u8>,
        /// With --longitude, print the validated submission body
        #[arg(long, requires = "longitude")]
        latitude: Option<f64>,
        #[arg(long, requires = "latitude")]
        longitude: Option<f64>,
    },
    /// Read or write the stored microphone offset
    Calibrate {
        #[command(subcommand)]
        action: CalibrateAction,
    },
    /// Render a GeoJSON file through the IDW engine and summarize the raster
    Render {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value_t = 39.105)]
        center_lat: f64,
        #[arg(long, default_value_t = 26.56)]
        center_lon: f64,
        #[arg(long, default_value_t = 15.0)]
        zoom: f64,
        #[arg(long, default_value_t = 800)]
        width: u32,
        #[arg(long, default_value_t = 600)]
        height: u32,
        /// Write every painted cell instead of the summary
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum CalibrateAction {
    Get,
    Set { offset: i32 },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum InputKind {
    /// Seeded white noise
    Synthetic,
    Wav,
    /// Live microphone (requires the live_audio feature)
    Mic,
}

#[derive(Serialize)]
struct RecordSummary {
    average_db: f64,
    readings: usize,
    calibration_offset: i32,
}

#[derive(Serialize)]
struct RenderSummary {
    points: usize,
    painted_cells: usize,
    min_value: Option<f64>,
    max_value: Option<f64>,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    noise_watch::init_logging(cli.verbose);

    let config = match cli.config.or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from)) {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::load(),
    };

    match cli.command {
        Commands::Serve { bind } => run_serve(&config, bind),
        Commands::Record {
            input,
            wav,
            amplitude,
            device,
            source,
            annoyance,
            latitude,
            longitude,
        } => {
            let capture = open_capture(&config, input, wav, amplitude, device)?;
            let position = latitude.zip(longitude).map(|(lat, lon)| GeoPosition::new(lat, lon));
            run_record(&config, capture, source, annoyance, position)
        }
        Commands::Calibrate { action } => run_calibrate(&config, action),
        Commands::Render {
            input,
            center_lat,
            center_lon,
            zoom,
            width,
            height,
            output,
        } => {
            let viewport = Viewport::new(center_lat, center_lon, zoom, width, height);
            run_render(&config, &input, &viewport, output)
        }
    }
}

fn run_serve(config: &AppConfig, bind: Option<SocketAddr>) -> Result<ExitCode> {
    let addr = match bind {
        Some(addr) => addr,
        None => config
            .server
            .bind_addr
            .parse()
            .with_context(|| format!("invalid server.bind_addr {}", config.server.bind_addr))?,
    };

    let state = ApiState::new(Arc::new(InMemoryRepository::new()), config.server.clone());
    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(run_http_server(state, addr))?;
    Ok(ExitCode::SUCCESS)
}

fn open_capture(
    config: &AppConfig,
    input: InputKind,
    wav: Option<PathBuf>,
    amplitude: f32,
    device: Option<String>,
) -> Result<Arc<dyn AudioCapture>> {
    let block_size = config.meter.block_size;
    match input {
        InputKind::Synthetic => {
            let sample_rate = 48_000;
            let samples = sample_rate as u64 * config.session.duration_ms / 1000;
            let blocks = (samples as usize).div_ceil(block_size);
            Ok(Arc::new(
                ScriptedCapture::noise(amplitude, sample_rate, block_size, blocks, 7)
                    .with_blocks_per_read(8),
            ))
        }
        InputKind::Wav => {
            let Some(path) = wav else {
                bail!("--input wav needs --wav <path>");
            };
            Ok(Arc::new(WavCapture::new(path, block_size)))
        }
        InputKind::Mic => open_microphone(config, device),
    }
}

#[cfg(feature = "live_audio")]
fn open_microphone(config: &AppConfig, device: Option<String>) -> Result<Arc<dyn AudioCapture>> {
    Ok(Arc::new(
        noise_watch::audio::CpalCapture::new(device)
            .with_pool(config.meter.buffer_pool_size, config.meter.block_size),
    ))
}

#[cfg(not(feature = "live_audio"))]
fn open_microphone(_config: &AppConfig, _device: Option<String>) -> Result<Arc<dyn AudioCapture>> {
    bail!("live microphone capture needs the live_audio feature")
}

fn run_record(
    config: &AppConfig,
    capture: Arc<dyn AudioCapture>,
    source: NoiseSource,
    annoyance: Option<u8>,
    position: Option<GeoPosition>,
) -> Result<ExitCode> {
    let store = Arc::new(FileCalibrationStore::with_default(
        &config.calibration.store_path,
        config.calibration.default_offset,
    ));
    let mut controller =
        SessionController::new(capture, store, config.meter.clone(), &config.session);
    let cancel = Arc::new(AtomicBool::new(false));

    let result = match controller.record_blocking(Duration::from_millis(20), &cancel) {
        Ok(Some(result)) => result,
        Ok(None) => {
            eprintln!("Recording cancelled");
            return Ok(ExitCode::from(2));
        }
        Err(err) => {
            eprintln!("{}", err.message());
            return Ok(ExitCode::from(2));
        }
    };

    let summary = RecordSummary {
        average_db: result.rounded_decibels(),
        readings: result.reading_count,
        calibration_offset: result.calibration_offset,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if let Some(position) = position {
        let submission = MeasurementReport::from_session(&result, source, annoyance).at(position);
        if let Err(err) = submission.validate(&config.server) {
            eprintln!("{}", err.message());
            return Ok(ExitCode::from(3));
        }
        println!("{}", serde_json::to_string_pretty(&submission)?);
    }

    Ok(ExitCode::SUCCESS)
}

fn run_calibrate(config: &AppConfig, action: CalibrateAction) -> Result<ExitCode> {
    let store = FileCalibrationStore::with_default(
        &config.calibration.store_path,
        config.calibration.default_offset,
    );
    match action {
        CalibrateAction::Get => println!("{}", store.get()),
        CalibrateAction::Set { offset } => {
            store
                .set(offset)
                .with_context(|| format!("failed to save offset to {:?}", store.path()))?;
            println!("{}", offset);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn run_render(
    config: &AppConfig,
    input: &Path,
    viewport: &Viewport,
    output: Option<PathBuf>,
) -> Result<ExitCode> {
    let contents =
        fs::read_to_string(input).with_context(|| format!("failed to read {:?}", input))?;
    let collection: FeatureCollection =
        serde_json::from_str(&contents).with_context(|| format!("invalid GeoJSON in {:?}", input))?;
    let points = extract_points(&collection);

    let lut = ColorLut::build(&config.idw.gradient);
    let frame = render(viewport, &points, &config.idw, &lut);

    let values = frame.cells.iter().map(|cell| cell.value);
    let summary = RenderSummary {
        points: points.len(),
        painted_cells: frame.cells.len(),
        min_value: values.clone().reduce(f64::min),
        max_value: values.reduce(f64::max),
    };

    if let Some(path) = output {
        fs::write(&path, serde_json::to_string_pretty(&frame)?)
            .with_context(|| format!("failed to write {:?}", path))?;
    }
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(ExitCode::SUCCESS)
}
