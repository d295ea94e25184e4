use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use multitrack_engine::audio::{load_wav, save_wav, Clip, RecordingMode, TransportState};
use multitrack_engine::config::EngineConfig;
use multitrack_engine::engine::{DesktopStubBackend, Player};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "multitrack_cli",
    about = "Offline renderer and playback harness for the multitrack engine"
)]
struct Cli {
    /// JSON engine configuration (defaults are used when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Mix WAV files offline into a single WAV file
    Render {
        /// Input tracks as FILE or FILE@OFFSET_FRAMES
        #[arg(required = true, value_parser = parse_track_spec)]
        tracks: Vec<(PathBuf, usize)>,
        #[arg(long, short)]
        output: PathBuf,
        /// Mix the metronome click into the render
        #[arg(long)]
        click: bool,
        #[arg(long)]
        bpm: Option<f64>,
        /// Loop region as START:END in frames
        #[arg(long, value_parser = parse_loop_region)]
        loop_region: Option<(i64, i64)>,
        /// Frames to render; required when looping
        #[arg(long)]
        frames: Option<usize>,
    },
    /// Punch-record a WAV take onto a base track and write the result
    Punch {
        #[arg(long)]
        base: PathBuf,
        #[arg(long)]
        take: PathBuf,
        /// Timeline frame where recording starts
        #[arg(long, default_value_t = 0)]
        at: i64,
        #[arg(long, value_enum, default_value_t = ModeArg::Replace)]
        mode: ModeArg,
        #[arg(long, short)]
        output: PathBuf,
    },
    /// Play WAV files through the default audio device until they end
    Play {
        #[arg(required = true, value_parser = parse_track_spec)]
        tracks: Vec<(PathBuf, usize)>,
        #[arg(long)]
        click: bool,
    },
    /// List audio devices
    Devices,
    /// Print the effective configuration as JSON
    Config,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    Replace,
    Mix,
}

impl From<ModeArg> for RecordingMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Replace => RecordingMode::Replace,
            ModeArg::Mix => RecordingMode::Mix,
        }
    }
}

#[derive(Serialize)]
struct RenderReport {
    output: PathBuf,
    frames: usize,
    channels: usize,
    sample_rate: u32,
    duration_seconds: f64,
}

impl RenderReport {
    fn new(output: &Path, clip: &Clip) -> Self {
        Self {
            output: output.to_path_buf(),
            frames: clip.length_frames(),
            channels: clip.channels(),
            sample_rate: clip.sample_rate(),
            duration_seconds: clip.duration_seconds(),
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

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
    let config = match &cli.config {
        Some(path) => EngineConfig::load_from_file(path),
        None => EngineConfig::default(),
    };
    config.validate().context("validating engine configuration")?;

    match cli.command {
        Commands::Render {
            tracks,
            output,
            click,
            bpm,
            loop_region,
            frames,
        } => run_render(config, &tracks, &output, click, bpm, loop_region, frames),
        Commands::Punch {
            base,
            take,
            at,
            mode,
            output,
        } => run_punch(config, &base, &take, at, mode.into(), &output),
        Commands::Play { tracks, click } => run_play(config, &tracks, click),
        Commands::Devices => run_devices(),
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(ExitCode::from(0))
        }
    }
}

fn parse_track_spec(value: &str) -> Result<(PathBuf, usize), String> {
    match value.rsplit_once('@') {
        Some((path, offset)) => offset
            .parse()
            .map(|offset| (PathBuf::from(path), offset))
            .map_err(|err| format!("invalid offset '{offset}': {err}")),
        None => Ok((PathBuf::from(value), 0)),
    }
}

fn parse_loop_region(value: &str) -> Result<(i64, i64), String> {
    let (start, end) = value
        .split_once(':')
        .ok_or_else(|| format!("expected START:END, got '{value}'"))?;
    let start = start.parse().map_err(|err| format!("invalid loop start: {err}"))?;
    let end = end.parse().map_err(|err| format!("invalid loop end: {err}"))?;
    Ok((start, end))
}

fn load_tracks(player: &Player, tracks: &[(PathBuf, usize)]) -> Result<()> {
    for (path, offset) in tracks {
        player
            .load_track(path, *offset)
            .with_context(|| format!("loading track {}", path.display()))?;
    }
    Ok(())
}

fn run_render(
    mut config: EngineConfig,
    tracks: &[(PathBuf, usize)],
    output: &Path,
    click: bool,
    bpm: Option<f64>,
    loop_region: Option<(i64, i64)>,
    frames: Option<usize>,
) -> Result<ExitCode> {
    if let Some(bpm) = bpm {
        config.metronome.tempo_bpm = bpm;
    }
    let block_size = config.audio.block_size;
    let (player, stub) = Player::with_stub_backend(config).context("creating offline player")?;
    load_tracks(&player, tracks)?;

    if click {
        player.toggle_click()?;
    }
    if let Some((start, end)) = loop_region {
        if !player.set_loop_points(start, end)? {
            bail!("invalid loop region {start}:{end}");
        }
    }

    let limit = match (frames, loop_region) {
        (Some(frames), _) => frames,
        (None, Some(_)) => bail!("--frames is required when rendering a loop"),
        (None, None) => player.status()?.total_duration_frames,
    };

    player.play().context("starting offline playback")?;
    let clip = render_offline(&player, &stub, block_size, limit)?;
    player.stop()?;

    save_wav(output, &clip).with_context(|| format!("writing {}", output.display()))?;
    println!("{}", serde_json::to_string(&RenderReport::new(output, &clip))?);
    Ok(ExitCode::from(0))
}

/// Pull blocks until `limit` frames are rendered or playback auto-stops.
fn render_offline(
    player: &Player,
    stub: &Arc<DesktopStubBackend>,
    block_size: usize,
    limit: usize,
) -> Result<Clip> {
    let channels = stub.output_channels();
    let mut samples = Vec::with_capacity(limit * channels);
    let mut rendered = 0;
    while rendered < limit {
        let frames = block_size.min(limit - rendered);
        samples.extend(stub.pump_output(frames));
        rendered += frames;
        if player.transport_state()? != TransportState::Playing {
            break;
        }
    }
    let sample_rate = player.config().audio.sample_rate;
    Ok(Clip::new("render", sample_rate, channels, samples))
}

fn run_punch(
    mut config: EngineConfig,
    base: &Path,
    take: &Path,
    at: i64,
    mode: RecordingMode,
    output: &Path,
) -> Result<ExitCode> {
    let base_clip = load_wav(base).with_context(|| format!("loading base {}", base.display()))?;
    let take_clip = load_wav(take).with_context(|| format!("loading take {}", take.display()))?;
    if base_clip.sample_rate() != take_clip.sample_rate() {
        tracing::warn!(
            "[Punch] Take sample rate {} differs from base {}; no resampling is done",
            take_clip.sample_rate(),
            base_clip.sample_rate()
        );
    }

    // The take is fed as captured input, so the streams take its shape.
    config.audio.sample_rate = base_clip.sample_rate();
    config.audio.output_channels = base_clip.channels();
    config.audio.input_channels = take_clip.channels();
    config.transport.recording_mode = mode;
    let block_size = config.audio.block_size;

    let (player, stub) = Player::with_stub_backend(config).context("creating offline player")?;
    let index = player.load_track(base, 0)?;
    player.select_track(index)?;
    player.toggle_arm()?;
    let start = player.set_position(at)?;
    if start as i64 != at {
        tracing::warn!("[Punch] Punch point {at} clamped to {start}");
    }

    player.start_recording().context("starting punch recording")?;
    for block in take_clip.samples().chunks(block_size * take_clip.channels()) {
        stub.pump_duplex(block);
    }
    let landed = player.stop_recording()?.unwrap_or(index);
    player.stop()?;

    player
        .save_track(landed, output, 0, None)
        .with_context(|| format!("writing {}", output.display()))?;
    let written = load_wav(output)?;
    println!("{}", serde_json::to_string(&RenderReport::new(output, &written))?);
    Ok(ExitCode::from(0))
}

fn run_play(config: EngineConfig, tracks: &[(PathBuf, usize)], click: bool) -> Result<ExitCode> {
    let player = Player::with_default_backend(config).context("opening audio device")?;
    load_tracks(&player, tracks)?;
    if click {
        player.toggle_click()?;
    }

    let total = player.total_duration_seconds()?;
    player.play().context("starting playback")?;
    eprintln!("Playing {:.2}s ...", total);
    while player.transport_state()? == TransportState::Playing {
        thread::sleep(Duration::from_millis(100));
    }
    eprintln!("Stopped at {:.2}s", player.current_time_seconds()?);
    player.stop()?;
    Ok(ExitCode::from(0))
}

#[cfg(not(target_os = "android"))]
fn run_devices() -> Result<ExitCode> {
    let (inputs, outputs) =
        multitrack_engine::engine::list_devices().context("enumerating audio devices")?;
    println!("Inputs:");
    for name in inputs {
        println!("  {name}");
    }
    println!("Outputs:");
    for name in outputs {
        println!("  {name}");
    }
    Ok(ExitCode::from(0))
}

#[cfg(target_os = "android")]
fn run_devices() -> Result<ExitCode> {
    bail!("device listing is not available on this platform")
}
