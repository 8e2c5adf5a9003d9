//! Audiosource - sample-accurate random access to decoded audio.
//!
//! This crate presents any audio track symphonia can demux and decode as a
//! flat, randomly addressable array of samples, with delay compensation and
//! a bounded frame cache in front of the decoder.

#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod output;
pub mod source;

use clap::Parser;
use cli::{Cli, Command, ExtractArgs, InfoArgs, SourceArgs};
use config::{Config, config_file_path, load_default_config, save_default_config, validate_config};
use constants::extract::{BLOCK_SAMPLES, DEFAULT_RAW_OUTPUT, DEFAULT_WAV_OUTPUT};
use output::{RawFileWriter, SampleWriter, WavFileWriter, progress};
use serde::Serialize;
use source::{
    AudioProperties, AudioSource, DelaySpec, EngineStats, HostSampleType, SourceOptions,
    TrackSelector,
};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};

pub use error::{Error, ErrorKind, Result};

/// Main entry point for the audiosource CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    let config = load_default_config()?;
    validate_config(&config)?;

    match cli.command {
        Command::Info(args) => handle_info(&args, &config),
        Command::Extract(args) => handle_extract(&args, &config, cli.quiet),
        Command::Config { action } => handle_config_command(action),
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter_str = if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info,symphonia=warn",
            1 => "debug,symphonia=info",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_str));

    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

/// Open the source described by the command line, falling back to config
/// defaults for anything not given.
fn open_source(args: &SourceArgs, config: &Config) -> Result<AudioSource> {
    let defaults = &config.defaults;

    let mut options = SourceOptions::from(defaults);
    options.enable_external_references |= args.enable_drefs;
    options.resolve_relative_paths |= args.absolute_paths;
    if let Some(drc_scale) = args.drc_scale {
        options.drc_scale = drc_scale;
    }

    let track = TrackSelector::from(args.track.or(defaults.track));
    let delay = DelaySpec {
        adjustment: args.delay,
        auto: args.auto_delay,
    };

    let mut source = AudioSource::open(&args.input, track, delay, &options, &config.engine)?;
    if args.exact || defaults.exact_samples {
        source.establish_exact_duration()?;
    }
    Ok(source)
}

/// Properties report printed by `info`.
#[derive(Debug, Serialize)]
struct InfoReport<'a> {
    path: &'a PathBuf,
    #[serde(flatten)]
    properties: &'a AudioProperties,
    bits_per_sample: u32,
    bytes_per_sample: usize,
    duration_secs: f64,
    delay_samples: i64,
    host_format: Option<HostSampleType>,
    stats: EngineStats,
}

fn handle_info(args: &InfoArgs, config: &Config) -> Result<()> {
    let source = open_source(&args.source, config)?;
    let properties = source.properties();

    let report = InfoReport {
        path: &args.source.input,
        properties,
        bits_per_sample: properties.bits_per_sample(),
        bytes_per_sample: properties.bytes_per_sample(),
        duration_secs: properties.duration_secs(),
        delay_samples: source.delay_offset(),
        host_format: properties.host_format().ok(),
        stats: source.stats(),
    };

    if args.json {
        let json = serde_json::to_string_pretty(&report).map_err(|e| Error::Internal {
            message: format!("failed to serialize properties: {e}"),
        })?;
        println!("{json}");
        return Ok(());
    }

    println!("File:        {}", report.path.display());
    println!("Format:      {} ({} bits)", properties.format, report.bits_per_sample);
    println!("Channels:    {} (layout 0x{:x})", properties.channels, properties.channel_layout);
    println!("Sample rate: {} Hz", properties.sample_rate);
    println!(
        "Samples:     {}{}",
        properties.num_samples,
        if properties.exact_samples { " (exact)" } else { "" }
    );
    println!("Duration:    {:.3}s", report.duration_secs);
    println!("Delay:       {} samples", report.delay_samples);
    Ok(())
}

fn handle_extract(args: &ExtractArgs, config: &Config, quiet: bool) -> Result<()> {
    let extract_start = Instant::now();
    let mut source = open_source(&args.source, config)?;
    let properties = source.properties().clone();

    let total = i64::try_from(properties.num_samples).unwrap_or(i64::MAX);
    let count = match args.count {
        Some(count) => count,
        None if args.start < total => total - args.start,
        None => {
            return Err(Error::InvalidRange {
                start: args.start,
                count: 0,
            });
        }
    };

    let output = args.output.clone().unwrap_or_else(|| {
        PathBuf::from(if args.raw {
            DEFAULT_RAW_OUTPUT
        } else {
            DEFAULT_WAV_OUTPUT
        })
    });

    let mut writer: Box<dyn SampleWriter> = if args.raw {
        Box::new(RawFileWriter::create(&output, &properties)?)
    } else {
        Box::new(WavFileWriter::create(&output, &properties)?)
    };

    info!(
        "Extracting {} samples from {} starting at {}",
        count,
        args.source.input.display(),
        args.start
    );

    let file_name = args
        .source
        .input
        .file_name()
        .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
    let progress_enabled = !quiet && !args.no_progress && !config.defaults.no_progress;
    let pb = progress::create_sample_progress(count.unsigned_abs(), &file_name, progress_enabled);

    let mut position = args.start;
    let end = args.start.saturating_add(count);
    while position < end {
        let block = (end - position).min(i64::try_from(BLOCK_SAMPLES).unwrap_or(i64::MAX));
        let planes = source.get_audio_planar(position, block)?;
        let block_len = usize::try_from(block).map_err(|_| Error::InvalidRange {
            start: position,
            count: block,
        })?;
        writer.write_block(&planes, block_len)?;
        progress::inc_progress(pb.as_ref(), block.unsigned_abs());
        position += block;
    }
    writer.finalize()?;
    progress::finish_progress(pb, "Complete");

    let stats = source.stats();
    debug!(
        seeks = stats.seeks,
        frames_decoded = stats.frames_decoded,
        cache_hits = stats.cache_hits,
        cache_misses = stats.cache_misses,
        evictions = stats.evictions,
        "extraction statistics"
    );
    info!(
        "Wrote {} in {:.2}s",
        output.display(),
        extract_start.elapsed().as_secs_f64()
    );
    Ok(())
}

fn handle_config_command(action: cli::ConfigAction) -> Result<()> {
    use cli::ConfigAction;

    match action {
        ConfigAction::Init => {
            let path = config_file_path()?;
            if path.exists() {
                println!("Configuration file already exists: {}", path.display());
            } else {
                let config = Config::default();
                let saved_path = save_default_config(&config)?;
                println!("Created configuration file: {}", saved_path.display());
            }
            Ok(())
        }
        ConfigAction::Show => {
            let config = load_default_config()?;
            println!("{config:#?}");
            Ok(())
        }
        ConfigAction::Path => {
            let path = config::config_file_path()?;
            println!("{}", path.display());
            Ok(())
        }
    }
}
