mod cli;

use std::fs;
use std::process::ExitCode;

use bytes::Bytes;
use clap::Parser;
use cli::Cli;
use mp4_demux::{DemuxEvent, DemuxerConfig, StreamDriver};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Respect RUST_LOG env var; otherwise use defaults based on the verbose flag.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "mp4_demux=trace".to_string()
        } else {
            "mp4_demux=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&env_filter))
        .init();

    match demux_file(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn demux_file(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.input.exists() {
        return Err(format!("Input file does not exist: {}", cli.input.display()).into());
    }

    let bytes = fs::read(&cli.input)?;
    tracing::info!("Demuxing {} ({} bytes)", cli.input.display(), bytes.len());

    let mut driver = StreamDriver::new(DemuxerConfig::default());
    let mut sample_count = 0u64;
    let mut byte_offset = 0u64;

    for chunk in bytes.chunks(cli.chunk_size.max(1)) {
        let outcome = driver.parse_chunk(Bytes::copy_from_slice(chunk), byte_offset)?;
        byte_offset += chunk.len() as u64;

        for event in outcome.events {
            match event {
                DemuxEvent::MediaInfo(info) => {
                    println!(
                        "media info: {}x{} @ {:.3} fps, codec {}, duration {} ms, audio={} video={}",
                        info.width,
                        info.height,
                        info.fps,
                        info.codec,
                        info.duration_ms,
                        info.has_audio,
                        info.has_video
                    );
                }
                DemuxEvent::TrackMetadata(meta) => {
                    println!(
                        "track {}: codec {}, profile {} level {}, timescale {}",
                        meta.track_id, meta.codec, meta.profile, meta.level, meta.timescale
                    );
                }
                DemuxEvent::DataAvailable { video_samples } => {
                    for sample in &video_samples {
                        sample_count += 1;
                        if cli.samples {
                            println!(
                                "sample {}: dts={} pts={} keyframe={} nal_units={}",
                                sample_count,
                                sample.dts,
                                sample.pts,
                                sample.is_keyframe,
                                sample.nal_units.len()
                            );
                        }
                    }
                }
                DemuxEvent::Error { kind, message } => {
                    return Err(format!("{kind:?}: {message}").into());
                }
            }
        }
    }

    println!("done: {sample_count} video samples, final state {:?}", driver.state());
    Ok(())
}
