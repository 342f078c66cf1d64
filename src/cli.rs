use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(name = "mp4-demux")]
#[command(author, version, about = "Stream an MP4 file through the mp4-demux parser")]
pub struct Cli {
    /// MP4 file to demux
    #[arg(required = true)]
    pub input: PathBuf,

    /// Bytes fed to the parser per chunk, simulating a network read size
    #[arg(short = 's', long, default_value_t = 64 * 1024)]
    pub chunk_size: usize,

    /// Print each sample's NAL unit count and keyframe flag
    #[arg(long)]
    pub samples: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}
