use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::error;

use lsbsteg::config::{DEFAULT_FFMPEG, DEFAULT_FFPROBE};
use lsbsteg::pipeline;
use lsbsteg::{MediaKind, StegoConfig, StegoError, TextEncoding};

/// lsbsteg: hide text in the least-significant bits of images, audio and video.
#[derive(Parser)]
#[command(name = "lsbsteg", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Hide a message in a carrier file
    Encode {
        /// Carrier file (image, audio or video)
        #[arg(short, long)]
        input: PathBuf,

        /// Output path (.png/.bmp for images, .wav for audio, .mkv/.avi for video)
        #[arg(short, long)]
        output: PathBuf,

        /// Message text
        #[arg(short, long, conflicts_with = "message_file", required_unless_present = "message_file")]
        message: Option<String>,

        /// Read the message from a file instead
        #[arg(long)]
        message_file: Option<PathBuf>,

        /// Do not copy the source audio track into an encoded video
        #[arg(long)]
        no_audio: bool,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Recover a hidden message from a carrier file
    Decode {
        /// Carrier file
        #[arg(short, long)]
        input: PathBuf,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Show how many message bytes a carrier can hold
    Capacity {
        /// Carrier file
        #[arg(short, long)]
        input: PathBuf,

        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Carrier type (default: guessed from the file extension)
    #[arg(long, value_enum)]
    media: Option<MediaArg>,

    /// Store the message as UTF-8 instead of one byte per character
    #[arg(long)]
    utf8: bool,

    /// ffmpeg binary used for video
    #[arg(long, default_value = DEFAULT_FFMPEG)]
    ffmpeg: String,

    /// ffprobe binary used for video
    #[arg(long, default_value = DEFAULT_FFPROBE)]
    ffprobe: String,

    /// Hide the progress bar
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum MediaArg {
    Image,
    Audio,
    Video,
}

impl From<MediaArg> for MediaKind {
    fn from(arg: MediaArg) -> Self {
        match arg {
            MediaArg::Image => MediaKind::Image,
            MediaArg::Audio => MediaKind::Audio,
            MediaArg::Video => MediaKind::Video,
        }
    }
}

impl CommonArgs {
    fn config(&self) -> StegoConfig {
        StegoConfig {
            text_encoding: if self.utf8 {
                TextEncoding::Utf8
            } else {
                TextEncoding::Latin1
            },
            ffmpeg: self.ffmpeg.clone(),
            ffprobe: self.ffprobe.clone(),
            show_progress: !self.quiet,
            ..Default::default()
        }
    }

    fn media_kind(&self, input: &Path) -> Result<MediaKind> {
        match self.media {
            Some(arg) => Ok(arg.into()),
            None => MediaKind::from_path(input).with_context(|| {
                format!(
                    "cannot tell the media type of {}; pass --media",
                    input.display()
                )
            }),
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Encode {
            input,
            output,
            message,
            message_file,
            no_audio,
            common,
        } => {
            let message = match (message, message_file) {
                (Some(m), _) => m,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read message file {}", path.display()))?,
                (None, None) => anyhow::bail!("a message is required"),
            };
            if message.is_empty() {
                anyhow::bail!("message cannot be empty");
            }

            let kind = common.media_kind(&input)?;
            let cfg = StegoConfig {
                keep_audio: !no_audio,
                ..common.config()
            };
            let report = pipeline::encode_file(kind, &input, &output, &message, &cfg)?;
            println!(
                "Message encoded into {} ({} of {} carrier bytes used)",
                output.display(),
                report.bits_embedded,
                report.carrier_units
            );
        }

        Commands::Decode { input, common } => {
            let kind = common.media_kind(&input)?;
            let message = pipeline::decode_file(kind, &input, &common.config())?;
            println!("{}", message);
        }

        Commands::Capacity { input, common } => {
            let kind = common.media_kind(&input)?;
            let bytes = pipeline::capacity(kind, &input, &common.config())?;
            println!("{} bytes", bytes);
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if matches!(e.downcast_ref::<StegoError>(), Some(StegoError::NoHiddenMessage)) => {
            eprintln!("No hidden message found.");
            ExitCode::from(2)
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
