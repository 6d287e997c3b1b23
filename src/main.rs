use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tracing::Level;

use textanim::audio::SilentMixer;
use textanim::config::AnimatorConfig;
use textanim::encoding::{CodecProfile, QualityProfile, VideoCodec};
use textanim::error::find_anim_error;
use textanim::pipeline::{GenerateOptions, TextAnimator};
use textanim::probe::VideoProber;
use textanim::renderer::StyleRenderer;
use textanim::request::{CanvasSize, RenderRequest};
use textanim::sequence::FrameSequenceGenerator;
use textanim::StyleCatalog;

const LONG_VERSION: &str = env!("TEXTANIM_LONG_VERSION");

#[derive(Debug, Parser)]
#[command(name = "textanim")]
#[command(about = "Render animated text styles to frames and MP4")]
#[command(version, long_version = LONG_VERSION)]
struct Cli {
    /// Debug-level logging on stderr.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Only warnings and errors on stderr.
    #[arg(short, long, global = true)]
    quiet: bool,
    /// Machine-readable output on stdout.
    #[arg(long, global = true)]
    json: bool,
    /// YAML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Render and encode an MP4.
    Render {
        text: String,
        #[command(flatten)]
        render: RenderArgs,
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
        #[arg(long)]
        quality: Option<QualityProfile>,
        #[arg(long)]
        codec: Option<VideoCodec>,
        #[arg(long)]
        mix_audio: bool,
    },
    /// Write every frame as a PNG. Does not need ffmpeg.
    Frames {
        text: String,
        #[command(flatten)]
        render: RenderArgs,
        #[arg(long = "out-dir")]
        out_dir: PathBuf,
    },
    /// List available styles.
    Styles {
        #[arg(long)]
        styles: Option<PathBuf>,
    },
    /// Report stream facts of an encoded video.
    Probe { video: PathBuf },
}

#[derive(Debug, Args)]
struct RenderArgs {
    #[arg(short = 's', long)]
    style: String,
    #[arg(long)]
    fps: Option<u32>,
    #[arg(long)]
    duration: Option<f32>,
    #[arg(long)]
    width: Option<u32>,
    #[arg(long)]
    height: Option<u32>,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// TrueType/OpenType font; the built-in bitmap font is used otherwise.
    #[arg(long)]
    font: Option<PathBuf>,
    /// YAML style file extending the built-in catalog.
    #[arg(long)]
    styles: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            report_error(&error, cli.json);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let level = if verbose {
        Level::DEBUG
    } else if quiet {
        Level::WARN
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn report_error(error: &anyhow::Error, as_json: bool) {
    match (find_anim_error(error), as_json) {
        (Some(anim), true) => match serde_json::to_string_pretty(&anim.envelope()) {
            Ok(payload) => println!("{payload}"),
            Err(_) => eprintln!("{}: {}", anim.code(), anim.detail()),
        },
        (Some(anim), false) => eprintln!("{}: {}", anim.code(), anim.detail()),
        (None, true) => println!(
            "{}",
            json!({ "ok": false, "error": { "code": "ERROR", "message": format!("{error:#}") } })
        ),
        (None, false) => eprintln!("ERROR: {error:#}"),
    }
}

fn run(cli: &Cli) -> Result<()> {
    let mut config = AnimatorConfig::load_or_default(cli.config.as_deref())?;

    match &cli.command {
        Commands::Render {
            text,
            render,
            output,
            quality,
            codec,
            mix_audio,
        } => {
            apply_overrides(&mut config, render);
            let profile = CodecProfile::new(
                codec.unwrap_or(config.defaults.codec),
                quality.or(config.defaults.quality),
            );
            run_render(&config, text, render, output.as_deref(), profile, *mix_audio, cli.json)
        }
        Commands::Frames {
            text,
            render,
            out_dir,
        } => {
            apply_overrides(&mut config, render);
            run_frames(&config, text, render, out_dir, cli.json)
        }
        Commands::Styles { styles } => {
            if let Some(styles) = styles {
                config.styles = Some(styles.clone());
            }
            run_styles(&config.catalog()?, cli.json)
        }
        Commands::Probe { video } => run_probe(video, cli.json),
    }
}

fn apply_overrides(config: &mut AnimatorConfig, args: &RenderArgs) {
    if let Some(font) = &args.font {
        config.font = Some(font.clone());
    }
    if let Some(styles) = &args.styles {
        config.styles = Some(styles.clone());
    }
}

fn build_request(
    config: &AnimatorConfig,
    catalog: &StyleCatalog,
    text: &str,
    args: &RenderArgs,
) -> Result<RenderRequest> {
    let defaults = &config.defaults;
    let style = catalog.get(&args.style)?.clone();
    Ok(RenderRequest::new(text, style)
        .with_fps(args.fps.unwrap_or(defaults.fps))
        .with_duration(args.duration.unwrap_or(defaults.duration))
        .with_canvas(CanvasSize::new(
            args.width.unwrap_or(defaults.width),
            args.height.unwrap_or(defaults.height),
        ))
        .with_seed(args.seed))
}

fn run_render(
    config: &AnimatorConfig,
    text: &str,
    args: &RenderArgs,
    output: Option<&Path>,
    codec: CodecProfile,
    mix_audio: bool,
    as_json: bool,
) -> Result<()> {
    let catalog = config.catalog()?;
    let request = build_request(config, &catalog, text, args)?;
    let animator = TextAnimator::new(
        catalog,
        StyleRenderer::new(config.text_metrics()),
        config.encoder()?,
    )
    .with_mixer(Box::new(SilentMixer));

    let generated = animator.generate(&request, &GenerateOptions { codec, mix_audio })?;
    let output_path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&generated.file_name));
    fs::write(&output_path, &generated.video.bytes)
        .with_context(|| format!("failed to write {}", output_path.display()))?;

    if as_json {
        let payload = json!({
            "ok": true,
            "path": output_path.display().to_string(),
            "file_name": generated.file_name,
            "mime_type": generated.mime_type,
            "bytes": generated.video.len(),
            "codec": generated.video.codec,
            "frame_count": generated.video.frame_count,
            "metadata": generated.metadata,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!(
            "Wrote {} ({}x{}, {} fps, {} frames, {})",
            output_path.display(),
            generated.video.width,
            generated.video.height,
            generated.video.fps,
            generated.video.frame_count,
            generated.video.codec
        );
    }
    Ok(())
}

fn run_frames(
    config: &AnimatorConfig,
    text: &str,
    args: &RenderArgs,
    out_dir: &Path,
    as_json: bool,
) -> Result<()> {
    let catalog = config.catalog()?;
    let request = build_request(config, &catalog, text, args)?;
    let renderer = StyleRenderer::new(config.text_metrics());
    let generator = FrameSequenceGenerator::new(&renderer, &request)?;

    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;
    for (index, frame) in generator.frames().enumerate() {
        let path = out_dir.join(format!("frame_{index:05}.png"));
        frame?.save_png(&path)?;
    }

    if as_json {
        let payload = json!({
            "ok": true,
            "out_dir": out_dir.display().to_string(),
            "frame_count": generator.total_frames(),
            "width": request.canvas.width,
            "height": request.canvas.height,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!(
            "Wrote {} frames to {}",
            generator.total_frames(),
            out_dir.display()
        );
    }
    Ok(())
}

fn run_styles(catalog: &StyleCatalog, as_json: bool) -> Result<()> {
    if as_json {
        let styles = catalog.iter().collect::<Vec<_>>();
        println!("{}", serde_json::to_string_pretty(&styles)?);
        return Ok(());
    }
    for style in catalog.iter() {
        println!(
            "{:<12} {:<16} {:<10} {:>3}px",
            style.key,
            style.name,
            style.animation.as_str(),
            style.font_size
        );
    }
    Ok(())
}

fn run_probe(video: &Path, as_json: bool) -> Result<()> {
    let probe = VideoProber::default().probe_file(video)?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&probe)?);
    } else {
        println!(
            "{}: {}x{}, codec {}, frames {}",
            video.display(),
            probe.width,
            probe.height,
            probe.codec_name.as_deref().unwrap_or("unknown"),
            probe
                .frame_count
                .map_or_else(|| "unknown".to_owned(), |count| count.to_string())
        );
    }
    Ok(())
}
