use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use quizcut::bank::{self, VideoSegment};
use quizcut::{AppConfig, CuePolicy, Generator, SegmentSource, SkeletonKind, TemplateRepository, TemplateSet};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "quizcut")]
#[command(about = "Interactive video question builder", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./quizcut.* when present)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct BankArgs {
    /// Path to the question bank text file
    #[arg(value_name = "BANK")]
    bank: PathBuf,

    /// Segment manifest (TOML) or directory of video segments
    #[arg(short, long)]
    segments: PathBuf,

    /// How to treat a cue that does not name the next segment
    #[arg(long, value_enum)]
    cue_policy: Option<CuePolicy>,

    /// Segment file extension used when scanning a directory
    #[arg(long)]
    extension: Option<String>,

    /// Directory with skeleton overrides (missing files fall back to builtin)
    #[arg(long)]
    templates: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build h5p.json and content/content.json
    Build {
        #[command(flatten)]
        input: BankArgs,

        /// Merged video the interactions play over
        #[arg(long)]
        video: PathBuf,

        /// Package title
        #[arg(long)]
        title: String,

        /// Output directory
        #[arg(short, long, default_value = "output")]
        out: PathBuf,
    },
    /// Parse and schedule a question bank without writing anything
    Inspect {
        #[command(flatten)]
        input: BankArgs,

        /// Print the scheduled sets as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a builtin skeleton
    Skeleton {
        #[arg(value_enum)]
        kind: SkeletonKind,
    },
}

struct Input {
    bank: String,
    segments: Vec<VideoSegment>,
    templates: TemplateSet,
}

fn load_input(args: &BankArgs, config: &mut AppConfig) -> Result<Input> {
    if let Some(policy) = args.cue_policy {
        config.timeline.cue_policy = policy;
    }
    if let Some(extension) = &args.extension {
        config.segments.extension = extension.trim_start_matches('.').to_string();
    }

    let bank = std::fs::read_to_string(&args.bank)
        .with_context(|| format!("Failed to read question bank: {}", args.bank.display()))?;
    let segments = SegmentSource::load(&args.segments, &config.segments.extension)?;

    let templates = match &args.templates {
        Some(dir) => TemplateSet::from_dir(dir)
            .with_context(|| format!("Failed to load skeletons from {}", dir.display()))?
            .with_fallback(TemplateSet::builtin()?),
        None => TemplateSet::builtin()?,
    };

    Ok(Input {
        bank,
        segments,
        templates,
    })
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let mut config = AppConfig::load_from(cli.config.as_deref())?;

    match cli.command {
        Commands::Skeleton { kind } => {
            let templates = TemplateSet::builtin()?;
            let skeleton = templates
                .skeleton(kind)
                .with_context(|| format!("No builtin skeleton for {}", kind))?;
            println!("{}", serde_json::to_string_pretty(skeleton)?);
        }
        Commands::Inspect { input, json } => {
            let input = load_input(&input, &mut config)?;
            let generator = Generator::new(&input.templates, &config)?;
            let sets = generator.schedule(&input.bank, &input.segments)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&sets)?);
            } else {
                println!("📋 Question Bank Summary:");
                print!("{}", bank::summarize(&sets));
            }
        }
        Commands::Build {
            input,
            video,
            title,
            out,
        } => {
            let input = load_input(&input, &mut config)?;
            let generator = Generator::new(&input.templates, &config)?;
            let package = generator.build(&input.bank, &input.segments, &video, &title)?;

            println!("📋 Question Bank Summary:");
            print!("{}", bank::summarize(&package.sets));

            let written = package
                .write(&out)
                .with_context(|| format!("Failed to write package to {}", out.display()))?;
            println!("\n📄 {} interactions written:", package.interactions);
            for path in written {
                println!("  ✓ {}", path.display());
            }
        }
    }

    Ok(())
}
