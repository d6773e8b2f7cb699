use clap::Parser;
use pdf_ocr_extract::{config, document, save_text, Config, Pipeline};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "pdf-ocr-extract")]
#[command(about = "Extract text from PDFs and images, with OCR for scanned pages")]
#[command(version)]
pub struct Args {
    /// PDF or image file, or a folder of them
    pub input: PathBuf,

    /// Save extracted text into the output directory
    #[arg(short, long)]
    pub save: bool,

    /// File name for the saved text (single file only; default: <input stem>.txt)
    #[arg(short = 'o', long, requires = "save")]
    pub output_name: Option<String>,

    /// Directory saved text is written to
    #[arg(long, env = "OCR_OUTPUT_DIR", default_value = config::DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Language for OCR (e.g., "eng", "spa", "deu")
    #[arg(long, env = "OCR_DEFAULT_LANGUAGE", default_value = config::DEFAULT_LANGUAGE)]
    pub language: String,

    /// OCR engine to use (ocrs, leptess); defaults to the first one compiled in
    #[arg(long, env = "OCR_ENGINE")]
    pub engine: Option<String>,

    /// Number of images recognized in parallel (default: number of CPUs)
    #[arg(short, long, env = "OCR_CONCURRENCY")]
    pub jobs: Option<usize>,

    /// Give up on a single image after this many seconds
    #[arg(long, env = "OCR_TIMEOUT_SECS")]
    pub ocr_timeout_secs: Option<u64>,

    /// Path to tessdata directory (uses TESSDATA_PREFIX env var if not set)
    #[arg(long, env = "TESSDATA_PREFIX")]
    pub tessdata_path: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

impl From<&Args> for Config {
    fn from(args: &Args) -> Self {
        let mut config = Config::default()
            .with_language(args.language.clone())
            .with_output_dir(args.output_dir.clone());
        if let Some(engine) = &args.engine {
            config = config.with_engine(engine.clone());
        }
        if let Some(jobs) = args.jobs {
            config = config.with_concurrency(jobs);
        }
        if let Some(secs) = args.ocr_timeout_secs {
            config = config.with_ocr_timeout(Duration::from_secs(secs));
        }
        config.tessdata_path = args.tessdata_path.clone();
        config
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr so extracted text on stdout stays clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    run_detached(runtime, run(args))
}

/// Drive `future` to completion, then shut the runtime down without
/// joining blocking OCR threads that outlived their timeout
fn run_detached<F: Future>(runtime: Runtime, future: F) -> F::Output {
    let output = runtime.block_on(future);
    runtime.shutdown_background();
    output
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = Config::from(&args);

    tracing::info!("Starting pdf-ocr-extract v{}", env!("CARGO_PKG_VERSION"));

    let pipeline = Pipeline::from_config(config)?;
    tracing::info!(
        "Using {} engine, language {}, concurrency {}",
        pipeline.engine_name(),
        pipeline.config().language,
        pipeline.config().concurrency
    );

    if args.input.is_dir() {
        process_folder(&pipeline, &args).await
    } else {
        process_single_file(&pipeline, &args).await
    }
}

async fn process_single_file(pipeline: &Pipeline, args: &Args) -> anyhow::Result<()> {
    let text = pipeline.process(&args.input).await?;
    println!("{}", text);

    if args.save {
        let file_name = args
            .output_name
            .clone()
            .unwrap_or_else(|| default_output_name(&args.input));
        let path = save_text(&pipeline.config().output_dir, &text, &file_name)?;
        eprintln!("Saved to {}", path.display());
    }

    Ok(())
}

async fn process_folder(pipeline: &Pipeline, args: &Args) -> anyhow::Result<()> {
    let files = supported_files(&args.input)?;
    if files.is_empty() {
        eprintln!(
            "No supported files ({}) found in {}",
            document::SUPPORTED_EXTENSIONS.join(", "),
            args.input.display()
        );
        return Ok(());
    }

    let mut failures = 0usize;
    for file in &files {
        let name = file.file_name().unwrap_or_default().to_string_lossy();
        let text = match pipeline.process(file).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("Failed to process {}: {}", name, e);
                failures += 1;
                continue;
            }
        };

        println!("\n--- Text extracted from {} ---", name);
        println!("{}", text);

        if args.save {
            match save_text(&pipeline.config().output_dir, &text, &default_output_name(file)) {
                Ok(path) => eprintln!("Saved to {}", path.display()),
                Err(e) => tracing::error!("Failed to save text of {}: {}", name, e),
            }
        }
    }

    tracing::info!(
        "Processed {} of {} files in {}",
        files.len() - failures,
        files.len(),
        args.input.display()
    );
    Ok(())
}

/// Files in `dir` with a supported extension, sorted by name
fn supported_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && document::has_supported_extension(path))
        .collect();
    files.sort();
    Ok(files)
}

fn default_output_name(input: &Path) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "extracted".to_string());
    format!("{}.txt", stem)
}
