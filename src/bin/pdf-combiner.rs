//! CLI binary for pdf-combiner.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PipelineConfig` and the request types, and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pdf_combiner::bridge::{serve_json_lines, spawn_bridge};
use pdf_combiner::{
    images_to_pdf, merge_pdfs, pdf_to_images, BatchSummary, HeicConverter, ImagesToPdfRequest,
    ItemError, MergeRequest, MethodCall, MethodResponse, OnItemError, PdfCombinerPlugin,
    PdfToImagesRequest, PipelineConfig, PipelineProgressCallback, PngCompression,
    ProgressCallback, ResizePolicy, SourceFile,
};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress bar over the items (files or pages) of one operation.
struct CliProgressCallback {
    bar: ProgressBar,
    unit: &'static str,
    skipped: AtomicUsize,
}

impl CliProgressCallback {
    fn new(unit: &'static str) -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self {
            bar,
            unit,
            skipped: AtomicUsize::new(0),
        })
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_start(&self, total: usize) {
        let style = ProgressStyle::with_template(&format!(
            "{{spinner:.cyan}} {{prefix:.bold}}  [{{bar:42.green/238}}] {{pos:>3}}/{{len}} {}  ⏱ {{elapsed_precise}}",
            self.unit
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);
        self.bar.set_length(total as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Processing");
    }

    fn on_item_complete(&self, _index: usize, _total: usize) {
        self.bar.inc(1);
    }

    fn on_item_skipped(&self, _index: usize, _total: usize, error: &ItemError) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!("  {} {}", red("✗"), red(&error.to_string())));
        self.bar.inc(1);
    }

    fn on_finish(&self, total: usize, succeeded: usize) {
        self.bar.finish_and_clear();
        let skipped = self.skipped.load(Ordering::SeqCst);
        if skipped == 0 {
            eprintln!("{} {} {} done", green("✔"), bold(&succeeded.to_string()), self.unit);
        } else {
            eprintln!(
                "{} {}/{} {} done  ({} skipped)",
                cyan("⚠"),
                bold(&succeeded.to_string()),
                total,
                self.unit,
                red(&skipped.to_string())
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Merge PDFs in order
  pdf-combiner merge a.pdf b.pdf c.pdf -o merged.pdf

  # One page per image, 800 px wide, height from the aspect ratio
  pdf-combiner images scan1.jpg scan2.heic -o scans.pdf --width 800 --keep-aspect-ratio

  # Every page to its own PNG
  pdf-combiner rasterize report.pdf -o pages/

  # All pages stacked into one PNG, best compression
  pdf-combiner rasterize report.pdf -o pages/ --combine --compression 9

  # One bridge call
  pdf-combiner call mergePdfs '{"paths":["a.pdf","b.pdf"],"outputDirPath":"m.pdf"}'

  # Newline-delimited JSON bridge on stdin/stdout
  pdf-combiner serve

ENVIRONMENT VARIABLES:
  PDF_COMBINER_ON_ERROR       abort | skip
  PDF_COMBINER_HEIC_CONVERTER HEIC converter template, e.g. "magick {input} {output}"
  PDF_COMBINER_PDFIUM_LIB     Explicit libpdfium path
  PDFIUM_LIB_PATH             Path to an existing libpdfium (checked before the cache)
  PDFIUM_AUTO_CACHE_DIR       Override the default pdfium cache directory
  RUST_LOG                    Log filter (overrides --verbose / --quiet)
"#;

/// Merge PDFs, build PDFs from images and rasterise PDF pages.
#[derive(Parser, Debug)]
#[command(
    name = "pdf-combiner",
    version,
    about = "Merge PDFs, build PDFs from images and rasterise PDF pages",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    global: GlobalArgs,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// What to do when one input fails: abort or skip.
    #[arg(long, global = true, env = "PDF_COMBINER_ON_ERROR", default_value = "abort")]
    on_error: OnItemError,

    /// HEIC/HEIF converter command with {input} and {output} placeholders.
    #[arg(long, global = true, env = "PDF_COMBINER_HEIC_CONVERTER")]
    heic_converter: Option<String>,

    /// Explicit PDFium shared library path.
    #[arg(long, global = true, env = "PDF_COMBINER_PDFIUM_LIB")]
    pdfium_lib: Option<PathBuf>,

    /// Never download PDFium; fail if no library is found.
    #[arg(long, global = true, env = "PDF_COMBINER_NO_DOWNLOAD")]
    no_download: bool,

    /// Print results as JSON.
    #[arg(long, global = true, env = "PDF_COMBINER_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, global = true, env = "PDF_COMBINER_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDF_COMBINER_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDF_COMBINER_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Concatenate PDFs in the given order.
    Merge {
        /// Source PDFs.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Output PDF.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Build a PDF with one page per image.
    Images {
        /// Source images (any format the image crate reads, plus HEIC/HEIF).
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Output PDF.
        #[arg(short, long)]
        output: PathBuf,
        /// Page width in pixels (0 = native).
        #[arg(long, default_value_t = 0)]
        width: u32,
        /// Page height in pixels (0 = native; ignored with --keep-aspect-ratio and --width).
        #[arg(long, default_value_t = 0)]
        height: u32,
        /// Derive the missing dimension from the image's aspect ratio.
        #[arg(long)]
        keep_aspect_ratio: bool,
    },

    /// Render PDF pages to PNG.
    Rasterize {
        /// Source PDF.
        input: PathBuf,
        /// Output directory.
        #[arg(short, long)]
        output: PathBuf,
        /// Image width in pixels (0 = native page width).
        #[arg(long, default_value_t = 0)]
        width: u32,
        /// Image height in pixels (0 = native page height).
        #[arg(long, default_value_t = 0)]
        height: u32,
        /// PNG compression, 0–9 (or 0–100, divided by ten).
        #[arg(long, default_value_t = 6,
              value_parser = clap::value_parser!(u32).range(0..=100))]
        compression: u32,
        /// Stack every page into a single image.
        #[arg(long)]
        combine: bool,
    },

    /// Send a single method call through the bridge and print the response.
    Call {
        /// Method name, e.g. mergePdfs.
        method: String,
        /// Arguments as a JSON map.
        #[arg(default_value = "{}")]
        arguments: String,
    },

    /// Serve newline-delimited JSON method calls on stdin/stdout.
    Serve,
}

impl Command {
    fn progress_unit(&self) -> Option<&'static str> {
        match self {
            Command::Merge { .. } => Some("files"),
            Command::Images { .. } => Some("images"),
            Command::Rasterize { .. } => Some("pages"),
            Command::Call { .. } | Command::Serve => None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let g = &cli.global;

    // ── Logging setup ────────────────────────────────────────────────────
    // INFO logs stay quiet while the progress bar is drawn.
    let unit = cli.command.progress_unit();
    let show_progress = !g.quiet && !g.no_progress && !g.json && unit.is_some();
    let filter = if g.verbose {
        "debug"
    } else if g.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Ensure PDFium engine is available ────────────────────────────────
    // First run downloads the library (~30 MB) into the pdfium-auto cache;
    // later runs only check the path.
    let needs_engine = !matches!(cli.command, Command::Call { .. } | Command::Serve);
    if needs_engine
        && g.pdfium_lib.is_none()
        && !g.no_download
        && pdfium_auto::cached_pdfium_path().is_none()
    {
        download_pdfium(g.quiet)?;
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress: Option<ProgressCallback> = match unit {
        Some(unit) if show_progress => {
            Some(CliProgressCallback::new(unit) as Arc<dyn PipelineProgressCallback>)
        }
        _ => None,
    };
    let config = build_config(g, progress)?;

    // ── Run ──────────────────────────────────────────────────────────────
    match cli.command {
        Command::Merge { inputs, output } => {
            let request = MergeRequest {
                sources: inputs.into_iter().map(SourceFile::from).collect(),
                output,
            };
            let out = merge_pdfs(request, &config).await.context("Merge failed")?;
            report(g, &[out.path.clone()], &out.summary, &out)?;
        }

        Command::Images {
            inputs,
            output,
            width,
            height,
            keep_aspect_ratio,
        } => {
            let request = ImagesToPdfRequest {
                sources: inputs.into_iter().map(SourceFile::from).collect(),
                output,
                resize: ResizePolicy::new(width, height, keep_aspect_ratio),
            };
            let out = images_to_pdf(request, &config)
                .await
                .context("Building the PDF failed")?;
            report(g, &[out.path.clone()], &out.summary, &out)?;
        }

        Command::Rasterize {
            input,
            output,
            width,
            height,
            compression,
            combine,
        } => {
            let request = PdfToImagesRequest {
                source: SourceFile::from(input),
                output_dir: output,
                size: ResizePolicy::new(width, height, false),
                compression: PngCompression::from_level(compression),
                combine,
            };
            let out = pdf_to_images(request, &config)
                .await
                .context("Rasterising failed")?;
            report(g, &out.paths, &out.summary, &out)?;
        }

        Command::Call { method, arguments } => {
            let arguments: serde_json::Value =
                serde_json::from_str(&arguments).context("Arguments are not valid JSON")?;
            let plugin = PdfCombinerPlugin::new(config);
            let call = MethodCall::new(method, arguments);
            let response = tokio::task::spawn_blocking(move || plugin.handle(&call))
                .await
                .context("Bridge call panicked")?;
            println!(
                "{}",
                serde_json::to_string_pretty(&response).context("Failed to serialise response")?
            );
            if !matches!(response, MethodResponse::Success { .. }) {
                std::process::exit(1);
            }
        }

        Command::Serve => {
            let (handle, server) = spawn_bridge(PdfCombinerPlugin::new(config));
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            serve_json_lines(&handle, stdin, tokio::io::stdout())
                .await
                .context("Bridge stopped")?;
            drop(handle);
            server.await.context("Bridge server panicked")?;
        }
    }

    Ok(())
}

/// Map CLI args to `PipelineConfig`.
fn build_config(g: &GlobalArgs, progress: Option<ProgressCallback>) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder()
        .on_item_error(g.on_error)
        .allow_pdfium_download(!g.no_download);

    if let Some(template) = &g.heic_converter {
        builder = builder.heic_converter(
            HeicConverter::from_template(template).context("Invalid --heic-converter")?,
        );
    }
    if let Some(path) = &g.pdfium_lib {
        builder = builder.pdfium_library_path(path);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Print produced paths (or the full output as JSON).
fn report<T: serde::Serialize>(
    g: &GlobalArgs,
    paths: &[PathBuf],
    summary: &BatchSummary,
    output: &T,
) -> Result<()> {
    if g.json {
        println!(
            "{}",
            serde_json::to_string_pretty(output).context("Failed to serialise output")?
        );
        return Ok(());
    }
    for path in paths {
        println!("{}", path.display());
    }
    if !g.quiet && !summary.skipped.is_empty() {
        eprintln!(
            "{} {} of {} inputs skipped",
            cyan("⚠"),
            summary.skipped.len(),
            summary.total
        );
    }
    Ok(())
}

fn download_pdfium(quiet: bool) -> Result<()> {
    if quiet {
        tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_library(None))
            .context("Failed to download PDFium engine")?;
        return Ok(());
    }

    let dl_bar = ProgressBar::new(0);
    dl_bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS),
    );
    dl_bar.set_prefix("PDF engine");
    dl_bar.enable_steady_tick(Duration::from_millis(80));

    let bar = dl_bar.clone();
    tokio::task::block_in_place(|| {
        pdfium_auto::ensure_pdfium_library(Some(&|downloaded, total| {
            if let Some(t) = total {
                if bar.length().unwrap_or(0) != t {
                    bar.set_length(t);
                }
            }
            bar.set_position(downloaded);
        }))
    })
    .context("Failed to download PDFium engine")?;

    dl_bar.finish_with_message("ready ✓");
    Ok(())
}
