//! CLI binary for math2any.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `BatchConfig`, drives a batch run with a live progress bar, and writes
//! the selected exports.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use math2any::{
    convert_image, export, run_batch, BatchConfig, BatchProgressCallback, BatchQueue,
    BatchRunContext, ProgressCallback, FORMATS,
};
use std::path::{Path, PathBuf};
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
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar anchored at the bottom, one log
/// line per finished item.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} images  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Recognizing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Starting batch of {total} image(s)…"))
        ));
    }

    fn on_item_start(&self, _index: usize, _total: usize, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn on_item_complete(&self, _index: usize, _total: usize, name: &str) {
        self.bar.inc(1);
        self.bar
            .println(format!("  {} {}", green("✓"), dim(name)));
    }

    fn on_item_error(&self, _index: usize, _total: usize, name: &str, error: &str) {
        self.bar.inc(1);
        self.bar
            .println(format!("  {} {} — {}", red("✗"), name, dim(error)));
    }

    fn on_batch_complete(&self, _total: usize, _completed: usize, _failed: usize) {
        self.bar.finish_and_clear();
    }
}

// ── CLI definition ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ExportKind {
    /// Flat text with per-format sections.
    Text,
    /// XHTML document with one MathML table row per image.
    Xhtml,
    /// Zip archive: XHTML + images/ + per-format outputs/.
    Zip,
}

#[derive(Parser, Debug)]
#[command(
    name = "math2any",
    version,
    about = "Convert images of mathematical expressions to LaTeX, MathML, AsciiMath, SymPy, and more",
    after_help = "Examples:\n  math2any formula.png --print latex\n  math2any scans/ --provider openai --model gpt-4o --export zip\n  math2any a.png b.png --formats latex,mathml,typst --export text,xhtml"
)]
struct Cli {
    /// Image files, directories, or HTTP(S) URLs.
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Recognition provider (openai, anthropic, google, mistral, ollama, …).
    #[arg(short, long, env = "MATH2ANY_PROVIDER")]
    provider: Option<String>,

    /// Vision model identifier.
    #[arg(short, long, env = "MATH2ANY_MODEL")]
    model: Option<String>,

    /// Comma-separated output formats for exports.
    #[arg(short, long, default_value = "latex,mathml,asciimath,markdown", value_delimiter = ',')]
    formats: Vec<String>,

    /// Print one format for a single image to stdout and exit.
    #[arg(long, value_name = "FORMAT", conflicts_with = "export")]
    print: Option<String>,

    /// Export shapes to write after the run.
    #[arg(short, long, value_delimiter = ',', default_value = "text")]
    export: Vec<ExportKind>,

    /// Output directory for export files.
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    /// Maximum total attempts per image.
    #[arg(long, default_value_t = 3)]
    retries: u32,

    /// Base retry backoff in milliseconds.
    #[arg(long, default_value_t = 1000)]
    backoff_ms: u64,

    /// Delay between images in milliseconds.
    #[arg(long, default_value_t = 1000)]
    delay_ms: u64,

    /// Download timeout for URL inputs in seconds.
    #[arg(long, default_value_t = 120)]
    download_timeout: u64,

    /// Verbose logging (overrides RUST_LOG).
    #[arg(short, long)]
    verbose: bool,
}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp"];

/// Expand directories into their image files; pass files and URLs through.
fn expand_inputs(inputs: &[String]) -> Result<Vec<String>> {
    let mut out = Vec::new();
    for input in inputs {
        let path = Path::new(input);
        if path.is_dir() {
            let mut files: Vec<PathBuf> = std::fs::read_dir(path)
                .with_context(|| format!("reading directory {input}"))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| {
                    p.extension()
                        .and_then(|e| e.to_str())
                        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
                })
                .collect();
            files.sort();
            if files.is_empty() {
                bail!("no image files found in directory {input}");
            }
            out.extend(files.into_iter().map(|p| p.display().to_string()));
        } else {
            out.push(input.clone());
        }
    }
    Ok(out)
}

fn build_config(cli: &Cli, callback: Option<ProgressCallback>) -> Result<BatchConfig> {
    let mut builder = BatchConfig::builder()
        .formats(cli.formats.clone())
        .max_retries(cli.retries)
        .retry_backoff_ms(cli.backoff_ms)
        .inter_item_delay_ms(cli.delay_ms)
        .download_timeout_secs(cli.download_timeout);
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(cb) = callback {
        builder = builder.progress_callback(cb);
    }
    Ok(builder.build()?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("math2any=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("math2any=warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let inputs = expand_inputs(&cli.inputs)?;

    // Single-image print mode: one recognition call, one format (or the
    // whole bundle as JSON), stdout.
    if let Some(ref format_id) = cli.print {
        if inputs.len() != 1 {
            bail!("--print expects exactly one input image, got {}", inputs.len());
        }
        if format_id != "json" && math2any::format_by_id(format_id).is_none() {
            let known: Vec<&str> = FORMATS.iter().map(|f| f.id).collect();
            bail!(
                "unknown format '{format_id}' (known: json, {})",
                known.join(", ")
            );
        }
        let config = build_config(&cli, None)?;
        let bundle = convert_image(&inputs[0], &config).await?;
        if format_id == "json" {
            println!("{}", serde_json::to_string_pretty(&bundle)?);
        } else {
            println!("{}", bundle.get(format_id).unwrap_or_default());
        }
        return Ok(());
    }

    let callback = CliProgressCallback::new();
    let config = build_config(&cli, Some(callback.clone() as ProgressCallback))?;

    let mut queue = BatchQueue::new();
    for input in &inputs {
        queue.enqueue(input.clone());
    }

    let ctx = Arc::new(BatchRunContext::with_queue(queue));

    // Ctrl-C requests cooperative cancellation; the in-flight image is
    // allowed to finish and the run returns a partial report.
    {
        let ctx = Arc::clone(&ctx);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\n{} cancelling after the current image…", cyan("◆"));
                ctx.control.cancel();
            }
        });
    }

    let report = run_batch(&ctx, &config).await?;

    println!(
        "{} {} completed, {} failed, {} untouched {}",
        bold("Done:"),
        green(&report.completed.to_string()),
        if report.failed > 0 {
            red(&report.failed.to_string())
        } else {
            report.failed.to_string()
        },
        report.pending,
        dim(&format!("({} ms)", report.duration_ms)),
    );
    if report.cancelled {
        println!("{}", dim("Run was cancelled before the queue finished."));
    }

    if report.completed == 0 {
        bail!("no image was recognized successfully");
    }

    // Write the selected exports from a queue snapshot so the context
    // lock is not held across file I/O.
    let queue = ctx.queue.lock().unwrap().clone();
    for kind in &cli.export {
        match kind {
            ExportKind::Text => {
                let path = cli.out_dir.join("batch-results.txt");
                let text = export::flat_text(&queue, &config.formats);
                export::write_atomic(&path, text.as_bytes()).await?;
                println!("  {} {}", green("→"), path.display());
            }
            ExportKind::Xhtml => {
                let path = cli.out_dir.join("math.xhtml");
                let doc = export::xhtml_table(&queue);
                export::write_atomic(&path, doc.as_bytes()).await?;
                println!("  {} {}", green("→"), path.display());
            }
            ExportKind::Zip => {
                let path = cli.out_dir.join("math-export.zip");
                let bytes =
                    export::zip_archive(&queue, &config.formats, config.download_timeout_secs)
                        .await?;
                export::write_atomic(&path, &bytes).await?;
                println!("  {} {}", green("→"), path.display());
            }
        }
    }

    Ok(())
}
