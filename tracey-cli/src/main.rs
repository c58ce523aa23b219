//! Tracey CLI - コマンドラインインターフェース
//!
//! ファイルまたは標準入力からスタックトレースを読み込み、
//! ソース行を解決して表またはJSONで出力します。

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::Read;
use std::sync::Arc;
use tracey_core::{ColumnWidths, PathRoot, ThirdPartyPredicate, Trace, TraceConfig};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Tracey - Stack trace pretty printer
#[derive(Parser)]
#[command(name = "tracey")]
#[command(version = "0.1.0")]
#[command(about = "Parse, resolve and pretty-print runtime stack traces", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: TraceCommand,

    #[command(flatten)]
    options: TraceOptions,
}

#[derive(Subcommand)]
enum TraceCommand {
    /// Print every frame with its source line
    Table {
        /// Trace file (reads stdin if omitted)
        file: Option<String>,
    },

    /// Print the cleaned trace (merged, without third-party/hidden/native frames)
    Clean {
        /// Trace file (reads stdin if omitted)
        file: Option<String>,

        /// Resolve sources concurrently
        #[arg(long = "async")]
        concurrent: bool,
    },

    /// Print the parsed frames as JSON
    Json {
        /// Trace file (reads stdin if omitted)
        file: Option<String>,

        /// Clean the trace before printing
        #[arg(long)]
        clean: bool,
    },
}

#[derive(Args)]
struct TraceOptions {
    /// Base directory or page URL for relative paths
    #[arg(long, global = true)]
    root: Option<String>,

    /// Number of leading frames to drop
    #[arg(long, global = true, default_value_t = 0)]
    skip: usize,

    /// Additional third-party path prefix (repeatable)
    #[arg(long = "third-party", global = true)]
    third_party: Vec<String>,

    /// Maximum width of the callee column
    #[arg(long, global = true)]
    max_callee: Option<usize>,

    /// Maximum width of the file column
    #[arg(long, global = true)]
    max_file: Option<usize>,

    /// Maximum width of the source line column
    #[arg(long, global = true)]
    max_source: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Arc::new(build_config(&cli.options));
    let resolver = tracey_source::shared();

    match cli.command {
        TraceCommand::Table { file } => {
            let trace = read_trace(file.as_deref(), &config, cli.options.skip)?;
            println!("{}", trace.with_sources(resolver));
        }
        TraceCommand::Clean { file, concurrent } => {
            let trace = read_trace(file.as_deref(), &config, cli.options.skip)?;
            let clean = if concurrent {
                trace.clean_async(resolver).await
            } else {
                trace.clean(resolver)
            };
            println!("{}", clean);
        }
        TraceCommand::Json { file, clean } => {
            let trace = read_trace(file.as_deref(), &config, cli.options.skip)?;
            let trace = if clean {
                trace.clean(resolver)
            } else {
                trace.with_sources(resolver)
            };
            println!("{}", serde_json::to_string_pretty(trace.items())?);
        }
    }

    Ok(())
}

/// コマンドラインの指定から設定を作る
fn build_config(options: &TraceOptions) -> TraceConfig {
    let mut config = TraceConfig::new();

    if let Some(root) = &options.root {
        config = config.with_root(parse_root(root));
    }

    if !options.third_party.is_empty() {
        let prefixes = options.third_party.clone();
        let predicate = ThirdPartyPredicate::default_heuristics()
            .or(move |path| prefixes.iter().any(|prefix| path.starts_with(prefix.as_str())));
        config = config.with_third_party(predicate);
    }

    let defaults = ColumnWidths::default();
    config.with_column_widths(ColumnWidths {
        callee: options.max_callee.unwrap_or(defaults.callee),
        file: options.max_file.unwrap_or(defaults.file),
        source_line: options.max_source.unwrap_or(defaults.source_line),
    })
}

/// URLならドキュメント、それ以外はディレクトリとして扱う
fn parse_root(root: &str) -> PathRoot {
    if root.contains("://") {
        PathRoot::document(root)
    } else {
        PathRoot::process(root.replace('\\', "/"))
    }
}

/// トレース文字列を読み込んで解析する
fn read_trace(file: Option<&str>, config: &Arc<TraceConfig>, skip: usize) -> Result<Trace> {
    let text = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read trace file {}", path))?,
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read trace from stdin")?;
            text
        }
    };

    let trace = Trace::from_text_with(Arc::clone(config), &text, skip);
    debug!("Parsed {} frames", trace.len());
    Ok(trace)
}
