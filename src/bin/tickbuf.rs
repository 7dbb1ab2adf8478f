//! TickBuf command line
//!
//! - `pipe`: copy stdin into a file (or stdout) through a ticked buffer
//! - `bench`: measure sequential or parallel write throughput
//! - `config`: print the effective buffer configuration
//!
//! # Examples
//!
//! ```bash
//! # Coalesce a log stream into 64 KiB writes, at most 500ms apart
//! tail -f app.log | tickbuf --buffer-size 65536 --flush-interval-ms 500 pipe -o out.log
//!
//! # Eight writers, one million 1 KiB writes
//! tickbuf --buffer-size 102400 bench --parallel 8 --writes 1000000
//! ```

use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tickbuf::buffer::bench;
use tickbuf::{pipe, BufferConfig, Sink, TickedBuffer, WriterSink};
use tracing::{error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// TickBuf - size and tick triggered write coalescing
#[derive(Parser, Debug)]
#[command(name = "tickbuf")]
#[command(version = tickbuf::VERSION)]
#[command(about = "TickBuf - size and tick triggered write coalescing", long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// TOML configuration file
    #[arg(long, global = true, env = "TICKBUF_CONFIG")]
    config: Option<PathBuf>,

    /// Size threshold in bytes (overrides config)
    #[arg(long, global = true)]
    buffer_size: Option<usize>,

    /// Tick interval in milliseconds, 0 disables ticks (overrides config)
    #[arg(long, global = true)]
    flush_interval_ms: Option<u64>,

    /// Retired buffers kept for reuse (overrides config)
    #[arg(long, global = true)]
    pool_size: Option<usize>,

    /// Log directory path
    #[arg(long, global = true, default_value = "logs", env = "TICKBUF_LOG_DIR")]
    log_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Serve Prometheus metrics on this address
    #[arg(long, global = true, env = "TICKBUF_METRICS_ADDR")]
    metrics_addr: Option<SocketAddr>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Copy stdin through a ticked buffer
    Pipe(PipeArgs),

    /// Run the throughput bench against an in-memory sink
    Bench(BenchArgs),

    /// Print the effective configuration as TOML
    Config,
}

#[derive(Args, Debug)]
struct PipeArgs {
    /// Output file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Append to the output file instead of truncating it
    #[arg(short, long)]
    append: bool,
}

#[derive(Args, Debug)]
struct BenchArgs {
    /// Concurrent writers (1 = sequential)
    #[arg(short, long, default_value = "1")]
    parallel: usize,

    /// Total number of writes
    #[arg(short, long, default_value = "100000")]
    writes: usize,

    /// Bytes per write
    #[arg(long, default_value = "1024")]
    payload: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let _guard = setup_logging(&cli)?;

    if let Some(addr) = cli.metrics_addr {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;
        tickbuf::metrics::describe_metrics();
        info!(%addr, "Prometheus exporter listening");
    }

    let config = effective_config(&cli)?;

    match cli.command {
        Commands::Pipe(args) => pipe_command(config, args).await,
        Commands::Bench(args) => bench_command(config, args).await,
        Commands::Config => {
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

/// Setup logging with rolling files and stderr output
///
/// Logs stay off stdout because `pipe` may write its data there.
fn setup_logging(cli: &Cli) -> anyhow::Result<tracing_appender::non_blocking::WorkerGuard> {
    std::fs::create_dir_all(&cli.log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &cli.log_dir, "tickbuf.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let log_level = cli
        .log_level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(!cli.no_color),
        )
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .init();

    Ok(guard)
}

/// Config file and environment, then command line overrides
fn effective_config(cli: &Cli) -> anyhow::Result<BufferConfig> {
    let mut config = BufferConfig::load(cli.config.as_deref())?;

    if let Some(size) = cli.buffer_size {
        config = config.with_buffer_size(size);
    }
    if let Some(ms) = cli.flush_interval_ms {
        config = config.with_flush_interval(Duration::from_millis(ms));
    }
    if let Some(size) = cli.pool_size {
        config = config.with_pool_size(size);
    }

    config.validate()?;
    Ok(config)
}

/// Pipe command - stdin through the buffer into the output
async fn pipe_command(config: BufferConfig, args: PipeArgs) -> anyhow::Result<()> {
    let sink: Arc<dyn Sink> = match &args.output {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .write(true)
                .append(args.append)
                .truncate(!args.append)
                .open(path)?;
            info!(path = %path.display(), "Writing to file");
            Arc::new(WriterSink::new(file))
        }
        None => Arc::new(WriterSink::new(std::io::stdout())),
    };

    let buffer = Arc::new(TickedBuffer::new(sink, config)?);
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };
    let copied = pipe::copy_lines(tokio::io::stdin(), &buffer, ctrl_c).await;

    let closer = Arc::clone(&buffer);
    tokio::task::spawn_blocking(move || closer.close()).await??;

    if let Some(e) = buffer.take_tick_error() {
        warn!(error = %e, "A tick triggered flush failed during the run");
    }

    eprintln!("{}", serde_json::to_string_pretty(&buffer.stats())?);
    let chunks = copied?;
    info!(chunks, "Pipe finished");
    Ok(())
}

/// Bench command - throughput against an in-memory sink
async fn bench_command(config: BufferConfig, args: BenchArgs) -> anyhow::Result<()> {
    let report = tokio::task::spawn_blocking(move || {
        if args.parallel <= 1 {
            bench::run_sequential(config, args.writes, args.payload)
        } else {
            bench::run_parallel(config, args.parallel, args.writes, args.payload)
        }
    })
    .await??;

    info!(
        elapsed_ms = report.elapsed_ms,
        writes_per_sec = report.writes_per_sec,
        "Bench finished"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
