use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use simreport_config::ReporterConfig;
use simreport_core::prelude::*;
use simreport_core::FrameDecoder;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::TcpListener;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "simreport", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a synthetic simulation and report it
    Demo(DemoArgs),
    /// Accept collector connections and print decoded records
    Listen(ListenArgs),
}

#[derive(Args, Debug, Clone)]
pub struct DemoArgs {
    /// YAML configuration file; defaults and SIMREPORT_* variables otherwise
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Collector host, overrides the configuration
    #[arg(long)]
    pub host: Option<String>,
    /// Collector port, overrides the configuration
    #[arg(long)]
    pub port: Option<u16>,
    /// Logfile path, overrides the configuration
    #[arg(long)]
    pub logfile: Option<PathBuf>,
    #[arg(long, default_value = "demo")]
    pub run: String,
    /// Number of simulated elements
    #[arg(long, default_value_t = 8)]
    pub elements: u32,
    /// Number of events to report
    #[arg(long, default_value_t = 100)]
    pub events: u64,
    /// Print Prometheus counters when the run ends
    #[arg(long)]
    pub metrics: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ListenArgs {
    #[arg(short, long, default_value = "127.0.0.1:9900")]
    pub bind: String,
    /// Stop after this many connections have finished (0 for unlimited)
    #[arg(long, default_value_t = 0)]
    pub connections: usize,
}

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Demo(args) => {
            let config = demo_config(&args)?;
            tokio::task::spawn_blocking(move || run_demo(&args, &config)).await?
        }
        Commands::Listen(args) => listen(args).await,
    }
}

fn demo_config(args: &DemoArgs) -> anyhow::Result<ReporterConfig> {
    let mut config = match &args.config {
        Some(path) => ReporterConfig::load_from_path(path)?,
        None => ReporterConfig::load()?,
    };
    if let Some(host) = &args.host {
        config.collector.host = Some(host.clone());
    }
    if let Some(port) = args.port {
        config.collector.port = port;
    }
    if let Some(logfile) = &args.logfile {
        config.output.logfile = Some(logfile.clone());
    }
    Ok(config)
}

/// Drives one synthetic run: routers and links alternate, events are spread
/// round-robin one microsecond of simulated time apart.
fn run_demo(args: &DemoArgs, config: &ReporterConfig) -> anyhow::Result<()> {
    let mut session =
        ReportingSession::from_config(config).context("building reporting session")?;
    let clock = session.clock();

    session.start_run(&args.run)?;
    let elements = (0..args.elements)
        .map(|n| {
            let kind = if n % 2 == 0 { "Router" } else { "Link" };
            let id = session.register_element(kind, i64::from(n))?;
            session.report_attribute(id, "index", &n.to_string())?;
            Ok(id)
        })
        .collect::<Result<Vec<_>, ReportError>>()?;

    if !elements.is_empty() {
        for step in 0..args.events {
            clock.advance(1_000);
            let element = elements[(step % elements.len() as u64) as usize];
            session.report_event(element, "flit_routed", &format!("step={step}"))?;
        }
    }

    session.log(
        Qualifier::Notable,
        format!(
            "Run {} reported {} events for {} elements",
            args.run,
            args.events,
            elements.len()
        ),
    )?;
    let metrics = session.metrics().clone();
    session.close();

    if args.metrics {
        print!("{}", metrics.gather()?);
    }
    Ok(())
}

async fn listen(args: ListenArgs) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("binding {}", args.bind))?;
    info!(addr = %listener.local_addr()?, "listening for reporting clients");

    let mut finished = 0;
    loop {
        let (stream, peer) = listener.accept().await?;
        let peer = peer.to_string();
        let task = tokio::spawn(async move {
            match handle_connection(stream, &peer).await {
                Ok(records) => info!(%peer, records, "client disconnected"),
                Err(e) => warn!(%peer, error = %e, "client connection failed"),
            }
        });

        if args.connections > 0 {
            task.await?;
            finished += 1;
            if finished >= args.connections {
                return Ok(());
            }
        }
    }
}

/// Reads one client's stream to its end, printing each record as a JSON line
/// prefixed by the peer address. Returns the number of records decoded.
async fn handle_connection<R: AsyncRead + Unpin>(mut reader: R, peer: &str) -> anyhow::Result<usize> {
    let mut decoder = FrameDecoder::new();
    let mut chunk = vec![0u8; 4096];
    let mut count = 0;
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        decoder.extend(&chunk[..n]);
        for record in decoder.drain() {
            match record {
                Ok(record) => {
                    println!("{peer} {}", serde_json::to_string(&record)?);
                    count += 1;
                }
                Err(e) => warn!(%peer, error = %e, "skipping malformed record"),
            }
        }
    }
    if decoder.pending() > 0 {
        warn!(%peer, bytes = decoder.pending(), "connection ended mid-record");
    }
    Ok(count)
}
