use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use serde_json::Value;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use dispatch_lite::client::MasterClient;
use dispatch_lite::config::{MasterConfig, WorkerConfig};
use dispatch_lite::node::MasterNode;
use dispatch_lite::scheduler::TaskSpec;
use dispatch_lite::shutdown::install_shutdown_handler;
use dispatch_lite::worker::TaskWorker;

#[derive(Parser, Debug)]
#[command(name = "dispatch-lite")]
#[command(version)]
#[command(about = "A master-coordinated task dispatcher")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start the master node
    Server(ServerArgs),

    /// Start a worker that polls the master for tasks
    Worker(WorkerArgs),

    /// Submit a single task to the master
    Submit(SubmitArgs),

    /// Print the master's task and worker counts
    Status {
        #[command(flatten)]
        client: ClientArgs,
    },
}

#[derive(Parser, Debug)]
struct ServerArgs {
    /// Address to listen on for the HTTP API
    #[arg(long, default_value = "127.0.0.1:8000")]
    listen: SocketAddr,

    /// Seconds of heartbeat silence after which a worker is removed
    #[arg(long, default_value = "10")]
    heartbeat_timeout_secs: u64,

    /// Seconds after which an unfinished assignment is requeued
    #[arg(long, default_value = "15")]
    task_timeout_secs: u64,

    /// Seconds between reconciler sweeps
    #[arg(long, default_value = "5")]
    reconcile_interval_secs: u64,
}

#[derive(Parser, Debug)]
struct ClientArgs {
    /// Base URL of the master
    #[arg(long, default_value = "http://127.0.0.1:8000")]
    master: String,
}

#[derive(Parser, Debug)]
struct WorkerArgs {
    #[command(flatten)]
    client: ClientArgs,

    /// Worker identifier; generated when omitted
    #[arg(long)]
    worker_id: Option<String>,

    /// Milliseconds to wait between polls when no task is available
    #[arg(long, default_value = "1000")]
    poll_interval_ms: u64,

    /// Seconds between heartbeats
    #[arg(long, default_value = "5")]
    heartbeat_interval_secs: u64,
}

#[derive(Parser, Debug)]
struct SubmitArgs {
    #[command(flatten)]
    client: ClientArgs,

    /// Unique task identifier
    #[arg(long)]
    task_id: String,

    /// Task type tag, e.g. "sort", "matmul" or "math"
    #[arg(long = "type")]
    task_type: String,

    /// Task payload as a JSON object
    #[arg(long, default_value = "{}")]
    payload: String,

    /// Dispatch priority; lower runs earlier
    #[arg(long, default_value = "10")]
    priority: i64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match args.command {
        Commands::Server(server) => run_server(server).await,
        Commands::Worker(worker) => run_worker(worker).await,
        Commands::Submit(submit) => run_submit(submit).await,
        Commands::Status { client } => run_status(client).await,
    }
}

async fn run_server(args: ServerArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = MasterConfig::new(args.listen)
        .with_heartbeat_timeout(Duration::from_secs(args.heartbeat_timeout_secs))
        .with_task_timeout(Duration::from_secs(args.task_timeout_secs))
        .with_reconcile_interval(Duration::from_secs(args.reconcile_interval_secs));

    let shutdown = install_shutdown_handler();
    MasterNode::new(config).run(shutdown).await?;
    Ok(())
}

async fn run_worker(args: WorkerArgs) -> Result<(), Box<dyn std::error::Error>> {
    let worker_id = args
        .worker_id
        .unwrap_or_else(|| format!("worker-{}", &Uuid::new_v4().simple().to_string()[..6]));

    let config = WorkerConfig::new(args.client.master, worker_id)
        .with_poll_interval(Duration::from_millis(args.poll_interval_ms))
        .with_heartbeat_interval(Duration::from_secs(args.heartbeat_interval_secs));

    let shutdown = install_shutdown_handler();
    TaskWorker::new(config).run(shutdown).await;
    Ok(())
}

async fn run_submit(args: SubmitArgs) -> Result<(), Box<dyn std::error::Error>> {
    let payload: Value = serde_json::from_str(&args.payload)?;
    let client = MasterClient::new(args.client.master);

    client
        .submit_task(&TaskSpec {
            task_id: args.task_id.clone(),
            task_type: args.task_type,
            payload,
            priority: args.priority,
        })
        .await?;

    println!("accepted: {}", args.task_id);
    Ok(())
}

async fn run_status(args: ClientArgs) -> Result<(), Box<dyn std::error::Error>> {
    let client = MasterClient::new(args.master);
    let status = client.status().await?;

    println!(
        "queued: {}  assigned: {}  done: {}  failed: {}",
        status.queued, status.assigned, status.done, status.failed
    );
    println!("workers: {}", status.workers.join(", "));
    Ok(())
}
