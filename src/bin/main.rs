use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;
use grid_scatter::{
    FailurePolicy, MultiplyPartitionOperation, NodeConfig, NodeEngine, OperationRegistry,
    PartitionId, PartitionIteratingOperation,
};

#[derive(Parser)]
#[command(name = "grid-scatter")]
#[command(about = "Partition scatter/gather execution engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the built-in multiply operation on a set of partitions
    Run {
        /// Comma-separated partition ids, e.g. 2,5,7
        #[arg(long, value_delimiter = ',', required = true)]
        partitions: Vec<i32>,
        #[arg(long, default_value_t = 2)]
        multiplier: i32,
        /// Number of execution workers (overrides config)
        #[arg(long)]
        workers: Option<usize>,
        /// Bound each partition wait, in milliseconds (overrides config)
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// Fail on the first failing partition instead of returning a partial result
        #[arg(long, default_value_t = false)]
        fail_fast: bool,
    },
    /// Print the wire envelope of a scatter/gather operation
    InspectEnvelope {
        #[arg(long, value_delimiter = ',', required = true)]
        partitions: Vec<i32>,
        #[arg(long, default_value_t = 2)]
        multiplier: i32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("grid_scatter=info".parse()?))
        .with_max_level(Level::INFO)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            partitions,
            multiplier,
            workers,
            timeout_ms,
            fail_fast,
        } => {
            let mut config = NodeConfig::load().context("Failed to load node config")?;
            if let Some(workers) = workers {
                config.worker_count = workers;
            }
            if timeout_ms.is_some() {
                config.gather_timeout_ms = timeout_ms;
            }
            if fail_fast {
                config.failure_policy = FailurePolicy::FailFast;
            }
            config.validate()?;

            info!(
                "Scattering multiply-by-{} over {} partitions",
                multiplier,
                partitions.len()
            );

            let node = NodeEngine::new(config, OperationRegistry::with_builtins());
            let template = node.to_data(&MultiplyPartitionOperation::new(multiplier))?;
            let partitions = partitions.into_iter().map(PartitionId::new).collect();

            let outcome = node.invoke_on_partitions(partitions, template).await;
            node.shutdown().await;
            let response = outcome?;

            println!("Gathered {} partition results:", response.len());
            for (partition, value) in response.as_map().iter() {
                println!("  {:>6} => {}", partition, value);
            }
            println!();
            println!("Encoded: {}", hex::encode(response.to_bytes()?));
        }
        Commands::InspectEnvelope {
            partitions,
            multiplier,
        } => {
            let template =
                OperationRegistry::with_builtins().encode(&MultiplyPartitionOperation::new(multiplier))?;
            let partitions = partitions.into_iter().map(PartitionId::new).collect();
            let op = PartitionIteratingOperation::new(partitions, template)?;

            let bytes = op.to_bytes()?;
            let decoded = PartitionIteratingOperation::from_bytes(&bytes)?;

            println!("Envelope ({} bytes): {}", bytes.len(), hex::encode(&bytes));
            println!("  Partitions:    {:?}", decoded.partitions());
            println!("  Template type: {}", decoded.operation_data().type_id());
            println!(
                "  Template size: {} bytes",
                decoded.operation_data().payload().len()
            );
        }
    }

    Ok(())
}
