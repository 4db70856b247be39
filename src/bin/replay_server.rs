use clap::{Parser, Subcommand};
use log::{error, info, warn};
use replaystream::replaystream::config::{ReplayConfig, SinkKind};
use replaystream::replaystream::dataset::load_dataset;
use replaystream::replaystream::emitter::Emitter;
use replaystream::replaystream::server::{self, shutdown::shutdown_signal, DatasetStream};
use replaystream::replaystream::sink::{KafkaSink, KafkaSinkConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "replay-server")]
#[command(about = "Replays CSV datasets over Kafka topics or Server-Sent Events")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve every SSE dataset from the config file
    Serve {
        /// Path to the YAML config file
        #[arg(long, default_value = "configs/datasets.yaml")]
        config: String,

        /// Override the configured listen address
        #[arg(long)]
        listen: Option<String>,
    },
    /// Replay one dataset into its Kafka topic, then exit
    Produce {
        /// Path to the YAML config file
        #[arg(long, default_value = "configs/datasets.yaml")]
        config: String,

        /// Name of the dataset to replay
        #[arg(long)]
        dataset: String,

        /// Override the configured broker list
        #[arg(long)]
        brokers: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Serve { config, listen } => serve(&config, listen).await,
        Commands::Produce {
            config,
            dataset,
            brokers,
        } => produce(&config, &dataset, brokers).await,
    }
}

async fn serve(config_path: &str, listen: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = ReplayConfig::from_yaml_file(config_path)?;
    let addr: SocketAddr = listen.unwrap_or_else(|| config.listen_addr.clone()).parse()?;

    let mut streams = Vec::new();
    for ds in &config.datasets {
        if ds.sink != SinkKind::Sse {
            continue;
        }
        // A dataset that fails to load is skipped; the others still serve.
        match load_dataset(&ds.path) {
            Ok(dataset) => {
                let normalizer = ds.normalizer()?;
                streams.push(Arc::new(DatasetStream {
                    name: ds.name.clone(),
                    dataset: Arc::new(dataset),
                    normalizer,
                    emitter_config: ds.emitter_config(),
                }));
            }
            Err(e) => {
                error!("failed to load dataset '{}' from {}: {}", ds.name, ds.path, e);
            }
        }
    }
    if streams.is_empty() {
        warn!("no datasets available to serve");
    }

    server::serve(addr, streams, CancellationToken::new()).await?;
    Ok(())
}

async fn produce(
    config_path: &str,
    dataset_name: &str,
    brokers: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = ReplayConfig::from_yaml_file(config_path)?;
    let ds = config
        .dataset(dataset_name)
        .ok_or_else(|| format!("dataset '{}' is not configured", dataset_name))?;
    let topic = ds
        .topic
        .clone()
        .ok_or_else(|| format!("dataset '{}' has no topic configured", dataset_name))?;

    let dataset = Arc::new(load_dataset(&ds.path)?);

    let mut sink_config = KafkaSinkConfig::new(brokers.unwrap_or_else(|| config.brokers.clone()), topic);
    if let Some(marker) = &ds.end_marker {
        sink_config = sink_config.with_end_marker(marker.clone());
    }

    let mut emitter = Emitter::new(ds.name.clone(), dataset, KafkaSink::new(sink_config))
        .with_config(ds.emitter_config());
    if let Some(normalizer) = ds.normalizer()? {
        emitter = emitter.with_normalizer(normalizer);
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            cancel.cancel();
        });
    }

    let state = emitter.run(cancel).await;
    info!("producer for '{}' finished in {:?}", dataset_name, state);
    Ok(())
}
