use anyhow::Context;
use clap::{Parser, Subcommand};
use send::{InputArgs, SizeArgs};
use sqsbatch::SqsQueue;

mod reader;
mod send;

const CHANNEL_CAPACITY: usize = 100;

#[tokio::main]
pub async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(e) = Cli::parse().run().await {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}

#[derive(Debug, Parser)]
#[command(name = "sqsbatch")]
#[command(about = "send and delete AWS SQS messages in size-packed batches", long_about = None)]
pub struct Cli {
    /// Use LocalStack with static test credentials
    #[arg(long, global = true, action)]
    local: bool,

    /// Override the SQS endpoint URL (defaults to http://localhost:4566 with --local)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List queue URLs
    List,
    /// Receive messages and print them as JSON lines
    Poll {
        url: String,

        /// Maximum number of receive calls
        #[arg(long, default_value_t = 10)]
        rounds: usize,
    },
    /// Send one message per input line
    Send {
        url: String,

        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        size: SizeArgs,
    },
    /// Delete messages given as JSON lines with a ReceiptHandle (e.g. `poll` output)
    Delete {
        url: String,

        #[command(flatten)]
        input: InputArgs,
    },
    /// Show how the input would be batched without sending anything
    Plan {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        size: SizeArgs,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match &self.command {
            Commands::List => {
                for url in self.queue().await.list().await? {
                    println!("{}", url);
                }
            }
            Commands::Poll { url, rounds } => {
                for message in self.queue().await.poll(url, *rounds).await? {
                    println!("{}", serde_json::to_string(&message)?);
                }
            }
            Commands::Send { url, input, size } => {
                let limits = input.limits(Some(size));
                let (reader, rx) = reader::spawn_line_reader(input.open().await?, CHANNEL_CAPACITY);
                let queue = self.queue().await;
                let delivered =
                    send::send(&queue.client, url, rx, input.builder(limits), size.json).await;
                conclude(delivered, reader.await)?;
            }
            Commands::Delete { url, input } => {
                let limits = input.limits(None);
                let (reader, rx) = reader::spawn_line_reader(input.open().await?, CHANNEL_CAPACITY);
                let queue = self.queue().await;
                let delivered = send::delete(&queue.client, url, rx, input.builder(limits)).await;
                conclude(delivered, reader.await)?;
            }
            Commands::Plan { input, size } => {
                let limits = input.limits(Some(size));
                let (reader, rx) = reader::spawn_line_reader(input.open().await?, CHANNEL_CAPACITY);
                let planned = send::plan(rx, input.builder(limits), size.json).await?;
                reader.await?.context("failed to read input")?;
                for batch in planned {
                    println!("{}", serde_json::to_string(&batch)?);
                }
            }
        }

        Ok(())
    }

    async fn queue(&self) -> SqsQueue {
        SqsQueue::from_config(self.aws_config().await)
    }

    async fn aws_config(&self) -> aws_config::SdkConfig {
        if self.local {
            return aws_config::defaults(aws_config::BehaviorVersion::latest())
                .region(
                    // supports loading region from known env variables
                    aws_config::meta::region::RegionProviderChain::default_provider()
                        .or_else(aws_config::Region::from_static("us-east-1")),
                )
                .credentials_provider(aws_sdk_sqs::config::Credentials::new(
                    "test", "test", None, None, "static",
                ))
                .endpoint_url(self.endpoint.as_deref().unwrap_or("http://localhost:4566"))
                .load()
                .await;
        }

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(endpoint) = &self.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        loader.load().await
    }
}

/// Prints what was delivered, then surfaces whatever stopped the run or the reader.
///
/// The report is printed even when the run stopped early.
fn conclude<S: serde::Serialize>(
    delivered: send::Delivered<S>,
    read: Result<std::io::Result<usize>, tokio::task::JoinError>,
) -> anyhow::Result<()> {
    let result = delivered.result;
    println!("{}", serde_json::to_string_pretty(&result)?);
    if !result.failed.is_empty() {
        log::warn!("{} entries were rejected", result.failed.len());
    }

    if let Some(e) = delivered.error {
        log::warn!(
            "run stopped early after {} delivered entries",
            result.successful.len() + result.failed.len()
        );
        return Err(e);
    }
    read?.context("failed to read input")?;
    Ok(())
}
