use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use reqwest::{Client, Response};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "ledger-cli")]
#[command(about = "CLI client for the proof-of-work ledger node")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Args, Debug)]
struct Node {
    /// Node base URL (e.g. http://127.0.0.1:5000)
    #[arg(long, default_value = "http://127.0.0.1:5000")]
    node: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a transaction to the pending pool
    Submit {
        #[command(flatten)]
        node: Node,
        /// Sender
        #[arg(long)]
        sender: String,
        /// Recipient
        #[arg(long)]
        recipient: String,
        /// Amount
        #[arg(long)]
        amount: u64,
    },
    /// Mine a block from the pending pool
    Mine {
        #[command(flatten)]
        node: Node,
    },
    /// Print the full chain
    Chain {
        #[command(flatten)]
        node: Node,
    },
    /// Print transactions waiting for the next block
    Pending {
        #[command(flatten)]
        node: Node,
    },
    /// Register peer nodes
    Register {
        #[command(flatten)]
        node: Node,
        /// Peer URL, e.g. http://127.0.0.1:5001; repeatable
        #[arg(long = "peer", required = true)]
        peers: Vec<String>,
    },
    /// List registered peers
    Peers {
        #[command(flatten)]
        node: Node,
    },
    /// Run consensus against registered peers
    Resolve {
        #[command(flatten)]
        node: Node,
    },
}

#[derive(Serialize)]
struct Tx {
    sender: String,
    recipient: String,
    amount: u64,
}

#[derive(Serialize)]
struct Register {
    nodes: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    let client = Client::new();
    let res = match cli.cmd {
        Command::Submit {
            node,
            sender,
            recipient,
            amount,
        } => {
            let tx = Tx {
                sender,
                recipient,
                amount,
            };
            client
                .post(format!("{}/transactions/new", node.node))
                .json(&tx)
                .send()
                .await?
        }
        Command::Mine { node } => client.get(format!("{}/mine", node.node)).send().await?,
        Command::Chain { node } => client.get(format!("{}/chain", node.node)).send().await?,
        Command::Pending { node } => {
            client
                .get(format!("{}/transactions/pending", node.node))
                .send()
                .await?
        }
        Command::Register { node, peers } => {
            client
                .post(format!("{}/nodes/register", node.node))
                .json(&Register { nodes: peers })
                .send()
                .await?
        }
        Command::Peers { node } => client.get(format!("{}/nodes", node.node)).send().await?,
        Command::Resolve { node } => {
            client
                .get(format!("{}/nodes/resolve", node.node))
                .send()
                .await?
        }
    };
    print_response(res).await
}

async fn print_response(res: Response) -> Result<()> {
    let status = res.status();
    debug!(url = %res.url(), %status, "response");
    let body = res.text().await?;
    println!("status: {}", status);
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{body}"),
    }
    Ok(())
}
