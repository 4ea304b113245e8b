//! Subcommands and what they report.

use anyhow::Context;
use clap::{Args, Subcommand};
use corelib::partitioner::{self, SharedPartitioner};
use corelib::{HashToken, NodeId, RingBuilder};
use replication::{ClusterNode, NodeOptions};
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use transport::HttpTransport;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a node until interrupted.
    Serve(ServeArgs),
    /// Print the owner and preference list of a key for a given set of nodes.
    Locate(LocateArgs),
}

/// Ring settings. Every node of a cluster must use the same vnode count and
/// partitioner.
#[derive(Debug, Args)]
pub struct RingArgs {
    /// Copies per key, owner included.
    #[arg(long, env = "RINGKV_REPLICAS", default_value_t = 1,
          value_parser = clap::value_parser!(u16).range(1..))]
    pub replicas: u16,

    /// Ring positions per node.
    #[arg(long, env = "RINGKV_VNODES", default_value_t = 1,
          value_parser = clap::value_parser!(u16).range(1..))]
    pub vnodes: u16,

    #[arg(long, env = "RINGKV_PARTITIONER", default_value = "sip",
          value_parser = ["sip", "xxh3"])]
    pub partitioner: String,
}

impl RingArgs {
    fn partitioner(&self) -> anyhow::Result<SharedPartitioner> {
        Ok(partitioner::from_name(&self.partitioner)?)
    }
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Socket address to listen on.
    #[arg(long, env = "RINGKV_BIND")]
    pub bind: SocketAddr,

    /// Base URL peers use to reach this node. Defaults to `http://<bind>`.
    #[arg(long, env = "RINGKV_ADVERTISE")]
    pub advertise: Option<String>,

    /// Peers to join at startup.
    #[arg(long, env = "RINGKV_JOIN", value_delimiter = ',')]
    pub join: Vec<String>,

    #[command(flatten)]
    pub ring: RingArgs,

    /// Timeout of every call to a peer, in milliseconds.
    #[arg(long, env = "RINGKV_TIMEOUT_MS", default_value_t = 2000)]
    pub timeout_ms: u64,
}

impl ServeArgs {
    pub fn advertise_url(&self) -> String {
        self.advertise
            .clone()
            .unwrap_or_else(|| format!("http://{}", self.bind))
    }
}

#[derive(Debug, Args)]
pub struct LocateArgs {
    /// Members of the ring.
    #[arg(long = "peer", required = true)]
    pub peers: Vec<String>,

    #[command(flatten)]
    pub ring: RingArgs,

    pub key: String,
}

/// Outcome of a command, printed on exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    Stopped {
        node: NodeId,
    },
    Located {
        key: String,
        token: HashToken,
        owner: NodeId,
        replicas: Vec<NodeId>,
    },
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandResult::Stopped { node } => write!(f, "node {node} stopped"),
            CommandResult::Located {
                key,
                token,
                owner,
                replicas,
            } => {
                writeln!(f, "key:      {key}")?;
                writeln!(f, "token:    {token}")?;
                writeln!(f, "owner:    {owner}")?;
                write!(f, "replicas:")?;
                for replica in replicas {
                    write!(f, " {replica}")?;
                }
                Ok(())
            }
        }
    }
}

impl Command {
    pub async fn execute(self) -> anyhow::Result<CommandResult> {
        match self {
            Command::Serve(args) => serve(args).await,
            Command::Locate(args) => locate(args),
        }
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<CommandResult> {
    let id = NodeId::parse(&args.advertise_url())?;
    let options = NodeOptions::new(id.clone())
        .with_replication_factor(usize::from(args.ring.replicas))
        .with_vnodes(usize::from(args.ring.vnodes))
        .with_partitioner(args.ring.partitioner()?);
    tracing::info!(?options, "starting node");

    let transport = Arc::new(HttpTransport::new(Duration::from_millis(args.timeout_ms))?);
    let node = Arc::new(ClusterNode::new(options, transport));

    let listener = TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;
    let mut server = tokio::spawn(transport::serve(listener, Arc::clone(&node)));

    // The server runs first: peers call back during the exchange.
    for peer in &args.join {
        let peer = NodeId::parse(peer)?;
        let report = node.join(&peer).await?;
        if report.unreachable.contains(&peer) {
            tracing::warn!(%peer, "seed peer unreachable");
        }
    }

    tokio::select! {
        result = &mut server => result??,
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for shutdown signal")?;
            tracing::info!(node = %id, "shutting down");
            server.abort();
        }
    }
    Ok(CommandResult::Stopped { node: id })
}

fn locate(args: LocateArgs) -> anyhow::Result<CommandResult> {
    let mut builder = RingBuilder::new()
        .with_vnodes(usize::from(args.ring.vnodes))
        .with_partitioner(args.ring.partitioner()?);
    for peer in &args.peers {
        builder = builder.add_node(NodeId::parse(peer)?);
    }
    let ring = builder.build();

    let replicas = ring.preference_list(&args.key, usize::from(args.ring.replicas))?;
    let owner = replicas
        .first()
        .cloned()
        .context("ring has no nodes")?;
    Ok(CommandResult::Located {
        token: ring.token_for(&args.key),
        key: args.key,
        owner,
        replicas,
    })
}
