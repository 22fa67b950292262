//! `ethtx`: craft, sign and broadcast transactions against a node, with keys
//! held by an external signing daemon.
//!
//! # Flow
//!
//! ```text
//!   flags / env / config file
//!           │
//!           ▼
//!     ┌───────────┐   nonce?   ┌──────────┐
//!     │ TxBuilder │───────────▶│   node   │
//!     └─────┬─────┘            └──────────┘
//!           │ Transaction            ▲
//!           ▼                        │ eth_sendRawTransaction
//!     ┌────────────┐  sign  ┌────────┴─┐
//!     │ TxPipeline │───────▶│  signer  │
//!     └────────────┘        └──────────┘
//! ```

use std::path::PathBuf;
use std::time::Duration;

use alloy::primitives::hex;
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};

use ethtx::blockchain::client::BlockId;
use ethtx::blockchain::coerce::{decode_hex, parse_address, to_quantity};
use ethtx::blockchain::types::SubmitReport;
use ethtx::blockchain::{RpcValue, SubmitOptions, Transaction, TxParams};
use ethtx::config::load_config_with;
use ethtx::observability::init_logging;
use ethtx::{ClientConfig, RpcClient, SignerClient, TxBuilder, TxPipeline};

#[derive(Parser)]
#[command(name = "ethtx")]
#[command(about = "A tool for sending transactions to ethereum chains", long_about = None)]
struct Cli {
    /// TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// <ip>:<port> or URL of the node.
    #[arg(long, global = true)]
    node_addr: Option<String>,

    /// <ip>:<port> or URL of the signing daemon.
    #[arg(long, global = true)]
    sign_addr: Option<String>,

    /// Address to send from and sign with.
    #[arg(long, global = true)]
    addr: Option<String>,

    /// Log level.
    #[arg(short, long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct TxArgs {
    /// Nonce for the transaction (0 fetches it from the node).
    #[arg(short, long, default_value_t = 0)]
    nonce: u64,

    /// Amount to send.
    #[arg(short, long, default_value = "")]
    amt: String,

    /// Amount of gas to provide.
    #[arg(short, long, default_value = "")]
    gas: String,

    /// Price we're willing to pay per gas.
    #[arg(short, long, default_value = "")]
    price: String,

    /// Sign the transaction.
    #[arg(short, long)]
    sign: bool,

    /// Print the serialized transaction (e.g. to broadcast later).
    #[arg(long)]
    binary: bool,

    /// Broadcast the transaction to the chain.
    #[arg(short, long)]
    broadcast: bool,

    /// Wait for the transaction to be mined.
    #[arg(short, long)]
    wait: bool,

    /// Seconds to wait for the receipt.
    #[arg(long, default_value_t = 120)]
    wait_secs: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Craft a simple send transaction
    Send {
        /// Destination address.
        #[arg(short, long, default_value = "")]
        to: String,
        #[command(flatten)]
        tx: TxArgs,
    },
    /// Create a new contract
    Create {
        /// Must be left empty: a creation has no destination.
        #[arg(short, long, default_value = "")]
        to: String,
        /// Code for the new contract.
        #[arg(short, long, alias = "data", default_value = "")]
        code: String,
        #[command(flatten)]
        tx: TxArgs,
    },
    /// Call a contract
    Call {
        /// Destination address.
        #[arg(short, long, default_value = "")]
        to: String,
        /// Data to send to the contract.
        #[arg(short, long, default_value = "")]
        data: String,
        #[command(flatten)]
        tx: TxArgs,
    },
    /// Broadcast a hex encoded serialized transaction
    Broadcast { raw: String },
    /// Decode a hex encoded serialized transaction
    Decode { raw: String },
    /// Print the node status
    Status,
    /// Print an account's balance, nonce and code
    Account { address: String },
    /// Fetch the receipt for a transaction
    Receipt { tx_hash: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config_with(cli.config.as_deref(), |config| apply_flags(config, &cli))?;
    init_logging(&config.log_level);

    let node = config.node_url().map(RpcClient::new);
    tracing::debug!(node = ?config.node_url(), signer = %config.sign_url(), "Configuration loaded");

    let output = match cli.command {
        Commands::Send { to, tx } => {
            let built = TxBuilder::new(node.clone())
                .send(&tx_params(&config, &tx), &to)
                .await?;
            submit(&config, node, built, &tx).await?
        }
        Commands::Create { to, code, tx } => {
            let built = TxBuilder::new(node.clone())
                .create_checked(&tx_params(&config, &tx), &to, &code)
                .await?;
            submit(&config, node, built, &tx).await?
        }
        Commands::Call { to, data, tx } => {
            let built = TxBuilder::new(node.clone())
                .call(&tx_params(&config, &tx), &to, &data)
                .await?;
            submit(&config, node, built, &tx).await?
        }
        Commands::Broadcast { raw } => {
            let node = node.ok_or("a node address is required")?;
            let bytes = decode_hex(&raw)?;
            json!({ "tx_id": node.send_raw_transaction(&bytes).await? })
        }
        Commands::Decode { raw } => transaction_json(&Transaction::decode(&decode_hex(&raw)?)?),
        Commands::Status => {
            let node = node.ok_or("a node address is required")?;
            serde_json::to_value(node.node_status().await?)?
        }
        Commands::Account { address } => {
            let node = node.ok_or("a node address is required")?;
            let address = parse_address(&address)?;
            let balance = node.balance(address, BlockId::Latest).await?;
            let nonce = node.transaction_count(address, BlockId::Latest).await?;
            let code = node.code(address, BlockId::Latest).await?;
            json!({
                "address": address.to_string(),
                "balance": balance.to_string(),
                "nonce": nonce,
                "code": code.to_string(),
            })
        }
        Commands::Receipt { tx_hash } => {
            let node = node.ok_or("a node address is required")?;
            match node.transaction_receipt(&tx_hash).await? {
                Some(receipt) => Value::from(RpcValue::Map(receipt)),
                None => Value::Null,
            }
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn apply_flags(config: &mut ClientConfig, cli: &Cli) {
    if let Some(v) = &cli.node_addr {
        config.node_addr = v.clone();
    }
    if let Some(v) = &cli.sign_addr {
        config.sign_addr = v.clone();
    }
    if let Some(v) = &cli.addr {
        config.addr = v.clone();
    }
    if let Some(v) = &cli.log {
        config.log_level = v.clone();
    }
}

fn tx_params(config: &ClientConfig, tx: &TxArgs) -> TxParams {
    TxParams {
        from: config.addr.clone(),
        amount: tx.amt.clone(),
        gas: tx.gas.clone(),
        price: tx.price.clone(),
        nonce: tx.nonce,
    }
}

async fn submit(
    config: &ClientConfig,
    node: Option<RpcClient>,
    tx: Transaction,
    args: &TxArgs,
) -> Result<Value, Box<dyn std::error::Error>> {
    let opts = SubmitOptions {
        sign: args.sign,
        binary: args.binary,
        broadcast: args.broadcast,
    };
    let pipeline = TxPipeline::new(SignerClient::new(config.sign_url()), node.clone());
    let report = pipeline.run(tx, opts).await?;
    let mut output = report_json(&report);

    if let (true, Some(tx_id), Some(node)) = (args.wait, report.tx_id.as_deref(), node.as_ref()) {
        let receipt = node
            .wait_for_receipt(tx_id, Duration::from_secs(2), Duration::from_secs(args.wait_secs))
            .await?;
        output["receipt"] = Value::from(RpcValue::Map(receipt));
    }
    Ok(output)
}

fn transaction_json(tx: &Transaction) -> Value {
    json!({
        "nonce": tx.nonce(),
        "to": tx.recipient().map(|a| a.to_string()),
        "from": tx.sender().to_string(),
        "amount": to_quantity(tx.amount()),
        "gas_limit": to_quantity(tx.gas_limit()),
        "gas_price": to_quantity(tx.price()),
        "data": tx.data().to_string(),
        "signing_hash": tx.signing_hash().to_string(),
        "signed": tx.is_signed(),
    })
}

fn report_json(report: &SubmitReport) -> Value {
    let mut out = json!({ "transaction": transaction_json(&report.transaction) });
    if let Some(sig) = &report.signature {
        out["signature"] = json!(hex::encode_prefixed(sig));
    }
    if let Some(raw) = &report.raw {
        out["raw"] = json!(raw.to_string());
    }
    if let Some(tx_id) = &report.tx_id {
        out["tx_id"] = json!(tx_id);
    }
    if let Some(addr) = &report.contract_address {
        out["contract_address"] = json!(addr.to_string());
    }
    out
}
