//! Self-custodial wallet CLI.
//!
//! # Architecture Overview
//!
//! ```text
//!   CLI command
//!       │
//!       ▼
//!   ┌──────────────────────────── WalletService ────────────────────────────┐
//!   │                                                                       │
//!   │  security::UnlockThrottle ──▶ vault::VaultStore ──▶ crypto::Cipher    │
//!   │                                     │                                 │
//!   │  keys (BIP-39 / BIP-44) ◀───────────┘      accounts::AccountRegistry  │
//!   │                                                                       │
//!   │  transactions: builder ──▶ submitter ──▶ ledger ◀── monitor           │
//!   │                     │            │                     │              │
//!   └─────────────────────┼────────────┼─────────────────────┼──────────────┘
//!                         ▼            ▼                     ▼
//!                 blockchain::ChainClient (JSON-RPC, failover, timeouts)
//!
//!   storage::JsonFileStore holds the vault record and the ledger.
//! ```

use alloy::primitives::TxHash;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use custody_wallet::blockchain::BlockchainClient;
use custody_wallet::config::{load_config, WalletConfig};
use custody_wallet::lifecycle::wait_for_signal;
use custody_wallet::monitor::{EventKind, MonitorEvent};
use custody_wallet::observability::{logging, metrics};
use custody_wallet::storage::JsonFileStore;
use custody_wallet::transactions::{
    format_ether, parse_address, parse_ether, GasSpeed, TransactionRecord,
};
use custody_wallet::{WalletError, WalletService};

#[derive(Parser)]
#[command(name = "custody-wallet")]
#[command(about = "Self-custodial Ethereum wallet", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Vault password.
    #[arg(long, global = true, env = "WALLET_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new recovery phrase and vault
    Create,
    /// Import a hex private key
    ImportKey { private_key: String },
    /// Import a 12-word recovery phrase
    ImportMnemonic { phrase: String },
    /// List accounts, deriving more if requested
    Accounts {
        #[arg(long, default_value_t = 1)]
        count: u32,
    },
    /// Show the balance of an address or of account 0
    Balance { address: Option<String> },
    /// Send ether from account 0
    Send {
        to: String,
        /// Amount in ether, e.g. 0.25
        amount: String,
        #[arg(long, default_value = "standard")]
        speed: GasSpeed,
        /// Skip estimation and use this gas limit
        #[arg(long)]
        gas_limit: Option<u64>,
        /// Block until the configured confirmation depth is reached
        #[arg(long)]
        wait: bool,
    },
    /// Show recorded transactions
    History { address: Option<String> },
    /// Reconcile pending transactions until interrupted
    Watch,
    /// Erase the vault and the transaction history
    Wipe {
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {}", e);
        std::process::exit(exit_code(e.as_ref()));
    }
}

fn exit_code(error: &(dyn std::error::Error + Send + Sync + 'static)) -> i32 {
    match error.downcast_ref::<WalletError>() {
        Some(WalletError::Validation(_)) => 2,
        Some(WalletError::Crypto) | Some(WalletError::TooManyAttempts { .. }) => 3,
        Some(WalletError::Network(_)) => 4,
        Some(WalletError::InsufficientFunds(_)) | Some(WalletError::GasEstimation(_)) => 5,
        _ => 1,
    }
}

fn password(cli_password: &Option<String>) -> Result<&str, WalletError> {
    cli_password
        .as_deref()
        .ok_or_else(|| {
            WalletError::Validation(
                "A password is required (--password or WALLET_PASSWORD)".to_string(),
            )
        })
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => WalletConfig::default(),
    };

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "custody-wallet starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let store = Arc::new(JsonFileStore::open(&config.vault.store_path)?);
    let client = Arc::new(BlockchainClient::new(config.blockchain.clone()).await?);
    let wallet = WalletService::new(&config, store, client)?;

    match cli.command {
        Commands::Create => {
            let created = wallet.create_wallet(password(&cli.password)?).await?;
            println!("address:  {}", created.address);
            println!("recovery phrase (write it down, it is not shown again):");
            println!("  {}", created.mnemonic.phrase());
        }
        Commands::ImportKey { private_key } => {
            let address = wallet
                .import_private_key(&private_key, password(&cli.password)?)
                .await?;
            println!("address: {}", address);
        }
        Commands::ImportMnemonic { phrase } => {
            let address = wallet.import_mnemonic(&phrase, password(&cli.password)?).await?;
            println!("address: {}", address);
        }
        Commands::Accounts { count } => {
            wallet.unlock(password(&cli.password)?).await?;
            for _ in 1..count {
                wallet.add_account()?;
            }
            for account in wallet.accounts()? {
                println!(
                    "{:<12} {}  (index {})",
                    account.display_name, account.address, account.derivation_index
                );
            }
        }
        Commands::Balance { address } => {
            let address = match address {
                Some(text) => Some(parse_address(&text)?),
                None => {
                    wallet.unlock(password(&cli.password)?).await?;
                    None
                }
            };
            let wei = wallet.balance(address).await?;
            println!("{} ETH", format_ether(wei));
        }
        Commands::Send {
            to,
            amount,
            speed,
            gas_limit,
            wait,
        } => {
            let amount = parse_ether(&amount)?;
            wallet.unlock(password(&cli.password)?).await?;
            let sent = match gas_limit {
                Some(limit) => wallet.send_with_gas_limit(&to, amount, speed, limit).await,
                None => wallet.send(&to, amount, speed).await,
            };
            if let Err(WalletError::GasEstimation(_)) = &sent {
                eprintln!(
                    "hint: retry with --gas-limit {} to skip estimation",
                    wallet.default_gas_limit()
                );
            }
            let hash = sent?;
            println!("{}", hash);
            if wait {
                report(&wallet, hash, wallet.wait_for_confirmation(hash).await?);
            }
        }
        Commands::History { address } => {
            let address = address.as_deref().map(parse_address).transpose()?;
            for record in wallet.history(address) {
                println!(
                    "{}  {:<7}  {} → {}  {} ETH  block {}",
                    record.hash,
                    record.status,
                    record.from,
                    record.to,
                    format_ether(record.value),
                    record.block_number.map(|b| b.to_string()).unwrap_or_else(|| "-".to_string())
                );
            }
        }
        Commands::Watch => {
            wallet.monitor().on(EventKind::StatusChange, |event| {
                if let MonitorEvent::StatusChange { record, old_status } = event {
                    println!("{}  {} → {}", record.hash, old_status, record.status);
                }
                Ok(())
            });
            wallet.start_monitor();
            wait_for_signal().await;
            wallet.monitor().stop();
        }
        Commands::Wipe { yes } => {
            if !yes {
                let refusal = WalletError::Validation("Refusing to wipe without --yes".to_string());
                return Err(refusal.into());
            }
            wallet.wipe()?;
            println!("wallet wiped");
        }
    }

    wallet.lock();
    Ok(())
}

fn report(wallet: &WalletService, hash: TxHash, record: Option<TransactionRecord>) {
    match record.or_else(|| wallet.transaction(&hash)) {
        Some(record) => println!(
            "{}  {}  gas used {}",
            record.hash, record.status, record.gas_used
        ),
        None => println!("{}  unknown", hash),
    }
}
