use cardano_types::Network;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod snapshot;

/// Offline Cardano transaction tool.
#[derive(Parser)]
#[command(name = "cardano-tx-cli")]
#[command(about = "Build, inspect and sign Cardano payment transactions")]
#[command(version)]
struct Cli {
    /// Network addresses must belong to.
    #[arg(long, default_value = "mainnet")]
    network: NetworkArg,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug)]
enum NetworkArg {
    Mainnet,
    Testnet,
}

impl std::fmt::Display for NetworkArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mainnet => write!(f, "mainnet"),
            Self::Testnet => write!(f, "testnet"),
        }
    }
}

impl std::str::FromStr for NetworkArg {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "mainnet" | "main" => Ok(Self::Mainnet),
            "testnet" | "test" | "preprod" | "preview" => Ok(Self::Testnet),
            _ => Err(format!("unknown network: {} (use mainnet or testnet)", s)),
        }
    }
}

impl NetworkArg {
    fn to_network(&self) -> Network {
        match self {
            Self::Mainnet => Network::Mainnet,
            Self::Testnet => Network::Testnet,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build an unsigned payment from a chain-state snapshot.
    Build {
        /// Snapshot file with fee parameters, tip, UTxOs and change address.
        #[arg(long)]
        snapshot: PathBuf,

        /// Destination address.
        #[arg(long)]
        to: String,

        /// Amount in lovelace.
        #[arg(long, required_unless_present = "max", conflicts_with = "max")]
        amount: Option<u64>,

        /// Send the whole balance.
        #[arg(long)]
        max: bool,

        /// Spend only from these addresses (default: every snapshot address).
        #[arg(long = "from")]
        from: Vec<String>,

        /// Seed for the coin-selection search, for reproducible output.
        #[arg(long)]
        seed: Option<u64>,

        /// Knapsack search rounds.
        #[arg(long)]
        iterations: Option<usize>,

        /// Slots past the tip the transaction stays valid for.
        #[arg(long)]
        validity_slots: Option<u64>,
    },

    /// Decode a transaction and print its contents as JSON.
    Decode {
        /// Transaction CBOR, hex.
        #[arg(long)]
        tx: String,

        /// Snapshot used to fill in values of known inputs.
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },

    /// Print the transaction id.
    Hash {
        /// Transaction CBOR, hex.
        #[arg(long)]
        tx: String,
    },

    /// Attach vkey witnesses to a transaction.
    Sign {
        /// Transaction CBOR, hex.
        #[arg(long)]
        tx: String,

        /// Witness as `<public key hex>:<signature hex>`. Repeatable.
        #[arg(long = "witness", required = true)]
        witnesses: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let network = cli.network.to_network();
    log::debug!("network: {}", cli.network);

    let result = match cli.command {
        Commands::Build {
            snapshot,
            to,
            amount,
            max,
            from,
            seed,
            iterations,
            validity_slots,
        } => {
            let request = commands::BuildRequest {
                network,
                to,
                amount: amount.unwrap_or(0),
                max,
                from,
                seed,
                iterations,
                validity_slots,
            };
            commands::build(&snapshot, &request).await
        }
        Commands::Decode { tx, snapshot } => commands::decode(&tx, snapshot.as_deref()).await,
        Commands::Hash { tx } => commands::hash(&tx),
        Commands::Sign { tx, witnesses } => commands::sign(&tx, &witnesses),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
