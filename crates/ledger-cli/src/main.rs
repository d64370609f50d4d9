use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use data_encoding::BASE64;
use ledger_core::{
    Chain, ChainStore, ChainValidation, EcdsaBlockSigner, KeyStore, ProofOfWork,
    ProofOfWorkSettings,
};
use ledger_storage::{FileKeyStore, JsonFileStore, SledStore};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "ledger-cli")]
#[command(about = "Single-node proof-of-work ledger")]
struct Cli {
    /// Directory holding the chain and the signing key
    #[arg(long, default_value = "./data", global = true)]
    data_dir: PathBuf,

    /// Chain storage backend
    #[arg(long, value_enum, default_value_t = StoreKind::Json, global = true)]
    store: StoreKind,

    /// Leading zero hex characters required of new blocks
    #[arg(long, default_value_t = 1, global = true)]
    difficulty: u32,

    /// Nonces tried before mining gives up
    #[arg(long, default_value_t = 1_000_000, global = true)]
    max_nonce_attempts: u64,

    /// Kept in the settings; no retargeting is performed
    #[arg(long, default_value_t = 10, global = true)]
    retarget_interval: u32,

    /// Kept in the settings; no retargeting is performed
    #[arg(long, default_value_t = 10_000, global = true)]
    target_block_time_ms: u64,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum StoreKind {
    Json,
    Sled,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mine, sign and append a block
    Add {
        /// Block payload
        data: String,
    },
    /// Print every block
    Show,
    /// Check linkage, hash and signature of every block
    Validate,
    /// Check hash and signature of every block, ignoring linkage
    ValidateBlocks,
    /// Check index sequencing and previous-hash chaining only
    Integrity,
    /// Print the base64 public key used to verify signatures
    PublicKey,
    /// Interactive menu
    Menu,
}

struct Ledger {
    chain: Chain,
    keys: Arc<FileKeyStore>,
}

impl Ledger {
    fn open(cli: &Cli) -> Result<Self> {
        let settings = ProofOfWorkSettings {
            difficulty: cli.difficulty,
            max_nonce_attempts: cli.max_nonce_attempts,
            retarget_interval: cli.retarget_interval,
            target_block_time_ms: cli.target_block_time_ms,
        };
        let store: Arc<dyn ChainStore> = match cli.store {
            StoreKind::Json => Arc::new(JsonFileStore::new(&cli.data_dir)),
            StoreKind::Sled => Arc::new(SledStore::open(cli.data_dir.join("sled"))?),
        };
        info!(data_dir = %cli.data_dir.display(), store = ?cli.store, "opening ledger");
        let keys = Arc::new(FileKeyStore::new(&cli.data_dir));
        let signer = Arc::new(EcdsaBlockSigner::new(keys.clone()));
        let pow = Arc::new(ProofOfWork::new(settings));
        let chain = Chain::with_collaborators(settings, pow, Some(signer), Some(store))
            .context("failed to open chain")?;
        Ok(Self { chain, keys })
    }

    fn add(&mut self, data: &str) -> Result<()> {
        if data.trim().is_empty() {
            println!("Block data must not be empty.");
            return Ok(());
        }
        let block = self.chain.add_block(data).context("error adding block")?;
        println!("Block {} added and mined successfully!", block.index());
        Ok(())
    }

    fn show(&self) {
        for block in self.chain.blocks() {
            println!("{block}");
        }
    }

    fn validate(&self) {
        report_stream(self.chain.validate_entire_chain());
    }

    fn validate_blocks(&self) {
        report_stream(self.chain.validate_blocks_individually());
    }

    fn integrity(&self) {
        let Some(result) = self.chain.validate_chain_integrity() else {
            println!("Chain is empty.");
            return;
        };
        if result.is_valid {
            println!("✓ Chain integrity is valid - all blocks are properly linked.");
        } else {
            println!(
                "✗ Chain integrity failed at block {}: {}",
                result.block.index(),
                result.message.as_deref().unwrap_or("invalid")
            );
            println!("Block: {}", result.block);
        }
    }

    fn public_key(&self) -> Result<()> {
        let key = self.keys.public_key().context("failed to load signing key")?;
        println!("{}", BASE64.encode(&key));
        Ok(())
    }
}

/// Prints each result as soon as it is produced.
fn report_stream(validation: ChainValidation<'_>) {
    let mut failed = false;
    for result in validation {
        println!("{}", result.block);
        if !result.is_valid {
            failed = true;
            println!(
                "✗ Validation failed at block {}: {}",
                result.block.index(),
                result.message.as_deref().unwrap_or("invalid")
            );
        }
    }
    if !failed {
        println!("✓ All blocks are valid.");
    }
}

fn menu(ledger: &mut Ledger) -> Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        println!("\n=== Ledger ===");
        println!("1. Add Block");
        println!("2. Show Blockchain");
        println!("3. Validate Entire Chain");
        println!("4. Validate Blocks Only");
        println!("5. Validate Chain Integrity");
        println!("6. Exit");
        print!("Choose option: ");
        io::stdout().flush()?;

        let Some(choice) = lines.next().transpose()? else {
            return Ok(());
        };
        match choice.trim() {
            "1" => {
                print!("Enter block data: ");
                io::stdout().flush()?;
                let data = lines.next().transpose()?.unwrap_or_default();
                if let Err(e) = ledger.add(&data) {
                    println!("Error adding block: {e:#}");
                }
            }
            "2" => ledger.show(),
            "3" => ledger.validate(),
            "4" => ledger.validate_blocks(),
            "5" => ledger.integrity(),
            "6" => {
                println!("Goodbye!");
                return Ok(());
            }
            _ => println!("Invalid option. Try again."),
        }
    }
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut ledger = Ledger::open(&cli)?;
    match &cli.cmd {
        Command::Add { data } => ledger.add(data)?,
        Command::Show => ledger.show(),
        Command::Validate => ledger.validate(),
        Command::ValidateBlocks => ledger.validate_blocks(),
        Command::Integrity => ledger.integrity(),
        Command::PublicKey => ledger.public_key()?,
        Command::Menu => menu(&mut ledger)?,
    }
    Ok(())
}
