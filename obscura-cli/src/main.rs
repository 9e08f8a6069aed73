//! Obscura CLI
//!
//! Command-line interface for the Obscura stealth address protocol:
//! key derivation, meta-address registration, sending, scanning, and
//! stealth key recovery against a file-backed registry.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use obscura_core::constants::{SCHEME_SECP256K1, SIGNATURE_SIZE};
use obscura_core::traits::{AnnouncementLog, MetaAddressRegistry};
use obscura_core::types::{CurvePublicKey, EthAddress, KeyPair, MetaAddress, SecretScalar, StealthKeySet};
use obscura_registry::{FileRegistry, MemoryRegistry};
use obscura_scanner::{Scanner, ScannerConfig};
use obscura_stealth::{StealthPaymentBuilder, StealthWallet, create_stealth_payment};

/// Obscura - ERC-5564 stealth addresses on secp256k1
#[derive(Parser)]
#[command(name = "obscura")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive stealth keys from a wallet signature
    Keys {
        /// 65-byte wallet signature (hex). Generated randomly if omitted.
        #[arg(short, long)]
        signature: Option<String>,
        /// Chain tag for the meta-address
        #[arg(short, long, default_value = "eth")]
        chain: String,
        /// Output file for keys (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Register a meta-address in the registry
    Register {
        /// Path to keys file
        #[arg(short, long)]
        keys: PathBuf,
        /// Registrant address (0x-prefixed)
        #[arg(long)]
        registrant: String,
        /// Path to registry file
        #[arg(short, long, default_value = "obscura-registry.json")]
        registry: PathBuf,
    },

    /// Resolve a registrant's meta-address from the registry
    Resolve {
        /// Registrant address (0x-prefixed)
        registrant: String,
        /// Path to registry file
        #[arg(short, long, default_value = "obscura-registry.json")]
        registry: PathBuf,
    },

    /// Decode and display a meta-address string
    Decode {
        /// Meta-address (st:<chain>:<hex>)
        meta_address: String,
    },

    /// Create a stealth payment and publish its announcement
    Send {
        /// Recipient: meta-address string or registered 0x address
        recipient: String,
        /// Path to registry file
        #[arg(short, long, default_value = "obscura-registry.json")]
        registry: PathBuf,
        /// Payment amount (informational)
        #[arg(long)]
        amount: Option<String>,
        /// Token symbol (informational)
        #[arg(long)]
        token: Option<String>,
        /// Memo (informational, stored locally only)
        #[arg(long)]
        memo: Option<String>,
    },

    /// Scan the announcement log for incoming payments
    Scan {
        /// Path to keys file
        #[arg(short, long)]
        keys: PathBuf,
        /// Path to registry file
        #[arg(short, long, default_value = "obscura-registry.json")]
        registry: PathBuf,
        /// Lowest block to scan (inclusive)
        #[arg(long)]
        from_block: Option<u64>,
        /// Highest block to scan (inclusive)
        #[arg(long)]
        to_block: Option<u64>,
        /// Use parallel matching
        #[arg(long)]
        parallel: bool,
    },

    /// Recover the stealth private key for a matched announcement
    Recover {
        /// Path to keys file
        #[arg(short, long)]
        keys: PathBuf,
        /// Path to registry file
        #[arg(short, long, default_value = "obscura-registry.json")]
        registry: PathBuf,
        /// Announcement ID to recover
        #[arg(long)]
        id: u64,
    },

    /// Run a scanning benchmark against an in-memory log
    Bench {
        /// Number of announcements to generate
        #[arg(short, long, default_value = "10000")]
        count: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "obscura=debug,info"
    } else {
        "obscura=info,warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Keys {
            signature,
            chain,
            output,
        } => cmd_keys(signature.as_deref(), &chain, output).await,
        Commands::Register {
            keys,
            registrant,
            registry,
        } => cmd_register(&keys, &registrant, &registry).await,
        Commands::Resolve {
            registrant,
            registry,
        } => cmd_resolve(&registrant, &registry).await,
        Commands::Decode { meta_address } => cmd_decode(&meta_address),
        Commands::Send {
            recipient,
            registry,
            amount,
            token,
            memo,
        } => cmd_send(&recipient, &registry, amount, token, memo).await,
        Commands::Scan {
            keys,
            registry,
            from_block,
            to_block,
            parallel,
        } => cmd_scan(&keys, &registry, from_block, to_block, parallel).await,
        Commands::Recover { keys, registry, id } => cmd_recover(&keys, &registry, id).await,
        Commands::Bench { count } => cmd_bench(count).await,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// KEYS FILE
// ═══════════════════════════════════════════════════════════════════════════════

/// On-disk key file format (all hex).
#[derive(Serialize, Deserialize)]
struct KeysFile {
    spending_pk: String,
    spending_sk: String,
    viewing_pk: String,
    viewing_sk: String,
    meta_address: String,
}

impl KeysFile {
    fn from_wallet(wallet: &StealthWallet) -> Self {
        let keys = wallet.keys();
        Self {
            spending_pk: keys.spending.public.to_hex(),
            spending_sk: hex::encode(keys.spending.secret.as_bytes()),
            viewing_pk: keys.viewing.public.to_hex(),
            viewing_sk: hex::encode(keys.viewing.secret.as_bytes()),
            meta_address: wallet.meta_address().encode(),
        }
    }
}

fn load_wallet(path: &Path) -> Result<StealthWallet> {
    let file: KeysFile = serde_json::from_reader(
        std::fs::File::open(path).context("Failed to open keys file")?,
    )
    .context("Malformed keys file")?;

    let spending = KeyPair::new(
        CurvePublicKey::from_hex(&file.spending_pk)?,
        SecretScalar::from_bytes(&hex::decode(&file.spending_sk)?)?,
    );
    let viewing = KeyPair::new(
        CurvePublicKey::from_hex(&file.viewing_pk)?,
        SecretScalar::from_bytes(&hex::decode(&file.viewing_sk)?)?,
    );
    let keys = StealthKeySet::new(spending, viewing);

    // Preserve the chain tag the keys were generated for
    let meta: MetaAddress = file.meta_address.parse()?;
    Ok(StealthWallet::from_keys_for_chain(keys, meta.chain_tag))
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMMANDS
// ═══════════════════════════════════════════════════════════════════════════════

/// Derive stealth keys from a wallet signature.
async fn cmd_keys(signature: Option<&str>, chain: &str, output: Option<PathBuf>) -> Result<()> {
    println!("{}", "Deriving stealth keys...".cyan().bold());

    let sig = match signature {
        Some(hex_sig) => {
            let bytes = hex::decode(hex_sig.trim_start_matches("0x"))
                .context("Signature is not valid hex")?;
            if bytes.len() != SIGNATURE_SIZE {
                bail!(
                    "signature must be {} bytes, got {}",
                    SIGNATURE_SIZE,
                    bytes.len()
                );
            }
            bytes
        }
        None => {
            println!(
                "{}",
                "No signature given; generating a random one. Keep it: it IS the key backup."
                    .yellow()
            );
            let mut bytes = vec![0u8; SIGNATURE_SIZE];
            rand::rngs::OsRng.fill_bytes(&mut bytes);
            println!("   {} {}", "Signature:".dimmed(), hex::encode(&bytes));
            bytes
        }
    };

    let keys = obscura_crypto::derive_key_set(&sig)?;
    let wallet = StealthWallet::from_keys_for_chain(keys, chain);
    let file = KeysFile::from_wallet(&wallet);

    if let Some(path) = output {
        std::fs::write(&path, serde_json::to_string_pretty(&file)?)?;
        println!("{} {}", "Keys saved to:".green(), path.display());
    } else {
        println!("\n{}", "Keys (JSON):".yellow().bold());
        println!("{}", serde_json::to_string_pretty(&file)?);
    }

    println!("\n{} {}", "Meta-address:".green().bold(), wallet.meta_address());
    println!(
        "\n{}",
        "IMPORTANT: spending_sk and viewing_sk must never be shared."
            .red()
            .bold()
    );

    Ok(())
}

/// Register a meta-address for a registrant.
async fn cmd_register(keys: &Path, registrant: &str, registry_path: &Path) -> Result<()> {
    let wallet = load_wallet(keys)?;
    let registrant = EthAddress::from_hex(registrant).context("Invalid registrant address")?;

    let registry = FileRegistry::new(registry_path)
        .await
        .context("Failed to open registry file")?;

    let encoded = wallet.meta_address().encode();
    registry
        .set_meta_address(&registrant, SCHEME_SECP256K1, encoded.as_bytes())
        .await?;
    registry.flush().await?;
    info!(registrant = %registrant.to_hex_string(), "meta-address registered");

    println!(
        "{} {} -> {}",
        "Registered:".green().bold(),
        registrant.to_hex_string(),
        encoded
    );
    Ok(())
}

/// Look up a registrant's meta-address.
async fn cmd_resolve(registrant: &str, registry_path: &Path) -> Result<()> {
    let registrant = EthAddress::from_hex(registrant).context("Invalid registrant address")?;

    let registry = FileRegistry::new(registry_path)
        .await
        .context("Failed to open registry file")?;

    let raw = registry
        .get_meta_address(&registrant, SCHEME_SECP256K1)
        .await?
        .context("No meta-address registered for this address")?;

    let meta = MetaAddress::decode(&raw)?;
    print_meta_address(&meta);
    Ok(())
}

/// Decode a meta-address string.
fn cmd_decode(input: &str) -> Result<()> {
    let meta: MetaAddress = input.parse().context("Invalid meta-address")?;
    print_meta_address(&meta);
    Ok(())
}

fn print_meta_address(meta: &MetaAddress) {
    println!("{}", "Meta-address:".green().bold());
    println!("   {} {}", "Chain tag:".dimmed(), meta.chain_tag);
    println!("   {} {}", "Scheme:".dimmed(), meta.scheme_id);
    println!("   {} {}", "Spending PK:".dimmed(), meta.spending_pk.to_hex());
    println!("   {} {}", "Viewing PK:".dimmed(), meta.viewing_pk.to_hex());
    println!("\n   {} {}", "Encoded:".dimmed(), meta.encode());
}

/// Create a stealth payment and publish the announcement.
async fn cmd_send(
    recipient: &str,
    registry_path: &Path,
    amount: Option<String>,
    token: Option<String>,
    memo: Option<String>,
) -> Result<()> {
    println!(
        "{} {}",
        "Creating stealth payment to:".cyan().bold(),
        recipient
    );

    let registry = FileRegistry::new(registry_path)
        .await
        .context("Failed to open registry file")?;

    let meta = if recipient.starts_with("0x") {
        let registrant =
            EthAddress::from_hex(recipient).context("Invalid recipient address")?;
        let raw = registry
            .get_meta_address(&registrant, SCHEME_SECP256K1)
            .await?
            .context("Recipient has no registered meta-address")?;
        MetaAddress::decode(&raw)?
    } else {
        recipient.parse().context("Invalid meta-address")?
    };

    let mut builder = StealthPaymentBuilder::new().recipient(meta);
    if let Some(amount) = amount {
        builder = builder.amount(amount);
    }
    if let Some(token) = token {
        builder = builder.token(token);
    }
    if let Some(memo) = memo {
        builder = builder.memo(memo);
    }
    let payment = builder.build().context("Failed to create stealth payment")?;

    let id = registry.announce(payment.announcement.clone()).await?;
    registry.flush().await?;
    info!(id, view_tag = payment.details.view_tag, "announcement published");

    println!("\n{}", "Stealth payment created:".green().bold());
    println!(
        "   {} {}",
        "Address:".yellow(),
        payment.details.address.to_hex_string()
    );
    println!("   {} {}", "View tag:".dimmed(), payment.details.view_tag);
    println!(
        "   {} {}",
        "Ephemeral key:".dimmed(),
        payment.details.ephemeral_pk.to_hex()
    );
    println!("   {} {}", "Announcement ID:".dimmed(), id);

    println!("\n{}", "Next steps:".cyan());
    println!("   1. Send funds to the stealth address above");
    println!("   2. The announcement is already published to the registry file");

    Ok(())
}

/// Scan the log for payments to this wallet.
async fn cmd_scan(
    keys: &Path,
    registry_path: &Path,
    from_block: Option<u64>,
    to_block: Option<u64>,
    parallel: bool,
) -> Result<()> {
    println!("{}", "Scanning for payments...".cyan().bold());

    let wallet = load_wallet(keys)?;
    let registry = FileRegistry::new(registry_path)
        .await
        .context("Failed to open registry file")?;

    let total = registry.count().await?;
    if total == 0 {
        println!("\n{}", "Registry is empty. Nothing to scan.".yellow());
        return Ok(());
    }

    let mut config = ScannerConfig::new();
    if let (Some(from), Some(to)) = (from_block, to_block) {
        config = config.block_range(from, to);
    } else {
        config.from_block = from_block;
        config.to_block = to_block;
    }

    let scanner = Scanner::from_wallet(&wallet);
    debug!(?from_block, ?to_block, parallel, total, "starting scan");

    let matched = if parallel {
        scanner.scan_parallel(&registry, config).await?
    } else {
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
                .progress_chars("#>-"),
        );
        let pb_handle = pb.clone();
        let callback: obscura_scanner::ProgressCallback = Box::new(move |progress| {
            pb_handle.set_position(progress.scanned);
        });

        let matched = scanner
            .scan_with_progress(&registry, config, callback)
            .await?;
        pb.finish_and_clear();
        matched
    };

    let stats = scanner.stats();
    info!(
        matches = matched.len(),
        scanned = stats.total_scanned,
        "scan complete"
    );
    if matched.is_empty() {
        println!("\n{}", "No payments found.".yellow());
    } else {
        println!("\n{} {} payment(s) found:", "OK".green(), matched.len());
        for payment in &matched {
            println!(
                "   {} {}  (announcement #{}, block {})",
                "Address:".green(),
                payment.stealth_address.to_hex_string(),
                payment.announcement.id,
                payment
                    .announcement
                    .block_number
                    .map_or("pending".to_string(), |b| b.to_string())
            );
        }
    }

    println!(
        "\n   {} scanned {} at {:.0}/s, {:.1}% skipped by view tag",
        "Stats:".dimmed(),
        stats.total_scanned,
        stats.rate(),
        stats.filter_efficiency()
    );

    Ok(())
}

/// Recover the stealth private key for an announcement.
async fn cmd_recover(keys: &Path, registry_path: &Path, id: u64) -> Result<()> {
    let wallet = load_wallet(keys)?;
    let registry = FileRegistry::new(registry_path)
        .await
        .context("Failed to open registry file")?;

    let announcement = registry
        .memory()
        .all_announcements()
        .into_iter()
        .find(|ann| ann.id == id)
        .with_context(|| format!("No announcement with id {id}"))?;

    let recovered = wallet
        .recover(&announcement)
        .context("Recovery failed; is this announcement really yours?")?;

    println!("{}", "Stealth key recovered:".green().bold());
    println!(
        "   {} {}",
        "Address:".yellow(),
        recovered.address.to_hex_string()
    );
    println!("   {} {}", "Public key:".dimmed(), recovered.public.to_hex());
    println!(
        "   {} {}",
        "Private key:".red(),
        hex::encode(recovered.secret.as_bytes())
    );
    println!(
        "\n{}",
        "This key controls the funds at the address above. Import it once, then discard."
            .red()
            .bold()
    );

    Ok(())
}

/// Scanning benchmark against an in-memory log.
async fn cmd_bench(count: usize) -> Result<()> {
    println!(
        "{} {} announcements",
        "Benchmarking with".cyan().bold(),
        count
    );

    println!("\n{}", "1. Deriving keys...".dimmed());
    let mut sig = vec![0u8; SIGNATURE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut sig);
    let ours = StealthWallet::from_signature(&sig)?;

    rand::rngs::OsRng.fill_bytes(&mut sig);
    let other = StealthWallet::from_signature(&sig)?;

    println!("{}", "2. Creating announcements...".dimmed());
    let registry = MemoryRegistry::new();
    let pb = ProgressBar::new(count as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("   [{bar:40.cyan/blue}] {pos}/{len}")?
            .progress_chars("#>-"),
    );

    let start = std::time::Instant::now();
    for i in 0..count {
        // One payment in a hundred is ours
        let meta = if i % 100 == 0 {
            ours.meta_address()
        } else {
            other.meta_address()
        };
        let payment = create_stealth_payment(meta)?;
        registry.announce(payment.announcement).await?;
        pb.inc(1);
    }
    pb.finish();
    println!("   Created {} announcements in {:?}", count, start.elapsed());

    println!("\n{}", "3. Scanning...".dimmed());
    let scanner = Scanner::from_wallet(&ours);
    let start = std::time::Instant::now();
    let matched = scanner.scan_all(&registry).await?;
    let scan_time = start.elapsed();

    let rate = count as f64 / scan_time.as_secs_f64();
    println!("   Scanned {} announcements in {:?}", count, scan_time);
    println!("   Found {} payments", matched.len());

    println!("\n{}", "Results:".green().bold());
    println!("   Scan rate: {:.0} announcements/sec", rate);
    println!(
        "   Time per announcement: {:.2}us",
        scan_time.as_micros() as f64 / count as f64
    );
    println!(
        "   View tag filter skipped {:.1}% of foreign traffic",
        scanner.stats().filter_efficiency()
    );

    let expected = count.div_ceil(100);
    if matched.len() == expected {
        println!("   {} All expected payments found", "OK".green());
    } else {
        println!(
            "   {} Expected {}, found {}",
            "MISMATCH".red(),
            expected,
            matched.len()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_file_round_trip() {
        let mut sig = vec![0x42u8; 64];
        sig.push(27);
        let wallet = StealthWallet::from_signature(&sig).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.json");
        let file = KeysFile::from_wallet(&wallet);
        std::fs::write(&path, serde_json::to_string_pretty(&file).unwrap()).unwrap();

        let loaded = load_wallet(&path).unwrap();
        assert_eq!(loaded.meta_address(), wallet.meta_address());
    }

    #[test]
    fn test_load_wallet_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(load_wallet(&path).is_err());
    }
}
