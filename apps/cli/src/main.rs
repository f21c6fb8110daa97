mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use eclet_core::{Device, EcletConfig, SimulatedDevice};
use tracing::{debug, error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "ECC secure element tool", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Device image file (overrides the configuration)
    #[arg(long, global = true)]
    device: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Verb,
}

#[derive(Subcommand, Debug)]
enum Verb {
    /// Print the SHA-256 of a file (or stdin)
    Hash {
        #[arg(long)]
        file: Option<PathBuf>,
    },
    #[command(flatten)]
    Device(DeviceVerb),
}

/// Verbs that talk to the device.
#[derive(Subcommand, Debug)]
enum DeviceVerb {
    /// Print 32 random bytes
    Random {
        /// Update the RNG seed before generating
        #[arg(long)]
        update_seed: bool,
    },
    /// Print the 9-byte serial number
    SerialNum,
    /// Print the lifecycle state
    State,
    /// Print the config zone
    GetConfig,
    /// Print the OTP zone (personalized devices only)
    GetOtp,
    /// Provision the device
    Personalize {
        /// Lifecycle state to reach
        #[arg(long, value_enum, default_value_t = Goal::Personalized)]
        goal: Goal,
        /// Key to burn into a data slot, as SLOT:HEX (repeatable)
        #[arg(long = "key", value_parser = commands::parse_slot_key)]
        keys: Vec<(u8, Vec<u8>)>,
    },
    /// Print a nonce mixed from the OTP zone
    Nonce,
    /// Generate a private key in a slot and print its public key
    GenKey {
        #[arg(long)]
        slot: u8,
    },
    /// Print the public key of a slot
    GetPub {
        #[arg(long)]
        slot: u8,
    },
    /// Sign the SHA-256 of a file (or stdin) with a slot key
    Sign {
        #[arg(long)]
        slot: u8,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Verify a signature over the SHA-256 of a file (or stdin)
    Verify {
        /// Public key as hex, 64-byte native or 65-byte uncompressed
        #[arg(long)]
        pub_key: String,
        /// Signature as hex, R || S
        #[arg(long)]
        signature: String,
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Goal {
    Initialized,
    Personalized,
}

fn load_config(args: &Args) -> Result<EcletConfig> {
    let mut config = match &args.config {
        Some(path) => EcletConfig::load_from_file(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => EcletConfig::default(),
    };
    if let Some(device) = &args.device {
        config.device_image = device.clone();
    }
    Ok(config)
}

fn open_device(config: &EcletConfig) -> Result<SimulatedDevice> {
    let sim = if config.device_image.exists() {
        debug!(image = %config.device_image.display(), "Loading device image");
        SimulatedDevice::load_image(&config.device_image)
            .with_context(|| format!("loading device image {}", config.device_image.display()))?
    } else {
        info!(
            image = %config.device_image.display(),
            "No device image, starting from a factory part"
        );
        SimulatedDevice::new()
    };
    sim.set_response_timeout(config.response_timeout_ms);
    Ok(sim)
}

fn run(args: Args) -> Result<()> {
    let config = load_config(&args)?;
    let verb = match args.command {
        Verb::Hash { file } => return commands::hash(file.as_deref()),
        Verb::Device(verb) => verb,
    };

    let sim = open_device(&config)?;
    let mut device = Device::new(&sim);
    let result = commands::dispatch(&mut device, &config, verb);

    // Lock and key state changes are permanent, so the image is saved on failure too.
    sim.save_image(&config.device_image)
        .with_context(|| format!("saving device image {}", config.device_image.display()))?;
    result
}

fn main() {
    let args = Args::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(if args.verbose {
                    tracing::Level::DEBUG.into()
                } else {
                    tracing::Level::INFO.into()
                })
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    if let Err(e) = run(args) {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_not_a_device_verb() {
        let args = Args::try_parse_from(["eclet", "hash", "--file", "input.bin"]).unwrap();
        assert!(matches!(args.command, Verb::Hash { file: Some(_) }));

        let args = Args::try_parse_from(["eclet", "random", "--update-seed"]).unwrap();
        assert!(matches!(
            args.command,
            Verb::Device(DeviceVerb::Random { update_seed: true })
        ));

        let args = Args::try_parse_from(["eclet", "gen-key", "--slot", "2"]).unwrap();
        assert!(matches!(args.command, Verb::Device(DeviceVerb::GenKey { slot: 2 })));
    }
}
