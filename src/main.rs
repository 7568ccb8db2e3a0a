use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use time::format_description::well_known::Rfc3339;

use qshield::capability::CapabilityProfiler;
use qshield::config::QShieldConfig;
use qshield::context::DeviceContext;
use qshield::crypto::profile::ProfileSelector;
use qshield::crypto::{AlgorithmVariant, CryptoError, KeyPair, SymmetricKey};

#[derive(Parser)]
#[command(
    name = "qshield",
    about = "Post-quantum session and key-lifecycle engine for IoT devices",
    version
)]
struct Cli {
    /// qshield config JSON (defaults apply when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Key store root, overriding the config's `key_dir`
    #[arg(long, global = true)]
    key_dir: Option<PathBuf>,

    /// Device profile (`auto`, `constrained`, `standard`, `high_performance`)
    #[arg(long, global = true)]
    profile: Option<String>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Print the hardware capability snapshot and the profile it selects
    Probe,

    /// Generate and store keypairs for an owner
    Keygen {
        #[arg(long)]
        owner: String,

        /// Single variant id (e.g. `ml-kem-512`); defaults to the profile's KEM and signature
        #[arg(long)]
        variant: Option<String>,
    },

    /// Rotate an owner's keypairs
    Rotate {
        #[arg(long)]
        owner: String,

        #[arg(long)]
        variant: Option<String>,

        /// Only rotate keys older than `key_rotation_interval_secs`
        #[arg(long)]
        if_due: bool,
    },

    /// Securely erase all key material of an owner
    Delete {
        #[arg(long)]
        owner: String,
    },

    /// Show what is stored for an owner (no key bytes)
    Info {
        #[arg(long)]
        owner: String,
    },

    /// Run a session + telemetry round trip with throwaway keys
    Selftest,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = QShieldConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.key_dir {
        config.key_dir = dir;
    }
    if let Some(profile) = cli.profile {
        config.profile = profile;
    }

    let report = match cli.cmd {
        Cmd::Probe => probe(&config),
        Cmd::Keygen { owner, variant } => keygen(&config, &owner, variant.as_deref())?,
        Cmd::Rotate {
            owner,
            variant,
            if_due,
        } => rotate(&config, &owner, variant.as_deref(), if_due)?,
        Cmd::Delete { owner } => {
            DeviceContext::from_config(&config)?.keystore().delete(&owner)?;
            json!({ "owner_id": owner, "deleted": true })
        }
        Cmd::Info { owner } => {
            let ctx = DeviceContext::from_config(&config)?;
            let info = ctx.keystore().key_info(&owner)?;
            let state = ctx.keystore().owner_state(&owner)?;
            json!({ "info": info, "state": state })
        }
        Cmd::Selftest => selftest(&config)?,
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn probe(config: &QShieldConfig) -> Value {
    let profiler = CapabilityProfiler::new();
    let snapshot = profiler.snapshot();
    let (profile, suite) = ProfileSelector::with_memory_threshold(config.min_pqc_memory_bytes)
        .select_suite(snapshot, config.profile_override());
    json!({
        "capabilities": snapshot,
        "crypto_acceleration": snapshot.has_crypto_acceleration(),
        "random_source": snapshot.random_source(),
        "pqc_capable": snapshot.pqc_capable(config.min_pqc_memory_bytes),
        "profile": profile,
        "suite": suite,
    })
}

fn parse_variants(ctx: &DeviceContext, variant: Option<&str>) -> Result<Vec<AlgorithmVariant>> {
    match variant {
        None => Ok(ctx.variants().to_vec()),
        Some(id) => match AlgorithmVariant::from_id(id) {
            Some(v) => Ok(vec![v]),
            None => Err(CryptoError::UnsupportedAlgorithm(id.to_string()).into()),
        },
    }
}

fn describe(keypair: &KeyPair) -> Value {
    json!({
        "variant": keypair.variant,
        "public_key_bytes": keypair.public.0.len(),
        "private_key_bytes": keypair.private.0.len(),
        "public_key_sha256": hex::encode(Sha256::digest(&keypair.public.0)),
    })
}

fn keygen(config: &QShieldConfig, owner: &str, variant: Option<&str>) -> Result<Value> {
    let ctx = DeviceContext::from_config(config)?;
    let mut keys = Vec::new();
    for v in parse_variants(&ctx, variant)? {
        let keypair = ctx
            .keystore()
            .generate_keypair(owner, v)
            .with_context(|| format!("generating {v} for '{owner}'"))?;
        keys.push(describe(&keypair));
    }
    Ok(json!({
        "owner_id": owner,
        "profile": ctx.profile(),
        "key_dir": ctx.keystore().root(),
        "keys": keys,
        "created_at": time::OffsetDateTime::now_utc().format(&Rfc3339)?,
    }))
}

fn rotate(config: &QShieldConfig, owner: &str, variant: Option<&str>, if_due: bool) -> Result<Value> {
    let ctx = DeviceContext::from_config(config)?;
    let mut results = Vec::new();
    for v in parse_variants(&ctx, variant)? {
        let rotated = if if_due {
            ctx.keystore()
                .rotate_if_due(owner, v, config.rotation_interval())?
        } else {
            ctx.keystore().rotate(owner, v)?;
            true
        };
        results.push(json!({ "variant": v, "rotated": rotated }));
    }
    Ok(json!({ "owner_id": owner, "results": results }))
}

/// Device and collector in one process: provision, agree a session key,
/// exchange one frame, and confirm that a flipped byte is rejected.
fn selftest(config: &QShieldConfig) -> Result<Value> {
    let ctx = DeviceContext::from_config(config)?;
    let session = ctx.session();
    let codec = ctx.codec();

    let collector = session.kem().generate_keypair("selftest-collector")?;
    let device = codec.signer().generate_keypair("selftest-device")?;

    let (device_key, ciphertext) = session.establish(&collector.public.0)?;
    let collector_key: SymmetricKey = session.accept(&ciphertext.0, &collector.private)?;
    if device_key != collector_key {
        bail!("session keys disagree");
    }

    let payload = b"temp=21.5";
    let mut frame = codec.seal(payload, b"selftest", &device_key, &device)?;
    let opened = codec.open(&frame, &collector_key, &device.public)?;
    if opened != payload {
        bail!("telemetry round trip returned different plaintext");
    }

    if let Some(last) = frame.ciphertext.last_mut() {
        *last ^= 0x01;
    }
    match codec.open(&frame, &collector_key, &device.public) {
        Err(CryptoError::DecryptionAuthFailure) => {}
        other => bail!("tampered frame not rejected: {other:?}"),
    }

    info!("selftest passed for profile {}", ctx.profile());
    Ok(json!({
        "profile": ctx.profile(),
        "suite": ctx.suite(),
        "backend": session.kem().backend_id(),
        "kem_ciphertext_bytes": ciphertext.0.len(),
        "signature_bytes": frame.signature.len(),
        "ok": true,
    }))
}
