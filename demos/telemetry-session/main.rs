//! Telemetry Session Demo for qshield
//!
//! This example walks one device and one collector through the full
//! lifecycle:
//!
//! 1. Probe the host and select a device profile
//! 2. Provision KEM and signature keypairs in a throwaway key store
//! 3. Agree a session key over ML-KEM
//! 4. Seal, transmit (as JSON) and open a telemetry frame
//! 5. Show that a tampered frame is rejected
//! 6. Rotate the collector's KEM key and re-establish
//!
//! Run with: `cargo run --example telemetry-session`

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use qshield::crypto::registry::default_registry;
use qshield::{CapabilityProfiler, DeviceContext, KeyStore, ProfileSelector, TelemetryFrame};

fn main() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Arc::new(default_registry());

    println!("=== qshield Telemetry Session Demo ===");
    println!();

    // ---- Step 1: Probe ----
    let profiler = CapabilityProfiler::new();
    let snapshot = profiler.snapshot();
    let (profile, suite) = ProfileSelector::new().select_suite(snapshot, None);
    println!("--- Step 1: Capabilities ---");
    println!(
        "  arch={} accel={} available={} MiB",
        snapshot.cpu_arch,
        snapshot.has_crypto_acceleration(),
        snapshot.available_memory_bytes / (1024 * 1024)
    );
    println!(
        "  profile={profile} kem={} sig={} aead={}",
        suite.kem.id(),
        suite.signature.id(),
        suite.aead.id()
    );
    println!();

    let context = |name: &str| {
        DeviceContext::new(
            profile,
            Arc::clone(&registry),
            Arc::new(KeyStore::new(dir.path().join(name), Arc::clone(&registry))),
            Duration::from_secs(60),
        )
        .unwrap()
    };
    let device = context("device");
    let collector = context("collector");

    // ---- Step 2: Provision ----
    println!("--- Step 2: Provision ---");
    let (collector_kem, _) = collector.provision_owner("collector").unwrap();
    let (_, device_sig) = device.provision_owner("sensor-1").unwrap();
    println!(
        "  collector KEM public key: {} bytes",
        collector_kem.public.0.len()
    );
    println!("  device signing public key: {} bytes", device_sig.public.0.len());
    println!();

    // ---- Step 3: Session ----
    println!("--- Step 3: Session ---");
    let ciphertext = device
        .establish_session("sensor-1", &collector_kem.public.0)
        .unwrap();
    collector
        .accept_session("collector", "sensor-1", &ciphertext)
        .unwrap();
    println!("  KEM ciphertext: {} bytes", ciphertext.len());
    println!();

    // ---- Step 4: Telemetry ----
    println!("--- Step 4: Telemetry ---");
    let frame = device
        .seal_telemetry("sensor-1", b"temp=21.5", b"seq=1")
        .unwrap();
    let wire = frame.to_json().unwrap();
    println!("  wire frame: {} bytes of JSON", wire.len());
    let received = TelemetryFrame::from_json(&wire).unwrap();
    let plaintext = collector
        .open_telemetry(&received, &device_sig.public)
        .unwrap();
    println!("  [OK] opened: {}", String::from_utf8_lossy(&plaintext));
    println!();

    // ---- Step 5: Tamper ----
    println!("--- Step 5: Tamper ---");
    let mut tampered = received;
    if let Some(last) = tampered.ciphertext.last_mut() {
        *last ^= 0x01;
    }
    match collector.open_telemetry(&tampered, &device_sig.public) {
        Ok(_) => println!("  [FAIL] tampered frame accepted"),
        Err(e) => println!("  [OK] rejected: {e}"),
    }
    println!();

    // ---- Step 6: Rotation ----
    println!("--- Step 6: Rotation ---");
    let rotated = collector
        .keystore()
        .rotate("collector", suite.kem.into())
        .unwrap();
    let ciphertext = device
        .establish_session("sensor-1", &rotated.public.0)
        .unwrap();
    collector
        .accept_session("collector", "sensor-1", &ciphertext)
        .unwrap();
    let frame = device
        .seal_telemetry("sensor-1", b"temp=21.7", b"seq=2")
        .unwrap();
    let plaintext = collector
        .open_telemetry(&frame, &device_sig.public)
        .unwrap();
    println!(
        "  [OK] after rotation: {}",
        String::from_utf8_lossy(&plaintext)
    );
    let info = collector.keystore().key_info("collector").unwrap();
    println!("  archived files: {}", info.archived_files);
}
