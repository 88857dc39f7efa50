//! Engine assembly integration tests.
//!
//! Constructing an [`Engine`] builds every client from configuration but
//! makes no network calls, so wiring can be exercised end to end offline.

use desk_engine::{Engine, EngineConfig, EngineError, Network};

fn config() -> EngineConfig {
    EngineConfig {
        passphrase: "integration-test-passphrase-long-enough!".to_string(),
        ..EngineConfig::default()
    }
}

#[tokio::test]
async fn test_engine_assembles_from_default_config() {
    let engine = Engine::new(&config()).unwrap();

    // A fresh identity round-trips through the shared vault.
    let identity = engine.new_identity().unwrap();
    assert_eq!(identity.address.to_string().len(), 42);
    assert_eq!(identity.encrypted_key.split(':').count(), 3);
}

#[tokio::test]
async fn test_engine_rejects_short_passphrase() {
    let mut config = config();
    config.passphrase = "too short".to_string();

    assert!(matches!(
        Engine::new(&config),
        Err(EngineError::Vault(_))
    ));
}

#[tokio::test]
async fn test_engine_rejects_malformed_addresses() {
    let mut config = config();
    config.ctf_exchange = "not-an-address".to_string();

    assert!(matches!(
        Engine::new(&config),
        Err(EngineError::Config(_))
    ));
}

#[tokio::test]
async fn test_identities_are_distinct_per_generation() {
    let engine = Engine::new(&config()).unwrap();

    let a = engine.new_identity().unwrap();
    let b = engine.new_identity().unwrap();
    assert_ne!(a.address, b.address);
    assert_ne!(a.encrypted_key, b.encrypted_key);
}

#[test]
fn test_mainnet_config_selects_mainnet_urls() {
    let mut config = config();
    config.network = Network::Mainnet;
    assert!(config.network.is_mainnet());
    assert!(config.network.perps_api_url().contains("hyperliquid"));
}
