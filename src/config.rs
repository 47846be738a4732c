//! Service configuration. Everything is an explicit value injected into a
//! constructor; nothing reads the environment after startup.

use std::path::PathBuf;

use crate::avoidance::DEFAULT_MARGIN_DEG;

/// Connection details for the external routing provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Base URL of the routing API, without the trailing `/routes`.
    pub base_url: String,
    pub api_key: String,
}

/// Knobs for the escalation loop.
///
/// The attempt ceiling and the risk floor schedule are deliberately separate
/// values: raising `max_attempts` does not change which risks a given
/// attempt avoids.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Avoidance queries per resolution; the baseline query is extra.
    pub max_attempts: u32,
    /// Risk floor used on the first attempt.
    pub floor_start: f64,
    /// How much the floor rises on each retry.
    pub floor_step: f64,
    /// Accepted duration as a multiple of the unconstrained baseline.
    pub time_tolerance: f64,
    /// Half-width of the box drawn around each risk point, in degrees.
    pub margin_deg: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            floor_start: 0.0,
            floor_step: 1.0,
            time_tolerance: 1.2,
            margin_deg: DEFAULT_MARGIN_DEG,
        }
    }
}

/// Everything `main` needs to assemble the service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    /// Path of the risk point document store.
    pub risk_store: PathBuf,
    pub provider: ProviderConfig,
    pub resolver: ResolverConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: std::env::var("SAFEROUTE_BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:3000".into()),
            risk_store: std::env::var("SAFEROUTE_RISK_STORE")
                .unwrap_or_else(|_| "data/risks.json".into())
                .into(),
            provider: ProviderConfig {
                base_url: std::env::var("SAFEROUTE_PROVIDER_URL")
                    .unwrap_or_else(|_| "https://router.hereapi.com/v8".into()),
                api_key: std::env::var("SAFEROUTE_PROVIDER_KEY").unwrap_or_default(),
            },
            resolver: ResolverConfig::default(),
        }
    }
}
