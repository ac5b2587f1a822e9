// crates/idis-config/src/env.rs
// ============================================================================
// Module: Environment Surface
// Description: Parsing of the IDIS_* environment-variable surface.
// Purpose: Turn ambient configuration into one explicit, testable value.
// Dependencies: idis-core, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Recognized variables:
//!
//! | Variable | Effect |
//! |---|---|
//! | `IDIS_API_KEYS_JSON` | api-key -> tenant record map |
//! | `IDIS_OIDC_ISSUER` / `_AUDIENCE` / `_JWKS_URI` / `_JWKS_CACHE_TTL` | JWT path; any missing disables it |
//! | `IDIS_BREAK_GLASS_SECRET` | MAC key for break-glass tokens |
//! | `IDIS_AUDIT_LOG_PATH` | file audit sink path |
//! | `IDIS_OBJECT_STORE_BASE_DIR` | object store root (default: temp dir + `idis_objects`) |
//! | `IDIS_DATABASE_URL` / `IDIS_DATABASE_ADMIN_URL` | relational store URLs |
//!
//! Parsing is pure over a lookup function so tests never mutate the process
//! environment.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::PathBuf;

use idis_core::DataRegion;
use idis_core::Role;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Variable Names
// ============================================================================

/// API-key map variable.
pub const API_KEYS_VAR: &str = "IDIS_API_KEYS_JSON";
/// OIDC issuer variable.
pub const OIDC_ISSUER_VAR: &str = "IDIS_OIDC_ISSUER";
/// OIDC audience variable.
pub const OIDC_AUDIENCE_VAR: &str = "IDIS_OIDC_AUDIENCE";
/// OIDC JWKS URI variable.
pub const OIDC_JWKS_URI_VAR: &str = "IDIS_OIDC_JWKS_URI";
/// OIDC JWKS cache-TTL variable.
pub const OIDC_JWKS_CACHE_TTL_VAR: &str = "IDIS_OIDC_JWKS_CACHE_TTL";
/// Break-glass secret variable.
pub const BREAK_GLASS_SECRET_VAR: &str = "IDIS_BREAK_GLASS_SECRET";
/// Audit log path variable.
pub const AUDIT_LOG_PATH_VAR: &str = "IDIS_AUDIT_LOG_PATH";
/// Object store base directory variable.
pub const OBJECT_STORE_BASE_DIR_VAR: &str = "IDIS_OBJECT_STORE_BASE_DIR";
/// Application database URL variable.
pub const DATABASE_URL_VAR: &str = "IDIS_DATABASE_URL";
/// Admin/migration database URL variable.
pub const DATABASE_ADMIN_URL_VAR: &str = "IDIS_DATABASE_ADMIN_URL";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration parse errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable held invalid JSON or an invalid value.
    #[error("invalid value for {variable}: {reason}")]
    Invalid {
        /// Offending variable name.
        variable: String,
        /// Parse failure reason.
        reason: String,
    },
}

// ============================================================================
// SECTION: Records
// ============================================================================

/// One api-key record from `IDIS_API_KEYS_JSON`.
///
/// # Invariants
/// - Unknown roles reject at deserialization; nothing defaults permissive.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiKeyRecord {
    /// Tenant the key authenticates into.
    pub tenant_id: String,
    /// Actor bound to the key.
    pub actor_id: String,
    /// Display name.
    pub name: String,
    /// Roles granted to the actor.
    pub roles: BTreeSet<Role>,
    /// Data-residency region.
    pub data_region: DataRegion,
}

/// OIDC configuration; present only when every variable is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OidcConfig {
    /// Token issuer.
    pub issuer: String,
    /// Expected audience.
    pub audience: String,
    /// JWKS endpoint.
    pub jwks_uri: String,
    /// JWKS cache TTL in seconds.
    pub jwks_cache_ttl_seconds: u64,
}

// ============================================================================
// SECTION: Config
// ============================================================================

/// Parsed IDIS configuration.
///
/// # Invariants
/// - `oidc` is `Some` only when all four OIDC variables were present; a
///   partial set disables the Bearer path entirely.
#[derive(Debug, Clone, PartialEq)]
pub struct IdisConfig {
    /// Api-key records keyed by the api key itself.
    pub api_keys: BTreeMap<String, ApiKeyRecord>,
    /// OIDC configuration, when fully specified.
    pub oidc: Option<OidcConfig>,
    /// Break-glass MAC secret, when configured.
    pub break_glass_secret: Option<String>,
    /// Audit log file path, when the file sink is selected.
    pub audit_log_path: Option<PathBuf>,
    /// Object store root directory.
    pub object_store_base_dir: PathBuf,
    /// Application database URL, when configured.
    pub database_url: Option<String>,
    /// Admin database URL, when configured.
    pub database_admin_url: Option<String>,
}

impl IdisConfig {
    /// Parses configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a present variable holds an invalid
    /// value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Parses configuration from a lookup function (testable form).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a present variable holds an invalid
    /// value.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let api_keys = match lookup(API_KEYS_VAR) {
            None => BTreeMap::new(),
            Some(raw) => {
                serde_json::from_str(&raw).map_err(|err| ConfigError::Invalid {
                    variable: API_KEYS_VAR.to_string(),
                    reason: err.to_string(),
                })?
            }
        };

        let oidc = match (
            lookup(OIDC_ISSUER_VAR),
            lookup(OIDC_AUDIENCE_VAR),
            lookup(OIDC_JWKS_URI_VAR),
            lookup(OIDC_JWKS_CACHE_TTL_VAR),
        ) {
            (Some(issuer), Some(audience), Some(jwks_uri), Some(ttl)) => {
                let jwks_cache_ttl_seconds =
                    ttl.parse::<u64>().map_err(|err| ConfigError::Invalid {
                        variable: OIDC_JWKS_CACHE_TTL_VAR.to_string(),
                        reason: err.to_string(),
                    })?;
                Some(OidcConfig {
                    issuer,
                    audience,
                    jwks_uri,
                    jwks_cache_ttl_seconds,
                })
            }
            // Any missing variable disables the Bearer path.
            _ => None,
        };

        let object_store_base_dir = lookup(OBJECT_STORE_BASE_DIR_VAR)
            .map_or_else(
                || std::env::temp_dir().join("idis_objects"),
                PathBuf::from,
            );

        Ok(Self {
            api_keys,
            oidc,
            break_glass_secret: lookup(BREAK_GLASS_SECRET_VAR).filter(|s| !s.is_empty()),
            audit_log_path: lookup(AUDIT_LOG_PATH_VAR).map(PathBuf::from),
            object_store_base_dir,
            database_url: lookup(DATABASE_URL_VAR),
            database_admin_url: lookup(DATABASE_ADMIN_URL_VAR),
        })
    }
}
