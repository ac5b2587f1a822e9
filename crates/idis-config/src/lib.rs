// crates/idis-config/src/lib.rs
// ============================================================================
// Module: IDIS Config
// Description: Environment-variable surface and the composition root.
// Purpose: Build the process-wide service registry from explicit config.
// Dependencies: idis-audit, idis-calc, idis-core, idis-object-store,
//               idis-policy, serde, tracing-subscriber
// ============================================================================

//! ## Overview
//! The core never reads process globals mid-request: everything configurable
//! is parsed once into [`IdisConfig`] and wired into a [`ServiceRegistry`]
//! at startup. Missing OIDC variables disable the Bearer path (fail closed);
//! a missing break-glass secret makes validation deny; an audit log path
//! pointing at a directory fails sink construction, which in turn fails
//! every mutation.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod env;
pub mod registry;

pub use env::ApiKeyRecord;
pub use env::ConfigError;
pub use env::IdisConfig;
pub use env::OidcConfig;
pub use registry::RegistryError;
pub use registry::ServiceRegistry;
pub use registry::init_tracing;
