// crates/idis-prompts/src/registry.rs
// ============================================================================
// Module: Prompt Registry Loader
// Description: Strict on-disk artifact and pointer-file handling.
// Purpose: Load prompts fail-closed and write pointers atomically.
// Dependencies: idis-core, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Layout (bit-exact):
//!
//! ```text
//! <root>/<prompt_id>/<version>/prompt.md
//! <root>/<prompt_id>/<version>/metadata.json
//! <root>/registry.<env>.json
//! ```
//!
//! Pointer files are canonical JSON with sorted keys, 2-space indent, and a
//! trailing newline, always written via temp + rename in the same directory.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use idis_core::Timestamp;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Prompt registry errors; every variant is fail-closed.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum PromptRegistryError {
    /// A required file is missing or unreadable.
    #[error("prompt file missing or unreadable: {0}")]
    Missing(String),
    /// JSON parsing or schema validation failed.
    #[error("prompt metadata invalid: {0}")]
    Invalid(String),
    /// Version is not strict MAJOR.MINOR.PATCH.
    #[error("invalid semver '{0}'")]
    Semver(String),
    /// Pointer and artifact metadata disagree.
    #[error("pointer/metadata mismatch: {0}")]
    Mismatch(String),
    /// Schema reference could not be resolved (or no schema root is
    /// configured while a schema ref is present).
    #[error("schema ref unresolvable: {0}")]
    SchemaRef(String),
    /// Filesystem write failed.
    #[error("registry write failed: {0}")]
    Write(String),
}

// ============================================================================
// SECTION: Enumerations
// ============================================================================

/// Prompt artifact lifecycle status.
///
/// # Invariants
/// - Variants are stable wire strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PromptStatus {
    /// Under development.
    Draft,
    /// Staged for evaluation.
    Staging,
    /// Serving production traffic.
    Prod,
    /// Retired; content retained for reproducibility.
    Deprecated,
}

/// Prompt risk classification driving gate requirements.
///
/// # Invariants
/// - Variants are stable wire strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskClass {
    /// Gate 1 required.
    Low,
    /// Gates 1 and 2 required.
    Medium,
    /// Gates 1 through 4 required.
    High,
}

/// Deployment environment for pointer files.
///
/// # Invariants
/// - Variants are stable wire strings and file-name segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Development.
    Dev,
    /// Staging.
    Staging,
    /// Production.
    Prod,
}

impl Environment {
    /// Returns the file-name segment for this environment.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Staging => "staging",
            Self::Prod => "prod",
        }
    }
}

// ============================================================================
// SECTION: Semver
// ============================================================================

/// Parses a strict `MAJOR.MINOR.PATCH` version.
///
/// # Errors
///
/// Returns [`PromptRegistryError::Semver`] for anything else — no `v`
/// prefixes, no pre-release tags, no missing components.
pub fn parse_semver(version: &str) -> Result<(u64, u64, u64), PromptRegistryError> {
    let parts: Vec<&str> = version.split('.').collect();
    if parts.len() != 3 {
        return Err(PromptRegistryError::Semver(version.to_string()));
    }
    let mut components = [0_u64; 3];
    for (idx, part) in parts.iter().enumerate() {
        if part.is_empty()
            || !part.bytes().all(|b| b.is_ascii_digit())
            || (part.len() > 1 && part.starts_with('0'))
        {
            return Err(PromptRegistryError::Semver(version.to_string()));
        }
        components[idx] = part
            .parse::<u64>()
            .map_err(|_| PromptRegistryError::Semver(version.to_string()))?;
    }
    Ok((components[0], components[1], components[2]))
}

// ============================================================================
// SECTION: Metadata and Artifacts
// ============================================================================

/// Prompt artifact metadata (`metadata.json`).
///
/// # Invariants
/// - Unknown fields reject at deserialization.
/// - `evaluation_results_ref` is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PromptMetadata {
    /// Prompt identifier; must match the directory and pointer.
    pub prompt_id: String,
    /// Strict semver; must match the directory and pointer.
    pub version: String,
    /// Lifecycle status.
    pub status: PromptStatus,
    /// Risk classification.
    pub risk_class: RiskClass,
    /// Gates that must pass before promotion.
    pub validation_gates_required: BTreeSet<u8>,
    /// Reference to evaluation results; never empty.
    pub evaluation_results_ref: String,
    /// Optional structured-output schema reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_ref: Option<String>,
}

/// A loaded prompt artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptArtifact {
    /// Prompt body (`prompt.md`).
    pub prompt_text: String,
    /// Parsed metadata.
    pub metadata: PromptMetadata,
}

// ============================================================================
// SECTION: Pointer Files
// ============================================================================

/// Registry pointer file (`registry.<env>.json`).
///
/// # Invariants
/// - `prompts` maps prompt id to active version; keys serialize sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryFile {
    /// Environment the file governs.
    pub env: Environment,
    /// Active version per prompt id.
    pub prompts: BTreeMap<String, String>,
    /// Last-update timestamp.
    pub updated_at: Timestamp,
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Strict on-disk prompt registry.
#[derive(Debug, Clone)]
pub struct PromptRegistry {
    /// Artifact root directory.
    root: PathBuf,
    /// Optional schema root for resolving schema refs.
    schema_root: Option<PathBuf>,
}

impl PromptRegistry {
    /// Creates a registry over `root` with an optional schema root.
    #[must_use]
    pub fn new(root: PathBuf, schema_root: Option<PathBuf>) -> Self {
        Self { root, schema_root }
    }

    /// Returns the artifact directory for `prompt_id@version`.
    #[must_use]
    pub fn artifact_dir(&self, prompt_id: &str, version: &str) -> PathBuf {
        self.root.join(prompt_id).join(version)
    }

    /// Returns the pointer-file path for an environment.
    #[must_use]
    pub fn pointer_path(&self, env: Environment) -> PathBuf {
        self.root.join(format!("registry.{}.json", env.as_str()))
    }

    /// Loads one artifact strictly.
    ///
    /// # Errors
    ///
    /// Returns [`PromptRegistryError`] for any missing file, invalid JSON,
    /// semver violation, id/version mismatch, or unresolvable schema ref.
    pub fn load_artifact(
        &self,
        prompt_id: &str,
        version: &str,
    ) -> Result<PromptArtifact, PromptRegistryError> {
        parse_semver(version)?;
        let dir = self.artifact_dir(prompt_id, version);
        let prompt_text = read_text(&dir.join("prompt.md"))?;
        let metadata_raw = read_text(&dir.join("metadata.json"))?;
        let metadata: PromptMetadata = serde_json::from_str(&metadata_raw)
            .map_err(|err| PromptRegistryError::Invalid(err.to_string()))?;
        parse_semver(&metadata.version)?;
        if metadata.prompt_id != prompt_id {
            return Err(PromptRegistryError::Mismatch(format!(
                "metadata prompt_id '{}' != '{prompt_id}'",
                metadata.prompt_id
            )));
        }
        if metadata.version != version {
            return Err(PromptRegistryError::Mismatch(format!(
                "metadata version '{}' != '{version}'",
                metadata.version
            )));
        }
        if metadata.evaluation_results_ref.trim().is_empty() {
            return Err(PromptRegistryError::Invalid(
                "evaluation_results_ref is empty".to_string(),
            ));
        }
        if metadata
            .validation_gates_required
            .iter()
            .any(|gate| !(1..=4).contains(gate))
        {
            return Err(PromptRegistryError::Invalid(
                "validation_gates_required outside 1..=4".to_string(),
            ));
        }
        if let Some(schema_ref) = &metadata.schema_ref {
            match &self.schema_root {
                // No schema root configured: any schema ref fails closed.
                None => {
                    return Err(PromptRegistryError::SchemaRef(format!(
                        "'{schema_ref}' present but no schema root configured"
                    )));
                }
                Some(schema_root) => {
                    let resolved = schema_root.join(schema_ref);
                    if !resolved.is_file() {
                        return Err(PromptRegistryError::SchemaRef(schema_ref.clone()));
                    }
                }
            }
        }
        Ok(PromptArtifact {
            prompt_text,
            metadata,
        })
    }

    /// Loads the pointer file for an environment.
    ///
    /// # Errors
    ///
    /// Returns [`PromptRegistryError`] when the file is missing or invalid.
    pub fn load_pointer(&self, env: Environment) -> Result<RegistryFile, PromptRegistryError> {
        let raw = read_text(&self.pointer_path(env))?;
        serde_json::from_str(&raw).map_err(|err| PromptRegistryError::Invalid(err.to_string()))
    }

    /// Loads the active artifact for `prompt_id` in `env`, verifying
    /// pointer/metadata consistency.
    ///
    /// # Errors
    ///
    /// Returns [`PromptRegistryError`] when unresolvable or inconsistent.
    pub fn load_active(
        &self,
        env: Environment,
        prompt_id: &str,
    ) -> Result<PromptArtifact, PromptRegistryError> {
        let pointer = self.load_pointer(env)?;
        let version = pointer.prompts.get(prompt_id).ok_or_else(|| {
            PromptRegistryError::Missing(format!("no pointer for prompt '{prompt_id}'"))
        })?;
        self.load_artifact(prompt_id, version)
    }

    /// Writes a pointer file atomically: canonical bytes to a temp file in
    /// the same directory, then rename over the original.
    ///
    /// # Errors
    ///
    /// Returns [`PromptRegistryError::Write`] when any filesystem step
    /// fails; the original pointer is untouched on failure.
    pub fn write_pointer(&self, file: &RegistryFile) -> Result<(), PromptRegistryError> {
        let path = self.pointer_path(file.env);
        let rendered = render_pointer(file)?;
        let tmp = self
            .root
            .join(format!(".registry.{}.{}.tmp", file.env.as_str(), Uuid::new_v4()));
        fs::write(&tmp, rendered.as_bytes())
            .map_err(|err| PromptRegistryError::Write(err.to_string()))?;
        if let Err(err) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(PromptRegistryError::Write(err.to_string()));
        }
        Ok(())
    }
}

/// Renders the canonical pointer-file form: sorted keys, 2-space indent,
/// trailing newline.
fn render_pointer(file: &RegistryFile) -> Result<String, PromptRegistryError> {
    let mut rendered = serde_json::to_string_pretty(file)
        .map_err(|err| PromptRegistryError::Write(err.to_string()))?;
    rendered.push('\n');
    Ok(rendered)
}

/// Reads a UTF-8 text file, mapping every failure to `Missing`.
fn read_text(path: &Path) -> Result<String, PromptRegistryError> {
    fs::read_to_string(path)
        .map_err(|err| PromptRegistryError::Missing(format!("{}: {err}", path.display())))
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::missing_docs_in_private_items,
        reason = "Test-only assertions are permitted."
    )]
    use super::*;

    #[test]
    fn semver_is_strict() {
        assert!(parse_semver("1.2.3").is_ok());
        assert!(parse_semver("0.1.0").is_ok());
        assert!(parse_semver("1.2").is_err());
        assert!(parse_semver("v1.2.3").is_err());
        assert!(parse_semver("1.2.3-rc1").is_err());
        assert!(parse_semver("01.2.3").is_err());
        assert!(parse_semver("1.2.3.4").is_err());
    }
}
