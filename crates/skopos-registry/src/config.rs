//! Registry settings: the declared `kind → name → configuration` entries.
//!
//! Settings come from two layers applied in order:
//!
//! 1. A JSON file with a top-level `registry` object:
//!    `{ "registry": { "ecr": { "private": { "region": "eu-west-1", ... } } } }`.
//! 2. Environment variables `SKOPOS_REGISTRY_<KIND>_<NAME>_<KEY>=value`, or
//!    `SKOPOS_REGISTRY_<KIND>_<NAME>=value` for a whole entry (the anonymous
//!    `""` form). These win over the file.
//!
//! Any `SKOPOS_*__FILE=<path>` variable is replaced by the same variable
//! without the suffix, holding the content of the file.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{RegistryError, Result};

/// Prefix of every environment variable read by Skopos.
pub const ENV_PREFIX: &str = "SKOPOS_";

/// Environment variable overriding the settings file path.
pub const CONFIG_FILE_ENV: &str = "SKOPOS_CONFIG_FILE";

/// Environment variable holding the log level.
pub const LOG_LEVEL_ENV: &str = "SKOPOS_LOG_LEVEL";

/// Settings file read when none is named explicitly.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

const REGISTRY_ENV_PREFIX: &str = "SKOPOS_REGISTRY_";
const SECRET_FILE_SUFFIX: &str = "__FILE";

/// Settings document; only the `registry` section is read.
#[derive(Deserialize)]
struct SettingsDocument {
    #[serde(default)]
    registry: IndexMap<String, IndexMap<String, Value>>,
}

/// Declared registry entries, in declaration order.
#[derive(Clone, Default, PartialEq)]
pub struct RegistrySettings {
    entries: IndexMap<String, IndexMap<String, Value>>,
}

impl RegistrySettings {
    /// Creates empty settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares (or replaces) the entry `kind.name`.
    #[must_use]
    pub fn with_entry(mut self, kind: &str, name: &str, value: Value) -> Self {
        self.insert(kind, name, value);
        self
    }

    /// Declares (or replaces) the entry `kind.name`.
    pub fn insert(&mut self, kind: &str, name: &str, value: Value) {
        self.entries
            .entry(kind.to_ascii_lowercase())
            .or_default()
            .insert(name.to_ascii_lowercase(), value);
    }

    /// Sets one key of the entry `kind.name`, turning it into an object if needed.
    pub fn set_field(&mut self, kind: &str, name: &str, key: &str, value: Value) {
        let entry = self
            .entries
            .entry(kind.to_ascii_lowercase())
            .or_default()
            .entry(name.to_ascii_lowercase())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(map) = entry {
            map.insert(key.to_ascii_lowercase(), value);
        }
    }

    /// Iterates `(kind, name, raw configuration)` in declaration order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, &Value)> {
        self.entries.iter().flat_map(|(kind, names)| {
            names
                .iter()
                .map(move |(name, value)| (kind.as_str(), name.as_str(), value))
        })
    }

    /// Returns the raw configuration of `kind.name`.
    #[must_use]
    pub fn get(&self, kind: &str, name: &str) -> Option<&Value> {
        self.entries.get(kind).and_then(|names| names.get(name))
    }

    /// Returns true if at least one entry of `kind` is declared.
    #[must_use]
    pub fn declares_kind(&self, kind: &str) -> bool {
        self.entries.get(kind).is_some_and(|names| !names.is_empty())
    }

    /// Number of declared entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.values().map(IndexMap::len).sum()
    }

    /// Returns true if nothing is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Applies `other` on top of `self`. Object entries are merged key by
    /// key, anything else replaces the existing entry.
    pub fn merge(&mut self, other: Self) {
        for (kind, names) in other.entries {
            for (name, value) in names {
                let existing_object = matches!(self.get(&kind, &name), Some(Value::Object(_)));
                match value {
                    Value::Object(fields) if existing_object => {
                        for (key, field) in fields {
                            self.set_field(&kind, &name, &key, field);
                        }
                    }
                    value => self.insert(&kind, &name, value),
                }
            }
        }
    }

    /// Parses the `registry` section of a settings document, keeping the
    /// order in which kinds and names are declared.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ConfigParse`] if the document is not valid
    /// JSON or the section is not a `kind → name → entry` object.
    pub fn from_json(path: &Path, content: &str) -> Result<Self> {
        let document: SettingsDocument =
            serde_json::from_str(content).map_err(|e| RegistryError::ConfigParse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let mut settings = Self::new();
        for (kind, names) in document.registry {
            for (name, value) in names {
                settings.insert(&kind, &name, value);
            }
        }
        Ok(settings)
    }

    /// Reads settings from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ConfigFile`] if the file cannot be read and
    /// [`RegistryError::ConfigParse`] if it is malformed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| RegistryError::ConfigFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(path, &content)
    }

    /// Reads the settings file if it exists.
    ///
    /// A missing file yields empty settings: silently for the default path,
    /// with a warning for an explicitly named one.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read or parsed.
    pub fn load_file(explicit: Option<&Path>) -> Result<Self> {
        let path = explicit.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), Path::to_path_buf);
        if !path.exists() {
            if explicit.is_some() {
                tracing::warn!(path = %path.display(), "Configuration file not found, ignoring");
            } else {
                tracing::info!(path = %path.display(), "No configuration file");
            }
            return Ok(Self::new());
        }

        let settings = Self::from_file(&path)?;
        tracing::info!(path = %path.display(), entries = settings.len(), "Loaded configuration file");
        Ok(settings)
    }

    /// Builds settings from environment variables.
    ///
    /// Variables are applied in sorted order, so a whole-entry variable is
    /// applied before the per-key variables of the same entry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::SecretFile`] if a `__FILE` reference cannot be read.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars = resolve_secret_files(vars)?;
        let mut settings = Self::new();

        for (variable, value) in vars {
            let Some(path) = variable.strip_prefix(REGISTRY_ENV_PREFIX) else {
                continue;
            };
            let parts: Vec<&str> = path.splitn(3, '_').collect();
            match parts.as_slice() {
                [kind, name] if !kind.is_empty() && !name.is_empty() => {
                    settings.insert(kind, name, Value::String(value));
                }
                [kind, name, key] if !kind.is_empty() && !name.is_empty() && !key.is_empty() => {
                    settings.set_field(kind, name, key, Value::String(value));
                }
                _ => tracing::warn!(variable = %variable, "Ignoring malformed registry variable"),
            }
        }
        Ok(settings)
    }

    /// Loads the settings file, then applies `vars` on top.
    ///
    /// # Errors
    ///
    /// See [`Self::load_file`] and [`Self::from_vars`].
    pub fn load<I, K, V>(config_file: Option<&Path>, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut settings = Self::load_file(config_file)?;
        settings.merge(Self::from_vars(vars)?);
        Ok(settings)
    }
}

impl fmt::Debug for RegistrySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries().map(|(kind, name, _)| format!("{kind}.{name}")))
            .finish()
    }
}

/// Keeps `SKOPOS_*` variables, replacing `__FILE` references by file content.
fn resolve_secret_files<I, K, V>(vars: I) -> Result<BTreeMap<String, String>>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let mut resolved = BTreeMap::new();
    let mut files = Vec::new();

    for (variable, value) in vars {
        let (variable, value) = (variable.into(), value.into());
        if !variable.starts_with(ENV_PREFIX) {
            continue;
        }
        match variable.strip_suffix(SECRET_FILE_SUFFIX) {
            Some(target) => files.push((target.to_string(), variable.clone(), PathBuf::from(value))),
            None => {
                resolved.insert(variable, value);
            }
        }
    }

    for (target, variable, path) in files {
        let content =
            std::fs::read_to_string(&path).map_err(|source| RegistryError::SecretFile {
                variable,
                path,
                source,
            })?;
        resolved.insert(target, content.trim_end_matches(['\r', '\n']).to_string());
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn write_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_from_file_keeps_declaration_order() {
        let file = write_file(
            r#"{
                "registry": {
                    "lscr": { "private": { "username": "u", "token": "t" } },
                    "ghcr": { "private": { "username": "u", "token": "t" }, "public": "" }
                }
            }"#,
        );
        let settings = RegistrySettings::from_file(file.path()).unwrap();
        let ids: Vec<String> = settings
            .entries()
            .map(|(kind, name, _)| format!("{kind}.{name}"))
            .collect();
        assert_eq!(ids, ["lscr.private", "ghcr.private", "ghcr.public"]);
        assert_eq!(settings.get("ghcr", "public"), Some(&json!("")));
    }

    #[test]
    fn test_from_file_without_registry_section() {
        let file = write_file(r#"{ "server": { "port": 3000 } }"#);
        assert!(RegistrySettings::from_file(file.path()).unwrap().is_empty());
    }

    #[test]
    fn test_from_file_rejects_malformed_json() {
        let file = write_file("{ not json");
        let err = RegistrySettings::from_file(file.path()).unwrap_err();
        assert!(matches!(err, RegistryError::ConfigParse { .. }));
    }

    #[test]
    fn test_from_file_rejects_wrong_shape() {
        let file = write_file(r#"{ "registry": { "hub": "oops" } }"#);
        let err = RegistrySettings::from_file(file.path()).unwrap_err();
        match err {
            RegistryError::ConfigParse { message, .. } => {
                assert!(message.contains("expected a map"), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_from_json_keeps_order_across_kinds() {
        let settings = RegistrySettings::from_json(
            Path::new("inline.json"),
            r#"{ "registry": {
                "quay": { "zeta": "", "alpha": "" },
                "custom": { "mirror": { "url": "https://registry.example.com" } },
                "ecr": { "private": "" }
            } }"#,
        )
        .unwrap();
        let ids: Vec<String> = settings
            .entries()
            .map(|(kind, name, _)| format!("{kind}.{name}"))
            .collect();
        assert_eq!(ids, ["quay.zeta", "quay.alpha", "custom.mirror", "ecr.private"]);
    }

    #[test]
    fn test_load_file_tolerates_missing_explicit_file() {
        let dir = TempDir::new().unwrap();
        let settings = RegistrySettings::load_file(Some(dir.path().join("missing.json").as_path())).unwrap();
        assert!(settings.is_empty());
    }

    #[test]
    fn test_from_vars() {
        let settings = RegistrySettings::from_vars([
            ("SKOPOS_REGISTRY_ECR_PRIVATE_ACCESSKEYID", "AKIA"),
            ("SKOPOS_REGISTRY_ECR_PRIVATE_REGION", "eu-west-1"),
            ("SKOPOS_REGISTRY_HUB_PUBLIC", ""),
            ("SKOPOS_LOG_LEVEL", "debug"),
            ("HOME", "/root"),
        ])
        .unwrap();

        assert_eq!(
            settings.get("ecr", "private"),
            Some(&json!({ "accesskeyid": "AKIA", "region": "eu-west-1" }))
        );
        assert_eq!(settings.get("hub", "public"), Some(&json!("")));
        assert_eq!(settings.len(), 2);
    }

    #[test]
    fn test_from_vars_field_after_whole_entry() {
        let settings = RegistrySettings::from_vars([
            ("SKOPOS_REGISTRY_GHCR_PRIVATE_TOKEN", "t"),
            ("SKOPOS_REGISTRY_GHCR_PRIVATE", ""),
        ])
        .unwrap();
        assert_eq!(settings.get("ghcr", "private"), Some(&json!({ "token": "t" })));
    }

    #[test]
    fn test_from_vars_reads_secret_files() {
        let secret = write_file("secretaccesskey\n");
        let path = secret.path().to_string_lossy().to_string();
        let settings = RegistrySettings::from_vars([(
            "SKOPOS_REGISTRY_ECR_PRIVATE_SECRETACCESSKEY__FILE".to_string(),
            path,
        )])
        .unwrap();
        assert_eq!(
            settings.get("ecr", "private"),
            Some(&json!({ "secretaccesskey": "secretaccesskey" }))
        );
    }

    #[test]
    fn test_from_vars_reports_missing_secret_file() {
        let err = RegistrySettings::from_vars([(
            "SKOPOS_REGISTRY_GITLAB_PRIVATE_TOKEN__FILE",
            "/nonexistent/skopos/token",
        )])
        .unwrap_err();
        match err {
            RegistryError::SecretFile { variable, .. } => {
                assert_eq!(variable, "SKOPOS_REGISTRY_GITLAB_PRIVATE_TOKEN__FILE");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_env_wins_over_file() {
        let file = write_file(
            r#"{ "registry": { "gitlab": { "private": { "token": "from-file", "url": "https://gitlab.example.com" } } } }"#,
        );
        let settings = RegistrySettings::load(
            Some(file.path()),
            [("SKOPOS_REGISTRY_GITLAB_PRIVATE_TOKEN", "from-env")],
        )
        .unwrap();
        assert_eq!(
            settings.get("gitlab", "private"),
            Some(&json!({ "token": "from-env", "url": "https://gitlab.example.com" }))
        );
    }

    #[test]
    fn test_debug_hides_values() {
        let settings =
            RegistrySettings::new().with_entry("gitlab", "private", json!({ "token": "secret" }));
        let debug = format!("{settings:?}");
        assert!(debug.contains("gitlab.private"));
        assert!(!debug.contains("secret"));
    }
}
