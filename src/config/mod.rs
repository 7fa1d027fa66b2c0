//! Provider Configuration
//!
//! A validated key/value store with typed accessors for everything the
//! aggregator and the GLUE mappers need: site identity, endpoints, VOs and
//! the facts derived for each storage area.

mod storage_area;

pub use storage_area::StorageArea;

use crate::error::{Error, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::debug;

// =============================================================================
// Constants
// =============================================================================

/// Keys that must be present in every configuration
pub const MANDATORY_KEYS: &[&str] = &[
    "SITE_NAME",
    "STORM_BACKEND_HOST",
    "STORM_DEFAULT_ROOT",
    "STORM_FRONTEND_PATH",
    "STORM_FRONTEND_PORT",
    "STORM_FRONTEND_PUBLIC_HOST",
    "STORM_BACKEND_REST_SERVICES_PORT",
    "VOS",
    "STORM_ENDPOINT_QUALITY_LEVEL",
    "STORM_STORAGEAREA_LIST",
];

/// Protocol switches, in publication order
const PROTOCOL_SWITCHES: &[(&str, &str)] = &[
    ("STORM_INFO_FILE_SUPPORT", "file"),
    ("STORM_INFO_RFIO_SUPPORT", "rfio"),
    ("STORM_INFO_GRIDFTP_SUPPORT", "gsiftp"),
    ("STORM_INFO_ROOT_SUPPORT", "xroot"),
    ("STORM_INFO_HTTP_SUPPORT", "http"),
    ("STORM_INFO_HTTPS_SUPPORT", "https"),
];

// =============================================================================
// Enumerated Values
// =============================================================================

/// Operational status of the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServingState {
    Production,
    Draining,
    Queueing,
    Closed,
}

impl ServingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServingState::Production => "production",
            ServingState::Draining => "draining",
            ServingState::Queueing => "queueing",
            ServingState::Closed => "closed",
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, ServingState::Closed)
    }
}

impl FromStr for ServingState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "production" | "open" => Ok(ServingState::Production),
            "draining" => Ok(ServingState::Draining),
            "queueing" => Ok(ServingState::Queueing),
            "closed" => Ok(ServingState::Closed),
            _ => Err(Error::InvalidConfigurationValue {
                key: "STORM_SERVING_STATE".into(),
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for ServingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maturity rating of the endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum QualityLevel {
    Development,
    Testing,
    PreProduction,
    Production,
}

impl QualityLevel {
    /// Map the numeric yaim index (0..=3) to a level
    pub fn from_index(index: i64) -> Result<Self> {
        match index {
            0 => Ok(QualityLevel::Development),
            1 => Ok(QualityLevel::Testing),
            2 => Ok(QualityLevel::PreProduction),
            3 => Ok(QualityLevel::Production),
            _ => Err(Error::UnknownQualityLevel { index }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityLevel::Development => "development",
            QualityLevel::Testing => "testing",
            QualityLevel::PreProduction => "pre-production",
            QualityLevel::Production => "production",
        }
    }
}

impl fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Configuration Source
// =============================================================================

/// Where configuration values come from
#[derive(Debug, Clone)]
pub enum ConfigurationSource {
    /// A flat YAML mapping on disk
    FromFile(PathBuf),
    /// Values supplied directly
    FromMapping(BTreeMap<String, String>),
}

impl ConfigurationSource {
    fn into_values(self) -> Result<BTreeMap<String, String>> {
        match self {
            ConfigurationSource::FromFile(path) => {
                debug!("Init configuration from file {} ...", path.display());
                let content =
                    std::fs::read_to_string(&path).map_err(|e| Error::file_system(&path, e))?;
                let raw: BTreeMap<String, serde_yaml::Value> = serde_yaml::from_str(&content)?;
                raw.into_iter()
                    .map(|(key, value)| {
                        let value = scalar_to_string(&key, value)?;
                        Ok((key, value))
                    })
                    .collect()
            }
            ConfigurationSource::FromMapping(values) => Ok(values),
        }
    }
}

fn scalar_to_string(key: &str, value: serde_yaml::Value) -> Result<String> {
    use serde_yaml::Value;
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        _ => Err(Error::Configuration(format!(
            "{} must be a scalar value",
            key
        ))),
    }
}

fn clean_value(value: &str) -> String {
    value
        .trim()
        .replace(['"', '\'', '\n'], "")
}

// =============================================================================
// Configuration
// =============================================================================

/// Validated, read-only provider configuration
#[derive(Debug, Clone)]
pub struct Configuration {
    values: BTreeMap<String, String>,
    serving_state: ServingState,
    quality_level: QualityLevel,
}

impl Configuration {
    /// Load and sanity-check a configuration
    pub fn load(source: ConfigurationSource) -> Result<Self> {
        let values = source
            .into_values()?
            .into_iter()
            .map(|(k, v)| (k.trim().to_string(), clean_value(&v)))
            .collect::<BTreeMap<_, _>>();

        debug!("Configuration sanity check ...");
        for key in MANDATORY_KEYS {
            if !values.contains_key(*key) {
                return Err(Error::MissingConfigurationKey {
                    key: key.to_string(),
                });
            }
        }

        let serving_state = match values.get("STORM_SERVING_STATE") {
            Some(v) if !v.is_empty() => v.parse()?,
            _ => ServingState::Production,
        };

        let quality_index = values["STORM_ENDPOINT_QUALITY_LEVEL"]
            .parse::<i64>()
            .map_err(|_| Error::InvalidConfigurationValue {
                key: "STORM_ENDPOINT_QUALITY_LEVEL".into(),
                value: values["STORM_ENDPOINT_QUALITY_LEVEL"].clone(),
            })?;
        let quality_level = QualityLevel::from_index(quality_index)?;

        let configuration = Self {
            values,
            serving_state,
            quality_level,
        };
        configuration.check_storage_areas()?;

        for (key, value) in &configuration.values {
            debug!("{}={}", key, value);
        }

        Ok(configuration)
    }

    /// Shorthand for [`ConfigurationSource::FromMapping`]
    pub fn from_mapping<K, V>(values: impl IntoIterator<Item = (K, V)>) -> Result<Self>
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::load(ConfigurationSource::FromMapping(
            values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        ))
    }

    fn check_storage_areas(&self) -> Result<()> {
        let mut seen = Vec::new();
        for sa in self.storage_area_names() {
            if seen.contains(&sa) {
                return Err(Error::DuplicateStorageArea {
                    name: sa.to_string(),
                });
            }
            seen.push(sa);
        }
        // every area must resolve, sizes included
        self.storage_areas().map(|_| ())
    }

    // =========================================================================
    // Raw Access
    // =========================================================================

    /// Get a mandatory value
    pub fn get(&self, key: &str) -> Result<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| Error::MissingConfigurationKey {
                key: key.to_string(),
            })
    }

    /// Get an optional value
    pub fn get_opt(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    fn is_enabled(&self, key: &str) -> bool {
        self.get_opt(key)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    fn list(&self, key: &str, separator: char) -> Vec<String> {
        self.get_opt(key)
            .map(|v| {
                v.split(separator)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn parse_u64(&self, key: &str) -> Result<u64> {
        let value = self.get(key)?;
        value
            .trim()
            .parse::<u64>()
            .map_err(|_| Error::InvalidConfigurationValue {
                key: key.to_string(),
                value: value.to_string(),
            })
    }

    /// A size in GB, converted to bytes
    fn parse_gigabytes(&self, key: &str) -> Result<u64> {
        self.parse_u64(key)?
            .checked_mul(GIGABYTE)
            .ok_or_else(|| Error::InvalidConfigurationValue {
                key: key.to_string(),
                value: self.get_opt(key).unwrap_or_default().to_string(),
            })
    }

    // =========================================================================
    // Service Identity
    // =========================================================================

    pub fn site_name(&self) -> &str {
        self.get_opt("SITE_NAME").unwrap_or_default()
    }

    pub fn backend_hostname(&self) -> &str {
        self.get_opt("STORM_BACKEND_HOST").unwrap_or_default()
    }

    pub fn frontend_public_host(&self) -> &str {
        self.get_opt("STORM_FRONTEND_PUBLIC_HOST").unwrap_or_default()
    }

    pub fn serving_state(&self) -> ServingState {
        self.serving_state
    }

    pub fn quality_level(&self) -> QualityLevel {
        self.quality_level
    }

    pub fn implementation_version(&self) -> &str {
        self.get_opt("STORM_IMPLEMENTATION_VERSION")
            .filter(|v| !v.is_empty())
            .unwrap_or("unknown")
    }

    pub fn issuer_ca(&self) -> Option<&str> {
        self.get_opt("ISSUER_CA").filter(|v| !v.is_empty())
    }

    /// Whether static files replace the previous ones (default: yes)
    pub fn is_info_overwrite(&self) -> bool {
        self.get_opt("STORM_INFO_OVERWRITE")
            .map(|v| !v.eq_ignore_ascii_case("false"))
            .unwrap_or(true)
    }

    // =========================================================================
    // Endpoints
    // =========================================================================

    /// REST endpoint of the backend, e.g. `http://backend:9998`
    pub fn backend_rest_endpoint(&self) -> String {
        format!(
            "http://{}:{}",
            self.backend_hostname(),
            self.get_opt("STORM_BACKEND_REST_SERVICES_PORT").unwrap_or_default()
        )
    }

    /// Public SRM endpoint, e.g. `httpg://frontend:8444/srm/managerv2`
    pub fn public_srm_endpoint(&self) -> String {
        format!(
            "httpg://{}:{}{}",
            self.frontend_public_host(),
            self.get_opt("STORM_FRONTEND_PORT").unwrap_or_default(),
            self.get_opt("STORM_FRONTEND_PATH").unwrap_or_default()
        )
    }

    pub fn has_gridhttps(&self) -> bool {
        self.is_enabled("STORM_GRIDHTTPS_ENABLED")
    }

    pub fn public_http_endpoint(&self) -> Result<String> {
        Ok(format!(
            "http://{}:{}/",
            self.get("STORM_GRIDHTTPS_PUBLIC_HOST")?,
            self.get("STORM_GRIDHTTPS_HTTP_PORT")?
        ))
    }

    pub fn public_https_endpoint(&self) -> Result<String> {
        Ok(format!(
            "https://{}:{}/",
            self.get("STORM_GRIDHTTPS_PUBLIC_HOST")?,
            self.get("STORM_GRIDHTTPS_HTTPS_PORT")?
        ))
    }

    /// WebDAV endpoints from the pool list
    pub fn webdav_endpoints(&self) -> Vec<String> {
        self.list("STORM_WEBDAV_POOL_LIST", ',')
    }

    pub fn has_webdav(&self) -> bool {
        !self.webdav_endpoints().is_empty()
    }

    /// Enabled access protocols, in publication order
    pub fn enabled_access_protocols(&self) -> Vec<String> {
        let mut enabled: Vec<String> = PROTOCOL_SWITCHES
            .iter()
            .filter(|(key, _)| self.is_enabled(key))
            .map(|(_, protocol)| protocol.to_string())
            .collect();
        if self.has_webdav() {
            enabled.push("webdav".to_string());
        }
        enabled
    }

    // =========================================================================
    // VOs and Storage Areas
    // =========================================================================

    pub fn supported_vos(&self) -> Vec<String> {
        self.list("VOS", ' ')
    }

    /// VOs bound to at least one storage area, wildcard excluded
    pub fn used_vos(&self) -> Result<Vec<String>> {
        let mut used: Vec<String> = Vec::new();
        for sa in self.storage_area_names() {
            for vo in self.sa_vos(sa) {
                if vo != crate::space::ANONYMOUS_VO && !used.contains(&vo) {
                    used.push(vo);
                }
            }
        }
        Ok(used)
    }

    pub fn storage_area_names(&self) -> Vec<&str> {
        self.get_opt("STORM_STORAGEAREA_LIST")
            .map(|v| v.split_whitespace().collect())
            .unwrap_or_default()
    }

    /// Upper-case key fragment of a storage area name
    pub fn sa_short(sa: &str) -> String {
        sa.replace(['.', '-', '_'], "").to_uppercase()
    }

    fn sa_key(sa: &str, suffix: &str) -> String {
        format!("STORM_{}_{}", Self::sa_short(sa), suffix)
    }

    /// VOs bound to a storage area
    pub fn sa_vos(&self, sa: &str) -> Vec<String> {
        let key = Self::sa_key(sa, "VONAME");
        if self.contains(&key) {
            return self.list(&key, ',');
        }
        if self.supported_vos().iter().any(|vo| vo == sa) {
            return vec![sa.to_string()];
        }
        Vec::new()
    }

    /// Whether the storage area behind a VFS name has a custom space token
    pub fn vfs_has_custom_token(&self, vfs_name: &str) -> bool {
        let short = crate::space::short_vfs_name(vfs_name);
        self.contains(&format!("STORM_{}_TOKEN", short))
    }

    /// Resolve the derived facts of every configured storage area
    pub fn storage_areas(&self) -> Result<Vec<StorageArea>> {
        self.storage_area_names()
            .into_iter()
            .map(|sa| self.storage_area(sa))
            .collect()
    }

    /// Resolve the derived facts of one storage area
    pub fn storage_area(&self, sa: &str) -> Result<StorageArea> {
        let token_key = Self::sa_key(sa, "TOKEN");
        let storage_class = self
            .get_opt(&Self::sa_key(sa, "STORAGECLASS"))
            .unwrap_or("T0D1")
            .to_string();
        let nearline_key = Self::sa_key(sa, "NEARLINE_SIZE");
        let nearline_size = if self.contains(&nearline_key) {
            self.parse_gigabytes(&nearline_key)?
        } else {
            0
        };

        Ok(StorageArea::derive(storage_area::StorageAreaSettings {
            name: sa.to_string(),
            short: Self::sa_short(sa),
            token: self
                .get_opt(&token_key)
                .map(str::to_string)
                .unwrap_or_else(|| format!("{}_TOKEN", Self::sa_short(sa))),
            has_custom_token: self.contains(&token_key),
            vos: self.sa_vos(sa),
            root: self
                .get_opt(&Self::sa_key(sa, "ROOT"))
                .unwrap_or(self.get("STORM_DEFAULT_ROOT")?)
                .to_string(),
            storage_class,
            access_points: {
                let points = self.list(&Self::sa_key(sa, "ACCESSPOINT"), ' ');
                if points.is_empty() {
                    vec![format!("/{}", sa)]
                } else {
                    points
                }
            },
            dn_fragments: self.dn_fragments(sa),
            online_size: self.parse_gigabytes(&Self::sa_key(sa, "ONLINE_SIZE"))?,
            nearline_size,
        }))
    }

    fn dn_fragments(&self, sa: &str) -> Vec<String> {
        [("C", "DN_C_REGEX"), ("O", "DN_O_REGEX"), ("OU", "DN_OU_REGEX"), ("L", "DN_L_REGEX"), ("CN", "DN_CN_REGEX")]
            .iter()
            .filter_map(|(component, suffix)| {
                self.get_opt(&Self::sa_key(sa, suffix))
                    .map(|regex| format!("/{}={}", component, regex))
            })
            .collect()
    }
}

/// Sizes in the configuration are expressed in GB
const GIGABYTE: u64 = 1_000_000_000;
