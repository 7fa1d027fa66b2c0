//! Info Provider Operations
//!
//! Ties aggregation, GLUE mapping, LDIF export and the JSON report together
//! into the operations exposed by the command line.

use crate::config::Configuration;
use crate::domain::ports::BackendGateway;
use crate::error::Result;
use crate::gateway::{GatewayConfig, StormGateway};
use crate::glue::{GlueSchema, GlueVersion};
use crate::ldif::{DirectoryExport, DirectoryRecord, DEFAULT_FOLD_WIDTH};
use crate::report::StorageServiceReport;
use crate::space::{SpaceInfo, SpaceInfoBuilder};
use chrono::{DateTime, Local, Utc};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// =============================================================================
// Configuration
// =============================================================================

/// Output options
#[derive(Debug, Clone)]
pub struct ProviderOptions {
    /// Directory holding the static LDIF files
    pub ldif_dir: PathBuf,
    /// LDIF fold column
    pub fold_width: usize,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            ldif_dir: PathBuf::from("/var/lib/bdii/gip/ldif"),
            fold_width: DEFAULT_FOLD_WIDTH,
        }
    }
}

// =============================================================================
// Info Provider
// =============================================================================

/// Entry point for every provider operation
pub struct InfoProvider {
    configuration: Configuration,
    gateway: Box<dyn BackendGateway>,
    options: ProviderOptions,
}

impl InfoProvider {
    pub fn new(
        configuration: Configuration,
        gateway: Box<dyn BackendGateway>,
        options: ProviderOptions,
    ) -> Self {
        Self {
            configuration,
            gateway,
            options,
        }
    }

    /// Provider talking to the backend named in the configuration
    pub fn with_storm_gateway(configuration: Configuration, options: ProviderOptions) -> Result<Self> {
        let gateway = StormGateway::new(GatewayConfig::from_configuration(&configuration))?;
        Ok(Self::new(configuration, Box::new(gateway), options))
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    async fn space_info(&self) -> Result<SpaceInfo> {
        SpaceInfoBuilder::new(&self.configuration, self.gateway.as_ref())
            .build()
            .await
    }

    fn export(&self, records: impl IntoIterator<Item = DirectoryRecord>) -> DirectoryExport {
        let mut export = DirectoryExport::with_fold_width(self.options.fold_width);
        export.extend(records);
        export
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Write the static LDIF file of each selected dialect and the report.
    ///
    /// Returns the paths written, report last.
    pub async fn configure(&self, glue: GlueVersion, report_path: &Path) -> Result<Vec<PathBuf>> {
        info!("Configure {} ...", glue);
        let now = Utc::now();
        let space = self.space_info().await?;

        // everything is built before the first file is touched
        let mut exports = Vec::new();
        for schema in glue.schemas(&self.configuration, now) {
            let path = self.options.ldif_dir.join(schema.static_ldif_file_name());
            exports.push((path, self.export(schema.static_records(&space)?)));
        }
        let report = StorageServiceReport::build(&self.configuration, &space, now)?;

        let mut written = Vec::new();
        for (path, export) in exports {
            let target = export
                .save_static(
                    &path,
                    self.configuration.is_info_overwrite(),
                    now.with_timezone(&Local),
                )
                .await?;
            info!("Successfully created {}", target.display());
            written.push(target);
        }

        report.save(report_path).await?;
        written.push(report_path.to_path_buf());
        Ok(written)
    }

    /// Print the full records of the selected dialects
    pub async fn static_ldif<W: Write>(&self, glue: GlueVersion, out: &mut W) -> Result<()> {
        self.static_ldif_at(glue, out, Utc::now()).await
    }

    async fn static_ldif_at<W: Write>(
        &self,
        glue: GlueVersion,
        out: &mut W,
        now: DateTime<Utc>,
    ) -> Result<()> {
        info!("Get static LDIF ...");
        let space = self.space_info().await?;
        let mut records = Vec::new();
        for schema in glue.schemas(&self.configuration, now) {
            records.extend(schema.static_records(&space)?);
        }
        self.export(records).write_to(out)?;
        Ok(())
    }

    /// Print the incremental records of the selected dialects.
    ///
    /// A closed service only refreshes endpoint serving states.
    pub async fn update_ldif<W: Write>(&self, glue: GlueVersion, out: &mut W) -> Result<()> {
        info!("Get update LDIF ...");
        let space = if self.configuration.serving_state().is_closed() {
            warn!("StoRM backend is declared closed");
            None
        } else {
            Some(self.space_info().await?)
        };

        let mut records = Vec::new();
        for schema in glue.schemas(&self.configuration, Utc::now()) {
            records.extend(schema.update_records(space.as_ref())?);
        }
        self.export(records).write_to(out)?;
        Ok(())
    }

    /// Write the JSON report
    pub async fn report_json(&self, path: &Path) -> Result<()> {
        info!("Get report JSON ...");
        let space = self.space_info().await?;
        StorageServiceReport::build(&self.configuration, &space, Utc::now())?
            .save(path)
            .await
    }
}

impl std::fmt::Debug for InfoProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfoProvider")
            .field("backend", &self.gateway.endpoint())
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::{default_configuration, default_values};
    use crate::config::ConfigurationSource;
    use crate::space::aggregator::tests::StubGateway;
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    fn provider(configuration: Configuration, gateway: StubGateway, dir: &TempDir) -> InfoProvider {
        InfoProvider::new(
            configuration,
            Box::new(gateway),
            ProviderOptions {
                ldif_dir: dir.path().to_path_buf(),
                ..Default::default()
            },
        )
    }

    fn closed_configuration() -> Configuration {
        let mut values = default_values();
        values.insert("STORM_SERVING_STATE".into(), "closed".into());
        Configuration::load(ConfigurationSource::FromMapping(values)).unwrap()
    }

    #[tokio::test]
    async fn test_configure_writes_both_dialects_and_report() {
        let dir = TempDir::new().unwrap();
        let provider = provider(default_configuration(), StubGateway::healthy(), &dir);
        let report = dir.path().join("report.json");

        let written = provider.configure(GlueVersion::All, &report).await.unwrap();
        assert_eq!(
            written,
            vec![
                dir.path().join("storm-glue13-static.ldif"),
                dir.path().join("storm-glue2-static.ldif"),
                report.clone(),
            ]
        );

        let glue2 = std::fs::read_to_string(dir.path().join("storm-glue2-static.ldif")).unwrap();
        assert!(glue2.starts_with("dn: GLUE2ServiceID=storm.example.org/storage,GLUE2GroupID=resource,o=glue\n"));
        assert!(std::fs::read_to_string(&report).unwrap().contains("\"test-site_srm\""));
    }

    #[tokio::test]
    async fn test_configure_twice_rotates_backup() {
        let dir = TempDir::new().unwrap();
        let provider = provider(default_configuration(), StubGateway::healthy(), &dir);
        let report = dir.path().join("report.json");

        provider.configure(GlueVersion::Glue13, &report).await.unwrap();
        provider.configure(GlueVersion::Glue13, &report).await.unwrap();

        let backups = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("storm-glue13-static.ldif.bkp_"))
            .count();
        assert_eq!(backups, 1);
    }

    #[tokio::test]
    async fn test_configure_writes_nothing_on_mapping_error() {
        let dir = TempDir::new().unwrap();
        let mut values = default_values();
        values.insert("STORM_WEBDAV_POOL_LIST".into(), "ftp://webdav.example.org/".into());
        let configuration = Configuration::load(ConfigurationSource::FromMapping(values)).unwrap();
        let provider = provider(configuration, StubGateway::healthy(), &dir);
        let report = dir.path().join("report.json");

        let err = provider.configure(GlueVersion::All, &report).await.unwrap_err();
        assert_matches!(err, crate::error::Error::Configuration(_));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_static_ldif_to_writer() {
        let dir = TempDir::new().unwrap();
        let provider = provider(default_configuration(), StubGateway::healthy(), &dir);

        let mut out = Vec::new();
        provider.static_ldif(GlueVersion::Glue13, &mut out).await.unwrap();
        let ldif = String::from_utf8(out).unwrap();
        assert!(ldif.starts_with("dn: GlueSEUniqueID=storm-fe.example.org,mds-vo-name=resource,o=grid\n"));
        assert!(ldif.contains("GlueSALocalID: testvo:replica:online\n"));
        assert!(!ldif.contains("GLUE2"));
    }

    #[tokio::test]
    async fn test_static_ldif_is_stable_for_same_instant() {
        let dir = TempDir::new().unwrap();
        let provider = provider(default_configuration(), StubGateway::healthy(), &dir);
        let now = Utc::now();

        let mut first = Vec::new();
        let mut second = Vec::new();
        provider.static_ldif_at(GlueVersion::All, &mut first, now).await.unwrap();
        provider.static_ldif_at(GlueVersion::All, &mut second, now).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_update_ldif_when_closed() {
        let dir = TempDir::new().unwrap();
        let provider = provider(closed_configuration(), StubGateway::healthy(), &dir);

        let mut out = Vec::new();
        provider.update_ldif(GlueVersion::All, &mut out).await.unwrap();
        let ldif = String::from_utf8(out).unwrap();
        assert_eq!(ldif.matches("dn: ").count(), 3);
        assert_eq!(ldif.matches("GLUE2EndpointServingState: closed\n").count(), 3);
        assert!(!ldif.contains("GlueSE"));
    }

    #[tokio::test]
    async fn test_update_ldif_uses_backend_counters() {
        let dir = TempDir::new().unwrap();
        let provider = provider(default_configuration(), StubGateway::healthy(), &dir);

        let mut out = Vec::new();
        provider.update_ldif(GlueVersion::Glue13, &mut out).await.unwrap();
        let ldif = String::from_utf8(out).unwrap();
        assert!(ldif.contains("GlueSEUsedOnlineSize: 2\n"));
        assert!(ldif.contains("GlueSEUsedNearlineSize: 0\n"));
    }

    #[tokio::test]
    async fn test_unreachable_backend_still_produces_output() {
        let dir = TempDir::new().unwrap();
        let gateway = StubGateway::failing();
        let provider = provider(default_configuration(), gateway, &dir);

        let mut out = Vec::new();
        provider.static_ldif(GlueVersion::Glue2, &mut out).await.unwrap();
        let ldif = String::from_utf8(out).unwrap();
        assert!(ldif.contains("GLUE2StorageShareCapacityUsedSize: 0\n"));
    }

    #[tokio::test]
    async fn test_report_json() {
        let dir = TempDir::new().unwrap();
        let gateway = StubGateway::healthy();
        let provider = provider(default_configuration(), gateway, &dir);
        let path = dir.path().join("report.json");

        provider.report_json(&path).await.unwrap();
        let report: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(report["shares"].as_array().unwrap().len(), 3);
        assert_eq!(report["shares"][0]["used_size"], 1_500_000_000u64);
    }
}
