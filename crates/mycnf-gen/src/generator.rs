use std::io::Write;
use std::path::{Path, PathBuf};

use mysql_ops_common::PodEnv;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::document::MyCnfDocument;
use crate::memory::MB;
use crate::{MyCnfError, Result};

pub const MYSQLD_SECTION: &str = "mysqld";
pub const DEFAULT_TEMPLATE_PATH: &str = "etc/templates/my.cnf.tmpl";
pub const DEFAULT_OUTPUT_PATH: &str = "/etc/my.cnf";

/// Upper bound for `query_cache_size`.
pub const QUERY_CACHE_CAP: u64 = 64 * MB;

/// Values derived from the memory budget of the pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MyCnfSettings {
    pub query_cache_size: u64,
    pub innodb_buffer_pool_size: u64,
    pub sessions_available: u64,
    pub sort_buffer_size: u64,
    pub join_buffer_size: u64,
}

pub fn compute_settings(memory: u64, pool_size: u64) -> MyCnfSettings {
    let query_cache_size = (memory / 64).min(QUERY_CACHE_CAP);

    let sessions_available = memory.checked_sub(pool_size).unwrap_or_else(|| {
        warn!(
            memory,
            pool_size, "innodb_buffer_pool_size exceeds memory, no room left for sessions"
        );
        0
    });
    // Sized for roughly 1000 concurrent sessions.
    let per_session = sessions_available / 1024 / 4;

    MyCnfSettings {
        query_cache_size,
        innodb_buffer_pool_size: pool_size,
        sessions_available,
        sort_buffer_size: per_session,
        join_buffer_size: per_session,
    }
}

/// Writes the managed keys into the `mysqld` section.
pub fn apply_settings(
    doc: &mut MyCnfDocument,
    server_id: &str,
    settings: &MyCnfSettings,
) -> Result<()> {
    if !doc.has_section(MYSQLD_SECTION) {
        return Err(MyCnfError::MissingSection(MYSQLD_SECTION.to_string()));
    }
    doc.set(MYSQLD_SECTION, "server-id", server_id)?;
    doc.set(MYSQLD_SECTION, "query_cache_size", settings.query_cache_size)?;
    doc.set(
        MYSQLD_SECTION,
        "innodb_buffer_pool_size",
        settings.innodb_buffer_pool_size,
    )?;
    doc.set(MYSQLD_SECTION, "sort_buffer_size", settings.sort_buffer_size)?;
    doc.set(MYSQLD_SECTION, "join_buffer_size", settings.join_buffer_size)?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct MyCnfGenerator {
    template_path: PathBuf,
    output_path: PathBuf,
    server_id: String,
}

impl MyCnfGenerator {
    pub fn new(server_id: impl Into<String>) -> Self {
        Self {
            template_path: PathBuf::from(DEFAULT_TEMPLATE_PATH),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            server_id: server_id.into(),
        }
    }

    /// Server id comes from the pod instance number; paths honour the
    /// `MYCNF_TEMPLATE` / `MYCNF_OUTPUT` overrides.
    pub fn from_env(env: &PodEnv) -> Result<Self> {
        let mut generator = Self::new(env.require_instance_no()?);
        if let Some(template) = &env.mycnf_template {
            generator = generator.with_template(template);
        }
        if let Some(output) = &env.mycnf_output {
            generator = generator.with_output(output);
        }
        Ok(generator)
    }

    pub fn with_template(mut self, path: impl Into<PathBuf>) -> Self {
        self.template_path = path.into();
        self
    }

    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    pub fn template_path(&self) -> &Path {
        &self.template_path
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Loads the template and fills in the managed keys without touching disk.
    pub fn render(&self, memory: u64, pool_size: u64) -> Result<(MyCnfDocument, MyCnfSettings)> {
        let mut doc = MyCnfDocument::load(&self.template_path)?;
        debug!(template = %self.template_path.display(), "Loaded my.cnf template");

        let settings = compute_settings(memory, pool_size);
        apply_settings(&mut doc, &self.server_id, &settings)?;
        Ok((doc, settings))
    }

    pub fn generate(&self, memory: u64, pool_size: u64) -> Result<MyCnfSettings> {
        let (doc, settings) = self.render(memory, pool_size)?;
        write_atomic(&self.output_path, doc.to_string().as_bytes())?;
        info!(
            output = %self.output_path.display(),
            server_id = %self.server_id,
            ?settings,
            "Wrote MySQL configuration"
        );
        Ok(settings)
    }
}

// Temp file in the target directory, then rename over `path`.
fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let io_err = |source| MyCnfError::Io {
        path: path.to_path_buf(),
        source,
    };
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(contents).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))
            .map_err(io_err)?;
    }
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}
