use anyhow::Context as _;
use std::path::{Path, PathBuf};
use svcinst_core::command::{locate, ProcessRunner};
use svcinst_core::config::Config;
use svcinst_core::controller::SysvServiceManager;
use svcinst_core::paths;
use svcinst_core::state_db::StateDb;

/// Settings shared by every subcommand.
///
/// Priority for the config file:
/// 1. `--config` flag / `SVCINST_CONFIG` env var
/// 2. `/etc/svcinst/svcinst.yaml`
///
/// `--state-db` overrides the `state_db` setting from the file.
pub struct Context {
    pub config: Config,
    pub config_path: PathBuf,
}

impl Context {
    pub fn load(config: Option<&Path>, state_db: Option<&Path>) -> anyhow::Result<Self> {
        let config_path = config
            .map(Path::to_path_buf)
            .unwrap_or_else(paths::default_config_path);
        let mut cfg = Config::load(&config_path)
            .with_context(|| format!("failed to load config {}", config_path.display()))?;
        if let Some(db) = state_db {
            cfg.state_db = db.to_path_buf();
        }
        tracing::debug!(
            config = %config_path.display(),
            state_db = %cfg.state_db.display(),
            "resolved settings"
        );
        Ok(Self {
            config: cfg,
            config_path,
        })
    }

    pub fn open_store(&self) -> anyhow::Result<StateDb> {
        StateDb::open(&self.config.state_db).with_context(|| {
            format!(
                "failed to open state database {}",
                self.config.state_db.display()
            )
        })
    }

    pub fn service_manager(&self) -> SysvServiceManager<ProcessRunner> {
        let service = self
            .config
            .service_command
            .clone()
            .unwrap_or_else(|| locate("service", paths::SBIN_DIR));
        let chkconfig = self
            .config
            .chkconfig_command
            .clone()
            .unwrap_or_else(|| locate("chkconfig", paths::SBIN_DIR));
        SysvServiceManager::with_commands(ProcessRunner, service, chkconfig)
    }
}
