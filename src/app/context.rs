use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::app::adb::client::{AdbClient, CommandExecutor, SystemExecutor};
use crate::app::adb::locator::{resolve_adb_program, validate_adb_program};
use crate::app::catalog::{CatalogClient, GooglePlayCatalog, OfflineCatalog};
use crate::app::config::AppConfig;
use crate::app::icons::resolve_placeholder_path;

pub struct AppContext {
    pub config: AppConfig,
    pub adb: AdbClient,
    pub catalog: Arc<dyn CatalogClient>,
    pub placeholder_path: PathBuf,
}

impl AppContext {
    pub fn new(
        config: AppConfig,
        executor: Arc<dyn CommandExecutor>,
        catalog: Arc<dyn CatalogClient>,
        placeholder_path: PathBuf,
    ) -> Self {
        let adb = AdbClient::new(executor, &config.adb, &config.apk_install);
        Self {
            config,
            adb,
            catalog,
            placeholder_path,
        }
    }

    pub fn from_config(config: AppConfig, trace_id: &str) -> Self {
        let program = resolve_adb_program(&config.adb.command_path);
        // A bad path is reported when the first command fails to spawn.
        if let Err(message) = validate_adb_program(&program) {
            warn!(trace_id = %trace_id, error = %message, "adb validation failed");
        }
        info!(trace_id = %trace_id, program = %program, "using adb");

        let catalog: Arc<dyn CatalogClient> = if config.catalog.enabled {
            Arc::new(GooglePlayCatalog::new(&config.catalog))
        } else {
            Arc::new(OfflineCatalog)
        };
        let placeholder_path = resolve_placeholder_path(&config.icons.placeholder_path);
        Self::new(
            config,
            Arc::new(SystemExecutor::new(program)),
            catalog,
            placeholder_path,
        )
    }
}
