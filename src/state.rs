//! Shared application state (DI container, §9: "construct at startup from
//! explicit configuration; hand references down, no module-level globals").

use crate::clients::tmdb::TmdbClient;
use crate::clients::tvdb::TvdbClient;
use crate::config::Config;
use crate::db::Store;
use crate::domain::NotificationEvent;
use crate::matcher::CatalogClients;
use crate::scanner::ScannerConfig;
use crate::services::association_checker::AssociationChecker;
use crate::services::quality_scan_cache::QualityScanCache;
use crate::services::transfer_service::TransferService;
use crate::services::validation_service::ValidationService;
use crate::services::workflow::WorkflowOrchestrator;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Everything the CLI's command handlers need, built once at startup and
/// passed down by reference rather than reached for through a global.
#[derive(Clone)]
pub struct SharedState {
    pub config: Config,
    pub store: Store,
    pub catalogs: CatalogClients,
    pub validation: Arc<ValidationService>,
    pub transfer: Arc<TransferService>,
    pub association_checker: Arc<AssociationChecker>,
    pub workflow: Arc<WorkflowOrchestrator>,
    pub event_bus: broadcast::Sender<NotificationEvent>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::new(&config.database_url).await?;

        let tmdb: Option<Arc<dyn crate::clients::CatalogClient>> = config
            .tmdb_api_key
            .clone()
            .map(|key| Arc::new(TmdbClient::new(key, store.clone())) as Arc<dyn crate::clients::CatalogClient>);
        let tvdb: Option<Arc<dyn crate::clients::CatalogClient>> = config
            .tvdb_api_key
            .clone()
            .map(|key| Arc::new(TvdbClient::new(key, store.clone())) as Arc<dyn crate::clients::CatalogClient>);
        let catalogs = CatalogClients::new(tmdb, tvdb);

        let scanner_config = ScannerConfig { min_file_size_bytes: config.min_file_size_bytes };

        let (event_bus, _) = broadcast::channel(256);

        let validation = Arc::new(ValidationService::new(store.clone(), catalogs.clone()));
        let transfer = Arc::new(TransferService::new(
            store.clone(),
            PathBuf::from(&config.storage_dir),
            PathBuf::from(&config.video_dir),
            event_bus.clone(),
        ));
        let scan_cache_path = PathBuf::from(&config.cache_dir).join("quality_scan_cache.json");
        let scan_cache = Arc::new(QualityScanCache::load(scan_cache_path).await?);
        let association_checker = Arc::new(AssociationChecker::new(store.clone(), event_bus.clone(), scan_cache));
        let workflow = Arc::new(WorkflowOrchestrator::new(
            store.clone(),
            catalogs.clone(),
            scanner_config,
            event_bus.clone(),
        ));

        Ok(Self {
            config,
            store,
            catalogs,
            validation,
            transfer,
            association_checker,
            workflow,
            event_bus,
        })
    }
}
