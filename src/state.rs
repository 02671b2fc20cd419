use crate::config::ServiceConfig;
use crate::workbench::Workbench;
use std::sync::Arc;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub config: ServiceConfig,
    pub workbench: Workbench,
}

impl AppState {
    pub fn new(config: ServiceConfig, workbench: Workbench) -> SharedState {
        Arc::new(Self { config, workbench })
    }

    pub fn from_config(config: ServiceConfig) -> anyhow::Result<SharedState> {
        let workbench = Workbench::from_config(&config)?;
        Ok(Self::new(config, workbench))
    }
}
