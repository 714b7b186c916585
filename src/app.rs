// SPDX-License-Identifier: MPL-2.0

use crate::api::{DataClient, DataError, RemoteError};
use crate::config::AppConfig;
use crate::customize::{self, CustomizationService};
use crate::runtime;
use crate::store::{LocalStore, StoreError};
use crate::streak::{StreakService, StreakWatcher};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
    #[error("remote setup failed: {0}")]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Data(#[from] DataError),
}

/// Everything the UI needs, wired together.
///
/// Owns the streak watcher; [`shutdown`](Self::shutdown) or dropping the app
/// stops it.
pub struct FlashApp {
    config: AppConfig,
    client: DataClient,
    streak: StreakService,
    pet: CustomizationService,
    garden: CustomizationService,
    watcher: StreakWatcher,
}

impl FlashApp {
    pub async fn start(config: AppConfig) -> Result<Self, AppError> {
        let store = open_store(&config)?;
        store.initialize()?;

        let client = DataClient::from_config(store, &config)?;
        let streak = StreakService::load(client.clone()).await?;
        let pet = CustomizationService::load(client.clone(), customize::pet().clone()).await?;
        let garden =
            CustomizationService::load(client.clone(), customize::garden().clone()).await?;
        let watcher = streak.watch(config.streak_check_interval).await;

        info!(
            persistent = client.store().is_persistent(),
            remote = config.api_base_url.as_ref().map(|u| u.as_str()),
            "data core started"
        );

        Ok(Self {
            config,
            client,
            streak,
            pet,
            garden,
            watcher,
        })
    }

    /// [`start`](Self::start) for synchronous callers, on the shared runtime.
    /// The streak watcher keeps running on that runtime's workers.
    pub fn start_blocking(config: AppConfig) -> Result<Self, AppError> {
        runtime::block_on(Self::start(config))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn client(&self) -> &DataClient {
        &self.client
    }

    pub fn streak(&self) -> &StreakService {
        &self.streak
    }

    pub fn pet(&self) -> &CustomizationService {
        &self.pet
    }

    pub fn garden(&self) -> &CustomizationService {
        &self.garden
    }

    /// False when storage was denied and data only lives for this session
    pub fn is_persistent(&self) -> bool {
        self.client.store().is_persistent()
    }

    pub fn shutdown(self) {
        self.watcher.stop();
        info!("data core stopped");
    }
}

/// Open the database file, or an in-memory store if the platform refuses
fn open_store(config: &AppConfig) -> Result<LocalStore, StoreError> {
    match LocalStore::open(&config.database_path()) {
        Err(StoreError::Unavailable(reason)) => {
            warn!(%reason, "persistent storage unavailable, keeping data in memory");
            LocalStore::open_in_memory()
        }
        result => result,
    }
}
