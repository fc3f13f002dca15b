pub mod rooms;

use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::{config::AppConfig, dao::state_store::StateStore, error::ServiceError};

pub use self::rooms::{RoomKey, RoomRegistry};

pub type SharedState = Arc<AppState>;

/// Central application state: the installed storage backend, the room
/// registry for live sockets, and the loaded configuration.
pub struct AppState {
    state_store: RwLock<Option<Arc<dyn StateStore>>>,
    rooms: RoomRegistry,
    config: Arc<AppConfig>,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            state_store: RwLock::new(None),
            rooms: RoomRegistry::new(),
            config: Arc::new(config),
            degraded: degraded_tx,
        })
    }

    /// Obtain a handle to the current state store, if one is installed.
    pub async fn state_store(&self) -> Option<Arc<dyn StateStore>> {
        let guard = self.state_store.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain the current state store or fail with [`ServiceError::Degraded`].
    ///
    /// Service entry points that cannot do anything useful without storage
    /// go through this accessor.
    pub async fn require_store(&self) -> Result<Arc<dyn StateStore>, ServiceError> {
        self.state_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new state store implementation and leave degraded mode.
    pub async fn install_state_store(&self, store: Arc<dyn StateStore>) {
        {
            let mut guard = self.state_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current state store and enter degraded mode.
    pub async fn clear_state_store(&self) {
        {
            let mut guard = self.state_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        let guard = self.state_store.read().await;
        guard.is_none()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Registry of live WebSocket rooms.
    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    /// Loaded application configuration.
    pub fn config(&self) -> Arc<AppConfig> {
        self.config.clone()
    }

    /// Update and broadcast the degraded flag when the value changes.
    fn update_degraded(&self, value: bool) {
        if *self.degraded.borrow() == value {
            return;
        }

        let _ = self.degraded.send(value);
    }
}
