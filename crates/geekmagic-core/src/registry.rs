// ── Device registry ──
//
// Host-owned map from device id to coordinator. Read-mostly: lookups
// never block each other, registration and removal are rare.

use std::sync::Arc;

use dashmap::DashMap;
use futures_util::future::join_all;
use tracing::{info, warn};

use crate::config::DeviceConfig;
use crate::coordinator::Coordinator;
use crate::error::CoreError;

/// A registered device: its coordinator plus the config it was built from.
#[derive(Clone)]
pub struct DeviceHandle {
    pub id: String,
    pub config: Arc<DeviceConfig>,
    pub coordinator: Coordinator,
}

/// All devices known to the host.
#[derive(Default)]
pub struct DeviceRegistry {
    devices: DashMap<String, DeviceHandle>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a coordinator for `config`, run its first refresh and start
    /// polling.
    ///
    /// A device whose first refresh fails stays registered (state
    /// `Unavailable`, polling running) and the refresh error is returned,
    /// so the host can report it and retry later. Registering an id that
    /// already exists replaces it and stops the old poller.
    pub async fn register(
        &self,
        id: impl Into<String>,
        config: DeviceConfig,
    ) -> Result<DeviceHandle, CoreError> {
        let id = id.into();
        let client = config.build_client()?;
        let coordinator = Coordinator::new(client, &config);
        let handle = DeviceHandle {
            id: id.clone(),
            config: Arc::new(config),
            coordinator: coordinator.clone(),
        };

        if let Some(previous) = self.devices.insert(id.clone(), handle.clone()) {
            previous.coordinator.shutdown().await;
        }

        let first = coordinator.refresh().await;
        coordinator.start().await;

        match first {
            Ok(()) => {
                info!(device = %id, "device registered");
                Ok(handle)
            }
            Err(e) => {
                warn!(device = %id, error = %e, "device registered but not reachable yet");
                Err(e)
            }
        }
    }

    /// Register several devices at once. First refreshes run concurrently,
    /// so one silent device costs a single timeout, not one per device.
    /// Results keep the input order.
    pub async fn register_all(
        &self,
        devices: impl IntoIterator<Item = (String, DeviceConfig)>,
    ) -> Vec<(String, Result<DeviceHandle, CoreError>)> {
        let pending = devices.into_iter().map(|(id, config)| async move {
            let result = self.register(id.clone(), config).await;
            (id, result)
        });
        join_all(pending).await
    }

    pub fn get(&self, id: &str) -> Option<DeviceHandle> {
        self.devices.get(id).map(|entry| entry.value().clone())
    }

    /// Look up a device, mapping absence to `DeviceNotFound`.
    pub fn require(&self, id: &str) -> Result<DeviceHandle, CoreError> {
        self.get(id).ok_or_else(|| CoreError::DeviceNotFound {
            identifier: id.to_owned(),
        })
    }

    /// Unregister a device and stop its polling task.
    pub async fn remove(&self, id: &str) -> Option<DeviceHandle> {
        let (_, handle) = self.devices.remove(id)?;
        handle.coordinator.shutdown().await;
        info!(device = %id, "device removed");
        Some(handle)
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.devices.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Stop every poller and clear the registry.
    pub async fn shutdown(&self) {
        for id in self.ids() {
            self.remove(&id).await;
        }
    }
}
