// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end engine tests.
//!
//! `EngineHarness` assembles a [`NotificationService`] over a
//! [`FaultyStore`] (memory or temp-file SQLite underneath) and a
//! [`MockTransport`], and simulates clients connecting and disconnecting.

use std::sync::Arc;

use herald_config::HeraldConfig;
use herald_core::{ChannelHandle, DurableStore, HeraldError, MessageDraft};
use herald_engine::{CatchUpReport, NotificationService, Routed};
use herald_storage::SqliteStore;
use tokio::task::JoinHandle;

use crate::faulty_store::FaultyStore;
use crate::mock_transport::MockTransport;

/// Builder for [`EngineHarness`].
pub struct EngineHarnessBuilder {
    config: HeraldConfig,
    sqlite: bool,
}

impl EngineHarnessBuilder {
    fn new() -> Self {
        let mut config = HeraldConfig::default();
        // Fast catch-up unless a test asks otherwise.
        config.catchup.pacing_ms = 1;
        Self {
            config,
            sqlite: false,
        }
    }

    /// Spacing between replayed backlog messages.
    pub fn with_pacing_ms(mut self, pacing_ms: u64) -> Self {
        self.config.catchup.pacing_ms = pacing_ms;
        self
    }

    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.config.delivery.max_batch_size = max_batch_size;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.config.delivery.concurrency = concurrency;
        self
    }

    /// Back the engine with a SQLite file in a temp directory instead of memory.
    pub fn with_sqlite(mut self) -> Self {
        self.sqlite = true;
        self
    }

    pub async fn build(self) -> Result<EngineHarness, HeraldError> {
        let mut temp_dir = None;
        let store = if self.sqlite {
            let dir = tempfile::TempDir::new().map_err(HeraldError::storage)?;
            let path = dir.path().join("herald-test.db");
            let sqlite = SqliteStore::open(&path.to_string_lossy()).await?;
            temp_dir = Some(dir);
            FaultyStore::new(Arc::new(sqlite))
        } else {
            FaultyStore::over_memory()
        };
        let store = Arc::new(store);
        let transport = Arc::new(MockTransport::new());
        let service = Arc::new(NotificationService::new(
            store.clone() as Arc<dyn DurableStore>,
            transport.clone(),
            &self.config,
        ));
        Ok(EngineHarness {
            service,
            store,
            transport,
            config: self.config,
            _temp_dir: temp_dir,
        })
    }
}

/// A notification service over mock collaborators.
pub struct EngineHarness {
    pub service: Arc<NotificationService>,
    /// Store with fault injection; healthy until a test breaks it.
    pub store: Arc<FaultyStore>,
    pub transport: Arc<MockTransport>,
    pub config: HeraldConfig,
    _temp_dir: Option<tempfile::TempDir>,
}

impl EngineHarness {
    pub fn builder() -> EngineHarnessBuilder {
        EngineHarnessBuilder::new()
    }

    /// Harness with default settings over a memory store.
    pub async fn new() -> Result<Self, HeraldError> {
        Self::builder().build().await
    }

    /// Open a fresh channel for `user_id` and start its catch-up.
    pub async fn connect(
        &self,
        user_id: &str,
    ) -> Result<(ChannelHandle, JoinHandle<CatchUpReport>), HeraldError> {
        let handle = ChannelHandle(uuid::Uuid::new_v4().to_string());
        self.transport.open(&handle);
        let pass = self.service.on_channel_established(user_id, &handle).await?;
        Ok((handle, pass))
    }

    /// Connect and wait for the catch-up pass to finish.
    pub async fn connect_and_catch_up(
        &self,
        user_id: &str,
    ) -> Result<(ChannelHandle, CatchUpReport), HeraldError> {
        let (handle, pass) = self.connect(user_id).await?;
        let report = pass
            .await
            .map_err(|e| HeraldError::Internal(format!("catch-up task failed: {e}")))?;
        Ok((handle, report))
    }

    /// Close the channel and run the teardown hook.
    pub async fn disconnect(&self, user_id: &str, handle: &ChannelHandle) -> Result<(), HeraldError> {
        self.transport.close(handle);
        self.service.on_channel_torn_down(user_id, handle).await
    }

    /// Send a simple message to one recipient.
    pub async fn send(&self, recipient_id: &str, title: &str) -> Result<Routed, HeraldError> {
        self.service
            .send_one(recipient_id, &MessageDraft::new(title, "body"))
            .await
    }

    /// Titles of the `notification` events delivered to `handle`, in order.
    pub async fn notification_titles(&self, handle: &ChannelHandle) -> Vec<String> {
        self.transport
            .sent_to(handle)
            .await
            .into_iter()
            .filter(|e| e.event == herald_engine::events::NOTIFICATION)
            .filter_map(|e| e.payload["title"].as_str().map(str::to_string))
            .collect()
    }
}
