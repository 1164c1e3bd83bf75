// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Link registration (component J, §4.10): register this runner instance
//! with the server on startup, heartbeat it every 30 s, deregister on
//! shutdown.
//!
//! Grounded on the teacher's periodic-reconciliation shape
//! (`daemon/src/lifecycle.rs`) and on `UuidIdGen` (`mush-core`) for the
//! instance id when none is supplied.

use crate::state::SharedState;
use mush_api::{ClientMetadata, LinkDeregisterRequest, LinkRegisterRequest, RunnerApi};
use mush_core::id::{IdGen, UuidIdGen};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Heartbeat period (§4.10: "Start a 30 s heartbeat").
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
/// Deadline for the best-effort shutdown deregister (§4.10).
const DEREGISTER_TIMEOUT: Duration = Duration::from_secs(5);

/// Registers this runner as a link and keeps it alive until dropped.
pub struct LinkRegistrar {
    api: Arc<dyn RunnerApi>,
    habitat_id: String,
    name: String,
    client_version: String,
    instance_id: Option<String>,
}

/// The registered link's id plus everything needed to heartbeat and
/// deregister it.
pub struct LinkHandle {
    link_id: String,
}

impl LinkRegistrar {
    pub fn new(
        api: Arc<dyn RunnerApi>,
        habitat_id: impl Into<String>,
        name: impl Into<String>,
        client_version: impl Into<String>,
        instance_id: Option<String>,
    ) -> Self {
        Self {
            api,
            habitat_id: habitat_id.into(),
            name: name.into(),
            client_version: client_version.into(),
            instance_id,
        }
    }

    /// POST the `RegisterLink` request, generating a UUID instance id if
    /// none was supplied (§4.10).
    pub async fn register(&self) -> Result<LinkHandle, mush_api::ApiError> {
        let instance_id = self
            .instance_id
            .clone()
            .unwrap_or_else(|| UuidIdGen.next());
        let request = LinkRegisterRequest::new(
            Some(instance_id),
            self.habitat_id.clone(),
            self.name.clone(),
            self.client_version.clone(),
            ClientMetadata::detect(Some(self.name.clone())),
        );
        let response = self.api.register_link(request).await?;
        Ok(LinkHandle {
            link_id: response.link_id,
        })
    }

    /// Run the 30 s heartbeat until `cancel` fires, then best-effort
    /// deregister under a 5 s timeout (§4.10).
    pub async fn run(
        &self,
        handle: &LinkHandle,
        state: SharedState,
        jobs_completed: impl Fn() -> u64,
        jobs_failed: impl Fn() -> u64,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(HEARTBEAT_INTERVAL) => {}
            }

            let current_job = state.current_job();
            if let Err(e) = self
                .api
                .heartbeat_link(&handle.link_id, current_job.as_ref())
                .await
            {
                warn!(link_id = %handle.link_id, error = %e, "link heartbeat failed");
            }
        }

        let request = LinkDeregisterRequest::graceful_shutdown(jobs_completed(), jobs_failed());
        let deregister = self.api.deregister_link(&handle.link_id, request);
        match tokio::time::timeout(DEREGISTER_TIMEOUT, deregister).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(link_id = %handle.link_id, error = %e, "link deregister failed"),
            Err(_) => warn!(link_id = %handle.link_id, "link deregister timed out"),
        }
    }
}

#[cfg(test)]
#[path = "link_tests.rs"]
mod tests;
