//! Collaborators and per-invocation state for one chunk.

use std::sync::Arc;

use inventory_sync_config::SyncConfig;
use inventory_sync_erp::ErpSource;
use inventory_sync_storefront::Storefront;
use tokio::sync::OnceCell;

use crate::SyncError;

/// Everything a chunk invocation needs.
///
/// Build one per invocation. The storefront location is resolved at most
/// once per context and reused for every quantity read and write in that
/// invocation; nothing is cached across contexts.
pub struct SyncContext {
    erp: Arc<dyn ErpSource>,
    storefront: Arc<dyn Storefront>,
    config: SyncConfig,
    erp_location_id: String,
    storefront_location_id: OnceCell<String>,
}

impl SyncContext {
    /// Creates a context reading ERP stock at `erp_location_id`.
    #[must_use]
    pub fn new(
        erp: Arc<dyn ErpSource>,
        storefront: Arc<dyn Storefront>,
        config: SyncConfig,
        erp_location_id: impl Into<String>,
    ) -> Self {
        Self {
            erp,
            storefront,
            config,
            erp_location_id: erp_location_id.into(),
            storefront_location_id: OnceCell::new(),
        }
    }

    /// Pins the storefront location instead of resolving it.
    #[must_use]
    pub fn with_storefront_location(self, location_id: impl Into<String>) -> Self {
        Self {
            storefront_location_id: OnceCell::new_with(Some(location_id.into())),
            ..self
        }
    }

    /// ERP collaborator.
    #[must_use]
    pub fn erp(&self) -> &dyn ErpSource {
        self.erp.as_ref()
    }

    /// Storefront collaborator.
    #[must_use]
    pub fn storefront(&self) -> &dyn Storefront {
        self.storefront.as_ref()
    }

    /// Engine tunables.
    #[must_use]
    pub const fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// ERP location whose stock is authoritative.
    #[must_use]
    pub fn erp_location_id(&self) -> &str {
        &self.erp_location_id
    }

    /// Storefront location to sync into: the first active location, looked
    /// up on first use.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NoLocation`] if the storefront has no active
    /// location, or the storefront failure if the lookup fails.
    pub async fn storefront_location_id(&self) -> Result<&str, SyncError> {
        let id = self
            .storefront_location_id
            .get_or_try_init(|| async {
                let locations = self.storefront.list_locations().await?;
                let location = locations
                    .into_iter()
                    .find(|l| l.is_active)
                    .ok_or(SyncError::NoLocation)?;
                log::info!(
                    "Syncing into storefront location {} ({})",
                    location.name,
                    location.id
                );
                Ok::<_, SyncError>(location.id)
            })
            .await?;
        Ok(id.as_str())
    }
}
