use crate::lifecycle::{CreateParams, LinkLifecycle, ListedLink};
use ember_core::{LinkError, OwnerId, ShortToken};
use std::sync::Arc;

/// Entry point for front ends that deal in plain strings and integers.
///
/// Every call validates its raw inputs into domain types and delegates to the
/// wrapped [`LinkLifecycle`].
#[derive(Clone)]
pub struct LinkFacade {
    lifecycle: Arc<dyn LinkLifecycle>,
}

impl LinkFacade {
    pub fn new(lifecycle: impl LinkLifecycle) -> Self {
        Self::from_arc(Arc::new(lifecycle))
    }

    pub fn from_arc(lifecycle: Arc<dyn LinkLifecycle>) -> Self {
        Self { lifecycle }
    }

    /// Shortens `destination` and returns the new token.
    pub async fn create(
        &self,
        owner: &str,
        destination: &str,
        click_limit: Option<i64>,
        ttl_hours: Option<i64>,
    ) -> Result<String, LinkError> {
        let owner = OwnerId::new(owner)?;
        let params = CreateParams {
            destination: destination.to_owned(),
            click_limit,
            ttl_hours,
        };

        let token = self.lifecycle.create(&owner, params).await?;
        Ok(token.as_str().to_owned())
    }

    pub async fn list(&self, owner: &str) -> Result<Vec<ListedLink>, LinkError> {
        let owner = OwnerId::new(owner)?;
        self.lifecycle.list(&owner).await
    }

    /// Consumes one click of `token` and returns its destination.
    pub async fn resolve(&self, owner: &str, token: &str) -> Result<String, LinkError> {
        let owner = OwnerId::new(owner)?;
        let token = ShortToken::new(token)?;

        let destination = self.lifecycle.resolve(&owner, &token).await?;
        Ok(destination.into_string())
    }

    /// Lists the owner's links and resolves the one at the 1-based `position`.
    pub async fn resolve_position(&self, owner: &str, position: usize) -> Result<String, LinkError> {
        let owner = OwnerId::new(owner)?;

        let listed = self.lifecycle.list(&owner).await?;
        let link = listed
            .into_iter()
            .find(|link| link.position == position)
            .ok_or(LinkError::NotFound)?;

        let destination = self
            .lifecycle
            .resolve(&owner, &link.record.short_token)
            .await?;
        Ok(destination.into_string())
    }

    pub async fn update_limit(
        &self,
        owner: &str,
        token: &str,
        click_limit: i64,
    ) -> Result<(), LinkError> {
        let owner = OwnerId::new(owner)?;
        let token = ShortToken::new(token)?;
        self.lifecycle
            .update_click_limit(&owner, &token, click_limit)
            .await
    }

    pub async fn update_ttl(&self, owner: &str, token: &str, ttl_hours: i64) -> Result<(), LinkError> {
        let owner = OwnerId::new(owner)?;
        let token = ShortToken::new(token)?;
        self.lifecycle
            .update_expiration(&owner, &token, ttl_hours)
            .await
    }

    pub async fn sweep_all(&self) -> u64 {
        self.lifecycle.sweep_all().await
    }
}
