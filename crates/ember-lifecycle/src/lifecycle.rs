use async_trait::async_trait;
use ember_core::{Destination, LinkError, LinkRecord, OwnerId, ShortToken};
use serde::{Deserialize, Serialize};

/// Input for [`LinkLifecycle::create`].
///
/// The numeric fields are signed on purpose: they usually come straight from
/// user input, and a missing or non-positive value means "use the default".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateParams {
    /// The address to shorten. Validated before any token is requested.
    pub destination: String,
    pub click_limit: Option<i64>,
    pub ttl_hours: Option<i64>,
}

impl CreateParams {
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            click_limit: None,
            ttl_hours: None,
        }
    }

    pub fn with_click_limit(mut self, click_limit: i64) -> Self {
        self.click_limit = Some(click_limit);
        self
    }

    pub fn with_ttl_hours(mut self, ttl_hours: i64) -> Self {
        self.ttl_hours = Some(ttl_hours);
        self
    }
}

/// A live record together with its 1-based position in a listing.
///
/// Positions are assigned when the listing is produced and are only
/// meaningful for that listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListedLink {
    pub position: usize,
    #[serde(flatten)]
    pub record: LinkRecord,
}

/// Owner-scoped operations over short links.
///
/// Every operation that takes an owner treats a record owned by somebody
/// else exactly like a missing one.
#[async_trait]
pub trait LinkLifecycle: Send + Sync + 'static {
    /// Creates a link and returns its newly generated token.
    async fn create(&self, owner: &OwnerId, params: CreateParams)
        -> Result<ShortToken, LinkError>;

    /// Consumes one click and returns the destination.
    ///
    /// A record found dead is deleted before `Expired` or `QuotaExceeded` is
    /// returned; the deadline wins when both have run out.
    async fn resolve(&self, owner: &OwnerId, token: &ShortToken)
        -> Result<Destination, LinkError>;

    /// Replaces the click limit. Liveness is not re-checked.
    async fn update_click_limit(
        &self,
        owner: &OwnerId,
        token: &ShortToken,
        click_limit: i64,
    ) -> Result<(), LinkError>;

    /// Sets the deadline to `now + ttl_hours`.
    async fn update_expiration(
        &self,
        owner: &OwnerId,
        token: &ShortToken,
        ttl_hours: i64,
    ) -> Result<(), LinkError>;

    /// Sweeps the owner's dead records, then lists the rest in creation order.
    async fn list(&self, owner: &OwnerId) -> Result<Vec<ListedLink>, LinkError>;

    /// Deletes every dead record of every owner and returns how many went.
    ///
    /// Never fails: a store error is logged and reported as zero deletions.
    async fn sweep_all(&self) -> u64;
}
