use crate::config::LifecycleConfig;
use crate::lifecycle::{CreateParams, LinkLifecycle, ListedLink};
use async_trait::async_trait;
use ember_core::{
    Clock, Destination, LinkError, LinkRecord, LinkRepository, Liveness, OwnerId, ShortToken,
    StorageError, SystemClock,
};
use ember_generator::CodeGenerator;
use jiff::{SignedDuration, Timestamp};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How many times `resolve` re-reads a record whose guarded click or
/// reclaim lost a race before giving up.
const CLICK_ATTEMPTS: u32 = 3;

/// The [`LinkLifecycle`] implementation over a repository and a code generator.
///
/// Expiry and quota are decided here; the repository only evaluates the
/// guards it is handed. Time comes from `C`, which is the wall clock unless
/// the manager is built with [`LinkManager::with_clock`].
#[derive(Debug, Clone)]
pub struct LinkManager<R, G, C = SystemClock> {
    repository: Arc<R>,
    generator: Arc<G>,
    clock: C,
    config: LifecycleConfig,
}

impl<R: LinkRepository, G: CodeGenerator> LinkManager<R, G> {
    pub fn new(repository: R, generator: G, config: LifecycleConfig) -> Self {
        Self::with_clock(repository, generator, SystemClock, config)
    }
}

impl<R: LinkRepository, G: CodeGenerator, C: Clock> LinkManager<R, G, C> {
    pub fn with_clock(repository: R, generator: G, clock: C, config: LifecycleConfig) -> Self {
        Self {
            repository: Arc::new(repository),
            generator: Arc::new(generator),
            clock,
            config: config.normalized(),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    fn effective_click_limit(&self, requested: Option<i64>) -> Result<u32, LinkError> {
        match requested {
            Some(limit) if limit > 0 => positive_u32(limit, "click limit"),
            _ => Ok(self.config.default_click_limit),
        }
    }

    fn effective_ttl_hours(&self, requested: Option<i64>) -> i64 {
        match requested {
            Some(hours) if hours > 0 => hours,
            _ => i64::from(self.config.default_ttl_hours),
        }
    }

    /// Text sent to the generator on the given attempt. Later attempts carry
    /// a fragment marker so a service that maps equal input to equal output
    /// hands out a different token.
    fn generation_request(destination: &Destination, attempt: u32) -> String {
        if attempt == 0 {
            destination.as_str().to_owned()
        } else {
            format!("{}#{}", destination, attempt)
        }
    }

    /// Deletes a record found dead during an access, provided it is still
    /// dead when the delete runs. Returns `false` if the record changed in
    /// between and was left alone.
    async fn reclaim(
        &self,
        record: &LinkRecord,
        now: Timestamp,
        reason: &LinkError,
    ) -> Result<bool, LinkError> {
        let deleted = self
            .repository
            .delete_if_dead(&record.short_token, &record.owner_id, now)
            .await?;

        if deleted {
            info!(
                token = %record.short_token,
                owner = %record.owner_id,
                %reason,
                "reclaimed dead link"
            );
        }
        Ok(deleted)
    }
}

fn positive_u32(value: i64, what: &str) -> Result<u32, LinkError> {
    if value <= 0 {
        return Err(LinkError::InvalidInput(format!(
            "{what} must be positive, got {value}"
        )));
    }
    u32::try_from(value)
        .map_err(|_| LinkError::InvalidInput(format!("{what} is too large: {value}")))
}

fn deadline(now: Timestamp, ttl_hours: i64) -> Result<Timestamp, LinkError> {
    let out_of_range = || LinkError::InvalidInput(format!("ttl of {ttl_hours} hours is too large"));

    let seconds = ttl_hours.checked_mul(3600).ok_or_else(out_of_range)?;
    now.checked_add(SignedDuration::from_secs(seconds))
        .map_err(|_| out_of_range())
}

#[async_trait]
impl<R: LinkRepository, G: CodeGenerator, C: Clock> LinkLifecycle for LinkManager<R, G, C> {
    async fn create(
        &self,
        owner: &OwnerId,
        params: CreateParams,
    ) -> Result<ShortToken, LinkError> {
        let destination = Destination::parse(&params.destination)?;
        let click_limit = self.effective_click_limit(params.click_limit)?;
        let ttl_hours = self.effective_ttl_hours(params.ttl_hours);
        let now = self.clock.now();
        let expires_at = deadline(now, ttl_hours)?;

        let attempts = self.config.max_generation_attempts;
        for attempt in 0..attempts {
            let request = Self::generation_request(&destination, attempt);
            let token = self.generator.generate(&request).await.map_err(|e| {
                warn!(
                    owner = %owner,
                    error = %e,
                    transport = e.is_transport(),
                    "short token generation failed"
                );
                LinkError::GenerationFailed(e)
            })?;

            if self.repository.exists(&token).await? {
                warn!(token = %token, attempt, "generated short token is taken, retrying");
                continue;
            }

            let record = LinkRecord {
                short_token: token.clone(),
                owner_id: owner.clone(),
                destination: destination.clone(),
                expires_at,
                click_limit,
                click_count: 0,
                created_at: now,
            };

            match self.repository.insert(&record).await {
                Ok(()) => {
                    info!(
                        token = %token,
                        owner = %owner,
                        click_limit,
                        expires_at = %record.expires_at,
                        "created link"
                    );
                    return Ok(token);
                }
                Err(StorageError::Conflict(_)) => {
                    warn!(token = %token, attempt, "short token taken before insert, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(LinkError::TooManyCollisions { attempts })
    }

    async fn resolve(
        &self,
        owner: &OwnerId,
        token: &ShortToken,
    ) -> Result<Destination, LinkError> {
        for _ in 0..CLICK_ATTEMPTS {
            let record = match self.repository.find_by_token(token).await? {
                Some(record) if record.is_owned_by(owner) => record,
                _ => {
                    debug!(token = %token, owner = %owner, "link not found");
                    return Err(LinkError::NotFound);
                }
            };

            let now = self.clock.now();
            let verdict = match record.liveness(now) {
                Liveness::Live => None,
                Liveness::Expired => Some(LinkError::Expired),
                Liveness::Exhausted => Some(LinkError::QuotaExceeded),
            };
            if let Some(err) = verdict {
                if self.reclaim(&record, now, &err).await? {
                    return Err(err);
                }
                debug!(token = %token, "link changed before reclaim, re-reading");
                continue;
            }

            if let Some(clicked) = self.repository.record_click(token, now).await? {
                debug!(
                    token = %token,
                    click_count = clicked.click_count,
                    click_limit = clicked.click_limit,
                    "resolved link"
                );
                return Ok(clicked.destination);
            }

            debug!(token = %token, "click guard failed, re-reading link");
        }

        Err(LinkError::StoreUnavailable(StorageError::Operation(format!(
            "access to {token} did not settle after {CLICK_ATTEMPTS} attempts"
        ))))
    }

    async fn update_click_limit(
        &self,
        owner: &OwnerId,
        token: &ShortToken,
        click_limit: i64,
    ) -> Result<(), LinkError> {
        let click_limit = positive_u32(click_limit, "click limit")?;

        if !self
            .repository
            .update_click_limit(token, owner, click_limit)
            .await?
        {
            return Err(LinkError::NotFound);
        }

        info!(token = %token, owner = %owner, click_limit, "updated click limit");
        Ok(())
    }

    async fn update_expiration(
        &self,
        owner: &OwnerId,
        token: &ShortToken,
        ttl_hours: i64,
    ) -> Result<(), LinkError> {
        if ttl_hours <= 0 {
            return Err(LinkError::InvalidInput(format!(
                "ttl hours must be positive, got {ttl_hours}"
            )));
        }
        let expires_at = deadline(self.clock.now(), ttl_hours)?;

        if !self
            .repository
            .update_expiry(token, owner, expires_at)
            .await?
        {
            return Err(LinkError::NotFound);
        }

        info!(token = %token, owner = %owner, %expires_at, "updated expiration");
        Ok(())
    }

    async fn list(&self, owner: &OwnerId) -> Result<Vec<ListedLink>, LinkError> {
        let now = self.clock.now();

        match self.repository.delete_dead(now, Some(owner)).await {
            Ok(0) => {}
            Ok(deleted) => info!(owner = %owner, deleted, "swept dead links"),
            Err(e) => warn!(owner = %owner, error = %e, "owner sweep failed"),
        }

        let records = self.repository.find_by_owner(owner).await?;

        // a failed sweep may have left dead records behind
        Ok(records
            .into_iter()
            .filter(|record| record.is_live(now))
            .enumerate()
            .map(|(index, record)| ListedLink {
                position: index + 1,
                record,
            })
            .collect())
    }

    async fn sweep_all(&self) -> u64 {
        match self.repository.delete_dead(self.clock.now(), None).await {
            Ok(deleted) => {
                info!(deleted, "swept dead links");
                deleted
            }
            Err(e) => {
                warn!(error = %e, "sweep failed");
                0
            }
        }
    }
}
