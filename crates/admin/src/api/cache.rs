//! Query cache for backend listings.
//!
//! Entries are keyed by the session token, the resource and the query
//! parameters, so two admins never share an entry and two pages of the user
//! list are cached separately. Invalidating a resource drops every token and
//! parameter variant at once.

use moka::future::Cache;
use tracing::{debug, warn};

use aiq_core::{Command, CreditStats, CreditTransaction, DashboardStats, Page, User};

use super::ApiToken;
use crate::config::CacheConfig;

/// Backend resource a cached query belongs to.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum Resource {
    Dashboard,
    Users,
    CreditTransactions,
    CreditStats,
    Commands,
}

impl Resource {
    /// Resources whose contents change when credits move.
    pub const CREDIT_DEPENDENT: [Self; 4] = [
        Self::Users,
        Self::CreditTransactions,
        Self::CreditStats,
        Self::Dashboard,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Users => "users",
            Self::CreditTransactions => "credit_transactions",
            Self::CreditStats => "credit_stats",
            Self::Commands => "commands",
        }
    }
}

/// Cache key: the token a query ran under, its resource and parameters.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct QueryKey {
    pub token: ApiToken,
    pub resource: Resource,
    pub params: Vec<(&'static str, String)>,
}

impl QueryKey {
    /// Key for a parameterless query.
    #[must_use]
    pub fn new(resource: Resource, token: &ApiToken) -> Self {
        Self::with_params(resource, token, Vec::new())
    }

    /// Key for a query with parameters.
    #[must_use]
    pub fn with_params(
        resource: Resource,
        token: &ApiToken,
        params: Vec<(&'static str, String)>,
    ) -> Self {
        Self {
            token: token.clone(),
            resource,
            params,
        }
    }
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CachedValue {
    Dashboard(Box<DashboardStats>),
    Users(Page<User>),
    CreditTransactions(Page<CreditTransaction>),
    CreditStats(CreditStats),
    Commands(Vec<Command>),
}

/// Shared, time-limited cache of backend query results.
#[derive(Clone)]
pub struct QueryCache {
    cache: Cache<QueryKey, CachedValue>,
}

impl QueryCache {
    /// Build a cache with the configured lifetime and capacity.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.capacity)
            .time_to_live(config.ttl)
            .support_invalidation_closures()
            .build();
        Self { cache }
    }

    pub async fn get(&self, key: &QueryKey) -> Option<CachedValue> {
        self.cache.get(key).await
    }

    pub async fn insert(&self, key: QueryKey, value: CachedValue) {
        self.cache.insert(key, value).await;
    }

    /// Drop every cached query of `resource`, whatever its parameters.
    pub async fn invalidate(&self, resource: Resource) {
        match self
            .cache
            .invalidate_entries_if(move |key, _| key.resource == resource)
        {
            Ok(_) => debug!(resource = resource.as_str(), "Invalidated cached queries"),
            Err(e) => {
                warn!(resource = resource.as_str(), error = %e, "Predicate invalidation failed, clearing cache");
                self.cache.invalidate_all();
            }
        }
        self.cache.run_pending_tasks().await;
    }

    /// Drop everything fetched under `token`, once the backend stops
    /// accepting it.
    pub async fn invalidate_token(&self, token: &ApiToken) {
        let token = token.clone();
        match self
            .cache
            .invalidate_entries_if(move |key, _| key.token == token)
        {
            Ok(_) => debug!("Invalidated cached queries of a rejected token"),
            Err(e) => {
                warn!(error = %e, "Predicate invalidation failed, clearing cache");
                self.cache.invalidate_all();
            }
        }
        self.cache.run_pending_tasks().await;
    }

    /// Drop several resources.
    pub async fn invalidate_many(&self, resources: &[Resource]) {
        for resource in resources {
            self.invalidate(*resource).await;
        }
    }

    /// Drop everything.
    pub async fn invalidate_all(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn cache() -> QueryCache {
        QueryCache::new(CacheConfig {
            ttl: Duration::from_secs(60),
            capacity: 100,
        })
    }

    fn token() -> ApiToken {
        ApiToken::new("t")
    }

    fn users_key(page: u32) -> QueryKey {
        QueryKey::with_params(Resource::Users, &token(), vec![("page", page.to_string())])
    }

    #[tokio::test]
    async fn test_params_are_part_of_the_key() {
        let cache = cache();
        cache
            .insert(users_key(1), CachedValue::Users(Page::default()))
            .await;

        assert!(cache.get(&users_key(1)).await.is_some());
        assert!(cache.get(&users_key(2)).await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_drops_every_variant_of_one_resource() {
        let cache = cache();
        cache
            .insert(users_key(1), CachedValue::Users(Page::default()))
            .await;
        cache
            .insert(users_key(2), CachedValue::Users(Page::default()))
            .await;
        cache
            .insert(
                QueryKey::new(Resource::Commands, &token()),
                CachedValue::Commands(Vec::new()),
            )
            .await;

        cache.invalidate(Resource::Users).await;

        assert!(cache.get(&users_key(1)).await.is_none());
        assert!(cache.get(&users_key(2)).await.is_none());
        assert!(
            cache
                .get(&QueryKey::new(Resource::Commands, &token()))
                .await
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_entries_are_scoped_to_the_token() {
        let cache = cache();
        let other = ApiToken::new("other");
        cache
            .insert(users_key(1), CachedValue::Users(Page::default()))
            .await;

        let foreign = QueryKey::with_params(Resource::Users, &other, vec![("page", "1".into())]);
        assert!(cache.get(&foreign).await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_token_keeps_other_sessions() {
        let cache = cache();
        let other = ApiToken::new("other");
        let other_key = QueryKey::new(Resource::CreditStats, &other);
        cache
            .insert(users_key(1), CachedValue::Users(Page::default()))
            .await;
        cache
            .insert(other_key.clone(), CachedValue::CreditStats(CreditStats::default()))
            .await;

        cache.invalidate_token(&token()).await;

        assert!(cache.get(&users_key(1)).await.is_none());
        assert!(cache.get(&other_key).await.is_some());
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let cache = QueryCache::new(CacheConfig {
            ttl: Duration::from_millis(50),
            capacity: 10,
        });
        let key = QueryKey::new(Resource::CreditStats, &token());
        cache
            .insert(key.clone(), CachedValue::CreditStats(CreditStats::default()))
            .await;
        assert!(cache.get(&key).await.is_some());

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(cache.get(&key).await.is_none());
    }
}
