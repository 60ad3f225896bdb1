//! Caching decorator over any [`BotApi`].
//!
//! Every read goes to the backend, so a revoked token is noticed on the very
//! next page visit. Successful reads refresh the [`QueryCache`]; when the
//! backend is unreachable or answers 5xx, the last result fetched under the
//! same token is served instead while it is fresh. A 401 drops everything
//! cached for that token.
//!
//! Successful mutations invalidate the resources they change for every
//! token. Failed calls leave the cache untouched.

use async_trait::async_trait;
use secrecy::SecretString;
use tracing::warn;

use aiq_core::forms::{BulkCreditGrant, CommandDraft, CreditAdjustment};
use aiq_core::{
    Admin, Command, CommandId, CreditStats, CreditTransaction, DashboardStats, Page, User, UserId,
};

use super::{
    ApiError, ApiToken, BotApi, CachedValue, LoginSuccess, QueryCache, QueryKey, Resource,
    UserQuery,
};

/// [`BotApi`] wrapper that caches listings.
pub struct CachedApi<A> {
    inner: A,
    cache: QueryCache,
}

impl<A: BotApi> CachedApi<A> {
    pub const fn new(inner: A, cache: QueryCache) -> Self {
        Self { inner, cache }
    }

    /// The wrapped client.
    pub const fn inner(&self) -> &A {
        &self.inner
    }

    pub const fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Record a fresh read, or fall back to the cached one when the backend
    /// is down.
    async fn revalidate<T: Clone + Send>(
        &self,
        key: QueryKey,
        fetched: Result<T, ApiError>,
        wrap: impl FnOnce(T) -> CachedValue + Send,
        unwrap: impl FnOnce(CachedValue) -> Option<T> + Send,
    ) -> Result<T, ApiError> {
        match fetched {
            Ok(value) => {
                self.cache.insert(key, wrap(value.clone())).await;
                Ok(value)
            }
            Err(e) if e.is_unauthorized() => {
                self.cache.invalidate_token(&key.token).await;
                Err(e)
            }
            Err(e) if e.is_unavailable() => match self.cache.get(&key).await.and_then(unwrap) {
                Some(stale) => {
                    warn!(resource = key.resource.as_str(), error = %e, "Bot API unavailable, serving cached result");
                    Ok(stale)
                }
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }

    async fn after_credit_change<T>(&self, result: Result<T, ApiError>) -> Result<T, ApiError> {
        if result.is_ok() {
            self.cache.invalidate_many(&Resource::CREDIT_DEPENDENT).await;
        }
        result
    }

    async fn after_command_change<T>(&self, result: Result<T, ApiError>) -> Result<T, ApiError> {
        if result.is_ok() {
            self.cache.invalidate(Resource::Commands).await;
        }
        result
    }
}

#[async_trait]
impl<A: BotApi> BotApi for CachedApi<A> {
    async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<LoginSuccess, ApiError> {
        self.inner.login(username, password).await
    }

    async fn current_admin(&self, token: &ApiToken) -> Result<Admin, ApiError> {
        self.inner.current_admin(token).await
    }

    async fn dashboard(&self, token: &ApiToken) -> Result<DashboardStats, ApiError> {
        let key = QueryKey::new(Resource::Dashboard, token);
        let fetched = self.inner.dashboard(token).await;
        self.revalidate(
            key,
            fetched,
            |stats| CachedValue::Dashboard(Box::new(stats)),
            |cached| match cached {
                CachedValue::Dashboard(stats) => Some(*stats),
                _ => None,
            },
        )
        .await
    }

    async fn list_users(
        &self,
        token: &ApiToken,
        query: &UserQuery,
    ) -> Result<Page<User>, ApiError> {
        let key = QueryKey::with_params(Resource::Users, token, query.to_params());
        let fetched = self.inner.list_users(token, query).await;
        self.revalidate(key, fetched, CachedValue::Users, |cached| match cached {
            CachedValue::Users(page) => Some(page),
            _ => None,
        })
        .await
    }

    async fn adjust_user_credits(
        &self,
        token: &ApiToken,
        user_id: &UserId,
        adjustment: &CreditAdjustment,
    ) -> Result<(), ApiError> {
        let result = self
            .inner
            .adjust_user_credits(token, user_id, adjustment)
            .await;
        self.after_credit_change(result).await
    }

    async fn list_transactions(
        &self,
        token: &ApiToken,
        page: u32,
    ) -> Result<Page<CreditTransaction>, ApiError> {
        let key = QueryKey::with_params(
            Resource::CreditTransactions,
            token,
            vec![("page", page.to_string())],
        );
        let fetched = self.inner.list_transactions(token, page).await;
        self.revalidate(
            key,
            fetched,
            CachedValue::CreditTransactions,
            |cached| match cached {
                CachedValue::CreditTransactions(page) => Some(page),
                _ => None,
            },
        )
        .await
    }

    async fn credit_stats(&self, token: &ApiToken) -> Result<CreditStats, ApiError> {
        let key = QueryKey::new(Resource::CreditStats, token);
        let fetched = self.inner.credit_stats(token).await;
        self.revalidate(key, fetched, CachedValue::CreditStats, |cached| match cached {
            CachedValue::CreditStats(stats) => Some(stats),
            _ => None,
        })
        .await
    }

    async fn bulk_add_credits(
        &self,
        token: &ApiToken,
        grant: &BulkCreditGrant,
    ) -> Result<(), ApiError> {
        let result = self.inner.bulk_add_credits(token, grant).await;
        self.after_credit_change(result).await
    }

    async fn list_commands(&self, token: &ApiToken) -> Result<Vec<Command>, ApiError> {
        let key = QueryKey::new(Resource::Commands, token);
        let fetched = self.inner.list_commands(token).await;
        self.revalidate(key, fetched, CachedValue::Commands, |cached| match cached {
            CachedValue::Commands(commands) => Some(commands),
            _ => None,
        })
        .await
    }

    async fn create_command(
        &self,
        token: &ApiToken,
        draft: &CommandDraft,
    ) -> Result<(), ApiError> {
        let result = self.inner.create_command(token, draft).await;
        self.after_command_change(result).await
    }

    async fn update_command(
        &self,
        token: &ApiToken,
        id: &CommandId,
        draft: &CommandDraft,
    ) -> Result<(), ApiError> {
        let result = self.inner.update_command(token, id, draft).await;
        self.after_command_change(result).await
    }

    async fn toggle_command(&self, token: &ApiToken, id: &CommandId) -> Result<(), ApiError> {
        let result = self.inner.toggle_command(token, id).await;
        self.after_command_change(result).await
    }

    async fn delete_command(&self, token: &ApiToken, id: &CommandId) -> Result<(), ApiError> {
        let result = self.inner.delete_command(token, id).await;
        self.after_command_change(result).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use aiq_core::{AdminId, CreditFilter, Pagination};

    use super::*;
    use crate::config::CacheConfig;

    /// Backend double counting calls per operation.
    #[derive(Default)]
    struct CountingApi {
        calls: Mutex<Vec<&'static str>>,
        fail_mutations: AtomicBool,
        unauthorized_reads: AtomicBool,
        unavailable: AtomicBool,
    }

    impl CountingApi {
        fn record(&self, op: &'static str) {
            self.calls.lock().unwrap().push(op);
        }

        fn count(&self, op: &str) -> usize {
            self.calls.lock().unwrap().iter().filter(|c| **c == op).count()
        }

        fn read<T>(&self, op: &'static str, value: T) -> Result<T, ApiError> {
            self.record(op);
            if self.unauthorized_reads.load(Ordering::SeqCst) {
                return Err(ApiError::Unauthorized { message: None });
            }
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(ApiError::Status {
                    status: 503,
                    message: None,
                });
            }
            Ok(value)
        }

        fn mutate(&self, op: &'static str) -> Result<(), ApiError> {
            self.record(op);
            if self.fail_mutations.load(Ordering::SeqCst) {
                return Err(ApiError::Status {
                    status: 400,
                    message: Some("rejected".to_string()),
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl BotApi for CountingApi {
        async fn login(&self, _: &str, _: &SecretString) -> Result<LoginSuccess, ApiError> {
            self.record("login");
            Ok(LoginSuccess {
                token: ApiToken::new("t"),
                admin: admin(),
            })
        }
        async fn current_admin(&self, _: &ApiToken) -> Result<Admin, ApiError> {
            self.read("current_admin", admin())
        }
        async fn dashboard(&self, _: &ApiToken) -> Result<DashboardStats, ApiError> {
            self.read("dashboard", DashboardStats::default())
        }
        async fn list_users(
            &self,
            _: &ApiToken,
            query: &UserQuery,
        ) -> Result<Page<User>, ApiError> {
            let pagination = Pagination {
                page: query.page,
                ..Pagination::default()
            };
            self.read("list_users", Page::new(Vec::new(), pagination))
        }
        async fn adjust_user_credits(
            &self,
            _: &ApiToken,
            _: &UserId,
            _: &CreditAdjustment,
        ) -> Result<(), ApiError> {
            self.mutate("adjust_user_credits")
        }
        async fn list_transactions(
            &self,
            _: &ApiToken,
            _: u32,
        ) -> Result<Page<CreditTransaction>, ApiError> {
            self.read("list_transactions", Page::default())
        }
        async fn credit_stats(&self, _: &ApiToken) -> Result<CreditStats, ApiError> {
            self.read("credit_stats", CreditStats::default())
        }
        async fn bulk_add_credits(
            &self,
            _: &ApiToken,
            _: &BulkCreditGrant,
        ) -> Result<(), ApiError> {
            self.mutate("bulk_add_credits")
        }
        async fn list_commands(&self, _: &ApiToken) -> Result<Vec<Command>, ApiError> {
            self.read("list_commands", Vec::new())
        }
        async fn create_command(&self, _: &ApiToken, _: &CommandDraft) -> Result<(), ApiError> {
            self.mutate("create_command")
        }
        async fn update_command(
            &self,
            _: &ApiToken,
            _: &CommandId,
            _: &CommandDraft,
        ) -> Result<(), ApiError> {
            self.mutate("update_command")
        }
        async fn toggle_command(&self, _: &ApiToken, _: &CommandId) -> Result<(), ApiError> {
            self.mutate("toggle_command")
        }
        async fn delete_command(&self, _: &ApiToken, _: &CommandId) -> Result<(), ApiError> {
            self.mutate("delete_command")
        }
    }

    fn admin() -> Admin {
        Admin {
            id: AdminId::new("a1"),
            username: "nok".to_string(),
            name: String::new(),
            email: String::new(),
            role: aiq_core::AdminRole::Admin,
            created_at: None,
        }
    }

    fn cached() -> CachedApi<CountingApi> {
        CachedApi::new(
            CountingApi::default(),
            QueryCache::new(CacheConfig {
                ttl: Duration::from_secs(60),
                capacity: 100,
            }),
        )
    }

    fn token() -> ApiToken {
        ApiToken::new("t")
    }

    async fn cached_users(api: &CachedApi<CountingApi>, token: &ApiToken, page: u32) -> bool {
        let key = QueryKey::with_params(
            Resource::Users,
            token,
            UserQuery::page(page, CreditFilter::All).to_params(),
        );
        api.cache().get(&key).await.is_some()
    }

    #[tokio::test]
    async fn test_every_read_reaches_the_backend() {
        let api = cached();
        let query = UserQuery::page(1, CreditFilter::All);

        api.list_users(&token(), &query).await.unwrap();
        api.list_users(&token(), &query).await.unwrap();
        api.credit_stats(&token()).await.unwrap();
        api.credit_stats(&token()).await.unwrap();

        assert_eq!(api.inner().count("list_users"), 2);
        assert_eq!(api.inner().count("credit_stats"), 2);
    }

    #[tokio::test]
    async fn test_revoked_token_is_not_hidden_by_cache() {
        let api = cached();
        let query = UserQuery::page(1, CreditFilter::All);
        api.list_users(&token(), &query).await.unwrap();

        api.inner().unauthorized_reads.store(true, Ordering::SeqCst);
        let err = api.list_users(&token(), &query).await.unwrap_err();
        assert!(err.is_unauthorized());

        // Entries of the rejected token are gone, even once the backend is down.
        api.inner().unauthorized_reads.store(false, Ordering::SeqCst);
        api.inner().unavailable.store(true, Ordering::SeqCst);
        let err = api.list_users(&token(), &query).await.unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn test_last_result_is_served_while_backend_is_down() {
        let api = cached();
        let query = UserQuery::page(3, CreditFilter::All);
        api.list_users(&token(), &query).await.unwrap();

        api.inner().unavailable.store(true, Ordering::SeqCst);
        let page = api.list_users(&token(), &query).await.unwrap();
        assert_eq!(page.pagination.page, 3);

        let err = api.credit_stats(&token()).await.unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_cached_results_are_scoped_to_the_token() {
        let api = cached();
        let other = ApiToken::new("other");
        api.list_users(&token(), &UserQuery::page(1, CreditFilter::All))
            .await
            .unwrap();

        assert!(cached_users(&api, &token(), 1).await);
        assert!(!cached_users(&api, &other, 1).await);

        api.inner().unavailable.store(true, Ordering::SeqCst);
        let err = api
            .list_users(&other, &UserQuery::page(1, CreditFilter::All))
            .await
            .unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn test_bulk_grant_invalidates_credit_views() {
        let api = cached();
        let query = UserQuery::page(1, CreditFilter::All);
        api.list_users(&token(), &query).await.unwrap();
        api.list_transactions(&token(), 1).await.unwrap();
        api.credit_stats(&token()).await.unwrap();
        api.dashboard(&token()).await.unwrap();
        api.list_commands(&token()).await.unwrap();

        let grant = BulkCreditGrant::parse("u1,u2", "10", "").unwrap();
        api.bulk_add_credits(&token(), &grant).await.unwrap();
        assert_eq!(api.inner().count("bulk_add_credits"), 1);

        // Nothing stale to fall back on for credit views; commands survive.
        api.inner().unavailable.store(true, Ordering::SeqCst);
        assert!(api.list_users(&token(), &query).await.is_err());
        assert!(api.list_transactions(&token(), 1).await.is_err());
        assert!(api.credit_stats(&token()).await.is_err());
        assert!(api.dashboard(&token()).await.is_err());
        assert!(api.list_commands(&token()).await.is_ok());
    }

    #[tokio::test]
    async fn test_command_mutation_only_invalidates_commands() {
        let api = cached();
        api.list_commands(&token()).await.unwrap();
        api.credit_stats(&token()).await.unwrap();

        api.toggle_command(&token(), &CommandId::new("c1"))
            .await
            .unwrap();

        api.inner().unavailable.store(true, Ordering::SeqCst);
        assert!(api.list_commands(&token()).await.is_err());
        assert!(api.credit_stats(&token()).await.is_ok());
    }

    #[tokio::test]
    async fn test_failed_mutation_keeps_cache() {
        let api = cached();
        api.list_commands(&token()).await.unwrap();
        api.inner().fail_mutations.store(true, Ordering::SeqCst);

        let err = api
            .delete_command(&token(), &CommandId::new("c1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 400, .. }));

        api.inner().unavailable.store(true, Ordering::SeqCst);
        assert!(api.list_commands(&token()).await.is_ok());
    }

    #[tokio::test]
    async fn test_client_errors_are_not_masked_by_cache() {
        let api = cached();
        api.dashboard(&token()).await.unwrap();

        api.inner().unauthorized_reads.store(true, Ordering::SeqCst);
        assert!(api.dashboard(&token()).await.unwrap_err().is_unauthorized());

        api.inner().unauthorized_reads.store(false, Ordering::SeqCst);
        api.dashboard(&token()).await.unwrap();
        assert_eq!(api.inner().count("dashboard"), 3);
    }
}
