//! Per-tenant registry of hybrid indexes

use crate::config::Config;
use crate::embedding::{build_provider, EmbeddingProvider};
use crate::error::RagError;
use crate::retrieval::{HybridIndex, IndexOptions, ScoredDocument, SearchError};
use ahash::{HashMap, HashMapExt};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

/// Tenant (user) identifier that keys every index
pub type TenantId = i64;

type IndexMap = HashMap<TenantId, Arc<HybridIndex>>;

/// Registry holding at most one [`HybridIndex`] per tenant
///
/// Indexes are built outside the lock and installed with a single map
/// insert, so a query that has cloned a tenant's `Arc` keeps searching one
/// consistent index even while that tenant is being rebuilt. Tenants never
/// share an index or a lock hold longer than one map operation.
pub struct IndexStore {
    indexes: RwLock<IndexMap>,
    provider: Arc<dyn EmbeddingProvider>,
    options: IndexOptions,
}

impl IndexStore {
    /// Create an empty store embedding with `provider`
    pub fn new(provider: Arc<dyn EmbeddingProvider>, options: IndexOptions) -> Self {
        Self {
            indexes: RwLock::new(HashMap::new()),
            provider,
            options,
        }
    }

    /// Create an empty store from configuration, initializing the embedding backend
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let options =
            IndexOptions::from_config(config).map_err(|e| RagError::Config(e.to_string()))?;
        let provider = build_provider(&config.embedding).map_err(SearchError::from)?;

        info!(
            "Index store ready: model={}, dimension={}, vector_backend={:?}",
            provider.model_name(),
            provider.dimension(),
            options.indexing.vector_backend
        );

        Ok(Self::new(provider, options))
    }

    /// Build an index over `documents` and install it for `tenant_id`
    ///
    /// Replaces any index the tenant already had. An empty document list is
    /// a no-op: nothing is installed and an existing index is left alone.
    pub fn build(&self, tenant_id: TenantId, documents: Vec<String>) -> Result<(), SearchError> {
        if documents.is_empty() {
            debug!("Skipping index build for tenant {}: no documents", tenant_id);
            return Ok(());
        }

        let index = Arc::new(self.build_index(tenant_id, documents)?);
        let replaced = self.write().insert(tenant_id, index).is_some();

        info!(
            "Installed index for tenant {} (replaced existing: {})",
            tenant_id, replaced
        );
        Ok(())
    }

    /// Query the tenant's index, returning the `top_k` best documents
    ///
    /// Fails with [`SearchError::IndexNotFound`] when the tenant has no
    /// index, which callers must treat differently from an empty result.
    pub fn query(
        &self,
        tenant_id: TenantId,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<String>, SearchError> {
        self.require(tenant_id)?.search(query, top_k)
    }

    /// Query with the store's default result count
    pub fn query_default(
        &self,
        tenant_id: TenantId,
        query: &str,
    ) -> Result<Vec<String>, SearchError> {
        self.query(tenant_id, query, self.options.default_top_k)
    }

    /// Result count used when a caller does not pass one
    pub fn default_top_k(&self) -> usize {
        self.options.default_top_k
    }

    /// Like [`query`](Self::query), with combined scores
    pub fn query_with_scores(
        &self,
        tenant_id: TenantId,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredDocument>, SearchError> {
        self.require(tenant_id)?.search_with_scores(query, top_k)
    }

    /// Remove the tenant's index; returns whether one existed
    pub fn delete(&self, tenant_id: TenantId) -> bool {
        let removed = self.write().remove(&tenant_id).is_some();
        if removed {
            info!("Deleted index for tenant {}", tenant_id);
        }
        removed
    }

    /// Number of documents in the tenant's index, 0 when it has none
    pub fn size(&self, tenant_id: TenantId) -> usize {
        self.read().get(&tenant_id).map_or(0, |index| index.len())
    }

    /// Replace the tenant's index with one built from `documents`
    ///
    /// Ends in the same state as `delete` followed by `build`: with no
    /// documents, or when the build fails, the tenant is left without an
    /// index. The old index stays queryable until the new one is installed.
    pub fn rebuild(&self, tenant_id: TenantId, documents: Vec<String>) -> Result<(), SearchError> {
        if documents.is_empty() {
            self.delete(tenant_id);
            return Ok(());
        }

        let index = match self.build_index(tenant_id, documents) {
            Ok(index) => Arc::new(index),
            Err(e) => {
                self.delete(tenant_id);
                return Err(e);
            }
        };

        self.write().insert(tenant_id, index);
        info!("Rebuilt index for tenant {}", tenant_id);
        Ok(())
    }

    /// Current index for the tenant, if any
    pub fn get(&self, tenant_id: TenantId) -> Option<Arc<HybridIndex>> {
        self.read().get(&tenant_id).cloned()
    }

    pub fn contains(&self, tenant_id: TenantId) -> bool {
        self.read().contains_key(&tenant_id)
    }

    /// Number of tenants with an installed index
    pub fn tenant_count(&self) -> usize {
        self.read().len()
    }

    fn require(&self, tenant_id: TenantId) -> Result<Arc<HybridIndex>, SearchError> {
        self.get(tenant_id)
            .ok_or(SearchError::IndexNotFound { tenant_id })
    }

    fn build_index(
        &self,
        tenant_id: TenantId,
        documents: Vec<String>,
    ) -> Result<HybridIndex, SearchError> {
        let start = std::time::Instant::now();
        let count = documents.len();

        let index = HybridIndex::build(documents, Arc::clone(&self.provider), &self.options)?;

        debug!(
            "Built index for tenant {}: {} documents in {}ms",
            tenant_id,
            count,
            start.elapsed().as_millis()
        );
        Ok(index)
    }

    // Every write is a single insert or remove, so a poisoned map is still whole
    fn read(&self) -> RwLockReadGuard<'_, IndexMap> {
        self.indexes.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexMap> {
        self.indexes.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{EmbeddingError, HashEmbedder};
    use crate::retrieval::test_support::FailingProvider;
    use crate::retrieval::DEFAULT_TOP_K;

    fn store() -> IndexStore {
        IndexStore::new(Arc::new(HashEmbedder::new(64)), IndexOptions::default())
    }

    fn docs(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_build_and_query() {
        let store = store();
        store.build(1, docs(&["alpha beta", "gamma delta"])).unwrap();

        assert!(store.contains(1));
        assert_eq!(store.size(1), 2);
        assert_eq!(store.query(1, "alpha", 5).unwrap().len(), 2);
    }

    #[test]
    fn test_query_missing_tenant() {
        let store = store();
        let err = store.query(99, "anything", 5).unwrap_err();
        assert!(err.is_not_found());
        assert!(matches!(err, SearchError::IndexNotFound { tenant_id: 99 }));
    }

    #[test]
    fn test_empty_build_is_noop() {
        let store = store();
        store.build(1, Vec::new()).unwrap();
        assert!(!store.contains(1));
        assert!(store.query(1, "x", 5).unwrap_err().is_not_found());

        store.build(1, docs(&["kept"])).unwrap();
        store.build(1, Vec::new()).unwrap();
        assert_eq!(store.size(1), 1);
    }

    #[test]
    fn test_delete() {
        let store = store();
        assert!(!store.delete(7));

        store.build(7, docs(&["one"])).unwrap();
        assert!(store.delete(7));
        assert!(!store.delete(7));
        assert_eq!(store.size(7), 0);
        assert_eq!(store.tenant_count(), 0);
    }

    #[test]
    fn test_build_replaces() {
        let store = store();
        store.build(3, docs(&["old one", "old two", "old three"])).unwrap();
        let before = store.get(3).unwrap();

        store.build(3, docs(&["new"])).unwrap();
        assert_eq!(store.size(3), 1);
        assert_eq!(store.tenant_count(), 1);

        // A handle taken before the swap still sees the old collection
        assert_eq!(before.len(), 3);
    }

    #[test]
    fn test_rebuild_with_empty_removes() {
        let store = store();
        store.build(4, docs(&["something"])).unwrap();
        store.rebuild(4, Vec::new()).unwrap();
        assert!(!store.contains(4));
    }

    #[test]
    fn test_query_default_uses_configured_count() {
        let store = store();
        let corpus: Vec<String> = (0..8).map(|i| format!("document {}", i)).collect();
        store.build(1, corpus).unwrap();

        assert_eq!(store.default_top_k(), DEFAULT_TOP_K);
        assert_eq!(store.query_default(1, "document").unwrap().len(), DEFAULT_TOP_K);

        let options = IndexOptions {
            default_top_k: 2,
            ..IndexOptions::default()
        };
        let narrow = IndexStore::new(Arc::new(HashEmbedder::new(64)), options);
        narrow.build(1, docs(&["a b", "b c", "c d"])).unwrap();
        assert_eq!(narrow.query_default(1, "b").unwrap().len(), 2);
        assert!(narrow.query_default(2, "b").unwrap_err().is_not_found());
    }

    #[test]
    fn test_failed_build_keeps_installed_index() {
        let provider = Arc::new(FailingProvider::new());
        let store = IndexStore::new(provider.clone(), IndexOptions::default());
        store.build(1, docs(&["old alpha", "old beta"])).unwrap();
        let before = store.get(1).unwrap();

        provider.fail();
        let err = store.build(1, docs(&["new alpha"])).unwrap_err();
        assert!(matches!(
            err,
            SearchError::Embedding(EmbeddingError::GenerationError(_))
        ));

        let after = store.get(1).unwrap();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(store.size(1), 2);
    }

    #[test]
    fn test_failed_rebuild_removes_tenant() {
        let provider = Arc::new(FailingProvider::new());
        let store = IndexStore::new(provider.clone(), IndexOptions::default());
        store.build(1, docs(&["old alpha", "old beta"])).unwrap();

        provider.fail();
        let err = store.rebuild(1, docs(&["new alpha"])).unwrap_err();
        assert!(matches!(err, SearchError::Embedding(_)));
        assert!(!err.is_not_found());

        assert!(!store.contains(1));
        assert!(store.query(1, "alpha", 5).unwrap_err().is_not_found());
    }

    #[test]
    fn test_query_failure_is_not_masked() {
        let provider = Arc::new(FailingProvider::new());
        let store = IndexStore::new(provider.clone(), IndexOptions::default());
        store.build(1, docs(&["alpha"])).unwrap();

        provider.fail();
        let err = store.query(1, "alpha", 5).unwrap_err();
        assert!(matches!(err, SearchError::Embedding(_)));
        assert!(store.contains(1));
    }
}
