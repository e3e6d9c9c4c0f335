//! Sync Hub
//!
//! Central owner of the backend client and of one infinite cache per record
//! type. Every cache reports into a single event channel, and list
//! controllers for the feature views are created from here.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use tracing::info;

use crate::domain::{Account, AdminLog, Agent, AppConfig, Client, Communication, Transaction};
use crate::error::Result;
use crate::services::{ApiClient, RestFetcher, RetryPolicy};
use crate::sync::{CacheOptions, InfiniteCache, ListController, PageFetcher, SyncEvent};

pub type ClientCache = InfiniteCache<RestFetcher<Client>>;
pub type AccountCache = InfiniteCache<RestFetcher<Account>>;
pub type TransactionCache = InfiniteCache<RestFetcher<Transaction>>;
pub type AgentCache = InfiniteCache<RestFetcher<Agent>>;
pub type CommunicationCache = InfiniteCache<RestFetcher<Communication>>;
pub type AdminLogCache = InfiniteCache<RestFetcher<AdminLog>>;

/// Backend client plus the per-type list caches
pub struct SyncHub {
    config: AppConfig,
    api: Arc<ApiClient>,
    clients: ClientCache,
    accounts: AccountCache,
    transactions: TransactionCache,
    agents: AgentCache,
    communications: CommunicationCache,
    admin_logs: AdminLogCache,
    /// Event receiver (for observers)
    rx: Receiver<SyncEvent>,
}

impl SyncHub {
    /// Create a hub for the given configuration
    pub fn new(config: AppConfig) -> Result<Self> {
        config.validate()?;
        let (tx, rx) = crossbeam_channel::unbounded();

        let api = Arc::new(ApiClient::new(
            &config.api,
            RetryPolicy::from(&config.retry),
        )?);
        let options = CacheOptions::from_config(&config.lists);

        info!(
            base_url = api.base_url(),
            page_size = options.page_size,
            max_lists = options.max_lists,
            "sync hub ready"
        );

        Ok(Self {
            clients: cache(&api, options, &tx),
            accounts: cache(&api, options, &tx),
            transactions: cache(&api, options, &tx),
            agents: cache(&api, options, &tx),
            communications: cache(&api, options, &tx),
            admin_logs: cache(&api, options, &tx),
            config,
            api,
            rx,
        })
    }

    /// Hub with default configuration (local development backend)
    pub fn with_defaults() -> Result<Self> {
        Self::new(AppConfig::default())
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Client for mutations that bypass the caches
    pub fn api(&self) -> &Arc<ApiClient> {
        &self.api
    }

    /// Events from all caches, multiplexed into one channel
    pub fn events(&self) -> Receiver<SyncEvent> {
        self.rx.clone()
    }

    // ==================== Caches ====================

    pub fn clients(&self) -> &ClientCache {
        &self.clients
    }

    pub fn accounts(&self) -> &AccountCache {
        &self.accounts
    }

    pub fn transactions(&self) -> &TransactionCache {
        &self.transactions
    }

    pub fn agents(&self) -> &AgentCache {
        &self.agents
    }

    pub fn communications(&self) -> &CommunicationCache {
        &self.communications
    }

    pub fn admin_logs(&self) -> &AdminLogCache {
        &self.admin_logs
    }

    /// New list controller over `cache`, using the configured search debounce
    ///
    /// Must be called inside a tokio runtime.
    pub fn controller<F: PageFetcher>(&self, cache: &InfiniteCache<F>) -> ListController<F> {
        ListController::new(cache.clone(), self.config.lists.search_debounce())
    }

    /// Mark every cached list of every type stale
    pub fn invalidate_all(&self) {
        info!("invalidating all cached lists");
        self.clients.invalidate_all();
        self.accounts.invalidate_all();
        self.transactions.invalidate_all();
        self.agents.invalidate_all();
        self.communications.invalidate_all();
        self.admin_logs.invalidate_all();
    }

    /// Total number of lists held across all caches
    pub fn cached_lists(&self) -> usize {
        self.clients.len()
            + self.accounts.len()
            + self.transactions.len()
            + self.agents.len()
            + self.communications.len()
            + self.admin_logs.len()
    }
}

fn cache<R: crate::domain::Record>(
    api: &Arc<ApiClient>,
    options: CacheOptions,
    tx: &Sender<SyncEvent>,
) -> InfiniteCache<RestFetcher<R>> {
    InfiniteCache::new(Arc::new(RestFetcher::new(api.clone())), options).with_events(tx.clone())
}

impl std::fmt::Debug for SyncHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncHub")
            .field("api", &self.api)
            .field("cached_lists", &self.cached_lists())
            .finish()
    }
}
