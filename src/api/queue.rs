use crate::api::ApiClient;
use crate::error::ClientError;
use crate::models::{PaginationMeta, PropertyRecord, VerificationStatus, Visibility};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

const DEFAULT_PAGE_SIZE: u32 = 20;

/// Which listing a query runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueScope {
    /// Properties awaiting review; the backend applies the pending scope
    Pending,
    /// Every property, filterable by status and visibility
    All,
}

impl QueueScope {
    pub fn path(&self) -> &'static str {
        match self {
            QueueScope::Pending => "admin/properties/verification-queue",
            QueueScope::All => "admin/properties",
        }
    }
}

/// Immutable filter for queue and listing queries.
///
/// Two filters with the same values are the same query. Every `with_*`
/// predicate change resets to page 1; `with_page` keeps the predicates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueFilter {
    page: u32,
    page_size: u32,
    agent_id: Option<String>,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
    city: Option<String>,
    country: Option<String>,
    verification_status: Option<VerificationStatus>,
    visibility: Option<Visibility>,
}

impl Default for QueueFilter {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            agent_id: None,
            date_from: None,
            date_to: None,
            city: None,
            country: None,
            verification_status: None,
            visibility: None,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl QueueFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn city(&self) -> Option<&str> {
        self.city.as_deref()
    }

    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }

    pub fn agent_id(&self) -> Option<&str> {
        self.agent_id.as_deref()
    }

    pub fn date_range(&self) -> (Option<NaiveDate>, Option<NaiveDate>) {
        (self.date_from, self.date_to)
    }

    pub fn verification_status(&self) -> Option<VerificationStatus> {
        self.verification_status
    }

    pub fn visibility(&self) -> Option<Visibility> {
        self.visibility
    }

    /// Move to another page, keeping every predicate
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self.page = 1;
        self
    }

    pub fn with_agent(mut self, agent_id: impl Into<Option<String>>) -> Self {
        self.agent_id = non_empty(agent_id.into());
        self.page = 1;
        self
    }

    /// Restrict to properties created between the two dates, inclusive
    pub fn with_date_range(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.date_from = from;
        self.date_to = to;
        self.page = 1;
        self
    }

    pub fn with_city(mut self, city: impl Into<Option<String>>) -> Self {
        self.city = non_empty(city.into());
        self.page = 1;
        self
    }

    pub fn with_country(mut self, country: impl Into<Option<String>>) -> Self {
        self.country = non_empty(country.into());
        self.page = 1;
        self
    }

    /// Only honoured by `QueueScope::All`
    pub fn with_status(mut self, status: Option<VerificationStatus>) -> Self {
        self.verification_status = status;
        self.page = 1;
        self
    }

    /// Only honoured by `QueueScope::All`
    pub fn with_visibility(mut self, visibility: Option<Visibility>) -> Self {
        self.visibility = visibility;
        self.page = 1;
        self
    }

    /// Same predicates, page reset to 1
    pub fn first_page(self) -> Self {
        self.with_page(1)
    }

    /// Query parameters for a scope, sorted by name
    pub fn query_params(&self, scope: QueueScope) -> BTreeMap<&'static str, String> {
        let mut params = BTreeMap::new();
        params.insert("page", self.page.to_string());
        params.insert("page_size", self.page_size.to_string());
        if let Some(agent) = &self.agent_id {
            params.insert("agent_id", agent.clone());
        }
        if let Some(from) = self.date_from {
            params.insert("date_from", from.format("%Y-%m-%d").to_string());
        }
        if let Some(to) = self.date_to {
            params.insert("date_to", to.format("%Y-%m-%d").to_string());
        }
        if let Some(city) = &self.city {
            params.insert("city", city.clone());
        }
        if let Some(country) = &self.country {
            params.insert("country", country.clone());
        }

        match scope {
            QueueScope::All => {
                if let Some(status) = self.verification_status {
                    params.insert("verification_status", status.as_str().to_string());
                }
                if let Some(visibility) = self.visibility {
                    params.insert("visibility", visibility.as_str().to_string());
                }
            }
            QueueScope::Pending => {
                if self.verification_status.is_some() || self.visibility.is_some() {
                    debug!("Status and visibility filters are ignored for the verification queue");
                }
            }
        }
        params
    }

    /// Canonical request key: scope path plus sorted, encoded parameters
    pub fn cache_key(&self, scope: QueueScope) -> String {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query_params(scope))
            .finish();
        format!("{}?{}", scope.path(), encoded)
    }
}

/// One page of results with the backend's paging metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuePage {
    pub items: Vec<PropertyRecord>,
    pub meta: PaginationMeta,
}

struct CachedPage {
    finished_at: Instant,
    outcome: Result<QueuePage, ClientError>,
}

struct Slot {
    entry: tokio::sync::Mutex<Option<CachedPage>>,
    /// Number of fetches that have finished on this slot
    completed: AtomicU64,
}

impl Slot {
    /// Nobody is fetching or waiting on the slot and its page is past the
    /// freshness window
    fn is_stale(self: &Arc<Self>, window: Duration) -> bool {
        if Arc::strong_count(self) > 1 {
            return false;
        }
        match self.entry.try_lock() {
            Ok(entry) => entry
                .as_ref()
                .map_or(true, |cached| cached.finished_at.elapsed() >= window),
            Err(_) => false,
        }
    }
}

/// Collapses identical queue queries onto one request.
///
/// Callers that arrive while a fetch for the same key is running wait for
/// it and share its outcome, success or failure. A successful page is then
/// reused until the window passes. Failures are never reused by later,
/// independent calls.
pub(crate) struct QueryCache {
    window: Duration,
    slots: Mutex<HashMap<String, Arc<Slot>>>,
}

impl QueryCache {
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            window,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Slot for `key`; creating one first evicts idle, expired slots
    fn slot(&self, key: &str) -> Arc<Slot> {
        let mut slots = self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(slot) = slots.get(key) {
            return Arc::clone(slot);
        }

        let before = slots.len();
        slots.retain(|_, slot| !slot.is_stale(self.window));
        if slots.len() < before {
            debug!("Evicted {} expired queue page(s)", before - slots.len());
        }

        let slot = Arc::new(Slot {
            entry: tokio::sync::Mutex::new(None),
            completed: AtomicU64::new(0),
        });
        slots.insert(key.to_string(), Arc::clone(&slot));
        slot
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }

    pub(crate) fn invalidate(&self) {
        let mut slots = self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !slots.is_empty() {
            debug!("Dropping {} cached queue page(s)", slots.len());
        }
        slots.clear();
    }

    pub(crate) async fn get_or_fetch<F, Fut>(
        &self,
        key: &str,
        bypass: bool,
        fetch: F,
    ) -> Result<QueuePage, ClientError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<QueuePage, ClientError>>,
    {
        let slot = self.slot(key);
        let seen = slot.completed.load(Ordering::SeqCst);
        let mut entry = slot.entry.lock().await;

        if let Some(cached) = entry.as_ref() {
            let finished_while_waiting = slot.completed.load(Ordering::SeqCst) > seen;
            let fresh = !bypass && cached.outcome.is_ok() && cached.finished_at.elapsed() < self.window;
            if finished_while_waiting || fresh {
                debug!("Reusing queue result for {}", key);
                return cached.outcome.clone();
            }
        }

        let outcome = fetch().await;
        *entry = Some(CachedPage {
            finished_at: Instant::now(),
            outcome: outcome.clone(),
        });
        slot.completed.fetch_add(1, Ordering::SeqCst);
        outcome
    }
}

impl ApiClient {
    /// Fetch one page for `filter`, sharing identical in-flight or fresh
    /// queries
    pub async fn query(&self, scope: QueueScope, filter: &QueueFilter) -> Result<QueuePage, ClientError> {
        self.query_inner(scope, filter, false).await
    }

    /// Pending-review queue
    pub async fn verification_queue(&self, filter: &QueueFilter) -> Result<QueuePage, ClientError> {
        self.query(QueueScope::Pending, filter).await
    }

    /// Every property, with status and visibility filters
    pub async fn all_properties(&self, filter: &QueueFilter) -> Result<QueuePage, ClientError> {
        self.query(QueueScope::All, filter).await
    }

    async fn query_inner(
        &self,
        scope: QueueScope,
        filter: &QueueFilter,
        bypass_cache: bool,
    ) -> Result<QueuePage, ClientError> {
        let key = filter.cache_key(scope);
        self.queue_cache()
            .get_or_fetch(&key, bypass_cache, || self.fetch_page(scope, filter))
            .await
    }

    async fn fetch_page(&self, scope: QueueScope, filter: &QueueFilter) -> Result<QueuePage, ClientError> {
        let mut url = self.url(scope.path())?;
        url.query_pairs_mut().extend_pairs(filter.query_params(scope));
        let endpoint = format!("GET /{}", scope.path());

        let (items, meta): (Vec<PropertyRecord>, _) =
            self.execute(&endpoint, self.http().get(url)).await?;
        let meta = meta.ok_or_else(|| ClientError::Decode {
            endpoint: endpoint.clone(),
            reason: "response has no pagination metadata".to_string(),
        })?;

        if !meta.is_consistent() {
            warn!("{} returned inconsistent pagination metadata: {:?}", endpoint, meta);
        }
        info!(
            "Fetched page {}/{} of {} ({} of {} properties)",
            meta.page,
            meta.total_pages,
            scope.path(),
            items.len(),
            meta.total
        );

        Ok(QueuePage { items, meta })
    }
}

/// Admin-side view over one scope: the current filter and its last page
pub struct QueueBrowser {
    client: ApiClient,
    scope: QueueScope,
    filter: QueueFilter,
    current: Option<QueuePage>,
}

impl QueueBrowser {
    pub fn new(client: ApiClient, scope: QueueScope) -> Self {
        Self {
            client,
            scope,
            filter: QueueFilter::default(),
            current: None,
        }
    }

    pub fn filter(&self) -> &QueueFilter {
        &self.filter
    }

    pub fn current(&self) -> Option<&QueuePage> {
        self.current.as_ref()
    }

    pub fn meta(&self) -> Option<&PaginationMeta> {
        self.current.as_ref().map(|p| &p.meta)
    }

    /// Next page exists according to the backend's `total_pages`
    pub fn has_next(&self) -> bool {
        self.meta().map_or(false, PaginationMeta::has_next)
    }

    pub fn has_previous(&self) -> bool {
        self.filter.page() > 1
    }

    /// Switch to a new filter, starting from its first page
    pub async fn apply(&mut self, filter: QueueFilter) -> Result<&QueuePage, ClientError> {
        self.load(filter.first_page(), false).await
    }

    pub async fn goto_page(&mut self, page: u32) -> Result<&QueuePage, ClientError> {
        let filter = self.filter.clone().with_page(page);
        self.load(filter, false).await
    }

    pub async fn next_page(&mut self) -> Result<&QueuePage, ClientError> {
        let page = self.filter.page() + 1;
        self.goto_page(page).await
    }

    pub async fn previous_page(&mut self) -> Result<&QueuePage, ClientError> {
        let page = self.filter.page().saturating_sub(1).max(1);
        self.goto_page(page).await
    }

    /// Reload the current page from the backend, skipping the cache
    pub async fn refresh(&mut self) -> Result<&QueuePage, ClientError> {
        let filter = self.filter.clone();
        self.load(filter, true).await
    }

    /// Fetch `filter`; the browser only moves to it once the page arrives
    async fn load(&mut self, filter: QueueFilter, bypass_cache: bool) -> Result<&QueuePage, ClientError> {
        let page = self
            .client
            .query_inner(self.scope, &filter, bypass_cache)
            .await?;
        self.filter = filter;
        Ok(self.current.insert(page))
    }
}
