use crate::api::{ApiClient, QueueFilter};
use crate::error::ClientError;
use crate::models::{AgentSummary, PropertyRecord, VerificationStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

/// Upstream feeds the activity projection reads from.
/// Each may fail on its own without affecting the others.
#[async_trait]
pub trait ActivitySource: Send + Sync {
    /// Most recently submitted properties
    async fn recent_submissions(&self, limit: u32) -> Result<Vec<PropertyRecord>, ClientError>;

    /// Properties whose review state may have changed recently.
    ///
    /// The backend listing has no `updated_at` ordering, so the client reads
    /// the same first page as `recent_submissions`. A review of a listing
    /// older than that page does not show up in the feed.
    async fn recent_reviews(&self, limit: u32) -> Result<Vec<PropertyRecord>, ClientError>;

    /// Most recently registered agents
    async fn recent_agents(&self, limit: u32) -> Result<Vec<AgentSummary>, ClientError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    PropertySubmitted,
    PropertyApproved,
    PropertyRejected,
    AgentRegistered,
}

/// One entry of the admin activity feed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityItem {
    pub kind: ActivityKind,
    pub title: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub property_id: Option<String>,
    pub agent_id: Option<String>,
}

fn submission_item(property: &PropertyRecord) -> ActivityItem {
    let by = property
        .agent
        .as_ref()
        .map(|a| format!(" by {}", a.display_name()))
        .unwrap_or_default();
    ActivityItem {
        kind: ActivityKind::PropertySubmitted,
        title: "New property submitted".to_string(),
        description: format!("\"{}\" was submitted{}", property.title, by),
        timestamp: property.created_at,
        property_id: Some(property.id.clone()),
        agent_id: Some(property.agent_id.clone()),
    }
}

/// A review decision, inferred from a record touched after creation
fn review_item(property: &PropertyRecord) -> Option<ActivityItem> {
    if !property.was_updated() {
        return None;
    }
    let (kind, title, verb) = match property.verification_status {
        VerificationStatus::Green => (ActivityKind::PropertyApproved, "Property approved", "approved"),
        VerificationStatus::Red => (ActivityKind::PropertyRejected, "Property rejected", "rejected"),
        VerificationStatus::Yellow => return None,
    };
    Some(ActivityItem {
        kind,
        title: title.to_string(),
        description: format!("\"{}\" was {}", property.title, verb),
        timestamp: property.updated_at,
        property_id: Some(property.id.clone()),
        agent_id: Some(property.agent_id.clone()),
    })
}

fn agent_item(agent: &AgentSummary) -> Option<ActivityItem> {
    let registered = agent.created_at?;
    Some(ActivityItem {
        kind: ActivityKind::AgentRegistered,
        title: "New agent registered".to_string(),
        description: format!("{} joined as an agent", agent.display_name()),
        timestamp: registered,
        property_id: None,
        agent_id: Some(agent.id.clone()),
    })
}

fn or_empty<T>(source: &str, result: Result<Vec<T>, ClientError>) -> Vec<T> {
    result.unwrap_or_else(|e| {
        warn!("Activity source {} unavailable: {}", source, e);
        Vec::new()
    })
}

/// Build a newest-first feed of at most `limit` items.
///
/// Never fails: a source that errors contributes nothing.
pub async fn project_activity(source: &dyn ActivitySource, limit: usize) -> Vec<ActivityItem> {
    if limit == 0 {
        return Vec::new();
    }
    let fetch = u32::try_from(limit).unwrap_or(u32::MAX);

    let (submissions, reviews, agents) = tokio::join!(
        source.recent_submissions(fetch),
        source.recent_reviews(fetch),
        source.recent_agents(fetch)
    );

    let mut items: Vec<ActivityItem> = or_empty("submissions", submissions)
        .iter()
        .map(submission_item)
        .collect();
    items.extend(or_empty("reviews", reviews).iter().filter_map(review_item));
    items.extend(or_empty("agents", agents).iter().filter_map(agent_item));

    items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    items.truncate(limit);
    debug!("Projected {} activity item(s)", items.len());
    items
}

#[async_trait]
impl ActivitySource for ApiClient {
    async fn recent_submissions(&self, limit: u32) -> Result<Vec<PropertyRecord>, ClientError> {
        let filter = QueueFilter::new().with_page_size(limit);
        Ok(self.all_properties(&filter).await?.items)
    }

    async fn recent_reviews(&self, limit: u32) -> Result<Vec<PropertyRecord>, ClientError> {
        // same listing as submissions; the shared query is fetched once
        let filter = QueueFilter::new().with_page_size(limit);
        Ok(self.all_properties(&filter).await?.items)
    }

    async fn recent_agents(&self, limit: u32) -> Result<Vec<AgentSummary>, ClientError> {
        let mut url = self.url("admin/agents")?;
        url.query_pairs_mut()
            .append_pair("page", "1")
            .append_pair("page_size", &limit.to_string());
        let (agents, _) = self.execute("GET /admin/agents", self.http().get(url)).await?;
        Ok(agents)
    }
}
