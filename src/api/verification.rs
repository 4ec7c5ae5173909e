use crate::api::ApiClient;
use crate::error::ClientError;
use crate::models::{PropertyRecord, VerificationStatus, Visibility};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

#[derive(Debug, Serialize)]
struct StatusUpdate<'a> {
    status: VerificationStatus,
    /// Always sent; an empty string clears earlier feedback
    admin_feedback: &'a str,
}

#[derive(Debug, Serialize)]
struct VisibilityUpdate {
    visibility: Visibility,
}

/// Outcome of looking up a property's verification status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusLookup {
    Known(VerificationStatus),
    /// No such submission exists yet
    NotSubmitted,
    /// The status could not be read, e.g. credentials were rejected
    Unavailable(String),
}

/// Marks a property as having a change in flight until dropped
struct MutationGuard {
    inflight: Arc<Mutex<HashSet<String>>>,
    property_id: String,
}

impl MutationGuard {
    fn acquire(inflight: &Arc<Mutex<HashSet<String>>>, property_id: &str) -> Result<Self, ClientError> {
        let mut set = inflight.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !set.insert(property_id.to_string()) {
            warn!("Ignoring second change to property {} while one is in flight", property_id);
            return Err(ClientError::MutationInFlight {
                property_id: property_id.to_string(),
            });
        }
        Ok(Self {
            inflight: Arc::clone(inflight),
            property_id: property_id.to_string(),
        })
    }
}

impl Drop for MutationGuard {
    fn drop(&mut self) {
        let mut set = self.inflight.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        set.remove(&self.property_id);
    }
}

impl ApiClient {
    /// Whether a status or visibility change for this property is pending.
    /// Callers disable the matching controls while this is true.
    pub fn is_mutating(&self, property_id: &str) -> bool {
        self.mutations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(property_id)
    }

    pub async fn get_property(&self, property_id: &str) -> Result<PropertyRecord, ClientError> {
        let url = self.url(&format!("properties/{}", property_id))?;
        let endpoint = format!("GET /properties/{}", property_id);
        let (record, _) = self.execute(&endpoint, self.http().get(url)).await?;
        Ok(record)
    }

    /// Read a property's status without conflating "missing" with
    /// "could not be read"
    pub async fn fetch_status(&self, property_id: &str) -> StatusLookup {
        match self.get_property(property_id).await {
            Ok(record) => StatusLookup::Known(record.verification_status),
            Err(ClientError::NotFound { .. }) => StatusLookup::NotSubmitted,
            Err(e) => StatusLookup::Unavailable(e.user_message()),
        }
    }

    /// Set the verification status. Any status may follow any other.
    ///
    /// `admin_feedback` replaces the stored feedback; pass `""` to clear it.
    pub async fn update_status(
        &self,
        property_id: &str,
        status: VerificationStatus,
        admin_feedback: &str,
    ) -> Result<PropertyRecord, ClientError> {
        let _guard = MutationGuard::acquire(&self.mutations, property_id)?;

        let url = self.url(&format!("admin/properties/{}/status", property_id))?;
        let endpoint = format!("PATCH /admin/properties/{}/status", property_id);
        let body = StatusUpdate {
            status,
            admin_feedback,
        };
        let (record, _): (PropertyRecord, _) =
            self.execute(&endpoint, self.http().patch(url).json(&body)).await?;

        info!("Property {} marked {}", property_id, record.verification_status);
        self.invalidate_queue();
        Ok(record)
    }

    /// Set public visibility, leaving the verification status untouched
    pub async fn update_visibility(
        &self,
        property_id: &str,
        visibility: Visibility,
    ) -> Result<PropertyRecord, ClientError> {
        let _guard = MutationGuard::acquire(&self.mutations, property_id)?;

        let url = self.url(&format!("admin/properties/{}/visibility", property_id))?;
        let endpoint = format!("PATCH /admin/properties/{}/visibility", property_id);
        let (record, _): (PropertyRecord, _) = self
            .execute(&endpoint, self.http().patch(url).json(&VisibilityUpdate { visibility }))
            .await?;

        info!("Property {} is now {}", property_id, record.visibility);
        self.invalidate_queue();
        Ok(record)
    }

    /// Review a property the caller already holds, checking the response
    /// against it
    pub async fn review(
        &self,
        current: &PropertyRecord,
        status: VerificationStatus,
        admin_feedback: &str,
    ) -> Result<PropertyRecord, ClientError> {
        let updated = self.update_status(&current.id, status, admin_feedback).await?;
        audit_mutation(current, &updated);
        if updated.visibility != current.visibility {
            warn!(
                "Status change on {} also changed visibility ({} → {})",
                current.id, current.visibility, updated.visibility
            );
        }
        Ok(updated)
    }

    /// Change visibility of a property the caller already holds
    pub async fn set_visibility(
        &self,
        current: &PropertyRecord,
        visibility: Visibility,
    ) -> Result<PropertyRecord, ClientError> {
        let updated = self.update_visibility(&current.id, visibility).await?;
        audit_mutation(current, &updated);
        if updated.verification_status != current.verification_status {
            warn!(
                "Visibility change on {} also changed status ({} → {})",
                current.id, current.verification_status, updated.verification_status
            );
        }
        Ok(updated)
    }
}

fn audit_mutation(before: &PropertyRecord, after: &PropertyRecord) {
    if after.updated_at <= before.updated_at {
        warn!(
            "Backend did not advance updated_at for {} ({} → {})",
            before.id, before.updated_at, after.updated_at
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_update_always_carries_feedback() {
        let body = serde_json::to_value(StatusUpdate {
            status: VerificationStatus::Green,
            admin_feedback: "",
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"status": "GREEN", "admin_feedback": ""}));
    }

    #[test]
    fn guard_blocks_concurrent_change_and_releases_on_drop() {
        let inflight = Arc::new(Mutex::new(HashSet::new()));

        let first = MutationGuard::acquire(&inflight, "p-1").unwrap();
        assert!(matches!(
            MutationGuard::acquire(&inflight, "p-1"),
            Err(ClientError::MutationInFlight { .. })
        ));
        // other properties are independent
        let other = MutationGuard::acquire(&inflight, "p-2").unwrap();

        drop(first);
        assert!(MutationGuard::acquire(&inflight, "p-1").is_ok());
        drop(other);
    }

    #[test]
    fn poisoned_lock_still_reports_pending_change() {
        let client = ApiClient::new(crate::ClientConfig::new("http://127.0.0.1:9").unwrap()).unwrap();
        let inflight = Arc::clone(&client.mutations);
        let _ = std::thread::spawn(move || {
            let mut set = inflight.lock().unwrap();
            set.insert("p-1".to_string());
            panic!("worker died holding the lock");
        })
        .join();

        assert!(client.mutations.is_poisoned());
        assert!(client.is_mutating("p-1"));
        assert!(matches!(
            MutationGuard::acquire(&client.mutations, "p-1"),
            Err(ClientError::MutationInFlight { .. })
        ));
    }
}
