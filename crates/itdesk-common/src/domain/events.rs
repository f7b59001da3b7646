//! Domain Events - Record significant occurrences in the domain
//!
//! Events are:
//! - Immutable records of past occurrences
//! - Named in past tense
//! - Plain data: delivery is the dispatcher's job, never the event's

use super::value_objects::CompanyId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Base event metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique event ID
    pub event_id: Uuid,
    /// When the event happened
    pub occurred_at: DateTime<Utc>,
    /// Owning tenant
    pub company_id: CompanyId,
    /// Aggregate ID
    pub aggregate_id: String,
    /// Aggregate type
    pub aggregate_type: String,
}

impl EventMetadata {
    /// Build metadata for an event raised by `aggregate_type` `aggregate_id`
    pub fn new(
        company_id: CompanyId,
        aggregate_id: impl ToString,
        aggregate_type: &str,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at,
            company_id,
            aggregate_id: aggregate_id.to_string(),
            aggregate_type: aggregate_type.to_string(),
        }
    }
}

/// Domain event trait
pub trait DomainEvent: Send + Sync {
    /// Dotted event type, e.g. `ticket.created`
    fn event_type(&self) -> &'static str;
    /// Event metadata
    fn metadata(&self) -> &EventMetadata;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pinged {
        metadata: EventMetadata,
    }

    impl DomainEvent for Pinged {
        fn event_type(&self) -> &'static str {
            "test.pinged"
        }
        fn metadata(&self) -> &EventMetadata {
            &self.metadata
        }
    }

    #[test]
    fn test_event_metadata() {
        let company = CompanyId::new();
        let event = Pinged {
            metadata: EventMetadata::new(company, "agg-1", "Test", Utc::now()),
        };

        assert_eq!(event.event_type(), "test.pinged");
        assert_eq!(event.metadata().aggregate_id, "agg-1");
        assert_eq!(event.metadata().company_id, company);
    }
}
