//! Support value objects
use chrono::{DateTime, Utc};
use itdesk_common::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Priority { Low, #[default] Medium, High, Critical }

impl Priority {
    pub const ALL: [Priority; 4] = [Priority::Low, Priority::Medium, Priority::High, Priority::Critical];

    pub fn as_str(&self) -> &'static str {
        match self { Self::Low => "low", Self::Medium => "medium", Self::High => "high", Self::Critical => "critical" }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Priority {
    type Err = DomainError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|p| p.as_str() == s)
            .ok_or_else(|| DomainError::UnknownVariant { kind: "priority", value: s.to_string() })
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TicketType { Damage, Maintenance, Update, Audit, #[default] Other }

/// Ticket status. Transitions only move toward `Closed`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus { #[default] Open, InProgress, WaitingParts, Resolved, Closed }

impl TicketStatus {
    pub const ALL: [TicketStatus; 5] = [
        TicketStatus::Open, TicketStatus::InProgress, TicketStatus::WaitingParts,
        TicketStatus::Resolved, TicketStatus::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open", Self::InProgress => "in_progress", Self::WaitingParts => "waiting_parts",
            Self::Resolved => "resolved", Self::Closed => "closed",
        }
    }

    /// Resolved or closed: the resolution clock no longer runs
    pub fn is_settled(&self) -> bool { matches!(self, Self::Resolved | Self::Closed) }

    /// Statuses the SLA sweep walks
    pub fn is_active(&self) -> bool { !self.is_settled() }

    pub fn can_transition_to(&self, to: TicketStatus) -> bool {
        use TicketStatus::*;
        match (self, to) {
            (Open, InProgress | WaitingParts | Resolved | Closed) => true,
            (InProgress, WaitingParts | Resolved | Closed) => true,
            (WaitingParts, InProgress | Resolved | Closed) => true,
            (Resolved, Closed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for TicketStatus {
    type Err = DomainError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|st| st.as_str() == s)
            .ok_or_else(|| DomainError::UnknownVariant { kind: "status", value: s.to_string() })
    }
}

/// Independently tracked SLA commitment
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SlaDimension { FirstResponse, Resolution }

impl fmt::Display for SlaDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self { Self::FirstResponse => "first_response", Self::Resolution => "resolution" })
    }
}

/// Deadlines computed once at creation (and again on priority change)
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlaDeadlines {
    pub first_response: DateTime<Utc>,
    pub resolution: DateTime<Utc>,
}

/// Derived violation flags. Never accepted as input.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SlaFlags {
    pub first_response: bool,
    pub resolution: bool,
}

impl SlaFlags {
    /// The aggregate `sla_violated` flag
    pub fn any(&self) -> bool { self.first_response || self.resolution }

    pub fn get(&self, dimension: SlaDimension) -> bool {
        match dimension { SlaDimension::FirstResponse => self.first_response, SlaDimension::Resolution => self.resolution }
    }

    /// Dimensions that are set here but not in `before`
    pub fn newly_set_since(&self, before: &SlaFlags) -> Vec<SlaDimension> {
        [SlaDimension::FirstResponse, SlaDimension::Resolution]
            .into_iter()
            .filter(|d| self.get(*d) && !before.get(*d))
            .collect()
    }
}
