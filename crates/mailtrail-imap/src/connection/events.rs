//! Untagged event routing.
//!
//! While a command is outstanding, each untagged response either belongs to
//! that command (its kind is in the command's interest set) or is queued
//! here for the caller to drain later. ALERT texts get a queue of their own.

use std::collections::VecDeque;

use crate::parser::UntaggedResponse;

/// Coarse classification of untagged responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Untagged OK, NO or PREAUTH.
    Condition,
    /// Untagged BYE.
    Bye,
    /// CAPABILITY data.
    Capability,
    /// FLAGS data.
    Flags,
    /// LIST data.
    List,
    /// LSUB data.
    Lsub,
    /// SEARCH data.
    Search,
    /// STATUS data.
    Status,
    /// NAMESPACE data.
    Namespace,
    /// QUOTA data.
    Quota,
    /// QUOTAROOT data.
    QuotaRoot,
    /// `n EXISTS`.
    Exists,
    /// `n RECENT`.
    Recent,
    /// `n EXPUNGE`.
    Expunge,
    /// `n FETCH`.
    Fetch,
    /// ACL data.
    Acl,
    /// LISTRIGHTS data.
    ListRights,
    /// MYRIGHTS data.
    MyRights,
    /// Responses without a dedicated kind, e.g. `ENABLED` or `VANISHED`.
    Other,
}

impl EventKind {
    /// Returns the kind of an untagged response.
    ///
    /// Untagged BAD has no kind: the correlator raises it as an error.
    #[must_use]
    pub const fn of(response: &UntaggedResponse) -> Option<Self> {
        Some(match response {
            UntaggedResponse::Ok { .. }
            | UntaggedResponse::No { .. }
            | UntaggedResponse::PreAuth { .. } => Self::Condition,
            UntaggedResponse::Bad { .. } => return None,
            UntaggedResponse::Bye { .. } => Self::Bye,
            UntaggedResponse::Capability(_) => Self::Capability,
            UntaggedResponse::Flags(_) => Self::Flags,
            UntaggedResponse::List(_) => Self::List,
            UntaggedResponse::Lsub(_) => Self::Lsub,
            UntaggedResponse::Search(_) => Self::Search,
            UntaggedResponse::Status { .. } => Self::Status,
            UntaggedResponse::Namespace(_) => Self::Namespace,
            UntaggedResponse::Quota(_) => Self::Quota,
            UntaggedResponse::QuotaRoot { .. } => Self::QuotaRoot,
            UntaggedResponse::Exists(_) => Self::Exists,
            UntaggedResponse::Recent(_) => Self::Recent,
            UntaggedResponse::Expunge(_) => Self::Expunge,
            UntaggedResponse::Fetch { .. } => Self::Fetch,
            UntaggedResponse::Acl { .. } => Self::Acl,
            UntaggedResponse::ListRights { .. } => Self::ListRights,
            UntaggedResponse::MyRights { .. } => Self::MyRights,
            UntaggedResponse::Other { .. } => Self::Other,
        })
    }
}

/// Session-wide queue of unsolicited responses and alerts.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<UntaggedResponse>,
    alerts: Vec<String>,
}

impl EventQueue {
    /// Queues an untagged response no command claimed.
    pub fn push(&mut self, event: UntaggedResponse) {
        self.events.push_back(event);
    }

    /// Queues the text of an ALERT response code.
    pub fn push_alert(&mut self, text: impl Into<String>) {
        self.alerts.push(text.into());
    }

    /// Number of queued events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if no events are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drains queued events in arrival order.
    pub fn take_events(&mut self) -> Vec<UntaggedResponse> {
        self.events.drain(..).collect()
    }

    /// Drains queued alert texts in arrival order.
    pub fn take_alerts(&mut self) -> Vec<String> {
        std::mem::take(&mut self.alerts)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use crate::types::SeqNum;

    #[test]
    fn test_kind_of() {
        assert_eq!(
            EventKind::of(&UntaggedResponse::Exists(3)),
            Some(EventKind::Exists)
        );
        assert_eq!(
            EventKind::of(&UntaggedResponse::Expunge(SeqNum::new(2).unwrap())),
            Some(EventKind::Expunge)
        );
        assert_eq!(
            EventKind::of(&UntaggedResponse::Bad {
                code: None,
                text: "nope".into()
            }),
            None
        );
        assert_eq!(
            EventKind::of(&UntaggedResponse::No {
                code: None,
                text: "warn".into()
            }),
            Some(EventKind::Condition)
        );
        assert_eq!(
            EventKind::of(&UntaggedResponse::Other {
                keyword: "ENABLED".into(),
                number: None,
                payload: Vec::new(),
            }),
            Some(EventKind::Other)
        );
    }

    #[test]
    fn test_queue_preserves_order_and_drains() {
        let mut queue = EventQueue::default();
        queue.push(UntaggedResponse::Exists(1));
        queue.push(UntaggedResponse::Recent(1));
        queue.push_alert("disk almost full");
        assert_eq!(queue.len(), 2);

        let events = queue.take_events();
        assert_eq!(
            events,
            vec![UntaggedResponse::Exists(1), UntaggedResponse::Recent(1)]
        );
        assert!(queue.is_empty());
        assert_eq!(queue.take_alerts(), vec!["disk almost full".to_string()]);
        assert!(queue.take_alerts().is_empty());
    }
}
