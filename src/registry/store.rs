//! Ticket registry implementation
//!
//! The single in-memory store of queue tickets. Owns the shared number
//! counter and the id -> ticket map.

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::connection::ConnectionId;

use super::config::{RegistryConfig, TransitionPolicy};
use super::error::RegistryError;
use super::ticket::{Ticket, TicketId, TicketStatus, TicketType};

/// Counter and map live behind one lock so numbering and insertion are atomic
#[derive(Debug, Default)]
struct Inner {
    tickets: HashMap<TicketId, Ticket>,
    counter: u64,
}

impl Inner {
    fn ordered(&self) -> Vec<Ticket> {
        let mut tickets: Vec<Ticket> = self.tickets.values().cloned().collect();
        tickets.sort_by_key(|t| t.number);
        tickets
    }
}

/// Per-status counts for dashboards
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSummary {
    pub waiting: usize,
    pub called: usize,
    pub serving: usize,
    pub done: usize,
}

/// Full queue view served over REST
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueState {
    pub tickets: Vec<Ticket>,
    /// Highest number currently called or being served
    pub current_number: Option<u64>,
    pub next_number: u64,
}

/// Central registry for all queue tickets
///
/// Thread-safe via `RwLock`. Every mutation holds the write lock for its
/// whole read-modify-write, so concurrent callers never lose updates to
/// the counter or the map.
pub struct TicketRegistry {
    inner: RwLock<Inner>,
    config: RegistryConfig,
}

impl TicketRegistry {
    /// Create a new registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Create a ticket with the next number, in `waiting`
    pub async fn create_ticket(
        &self,
        ticket_type: TicketType,
        customer_name: Option<String>,
    ) -> Ticket {
        let mut inner = self.inner.write().await;

        inner.counter += 1;
        let ticket = Ticket::new(inner.counter, ticket_type, customer_name);
        inner.tickets.insert(ticket.id.clone(), ticket.clone());

        tracing::info!(
            ticket = %ticket.id,
            number = ticket.number,
            ticket_type = ?ticket.ticket_type,
            "Ticket created"
        );

        ticket
    }

    /// All tickets, ascending by number
    pub async fn get_all(&self) -> Vec<Ticket> {
        self.inner.read().await.ordered()
    }

    /// Tickets still holding a place in line (waiting or called), in order
    pub async fn waiting(&self) -> Vec<Ticket> {
        let inner = self.inner.read().await;
        inner
            .ordered()
            .into_iter()
            .filter(|t| t.status.is_pending())
            .collect()
    }

    pub async fn get_by_id(&self, id: &TicketId) -> Option<Ticket> {
        self.inner.read().await.tickets.get(id).cloned()
    }

    /// Overwrite a ticket's status
    ///
    /// Under [`TransitionPolicy::Permissive`] any status is accepted. Under
    /// [`TransitionPolicy::Strict`] this behaves like [`Self::transition`].
    pub async fn update_status(
        &self,
        id: &TicketId,
        status: TicketStatus,
    ) -> Result<Ticket, RegistryError> {
        match self.config.transition_policy {
            TransitionPolicy::Permissive => self.apply(id, status, false).await,
            TransitionPolicy::Strict => self.apply(id, status, true).await,
        }
    }

    /// Change a ticket's status only if the queue graph allows it
    ///
    /// The check and the write happen under the same lock.
    pub async fn transition(
        &self,
        id: &TicketId,
        status: TicketStatus,
    ) -> Result<Ticket, RegistryError> {
        self.apply(id, status, true).await
    }

    async fn apply(
        &self,
        id: &TicketId,
        status: TicketStatus,
        validate: bool,
    ) -> Result<Ticket, RegistryError> {
        let mut inner = self.inner.write().await;

        let ticket = inner
            .tickets
            .get_mut(id)
            .ok_or_else(|| RegistryError::TicketNotFound(id.clone()))?;

        let from = ticket.status;
        if validate && !from.can_transition_to(status) {
            return Err(RegistryError::IllegalTransition {
                id: id.clone(),
                from,
                to: status,
            });
        }

        ticket.status = status;

        tracing::info!(ticket = %id, from = %from, to = %status, "Ticket status changed");

        Ok(ticket.clone())
    }

    /// Associate a live connection with a ticket
    ///
    /// Idempotent. Returns `false` if the ticket does not exist.
    pub async fn update_connection_id(&self, id: &TicketId, connection_id: ConnectionId) -> bool {
        let mut inner = self.inner.write().await;

        match inner.tickets.get_mut(id) {
            Some(ticket) => {
                tracing::debug!(ticket = %id, connection_id = %connection_id, "Ticket bound to connection");
                ticket.connection_id = Some(connection_id);
                true
            }
            None => false,
        }
    }

    /// Number the next created ticket will receive
    pub async fn next_number(&self) -> u64 {
        self.inner.read().await.counter + 1
    }

    /// Per-status counts
    pub async fn summary(&self) -> QueueSummary {
        let inner = self.inner.read().await;
        let mut summary = QueueSummary::default();

        for ticket in inner.tickets.values() {
            match ticket.status {
                TicketStatus::Waiting => summary.waiting += 1,
                TicketStatus::Called => summary.called += 1,
                TicketStatus::Serving => summary.serving += 1,
                TicketStatus::Done => summary.done += 1,
            }
        }

        summary
    }

    /// Ordered tickets plus current and next numbers, from one snapshot
    pub async fn state(&self) -> QueueState {
        let inner = self.inner.read().await;

        let current_number = inner
            .tickets
            .values()
            .filter(|t| matches!(t.status, TicketStatus::Called | TicketStatus::Serving))
            .map(|t| t.number)
            .max();

        QueueState {
            tickets: inner.ordered(),
            current_number,
            next_number: inner.counter + 1,
        }
    }

    /// Get total number of tickets
    pub async fn ticket_count(&self) -> usize {
        self.inner.read().await.tickets.len()
    }

    /// Drop every ticket and restart numbering at 1
    pub async fn reset(&self) {
        let mut inner = self.inner.write().await;
        inner.tickets.clear();
        inner.counter = 0;

        tracing::info!("Ticket registry reset");
    }
}

impl Default for TicketRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn test_numbers_strictly_increase() {
        let registry = TicketRegistry::new();

        let mut last = 0;
        for _ in 0..20 {
            let ticket = registry.create_ticket(TicketType::Online, None).await;
            assert!(ticket.number > last);
            assert_eq!(ticket.status, TicketStatus::Waiting);
            last = ticket.number;
        }
        assert_eq!(registry.next_number().await, 21);
    }

    #[tokio::test]
    async fn test_concurrent_creates_get_unique_numbers() {
        let registry = Arc::new(TicketRegistry::new());

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move {
                    registry.create_ticket(TicketType::InStore, None).await.number
                })
            })
            .collect();

        let mut numbers = Vec::new();
        for handle in handles {
            numbers.push(handle.await.unwrap());
        }
        numbers.sort_unstable();
        numbers.dedup();

        assert_eq!(numbers.len(), 50);
        assert_eq!(numbers.first(), Some(&1));
        assert_eq!(numbers.last(), Some(&50));
    }

    #[tokio::test]
    async fn test_get_all_sorted_after_mutations() {
        let registry = TicketRegistry::new();
        let t1 = registry.create_ticket(TicketType::Online, None).await;
        let t2 = registry.create_ticket(TicketType::Online, None).await;
        let t3 = registry.create_ticket(TicketType::InStore, None).await;

        registry.update_status(&t3.id, TicketStatus::Done).await.unwrap();
        registry.update_status(&t1.id, TicketStatus::Serving).await.unwrap();
        registry
            .update_connection_id(&t2.id, ConnectionId::from("conn-a"))
            .await;

        let numbers: Vec<u64> = registry.get_all().await.iter().map(|t| t.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_update_status() {
        let registry = TicketRegistry::new();
        let ticket = registry.create_ticket(TicketType::Online, Some("Bo".into())).await;

        let updated = registry
            .update_status(&ticket.id, TicketStatus::Called)
            .await
            .unwrap();
        assert_eq!(updated.status, TicketStatus::Called);

        let fetched = registry.get_by_id(&ticket.id).await.unwrap();
        assert_eq!(fetched.status, TicketStatus::Called);
        assert_eq!(fetched.customer_name.as_deref(), Some("Bo"));
    }

    #[tokio::test]
    async fn test_update_status_unknown_id_leaves_registry_unchanged() {
        let registry = TicketRegistry::new();
        registry.create_ticket(TicketType::Online, None).await;
        let before = registry.get_all().await;

        let missing = TicketId::from("ticket-missing");
        let result = registry.update_status(&missing, TicketStatus::Done).await;

        assert_eq!(result, Err(RegistryError::TicketNotFound(missing)));
        assert_eq!(registry.get_all().await, before);
    }

    #[tokio::test]
    async fn test_permissive_allows_backward_move() {
        let registry = TicketRegistry::new();
        let ticket = registry.create_ticket(TicketType::Online, None).await;

        registry.update_status(&ticket.id, TicketStatus::Done).await.unwrap();
        let reopened = registry
            .update_status(&ticket.id, TicketStatus::Waiting)
            .await
            .unwrap();

        assert_eq!(reopened.status, TicketStatus::Waiting);
    }

    #[tokio::test]
    async fn test_strict_rejects_backward_move() {
        let registry = TicketRegistry::with_config(RegistryConfig::default().strict());
        let ticket = registry.create_ticket(TicketType::Online, None).await;

        registry.update_status(&ticket.id, TicketStatus::Done).await.unwrap();
        let result = registry.update_status(&ticket.id, TicketStatus::Waiting).await;

        assert!(matches!(
            result,
            Err(RegistryError::IllegalTransition {
                from: TicketStatus::Done,
                to: TicketStatus::Waiting,
                ..
            })
        ));
        let fetched = registry.get_by_id(&ticket.id).await.unwrap();
        assert_eq!(fetched.status, TicketStatus::Done);
    }

    #[tokio::test]
    async fn test_transition_validates_regardless_of_policy() {
        let registry = TicketRegistry::new();
        let ticket = registry.create_ticket(TicketType::Online, None).await;

        registry
            .transition(&ticket.id, TicketStatus::Serving)
            .await
            .unwrap();
        let result = registry.transition(&ticket.id, TicketStatus::Called).await;

        assert!(matches!(result, Err(RegistryError::IllegalTransition { .. })));
    }

    #[tokio::test]
    async fn test_update_connection_id() {
        let registry = TicketRegistry::new();
        let ticket = registry.create_ticket(TicketType::Online, None).await;
        let conn = ConnectionId::from("conn-1");

        assert!(registry.update_connection_id(&ticket.id, conn.clone()).await);
        assert!(registry.update_connection_id(&ticket.id, conn.clone()).await);
        assert_eq!(
            registry.get_by_id(&ticket.id).await.unwrap().connection_id,
            Some(conn.clone())
        );

        let missing = TicketId::from("nope");
        assert!(!registry.update_connection_id(&missing, conn).await);
        assert_eq!(registry.ticket_count().await, 1);
    }

    #[tokio::test]
    async fn test_waiting_summary_and_state() {
        let registry = TicketRegistry::new();
        let t1 = registry.create_ticket(TicketType::Online, None).await;
        let t2 = registry.create_ticket(TicketType::Online, None).await;
        let t3 = registry.create_ticket(TicketType::Online, None).await;
        let _t4 = registry.create_ticket(TicketType::Online, None).await;

        registry.update_status(&t1.id, TicketStatus::Done).await.unwrap();
        registry.update_status(&t2.id, TicketStatus::Serving).await.unwrap();
        registry.update_status(&t3.id, TicketStatus::Called).await.unwrap();

        let waiting: Vec<u64> = registry.waiting().await.iter().map(|t| t.number).collect();
        assert_eq!(waiting, vec![3, 4]);

        let summary = registry.summary().await;
        assert_eq!(
            summary,
            QueueSummary {
                waiting: 1,
                called: 1,
                serving: 1,
                done: 1,
            }
        );

        let state = registry.state().await;
        assert_eq!(state.current_number, Some(3));
        assert_eq!(state.next_number, 5);
        assert_eq!(state.tickets.len(), 4);
    }

    #[tokio::test]
    async fn test_reset_restarts_numbering() {
        let registry = TicketRegistry::new();
        registry.create_ticket(TicketType::Online, None).await;
        registry.create_ticket(TicketType::Online, None).await;

        registry.reset().await;
        assert_eq!(registry.ticket_count().await, 0);

        let ticket = registry.create_ticket(TicketType::Online, None).await;
        assert_eq!(ticket.number, 1);
    }
}
