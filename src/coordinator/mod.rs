//! Queue coordinator
//!
//! Turns client queue actions into ticket registry mutations and pushes the
//! resulting full ticket list to every connection.
//!
//! Each mutation and its broadcast run under one ordering lock, so clients
//! observe status changes in the order they were applied.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::connection::{ConnectionId, ConnectionRegistry, Delivery, OutboundFrame};
use crate::protocol::{PaymentComplete, PaymentNotice, ServerEvent, TicketNotice};
use crate::registry::{
    QueueState, RegistryError, Ticket, TicketId, TicketRegistry, TicketStatus, TicketType,
};

/// Owner of queue state for one server process
pub struct QueueCoordinator {
    tickets: TicketRegistry,
    connections: Arc<ConnectionRegistry>,
    ordering: Mutex<()>,
}

impl QueueCoordinator {
    pub fn new(tickets: TicketRegistry, connections: Arc<ConnectionRegistry>) -> Self {
        Self {
            tickets,
            connections,
            ordering: Mutex::new(()),
        }
    }

    pub fn tickets(&self) -> &TicketRegistry {
        &self.tickets
    }

    pub fn connections(&self) -> &Arc<ConnectionRegistry> {
        &self.connections
    }

    /// Customer draws a ticket
    pub async fn create_ticket(
        &self,
        ticket_type: TicketType,
        customer_name: Option<String>,
    ) -> Ticket {
        let _order = self.ordering.lock().await;
        let ticket = self.tickets.create_ticket(ticket_type, customer_name).await;
        self.broadcast_queue().await;
        ticket
    }

    /// Bind a connection to a ticket so it receives targeted notices
    ///
    /// Returns `false` for an unknown ticket; nothing is broadcast then.
    pub async fn join(&self, ticket_id: &TicketId, connection_id: &ConnectionId) -> bool {
        let _order = self.ordering.lock().await;

        let bound = self
            .tickets
            .update_connection_id(ticket_id, connection_id.clone())
            .await;
        if bound {
            self.broadcast_queue().await;
        }
        bound
    }

    /// Send the current ticket list to one connection
    pub async fn send_queue_to(&self, connection_id: &ConnectionId) -> Delivery {
        let event = ServerEvent::QueueUpdate(self.tickets.get_all().await);
        match OutboundFrame::encode(&event) {
            Ok(frame) => self.connections.send_to(connection_id, frame).await,
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode queue update");
                Delivery::Dropped
            }
        }
    }

    /// Seller announces a ticket: `waiting -> called`
    ///
    /// The ticket's customer connection, if any, also receives `queue.called`.
    pub async fn call_ticket(&self, ticket_id: &TicketId) -> Result<Ticket, RegistryError> {
        self.advance(ticket_id, TicketStatus::Called).await
    }

    /// Seller starts a video call: `waiting | called -> serving`
    pub async fn start_serving(&self, ticket_id: &TicketId) -> Result<Ticket, RegistryError> {
        self.advance(ticket_id, TicketStatus::Serving).await
    }

    /// Engagement finished: `* -> done`
    pub async fn complete(&self, ticket_id: &TicketId) -> Result<Ticket, RegistryError> {
        self.advance(ticket_id, TicketStatus::Done).await
    }

    /// Generic status change, used by the REST surface
    ///
    /// Enforces the same transition graph as the named actions.
    pub async fn set_status(
        &self,
        ticket_id: &TicketId,
        status: TicketStatus,
    ) -> Result<Ticket, RegistryError> {
        self.advance(ticket_id, status).await
    }

    async fn advance(
        &self,
        ticket_id: &TicketId,
        status: TicketStatus,
    ) -> Result<Ticket, RegistryError> {
        let _order = self.ordering.lock().await;

        let ticket = self.tickets.transition(ticket_id, status).await?;
        self.broadcast_queue().await;

        if status == TicketStatus::Called {
            self.notify_called(&ticket).await;
        }

        Ok(ticket)
    }

    async fn notify_called(&self, ticket: &Ticket) {
        let Some(connection_id) = &ticket.connection_id else {
            tracing::debug!(ticket = %ticket.id, "Called ticket has no connection");
            return;
        };

        let event = ServerEvent::QueueCalled(TicketNotice {
            ticket: ticket.clone(),
        });
        if let Ok(frame) = OutboundFrame::encode(&event) {
            let delivery = self.connections.send_to(connection_id, frame).await;
            tracing::debug!(
                ticket = %ticket.id,
                connection_id = %connection_id,
                delivery = ?delivery,
                "Customer notified"
            );
        }
    }

    /// Broadcast a payment notice for an existing ticket
    ///
    /// The ticket itself is not changed.
    pub async fn payment_received(&self, payment: PaymentComplete) -> Result<Ticket, RegistryError> {
        let ticket = self
            .tickets
            .get_by_id(&payment.ticket_id)
            .await
            .ok_or_else(|| RegistryError::TicketNotFound(payment.ticket_id.clone()))?;

        let event = ServerEvent::PaymentReceived(PaymentNotice {
            ticket: ticket.clone(),
            method: payment.method,
            address: payment.address,
        });
        if let Ok(frame) = OutboundFrame::encode(&event) {
            let reached = self.connections.broadcast(frame).await;
            tracing::info!(ticket = %ticket.id, method = ?payment.method, reached, "Payment received");
        }

        Ok(ticket)
    }

    /// Current list plus current and next numbers
    pub async fn state(&self) -> QueueState {
        self.tickets.state().await
    }

    async fn broadcast_queue(&self) {
        let tickets = self.tickets.get_all().await;
        let count = tickets.len();

        match OutboundFrame::encode(&ServerEvent::QueueUpdate(tickets)) {
            Ok(frame) => {
                let reached = self.connections.broadcast(frame).await;
                tracing::debug!(tickets = count, reached, "Queue update broadcast");
            }
            Err(e) => tracing::error!(error = %e, "Failed to encode queue update"),
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::protocol::PaymentMethod;

    fn setup() -> QueueCoordinator {
        QueueCoordinator::new(TicketRegistry::new(), Arc::new(ConnectionRegistry::new()))
    }

    fn drain(rx: &mut mpsc::Receiver<OutboundFrame>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            events.push(frame.decode().unwrap());
        }
        events
    }

    fn statuses(event: &ServerEvent) -> Vec<(u64, TicketStatus)> {
        match event {
            ServerEvent::QueueUpdate(tickets) => {
                tickets.iter().map(|t| (t.number, t.status)).collect()
            }
            other => panic!("expected queue.update, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_queue_scenario() {
        let coordinator = setup();
        let (_observer, mut rx) = coordinator.connections().open(64).await;

        let t1 = coordinator.create_ticket(TicketType::Online, None).await;
        let t2 = coordinator.create_ticket(TicketType::Online, None).await;
        assert_eq!((t1.number, t2.number), (1, 2));
        drain(&mut rx);

        let called = assert_ok!(coordinator.call_ticket(&t1.id).await);
        assert_eq!(called.status, TicketStatus::Called);
        let events = drain(&mut rx);
        assert_eq!(
            statuses(&events[0]),
            vec![(1, TicketStatus::Called), (2, TicketStatus::Waiting)]
        );

        let serving = assert_ok!(coordinator.start_serving(&t1.id).await);
        assert_eq!(serving.status, TicketStatus::Serving);

        let done = assert_ok!(coordinator.complete(&t1.id).await);
        assert_eq!(done.status, TicketStatus::Done);

        let t2_now = coordinator.tickets().get_by_id(&t2.id).await.unwrap();
        assert_eq!(t2_now.status, TicketStatus::Waiting);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        assert_eq!(
            statuses(&events[1]),
            vec![(1, TicketStatus::Done), (2, TicketStatus::Waiting)]
        );
    }

    #[tokio::test]
    async fn test_call_notifies_bound_customer() {
        let coordinator = setup();
        let (customer, mut customer_rx) = coordinator.connections().open(64).await;

        let ticket = coordinator.create_ticket(TicketType::Online, Some("Mia".into())).await;
        assert!(coordinator.join(&ticket.id, &customer).await);
        drain(&mut customer_rx);

        coordinator.call_ticket(&ticket.id).await.unwrap();

        let events = drain(&mut customer_rx);
        assert!(matches!(events[0], ServerEvent::QueueUpdate(_)));
        match &events[1] {
            ServerEvent::QueueCalled(notice) => {
                assert_eq!(notice.ticket.id, ticket.id);
                assert_eq!(notice.ticket.status, TicketStatus::Called);
            }
            other => panic!("expected queue.called, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_call_with_stale_connection_is_not_an_error() {
        let coordinator = setup();
        let (customer, _rx) = coordinator.connections().open(8).await;

        let ticket = coordinator.create_ticket(TicketType::Online, None).await;
        coordinator.join(&ticket.id, &customer).await;
        coordinator.connections().unregister(&customer).await;

        let called = coordinator.call_ticket(&ticket.id).await.unwrap();
        assert_eq!(called.connection_id, Some(customer));
    }

    #[tokio::test]
    async fn test_illegal_transition_is_refused_without_broadcast() {
        let coordinator = setup();
        let ticket = coordinator.create_ticket(TicketType::Online, None).await;
        coordinator.complete(&ticket.id).await.unwrap();

        let (_observer, mut rx) = coordinator.connections().open(8).await;
        let error = assert_err!(coordinator.call_ticket(&ticket.id).await);

        assert!(matches!(error, RegistryError::IllegalTransition { .. }));
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_unknown_ticket() {
        let coordinator = setup();
        let missing = TicketId::from("missing");

        assert!(matches!(
            coordinator.complete(&missing).await,
            Err(RegistryError::TicketNotFound(_))
        ));
        assert!(!coordinator.join(&missing, &ConnectionId::from("c")).await);
    }

    #[tokio::test]
    async fn test_request_queue_reaches_only_requester() {
        let coordinator = setup();
        coordinator.create_ticket(TicketType::InStore, None).await;
        let (a, mut a_rx) = coordinator.connections().open(8).await;
        let (_b, mut b_rx) = coordinator.connections().open(8).await;

        assert_eq!(coordinator.send_queue_to(&a).await, Delivery::Delivered);

        assert_eq!(drain(&mut a_rx).len(), 1);
        assert!(drain(&mut b_rx).is_empty());
    }

    #[tokio::test]
    async fn test_payment_broadcast_leaves_ticket_untouched() {
        let coordinator = setup();
        let ticket = coordinator.create_ticket(TicketType::Online, None).await;
        coordinator.start_serving(&ticket.id).await.unwrap();
        let (_seller, mut seller_rx) = coordinator.connections().open(8).await;

        coordinator
            .payment_received(PaymentComplete {
                ticket_id: ticket.id.clone(),
                method: PaymentMethod::Delivery,
                address: Some("Main St 1".into()),
            })
            .await
            .unwrap();

        match &drain(&mut seller_rx)[0] {
            ServerEvent::PaymentReceived(notice) => {
                assert_eq!(notice.method, PaymentMethod::Delivery);
                assert_eq!(notice.address.as_deref(), Some("Main St 1"));
            }
            other => panic!("expected payment.received, got {other:?}"),
        }
        let after = coordinator.tickets().get_by_id(&ticket.id).await.unwrap();
        assert_eq!(after.status, TicketStatus::Serving);
    }

    #[tokio::test]
    async fn test_broadcasts_follow_mutation_order() {
        let coordinator = Arc::new(setup());
        let ticket = coordinator.create_ticket(TicketType::Online, None).await;
        let (_observer, mut rx) = coordinator.connections().open(64).await;

        coordinator.call_ticket(&ticket.id).await.unwrap();
        coordinator.start_serving(&ticket.id).await.unwrap();
        coordinator.complete(&ticket.id).await.unwrap();

        let seen: Vec<TicketStatus> = drain(&mut rx)
            .iter()
            .map(|e| statuses(e)[0].1)
            .collect();
        assert_eq!(
            seen,
            vec![TicketStatus::Called, TicketStatus::Serving, TicketStatus::Done]
        );
    }
}
