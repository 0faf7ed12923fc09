use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use kiosk_agent::oracle::IntentClassifier;
use kiosk_agent::prompt::TurnContext;
use kiosk_core::config::{BusinessConfig, ChatConfig};
use kiosk_core::domain::customer::{Customer, CustomerId};
use kiosk_core::errors::ApplicationError;
use kiosk_core::negotiation::{
    parse_address, parse_confirmation_reply, ConfirmationReply, Negotiation, NegotiationStage,
};
use kiosk_core::pricing::FeeSchedule;
use kiosk_core::session::{Action, Session, SessionStore, TurnRole};
use kiosk_db::repositories::{CustomerRepository, OrderRepository, ProductRepository};

use crate::admin::AdminRouter;
use crate::commit::{CommitError, OrderCommitService};
use crate::events::{InboundMessage, TurnOutcome};
use crate::messages;
use crate::notify::Notifier;

/// Per-customer turn serialization. Turns for the same customer run one at
/// a time; turns for different customers proceed in parallel.
#[derive(Default)]
pub struct CustomerLocks {
    locks: Mutex<HashMap<CustomerId, Arc<Mutex<()>>>>,
}

impl CustomerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, customer_id: &CustomerId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(customer_id.clone()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
        };
        lock.lock_owned().await
    }
}

pub struct Orchestrator {
    customers: Arc<dyn CustomerRepository>,
    products: Arc<dyn ProductRepository>,
    orders: Arc<dyn OrderRepository>,
    sessions: Arc<dyn SessionStore>,
    classifier: Arc<dyn IntentClassifier>,
    notifier: Notifier,
    commit: OrderCommitService,
    admin: AdminRouter,
    schedule: FeeSchedule,
    chat: ChatConfig,
    business: BusinessConfig,
    locks: Arc<CustomerLocks>,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        customers: Arc<dyn CustomerRepository>,
        products: Arc<dyn ProductRepository>,
        orders: Arc<dyn OrderRepository>,
        sessions: Arc<dyn SessionStore>,
        classifier: Arc<dyn IntentClassifier>,
        notifier: Notifier,
        chat: ChatConfig,
        business: BusinessConfig,
    ) -> Self {
        let commit =
            OrderCommitService::new(customers.clone(), products.clone(), orders.clone());
        let admin = AdminRouter::new(orders.clone(), products.clone(), business.clone());
        Self {
            customers,
            products,
            orders,
            sessions,
            classifier,
            notifier,
            commit,
            admin,
            schedule: FeeSchedule::default(),
            chat,
            business,
            locks: Arc::new(CustomerLocks::new()),
        }
    }

    /// The per-customer turn locks, shared with the negotiation sweeper so
    /// expiry never races a turn in flight.
    pub fn turn_locks(&self) -> Arc<CustomerLocks> {
        self.locks.clone()
    }

    fn negotiation_timeout(&self) -> Duration {
        Duration::seconds(self.chat.negotiation_timeout_secs.min(i64::MAX as u64) as i64)
    }

    /// Entry point for one inbound message. Replies go out through the
    /// notifier; the returned outcome reports how the turn was resolved.
    pub async fn handle_message(
        &self,
        inbound: InboundMessage,
    ) -> Result<TurnOutcome, ApplicationError> {
        let text = inbound.text.trim().to_string();
        if text.is_empty() {
            return Ok(TurnOutcome::Ignored);
        }

        // Admin commands bypass the customer pipeline entirely.
        if self.admin.is_admin_command(
            self.chat.admin_id.as_deref(),
            &self.chat.command_prefix,
            &inbound.sender_id,
            &text,
        ) {
            let reply = self.admin.handle(&text).await;
            self.notifier.send(&inbound.sender_id, &reply).await;
            return Ok(TurnOutcome::Admin);
        }

        let customer_id = CustomerId(inbound.sender_id.clone());
        let _turn_guard = self.locks.acquire(&customer_id).await;
        let now = inbound.timestamp;

        tracing::info!(
            event_name = "turn_received",
            customer_id = %customer_id.0,
            "handling customer turn",
        );

        let mut customer = match self.customers.find_or_create(&customer_id, now).await {
            Ok(customer) => customer,
            Err(err) => {
                let failure = ApplicationError::Persistence(err.to_string());
                self.notifier.send(&customer_id.0, failure.customer_reply()).await;
                return Err(failure);
            }
        };

        let mut session = self
            .sessions
            .load(&customer_id)
            .await
            .unwrap_or_else(|| Session::new(customer_id.clone(), now));
        session.push_turn(TurnRole::Customer, text.clone(), now);

        // An expired negotiation the sweeper has not reaped yet is dropped
        // here so the customer is not held to a stale summary.
        if session.negotiation_expired(now, self.negotiation_timeout()) {
            session.negotiation = None;
            self.notifier.send(&customer_id.0, &messages::negotiation_expired()).await;
        }

        // Negotiation replies are deterministic and never consult the oracle.
        if let Some(negotiation) = session.negotiation.clone() {
            let outcome = match negotiation.stage {
                NegotiationStage::CollectingAddress => {
                    Some(self.advance_address(&mut customer, &mut session, negotiation, &text, now).await)
                }
                NegotiationStage::AwaitingConfirmation => {
                    self.advance_confirmation(&mut customer, &mut session, negotiation, &text, now)
                        .await
                }
            };
            if let Some(reply) = outcome {
                session.push_turn(TurnRole::Assistant, reply, now);
                self.sessions.store(session).await;
                return Ok(TurnOutcome::Replied { action: None });
            }
        }

        // Everything else goes through intent classification.
        let catalog = self.products.list_active(self.chat.catalog_limit).await.unwrap_or_default();
        let open_orders = self.orders.list_open_for_customer(&customer_id).await.unwrap_or_default();
        let classification = self
            .classifier
            .classify(&TurnContext {
                message: &text,
                customer: &customer,
                products: &catalog,
                open_orders: &open_orders,
                turns: &session.turns,
                business: &self.business,
            })
            .await;

        tracing::info!(
            event_name = "turn_classified",
            customer_id = %customer_id.0,
            action = classification.action.as_str(),
            requires_human = classification.requires_human,
            "oracle classified turn",
        );

        let reply = match classification.action {
            Action::BrowseProducts => {
                self.notifier.send(&customer_id.0, &classification.message).await;
                self.send_product_cards(&customer_id, &classification.suggested_products).await;
                classification.message.clone()
            }
            Action::PlaceOrder => {
                self.begin_order(&mut customer, &mut session, &classification, now).await
            }
            Action::TrackOrder => {
                self.notifier.send(&customer_id.0, &classification.message).await;
                self.send_order_statuses(&customer_id).await;
                classification.message.clone()
            }
            Action::Escalate => {
                let reply = messages::escalation_reply(&self.business);
                self.notifier.send(&customer_id.0, &reply).await;
                self.notify_operator(&messages::operator_escalation(&customer, &text)).await;
                reply
            }
            Action::GeneralInquiry => {
                self.notifier.send(&customer_id.0, &classification.message).await;
                classification.message.clone()
            }
        };

        session.last_action = Some(classification.action);
        session.push_turn(TurnRole::Assistant, reply, now);
        self.sessions.store(session).await;

        customer.last_interaction = now;
        if let Err(err) = self.customers.save(customer).await {
            tracing::warn!(
                event_name = "customer_save_failed",
                customer_id = %customer_id.0,
                error = %err,
                "customer interaction update failed",
            );
        }

        Ok(TurnOutcome::Replied { action: Some(classification.action) })
    }

    /// CollectingAddress stage: cancel, or a parsable address, or re-prompt.
    async fn advance_address(
        &self,
        customer: &mut Customer,
        session: &mut Session,
        mut negotiation: Negotiation,
        text: &str,
        now: DateTime<Utc>,
    ) -> String {
        if let Some(ConfirmationReply::Cancel) = parse_confirmation_reply(text) {
            session.negotiation = None;
            let reply = messages::cancelled_ack();
            self.notifier.send(&customer.id.0, &reply).await;
            return reply;
        }

        let Some(address) = parse_address(text, &self.schedule) else {
            let reply = messages::address_retry();
            self.notifier.send(&customer.id.0, &reply).await;
            return reply;
        };

        customer.add_address(address.clone());
        if let Err(err) = self.customers.save(customer.clone()).await {
            tracing::warn!(
                event_name = "customer_save_failed",
                customer_id = %customer.id.0,
                error = %err,
                "address save failed, negotiation continues",
            );
        }

        negotiation.provide_address(address, &self.schedule, now);
        let reply = messages::order_summary(&negotiation, &self.business);
        session.negotiation = Some(negotiation);
        self.notifier.send(&customer.id.0, &reply).await;
        reply
    }

    /// AwaitingConfirmation stage. Returns `None` when the text is neither a
    /// confirmation nor a cancel, so the turn falls through to the oracle
    /// (questions mid-negotiation are allowed and keep the summary live).
    async fn advance_confirmation(
        &self,
        customer: &mut Customer,
        session: &mut Session,
        mut negotiation: Negotiation,
        text: &str,
        now: DateTime<Utc>,
    ) -> Option<String> {
        let reply = match parse_confirmation_reply(text)? {
            ConfirmationReply::Cancel => {
                session.negotiation = None;
                let reply = messages::cancelled_ack();
                self.notifier.send(&customer.id.0, &reply).await;
                reply
            }
            ConfirmationReply::Confirm(payment_method) => {
                match self.commit.commit(customer, &negotiation, payment_method, now).await {
                    Ok(order) => {
                        session.negotiation = None;
                        let reply = messages::order_confirmed(&order, &self.business);
                        self.notifier.send(&customer.id.0, &reply).await;
                        self.notify_operator(&messages::operator_new_order(&order, &self.business))
                            .await;
                        reply
                    }
                    Err(CommitError::InsufficientStock { available: 0 }) => {
                        session.negotiation = None;
                        let reply = messages::stock_gone(&negotiation.product.name);
                        self.notifier.send(&customer.id.0, &reply).await;
                        reply
                    }
                    Err(CommitError::InsufficientStock { available }) => {
                        // Revise downward and re-summarize; the customer
                        // decides again against the new numbers.
                        negotiation.revise_quantity(available, &self.schedule, now);
                        let notice =
                            messages::quantity_revised(&negotiation.product.name, available);
                        let summary = messages::order_summary(&negotiation, &self.business);
                        session.negotiation = Some(negotiation);
                        self.notifier.send(&customer.id.0, &notice).await;
                        self.notifier.send(&customer.id.0, &summary).await;
                        summary
                    }
                    Err(CommitError::Repository(err)) => {
                        // Keep the negotiation; the customer can retry.
                        let failure = ApplicationError::Persistence(err.to_string());
                        let reply = failure.customer_reply().to_string();
                        self.notifier.send(&customer.id.0, &reply).await;
                        reply
                    }
                }
            }
        };
        Some(reply)
    }

    /// Opens (or resumes) a negotiation for a classified order intent.
    async fn begin_order(
        &self,
        customer: &mut Customer,
        session: &mut Session,
        classification: &kiosk_agent::oracle::Classification,
        now: DateTime<Utc>,
    ) -> String {
        let Some(product_id) = &classification.target_product else {
            // The oracle saw buying interest but no concrete product; its
            // own message asks the customer to narrow down.
            self.notifier.send(&customer.id.0, &classification.message).await;
            return classification.message.clone();
        };

        // One negotiation at a time. Same product resumes it; a different
        // product is rejected until the open one is finished or cancelled.
        // A negotiation that is still open here is always awaiting
        // confirmation: while the address is being collected every message
        // is consumed by the address handler before classification.
        if let Some(open) = &session.negotiation {
            let reply = if open.is_for_product(&product_id.0) {
                messages::order_summary(open, &self.business)
            } else {
                messages::order_in_progress(&open.product.name)
            };
            self.notifier.send(&customer.id.0, &reply).await;
            return reply;
        }

        let product = match self.products.find_by_id(product_id).await {
            Ok(Some(product)) if product.is_orderable() => product,
            Ok(_) => {
                let reply = messages::product_unavailable();
                self.notifier.send(&customer.id.0, &reply).await;
                return reply;
            }
            Err(err) => {
                let failure = ApplicationError::Persistence(err.to_string());
                let reply = failure.customer_reply().to_string();
                self.notifier.send(&customer.id.0, &reply).await;
                return reply;
            }
        };

        let quantity = classification.quantity.unwrap_or(1).max(1);
        if product.stock < quantity {
            let reply = messages::stock_short(&product.name, product.stock);
            self.notifier.send(&customer.id.0, &reply).await;
            return reply;
        }

        let snapshot = product.snapshot();
        let reply = match customer.usable_address().cloned() {
            Some(address) => {
                let negotiation = Negotiation::awaiting_confirmation(
                    snapshot,
                    quantity,
                    address,
                    &self.schedule,
                    now,
                );
                let reply = messages::order_summary(&negotiation, &self.business);
                session.negotiation = Some(negotiation);
                reply
            }
            None => {
                let negotiation = Negotiation::collecting_address(snapshot.clone(), quantity, now);
                session.negotiation = Some(negotiation);
                messages::address_request(&snapshot, quantity, &self.business)
            }
        };
        self.notifier.send(&customer.id.0, &reply).await;
        reply
    }

    async fn send_product_cards(
        &self,
        customer_id: &CustomerId,
        suggested: &[kiosk_core::domain::product::ProductId],
    ) {
        for product_id in suggested.iter().take(5) {
            match self.products.find_by_id(product_id).await {
                Ok(Some(product)) => {
                    self.notifier
                        .send(&customer_id.0, &messages::product_card(&product, &self.business))
                        .await;
                    if let Err(err) = self.products.record_view(product_id).await {
                        tracing::debug!(
                            event_name = "product_view_update_failed",
                            product_id = %product_id.0,
                            error = %err,
                            "view counter update failed",
                        );
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(
                        event_name = "product_card_failed",
                        product_id = %product_id.0,
                        error = %err,
                        "product lookup for card failed",
                    );
                }
            }
        }
    }

    async fn send_order_statuses(&self, customer_id: &CustomerId) {
        match self.orders.list_recent_for_customer(customer_id, 3).await {
            Ok(orders) => {
                for order in &orders {
                    self.notifier
                        .send(&customer_id.0, &messages::order_status(order, &self.business))
                        .await;
                }
            }
            Err(err) => {
                tracing::warn!(
                    event_name = "order_status_lookup_failed",
                    customer_id = %customer_id.0,
                    error = %err,
                    "recent order lookup failed",
                );
            }
        }
    }

    async fn notify_operator(&self, text: &str) {
        if let Some(admin_id) = &self.chat.admin_id {
            self.notifier.send(admin_id, text).await;
        }
    }
}
