use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::domain::customer::CustomerId;
use crate::negotiation::Negotiation;

/// Maximum turns retained per session. Older turns roll off so the
/// classification prompt stays bounded.
pub const HISTORY_CAP: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    Customer,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
    pub at: DateTime<Utc>,
}

/// The resolved intent of one customer message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    BrowseProducts,
    PlaceOrder,
    TrackOrder,
    Escalate,
    GeneralInquiry,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BrowseProducts => "browse_products",
            Self::PlaceOrder => "place_order",
            Self::TrackOrder => "track_order",
            Self::Escalate => "escalate",
            Self::GeneralInquiry => "general_inquiry",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "browse_products" => Some(Self::BrowseProducts),
            "place_order" => Some(Self::PlaceOrder),
            "track_order" => Some(Self::TrackOrder),
            "escalate" => Some(Self::Escalate),
            "general_inquiry" => Some(Self::GeneralInquiry),
            _ => None,
        }
    }
}

/// Per-customer conversation state: bounded turn history, the last resolved
/// action, and the in-progress negotiation if one is open.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub customer_id: CustomerId,
    pub turns: Vec<Turn>,
    pub last_action: Option<Action>,
    pub negotiation: Option<Negotiation>,
    pub last_activity: DateTime<Utc>,
}

impl Session {
    pub fn new(customer_id: CustomerId, now: DateTime<Utc>) -> Self {
        Self { customer_id, turns: Vec::new(), last_action: None, negotiation: None, last_activity: now }
    }

    pub fn push_turn(&mut self, role: TurnRole, text: impl Into<String>, now: DateTime<Utc>) {
        self.turns.push(Turn { role, text: text.into(), at: now });
        if self.turns.len() > HISTORY_CAP {
            let excess = self.turns.len() - HISTORY_CAP;
            self.turns.drain(..excess);
        }
        self.last_activity = now;
    }

    pub fn negotiation_expired(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        self.negotiation.as_ref().is_some_and(|n| n.is_expired(now, timeout))
    }
}

/// Session persistence seam. The in-memory implementation backs both tests
/// and single-process deployments; sessions are rebuildable state and do not
/// need to survive a restart.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, customer_id: &CustomerId) -> Option<Session>;

    async fn store(&self, session: Session);

    /// Customers whose negotiation has sat past the timeout. Read-only: the
    /// sweep re-checks each candidate with `expire_negotiation` once it
    /// holds that customer's turn lock, so a turn in flight can refresh the
    /// negotiation in between.
    async fn stale_negotiations(&self, now: DateTime<Utc>, timeout: Duration) -> Vec<CustomerId>;

    /// Drops the customer's negotiation if it is still expired, returning
    /// whether one was dropped.
    async fn expire_negotiation(
        &self,
        customer_id: &CustomerId,
        now: DateTime<Utc>,
        timeout: Duration,
    ) -> bool;
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<CustomerId, Session>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, customer_id: &CustomerId) -> Option<Session> {
        self.sessions.read().await.get(customer_id).cloned()
    }

    async fn store(&self, session: Session) {
        self.sessions.write().await.insert(session.customer_id.clone(), session);
    }

    async fn stale_negotiations(&self, now: DateTime<Utc>, timeout: Duration) -> Vec<CustomerId> {
        self.sessions
            .read()
            .await
            .iter()
            .filter(|(_, session)| session.negotiation_expired(now, timeout))
            .map(|(customer_id, _)| customer_id.clone())
            .collect()
    }

    async fn expire_negotiation(
        &self,
        customer_id: &CustomerId,
        now: DateTime<Utc>,
        timeout: Duration,
    ) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(customer_id) {
            Some(session) if session.negotiation_expired(now, timeout) => {
                session.negotiation = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use crate::domain::customer::CustomerId;
    use crate::domain::product::{ProductId, ProductSnapshot};
    use crate::negotiation::Negotiation;

    use super::{Action, InMemorySessionStore, Session, SessionStore, TurnRole, HISTORY_CAP};

    fn session() -> Session {
        Session::new(CustomerId("2348012345678".to_string()), Utc::now())
    }

    #[test]
    fn turn_history_is_capped() {
        let mut session = session();
        for i in 0..15 {
            session.push_turn(TurnRole::Customer, format!("message {i}"), Utc::now());
        }
        assert_eq!(session.turns.len(), HISTORY_CAP);
        assert_eq!(session.turns[0].text, "message 5");
        assert_eq!(session.turns.last().map(|t| t.text.as_str()), Some("message 14"));
    }

    #[test]
    fn action_labels_round_trip() {
        for action in [
            Action::BrowseProducts,
            Action::PlaceOrder,
            Action::TrackOrder,
            Action::Escalate,
            Action::GeneralInquiry,
        ] {
            assert_eq!(Action::parse(action.as_str()), Some(action));
        }
        assert_eq!(Action::parse("make_coffee"), None);
    }

    #[tokio::test]
    async fn store_round_trips_sessions() {
        let store = InMemorySessionStore::new();
        let mut session = session();
        session.push_turn(TurnRole::Customer, "hello", Utc::now());
        store.store(session.clone()).await;

        let loaded = store.load(&session.customer_id).await.expect("stored session");
        assert_eq!(loaded, session);
        assert!(store.load(&CustomerId("unknown".to_string())).await.is_none());
    }

    #[tokio::test]
    async fn stale_scan_and_expiry_drop_old_negotiations_only() {
        let store = InMemorySessionStore::new();
        let stale_start = Utc::now() - Duration::hours(2);
        let timeout = Duration::minutes(30);

        let snapshot = ProductSnapshot {
            id: ProductId("PRD-001".to_string()),
            name: "Wireless Earbuds".to_string(),
            unit_price: Decimal::new(50_000, 0),
            stock: 5,
            category: "audio".to_string(),
        };

        let mut stale = Session::new(CustomerId("2348000000001".to_string()), stale_start);
        stale.negotiation = Some(Negotiation::collecting_address(snapshot.clone(), 1, stale_start));
        store.store(stale).await;

        let mut fresh = Session::new(CustomerId("2348000000002".to_string()), Utc::now());
        fresh.negotiation = Some(Negotiation::collecting_address(snapshot, 1, Utc::now()));
        store.store(fresh).await;

        let candidates = store.stale_negotiations(Utc::now(), timeout).await;
        assert_eq!(candidates, vec![CustomerId("2348000000001".to_string())]);

        assert!(store.expire_negotiation(&candidates[0], Utc::now(), timeout).await);
        // Already dropped, so the re-check is a no-op.
        assert!(!store.expire_negotiation(&candidates[0], Utc::now(), timeout).await);

        let stale = store.load(&CustomerId("2348000000001".to_string())).await.expect("session kept");
        assert!(stale.negotiation.is_none());
        let fresh = store.load(&CustomerId("2348000000002".to_string())).await.expect("session kept");
        assert!(fresh.negotiation.is_some());
        assert!(
            !store.expire_negotiation(&fresh.customer_id, Utc::now(), timeout).await,
            "a live negotiation must survive the re-check"
        );
    }
}
