pub mod config;
pub mod domain;
pub mod errors;
pub mod negotiation;
pub mod pricing;
pub mod session;

pub use domain::customer::{Address, Customer, CustomerId, OrderSummary, VipTier};
pub use domain::order::{
    LineItem, Order, OrderId, OrderStatus, PaymentMethod, PaymentStatus, StatusEntry,
};
pub use domain::product::{Product, ProductId, ProductSnapshot, ProductStatus};
pub use errors::{ApplicationError, DomainError};
pub use negotiation::{
    parse_address, parse_confirmation_reply, ConfirmationReply, Negotiation, NegotiationStage,
};
pub use pricing::{DeliveryZone, FeeSchedule, PricingBreakdown, ZoneQuote};
pub use session::{Action, Session, SessionStore, Turn, TurnRole};
