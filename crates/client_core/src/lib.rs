//! Client core for the order management frontend: session state with a
//! two-step login flow, a typed adapter over the order HTTP API, the
//! form-model/backend-payload reconciliation for order line items, and the
//! debounced filter pipeline feeding the order list.
//!
//! Rendering, routing, and the backend itself are external; everything
//! here is UI-framework agnostic and talks to the backend over HTTP only.

pub mod aggregate;
pub mod auth;
pub mod config;
pub mod error;
pub mod filter;
pub mod orders;
pub mod session;
pub mod transport;

pub use aggregate::{LineItemDraft, LineItemEditError, OrderAggregateSync, OrderDraft};
pub use auth::{AuthError, AuthFlow, AuthStage, CredentialsOutcome};
pub use config::Settings;
pub use error::{ApiClientError, ClientValidationError};
pub use filter::{FilterQuery, OrderFilterPipeline, OrderListFeed, OrderListUpdate};
pub use orders::OrderQueryService;
pub use session::{DurableSessionVault, MemorySessionVault, Session, SessionStore, SessionVault};
pub use transport::ApiTransport;
