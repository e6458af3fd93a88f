//! Gateway server implementation

mod dispatcher;
mod router;
mod server;

pub use dispatcher::{Credentials, GatewayDispatcher, Outcome, RejectReason};
pub use router::{X_AUTH_TOKEN, X_TENANT_NAME, create_router};
pub use server::Gateway;
