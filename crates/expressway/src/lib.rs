//! Guest-join negotiation against Expressway-class conferencing gateways.
//!
//! Two flows are supported. [`LegacyFlow`] walks the `/api/v1` guest API up
//! to a stream subscription and reads the WebRTC media configuration pushed
//! over its WebSocket. [`JoinFlow`] uses the newer `/api` lookup and join
//! calls, which return the TURN servers directly.

pub mod error;
pub mod join;
pub mod legacy;
pub mod output;
pub mod session;
pub mod types;
pub mod updates;

pub use {
    error::{EXIT_CONFIG, EXIT_REJECTED, EXIT_TRANSPORT, FlowError, FlowResult},
    join::JoinFlow,
    legacy::LegacyFlow,
    session::{GatewayResponse, GatewaySession},
    types::{GuestCredentials, ResponseBody},
    updates::{StreamSubscription, UpdatesOptions},
};
