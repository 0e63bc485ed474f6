//! HTTP-bridge transport: SSE subscription plus request/response RPC.

pub mod gateway;
pub mod provider;

pub use gateway::{BridgeGateway, BridgeIncomingMessage, GatewayEvent};
pub use provider::BridgeProvider;
