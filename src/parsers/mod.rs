//! Decoders for wallet-originated payloads: the `connect` event and typed
//! RPC method responses (`sendTransaction`, ...).

pub mod connect_event;
pub mod rpc_parser;
pub mod send_transaction;

pub use connect_event::ConnectEventParser;
pub use rpc_parser::{is_error, RpcParser};
pub use send_transaction::SendTransactionParser;
