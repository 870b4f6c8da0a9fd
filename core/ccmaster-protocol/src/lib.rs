//! Wire types shared between `ccmasterd` (the supervisor daemon) and its
//! clients: the JSON-RPC 2.0 envelope used by the RPC tool dispatcher, and
//! the on-disk `StatusRecord` schema hook scripts write and the Hook Ingest
//! component reads.
//!
//! Keeping both in one crate prevents schema drift between the daemon and
//! anything that talks to it (the bridge, test harnesses, future clients).
//! The daemon remains the authority on validation; this crate only defines
//! the shapes and the cheap structural checks that don't need daemon state.

pub mod rpc;
pub mod status;

pub use rpc::{
    ErrorCode, JsonRpcError, JsonRpcId, Request, Response, ToolCallParams, JSONRPC_VERSION,
};
pub use status::{SessionCurrentState, StatusRecord};
