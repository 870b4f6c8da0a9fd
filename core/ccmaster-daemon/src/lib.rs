//! `ccmaster-daemon`: the supervisor daemon built on top of `ccmaster-core`'s
//! stores (spec §2). Owns the RPC Tool Dispatcher (H), Hook Ingest poller
//! (E), Auto-Continue Scheduler (F), and Session Lifecycle Manager (G), and
//! wires them to a concrete headless `Launcher`/`Injector` pair for
//! local/test use (`process_launcher`).

pub mod dispatch;
pub mod error;
pub mod hook_config;
pub mod hook_ingest;
pub mod lifecycle;
pub mod logs;
pub mod process_launcher;
pub mod resources;
pub mod rpc;
pub mod scheduler;
pub mod state;
