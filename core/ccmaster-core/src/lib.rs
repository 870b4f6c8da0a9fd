//! Shared session/mail/job data model and on-disk stores for the ccmaster
//! supervisor.
//!
//! This crate owns everything spec §2 labels "core": the Session Registry
//! (D), Status Store reader (A), Mailbox Store (B), Job Queue Store (C),
//! and the Identity Service (I), plus the filesystem layout and process
//! primitives they all depend on. The RPC surface (H), Hook Ingest poller
//! (E), Auto-Continue Scheduler (F), and Session Lifecycle Manager (G) live
//! in `ccmaster-daemon`, which wires these building blocks together behind
//! an HTTP JSON-RPC server.

pub mod config;
pub mod error;
pub mod fsutil;
pub mod identity;
pub mod injector;
pub mod job_queue;
pub mod launcher;
pub mod mailbox;
pub mod process;
pub mod registry;
pub mod session;
pub mod status_store;

pub use error::{CoreError, Result};
