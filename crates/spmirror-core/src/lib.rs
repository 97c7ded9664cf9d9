//! spmirror Core - Configuration and port definitions
//!
//! This crate contains the provider-agnostic heart of spmirror:
//! - **Configuration** - typed config file mapping with loading and validation
//! - **Port definitions** - Traits the adapter crates implement:
//!   `IDirectoryProvider` (remote document store), `ISyncObserver`
//!   (create/update/delete notification sink)
//!
//! The sync engine (`spmirror-sync`) depends only on this crate; the
//! Microsoft Graph adapter (`spmirror-graph`) implements the ports.

pub mod config;
pub mod ports;
