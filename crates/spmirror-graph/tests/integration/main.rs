//! Integration tests for spmirror-graph
//!
//! Uses wiremock to simulate the Microsoft identity platform and Graph
//! API, verifying end-to-end behavior of the session, listings, name
//! resolution and downloads.

mod common;

mod test_listing;
mod test_session;
mod test_transport;
