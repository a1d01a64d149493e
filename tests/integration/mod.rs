//! Integration test suite for taskdeck.
//!
//! # Test Categories
//!
//! - `board_flow`: the reconciler driven against an in-memory service,
//!   covering optimistic moves, create/edit/delete protocols and scope
//!   switches
//! - `http_contract`: the HTTP client against a local axum server
//!
//! Nothing here talks to a real backend, so the suite is safe to run in CI.


mod board_flow;
mod http_contract;
