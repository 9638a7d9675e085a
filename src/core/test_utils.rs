//! Test utilities for arena-based testing.
//!
//! Every metadata context borrows a `bumpalo` arena; these helpers keep the
//! arena alive for the duration of a test.
