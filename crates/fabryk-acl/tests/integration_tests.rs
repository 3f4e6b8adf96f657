//! Integration test suite for fabryk-acl.
//!
//! Drives the store, resolver, notifier and edit session together over a
//! small resource tree, including concurrent mutation of one resource.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

mod common;
mod integration;
