//! Property-based tests for identifier parsing.
