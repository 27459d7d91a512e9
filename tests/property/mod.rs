//! Property-based tests for the layout engine and pipeline arithmetic

mod determinism;
