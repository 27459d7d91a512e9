//! Integration tests for the mosaic layout engine and generation coordinator

mod config_integration;
mod job_pipeline;
mod layout_engine;
mod stall_watchdog;
