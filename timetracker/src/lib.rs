//! TimeTracker library
//!
//! This library exposes the session timer, its day-bucketed storage and
//! the settings and tag services for front ends and tests.

pub mod app;
pub mod clock;
pub mod commands;
pub mod config;
pub mod display;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;
