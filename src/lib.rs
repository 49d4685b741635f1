//! dayplan - Personal Day Planner Library
//!
//! This library provides the core functionality for the dayplan CLI tool:
//! a reducer-driven store of dated tasks and topic backlogs, persisted to
//! a local data directory.
//!
//! # Core Concepts
//!
//! - **Tasks**: Dated, timed work items keyed by `DD.MM`
//! - **Topics**: Named backlogs whose items can be promoted to the daily plan
//! - **Actions**: Every change is an action applied by a pure reducer
//! - **Views**: Daily slots, weekly, monthly and statistics projections
//! - **Session**: Registered users, email verification and a route guard
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `.dayplan.toml`
//! - `error`: Error types and result aliases
//! - `model`: Tasks, topics and the `DD.MM` day key
//! - `store`: Reducer, outcomes and the persisted task store
//! - `views`: Read-only projections over the task list
//! - `auth`: Users, registration and the session store
//! - `guard`: Route protection decisions
//! - `mail`: Outgoing mail composition and the spool transport
//! - `storage`: File storage and directory management
//! - `lock`: File locking and atomic operations for concurrency safety
//! - `output`: JSON envelope and human output rendering

pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod guard;
pub mod lock;
pub mod mail;
pub mod model;
pub mod output;
pub mod storage;
pub mod store;
pub mod views;

pub use error::{Error, Result};
