//! ficha-core - Core library for Ficha
//!
//! This crate contains the patient-record models and the offline-first
//! sync subsystem: merging local and remote collections, conflict
//! resolution, deletion/dropout guards, and the sync cycle state machine.
//! Storage adapters, UI, and reporting live in the app shells and reach
//! this core only through the `store` contracts.

pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod store;
pub mod sync;

pub use error::{Error, Result};
pub use models::{AttachedFile, PatientRecord, PendingTask, SyncChange, SyncSummary};
pub use state::SyncState;
