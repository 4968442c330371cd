//! Collections commitment-map simulation core.
//!
//! A roster of customers drifts through the payment lifecycle one tick
//! at a time. Payments are captured in a session ledger and the lag of
//! the paying customer restarts at the preventive end of the map.

pub mod catalog;
pub mod clock;
pub mod command;
pub mod config;
pub mod customer;
pub mod engine;
pub mod error;
pub mod event;
pub mod filter;
pub mod ledger;
pub mod movement;
pub mod name_generator;
pub mod report;
pub mod rng;
pub mod roster;
pub mod snapshot;
pub mod stage;
pub mod store;
pub mod types;
