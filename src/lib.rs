// src/lib.rs
pub mod types;
pub mod codec;
pub mod crypto;
pub mod config;
pub mod error;
pub mod state;
pub mod provenance;
pub mod account;
pub mod usage;
pub mod cheating;
pub mod block;
pub mod stf;
pub mod actor;
