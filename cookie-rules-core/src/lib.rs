#![doc = "cookie-rules-core: core logic library for the cookie banner rule list tooling."]

//! This crate contains the data model, the rule list validator and the diff/sync
//! pipelines that keep Remote Settings collections in line with local data.
//! Network access lives in the `cookie-rules` CLI crate; everything here talks to
//! the outside world through the traits in [`contract`].
//!
//! # Usage
//! Depend on this crate for validation, compat flattening, diff planning and
//! record sync. Supply a [`contract::RecordStore`] and a [`contract::SchemaFetcher`].

pub mod compat;
pub mod config;
pub mod contract;
pub mod error;
pub mod publish;
pub mod rules;
pub mod schema;
pub mod synchronise;
pub mod validate;
