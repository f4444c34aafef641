//! Catalog service for machine-learning model artifacts.
//!
//! The [service::ModelService] is the single source of behavior; the REST ([router]) and RPC
//! ([rpc]) adapters translate their wire formats into it and map its errors back by kind.

pub mod api_types;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod observe;
pub mod repository;
pub mod router;
pub mod rpc;
pub mod service;
pub mod state;
pub mod validation;

#[cfg(test)]
mod test_support;
