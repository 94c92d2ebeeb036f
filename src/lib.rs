//! Profit Analytics Library
//!
//! Turns a tenant's sales, purchase and inventory history into month-end
//! projections, monthly profit and ROI trends and per-product investment
//! recommendations.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod common;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod models;
pub mod repositories;
pub mod services;
pub mod tenancy;

pub use common::DateRange;
pub use errors::ServiceError;
pub use models::{ProfitAnalysisRequest, ProfitAnalysisResponse};
pub use repositories::AnalyticsRepository;
pub use services::{InventorySnapshotService, ProfitAnalysisService};
pub use tenancy::{TenantFilter, TenantKey};
