//! # Payroll Backend
//!
//! Multi-tenant payroll engine: salary structure calculation, statutory
//! deductions, monthly payrun generation and the payroll record
//! lifecycle.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        PAYROLL BACKEND                           │
//! │                                                                  │
//! │  ┌──────────────────────┐          ┌──────────────────────────┐  │
//! │  │   payroll-admin CLI  │          │   Embedding application  │  │
//! │  └──────────┬───────────┘          └────────────┬─────────────┘  │
//! │             └──────────────┬────────────────────┘                │
//! │  ┌─────────────────────────┴─────────────────────────────────┐  │
//! │  │                    SERVICE LAYER                           │  │
//! │  │  PayrollService · PayrunGenerator · OrphanReconciler       │  │
//! │  │  compute_structure · compute_deductions                    │  │
//! │  └─────────────────────────┬─────────────────────────────────┘  │
//! │                            │ store traits                        │
//! │         ┌──────────────────┴──────────────┐                     │
//! │  ┌──────┴──────┐                   ┌──────┴──────┐              │
//! │  │   PgStore   │                   │ MemoryStore │              │
//! │  │ PostgreSQL  │                   │  in-process │              │
//! │  └─────────────┘                   └─────────────┘              │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use payroll_backend::config::EngineSettings;
//! use payroll_backend::db::MemoryStore;
//! use payroll_backend::services::PayrollService;
//!
//! let service = PayrollService::new(Arc::new(MemoryStore::new()), EngineSettings::default());
//! let payrun = service.create_payrun(tenant_id, "2025-03", admin_id).await?;
//! ```

pub mod cli;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod utils;
