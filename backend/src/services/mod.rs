//! # Services Module
//!
//! This module contains the payroll engine's business logic. The
//! calculators are pure functions; the services hold a store handle.
//!
//! ## Services Overview
//!
//! | Item | Responsibility |
//! |------|---------------|
//! | `PayrollService` | Entry point for every operation |
//! | `PayrunGenerator` | One batch: records, then a summary |
//! | `OrphanReconciler` | Summaries for records left without one |
//! | `compute_structure` | Wage to six-component breakdown |
//! | `compute_deductions` / `net_pay` | PF, professional tax, take-home |
//!
//! ## Service Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        SERVICES LAYER                            │
//! │                                                                  │
//! │  ┌──────────────────────────────────────────────────────────┐   │
//! │  │                    PayrollService                         │   │
//! │  │  • create_configuration()   • create_salary_structure()   │   │
//! │  │  • create_payrun()          • mark_as_paid()              │   │
//! │  └──────────────────────────────────────────────────────────┘   │
//! │                              │                                   │
//! │         ┌────────────────────┼────────────────────┐             │
//! │         ▼                    ▼                    ▼             │
//! │  ┌────────────┐      ┌────────────┐       ┌────────────┐       │
//! │  │  Salary    │      │  Payrun    │       │  Orphan    │       │
//! │  │ Calculator │      │ Generator  │       │ Reconciler │       │
//! │  │ Deductions │      │            │       │            │       │
//! │  └────────────┘      └────────────┘       └────────────┘       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod deductions;
pub mod errors;
pub mod payroll_service;
pub mod payrun_generator;
pub mod reconciler;
pub mod salary_calculator;

pub use deductions::{compute_deductions, net_pay, Deductions};
pub use errors::PayrollError;
pub use payroll_service::PayrollService;
pub use payrun_generator::PayrunGenerator;
pub use reconciler::OrphanReconciler;
pub use salary_calculator::compute_structure;
