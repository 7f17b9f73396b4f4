//! Bankflow E2E Framework
//!
//! Drives transactions through a banking UI and verifies, with bounded
//! retries, that the UI eventually reflects them:
//! - Declarative post-conditions (`Condition`) evaluated by a UI session
//! - A flow driver that runs login, navigation, confirmation, success and
//!   history checks
//! - YAML suites of fixture-backed cases, run concurrently
//! - An in-process simulated bank with configurable propagation lag
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     SuiteRunner                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SuiteSpec (YAML) -> cases { name, fixture, tags, expect }   │
//! │  per case: SessionFactory::open(fixture) -> dyn BankingUi    │
//! │    FlowDriver::execute(fixture)                              │
//! │      ├── (session opens) -> verify [login]                   │
//! │      ├── login           -> verify [home]                    │
//! │      ├── navigate(form)  -> verify [navigation]              │
//! │      ├── submit          -> verify [confirmation]            │
//! │      ├── confirm         -> verify [success]                 │
//! │      └── navigate(history) -> verify [history]               │
//! │    each verify: Conditions -> UiProbes -> VerificationPlan   │
//! │                 -> RetryVerifier -> VerificationOutcome      │
//! │  -> SuiteResult -> test-results.json                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod condition;
pub mod config;
pub mod error;
pub mod fixture;
pub mod flow;
pub mod runner;
pub mod session;
pub mod sim;
pub mod suite;
pub mod transaction;

pub use condition::{Condition, Section};
pub use config::{HarnessConfig, PhasePolicies};
pub use error::{E2eError, E2eResult};
pub use fixture::{FixtureSet, TransactionFixture};
pub use flow::{FlowDriver, FlowReport, Phase, PhaseReport};
pub use runner::{CaseFilter, CaseResult, SuiteResult, SuiteRunner};
pub use session::{BankingUi, Credentials, SessionFactory, UiProbe};
pub use sim::{SimConfig, SimSessions, SimulatedBank};
pub use suite::{SuiteCase, SuiteSpec};
pub use transaction::{Amount, Transaction, TransactionKind};
