//! UI collaborator interface
//!
//! Browser automation lives outside this crate. A session only has to be able
//! to perform the handful of state-advancing actions a flow needs and to
//! evaluate [`Condition`]s without side effects.

use async_trait::async_trait;
use bankflow_verify::{ConditionProbe, ProbeResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::condition::{Condition, Section};
use crate::error::E2eResult;
use crate::fixture::TransactionFixture;
use crate::transaction::Transaction;

/// Login form input
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub username: String,
    pub password: String,

    /// Application picked in the login form's "App Name" dropdown
    #[serde(rename = "appName", alias = "app_name")]
    pub app_name: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            username: "TestersTalk".to_string(),
            password: "TestersTalk".to_string(),
            app_name: "Banking".to_string(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .field("app_name", &self.app_name)
            .finish()
    }
}

/// A live session against the banking demo
#[async_trait]
pub trait BankingUi: Send + Sync {
    /// Fill and submit the login form
    async fn login(&self, credentials: &Credentials) -> E2eResult<()>;

    /// Follow the link to a top-level section
    async fn navigate(&self, section: Section) -> E2eResult<()>;

    /// Fill the quick-transaction (or bill payment) form and submit it
    async fn submit(&self, transaction: &Transaction) -> E2eResult<()>;

    /// Confirm the pending transaction; returns the transaction reference
    /// shown on the success page, if the page shows one
    async fn confirm(&self) -> E2eResult<Option<String>>;

    /// Observe whether a condition currently holds.
    ///
    /// Must not advance application state. A lookup that could not complete
    /// is `ProbeError::Transient`; a structurally impossible condition is
    /// `ProbeError::Fatal`.
    async fn evaluate_condition(&self, condition: &Condition) -> ProbeResult;
}

/// Builds a fresh, logged-out session per suite case.
///
/// The fixture is passed so the session can start from the account state the
/// case expects (its opening balance).
pub trait SessionFactory: Send + Sync {
    fn open(&self, fixture: &TransactionFixture) -> Arc<dyn BankingUi>;
}

impl<F> SessionFactory for F
where
    F: Fn(&TransactionFixture) -> Arc<dyn BankingUi> + Send + Sync,
{
    fn open(&self, fixture: &TransactionFixture) -> Arc<dyn BankingUi> {
        self(fixture)
    }
}

/// Adapts a [`Condition`] on a shared session into a [`ConditionProbe`]
pub struct UiProbe {
    name: String,
    condition: Condition,
    ui: Arc<dyn BankingUi>,
}

impl UiProbe {
    pub fn new(ui: Arc<dyn BankingUi>, condition: Condition) -> Self {
        Self {
            name: condition.name(),
            condition,
            ui,
        }
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }
}

#[async_trait]
impl ConditionProbe for UiProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn evaluate(&self) -> ProbeResult {
        self.ui.evaluate_condition(&self.condition).await
    }
}

/// Turn an ordered list of conditions into boxed probes on one session
pub fn probes_for(ui: &Arc<dyn BankingUi>, conditions: &[Condition]) -> Vec<Box<dyn ConditionProbe>> {
    conditions
        .iter()
        .cloned()
        .map(|c| Box::new(UiProbe::new(ui.clone(), c)) as Box<dyn ConditionProbe>)
        .collect()
}
