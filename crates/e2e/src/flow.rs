//! Transaction flow driver
//!
//! Drives one transaction through the banking UI and verifies, phase by
//! phase, that the UI eventually reflects it:
//!
//! ```text
//! [login] ─► log in ─► [home] ─► open form ─► [navigation]
//!   ─► submit ─► [confirmation] ─► confirm ─► [success] ─► open history ─► [history]
//! ```
//!
//! Each bracketed phase is a verification plan run by the [`RetryVerifier`]
//! under that phase's [`RetryPolicy`](bankflow_verify::RetryPolicy). A phase
//! that does not succeed ends the flow. A cancelled flow performs no further
//! UI actions.

use bankflow_verify::{
    CancellationToken, PlanBuilder, RetryPolicy, RetryVerifier, VerificationOutcome,
    VerificationPlan,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::condition::{Condition, Section};
use crate::config::PhasePolicies;
use crate::error::{E2eError, E2eResult};
use crate::fixture::TransactionFixture;
use crate::session::{probes_for, BankingUi, Credentials};
use crate::transaction::TransactionKind;

/// Verification phases of a transaction flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Login page loaded
    Login,
    /// Home page loaded after logging in
    Home,
    /// Transaction form opened
    Navigation,
    Confirmation,
    Success,
    History,
}

impl Phase {
    /// Every phase of a complete flow, in order
    pub const FLOW: [Phase; 6] = [
        Phase::Login,
        Phase::Home,
        Phase::Navigation,
        Phase::Confirmation,
        Phase::Success,
        Phase::History,
    ];
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Login => "login",
            Phase::Home => "home",
            Phase::Navigation => "navigation",
            Phase::Confirmation => "confirmation",
            Phase::Success => "success",
            Phase::History => "history",
        };
        f.write_str(s)
    }
}

/// Outcome of one verification phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseReport {
    pub phase: Phase,
    pub conditions: Vec<String>,
    pub outcome: VerificationOutcome,
}

/// Outcome of a whole flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowReport {
    /// Reference shown on the success page, if any
    pub reference: Option<String>,
    pub phases: Vec<PhaseReport>,

    /// UI action skipped because the flow was cancelled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_before: Option<String>,

    pub duration_ms: u64,
}

impl FlowReport {
    fn new() -> Self {
        Self {
            reference: None,
            phases: Vec::with_capacity(Phase::FLOW.len()),
            cancelled_before: None,
            duration_ms: 0,
        }
    }

    /// Every phase ran and succeeded
    pub fn passed(&self) -> bool {
        self.cancelled_before.is_none()
            && self.phases.len() == Phase::FLOW.len()
            && self.phases.iter().all(|p| p.outcome.succeeded())
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled_before.is_some()
    }

    /// First phase that did not succeed
    pub fn failed_phase(&self) -> Option<&PhaseReport> {
        self.phases.iter().find(|p| !p.outcome.succeeded())
    }

    pub fn phase(&self, phase: Phase) -> Option<&PhaseReport> {
        self.phases.iter().find(|p| p.phase == phase)
    }

    /// Turn a failed flow into `E2eError::VerificationFailed`, or
    /// `E2eError::Cancelled` when it stopped between phases
    pub fn into_result(self) -> E2eResult<Self> {
        if let Some(failed) = self.failed_phase() {
            return Err(E2eError::VerificationFailed(Box::new(failed.outcome.clone())));
        }
        match self.cancelled_before {
            Some(action) => Err(E2eError::Cancelled(action)),
            None => Ok(self),
        }
    }
}

/// Conditions the login page must show before credentials are entered
pub fn login_conditions() -> Vec<Condition> {
    vec![Condition::section(Section::Login)]
}

/// Conditions the home page must show after logging in.
///
/// The page first, then the balance the fixture expects to start from.
pub fn home_conditions(fixture: &TransactionFixture) -> Vec<Condition> {
    vec![
        Condition::section(Section::Home),
        Condition::BalanceIs {
            amount: fixture.opening_balance,
        },
    ]
}

/// Conditions the transaction form's section must show
pub fn navigation_conditions(kind: TransactionKind) -> Vec<Condition> {
    vec![Condition::section(kind.form_section())]
}

/// Conditions the confirmation page must show before confirming.
///
/// Coarse first: the page itself, then the transaction details, then the
/// projected balance.
pub fn confirmation_conditions(fixture: &TransactionFixture) -> E2eResult<Vec<Condition>> {
    let tx = &fixture.transaction;
    let mut conditions = vec![
        Condition::section(Section::Confirmation),
        Condition::confirmation_contains(tx.kind.label()),
        Condition::confirmation_contains(tx.amount.to_string()),
    ];
    if !tx.description.trim().is_empty() {
        conditions.push(Condition::confirmation_contains(tx.description.clone()));
    }
    if let Some(account) = &tx.to_account {
        conditions.push(Condition::confirmation_contains(account.clone()));
    }
    if let Some(biller) = &tx.biller {
        conditions.push(Condition::confirmation_contains(biller.clone()));
    }
    conditions.push(Condition::confirmation_contains(format!(
        "New Balance: {}",
        fixture.closing_balance()?
    )));
    Ok(dedup(conditions))
}

/// Conditions the success page must show
pub fn success_conditions() -> Vec<Condition> {
    vec![Condition::section(Section::Success)]
}

/// Conditions the history must eventually show for a settled transaction
pub fn history_conditions(
    fixture: &TransactionFixture,
    reference: Option<&str>,
) -> E2eResult<Vec<Condition>> {
    let tx = &fixture.transaction;
    let mut conditions = vec![
        Condition::section(Section::TransactionHistory),
        Condition::HistoryHasEntries,
        Condition::history_contains(tx.history_label()),
        Condition::history_contains(tx.signed_amount()),
    ];
    if let Some(reference) = reference {
        conditions.push(Condition::ReferenceInHistory {
            reference: reference.to_string(),
        });
    }
    conditions.push(Condition::BalanceIs {
        amount: fixture.closing_balance()?,
    });
    Ok(dedup(conditions))
}

fn dedup(conditions: Vec<Condition>) -> Vec<Condition> {
    let mut seen = HashSet::new();
    conditions
        .into_iter()
        .filter(|c| seen.insert(c.name()))
        .collect()
}

/// Drives transactions through one UI session
pub struct FlowDriver {
    ui: Arc<dyn BankingUi>,
    verifier: RetryVerifier,
    policies: PhasePolicies,
    credentials: Credentials,
}

impl FlowDriver {
    pub fn new(ui: Arc<dyn BankingUi>, policies: PhasePolicies) -> Self {
        Self {
            ui,
            verifier: RetryVerifier::new(),
            policies,
            credentials: Credentials::default(),
        }
    }

    /// Use a specific verifier (e.g. one with a recording sleeper)
    pub fn with_verifier(mut self, verifier: RetryVerifier) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn policies(&self) -> &PhasePolicies {
        &self.policies
    }

    /// Build a plan from conditions under a phase's policy
    pub fn plan(&self, phase: Phase, conditions: &[Condition]) -> E2eResult<VerificationPlan> {
        for condition in conditions {
            condition.validate()?;
        }
        let policy = self.policy(phase);
        let builder = PlanBuilder::new(phase.to_string()).probes(probes_for(&self.ui, conditions));
        Ok(policy.apply(builder).build()?)
    }

    fn policy(&self, phase: Phase) -> &RetryPolicy {
        match phase {
            Phase::Login | Phase::Home | Phase::Navigation => &self.policies.navigation,
            Phase::Confirmation => &self.policies.confirmation,
            Phase::Success => &self.policies.success,
            Phase::History => &self.policies.history,
        }
    }

    /// Run one phase's conditions to a verdict
    pub async fn verify(
        &self,
        phase: Phase,
        conditions: Vec<Condition>,
        cancel: &CancellationToken,
    ) -> E2eResult<PhaseReport> {
        let plan = self.plan(phase, &conditions)?;
        debug!("Verifying {} ({} condition(s))", phase, conditions.len());
        let outcome = self.verifier.run_with_cancel(&plan, cancel).await;
        Ok(PhaseReport {
            phase,
            conditions: conditions.iter().map(Condition::name).collect(),
            outcome,
        })
    }

    /// Verify that the history reflects an already confirmed transaction.
    ///
    /// Navigates to the history first.
    pub async fn verify_history(
        &self,
        fixture: &TransactionFixture,
        reference: Option<&str>,
        cancel: &CancellationToken,
    ) -> E2eResult<PhaseReport> {
        self.ui.navigate(Section::TransactionHistory).await?;
        self.verify(Phase::History, history_conditions(fixture, reference)?, cancel)
            .await
    }

    /// Log in, submit, confirm and verify one transaction end to end on a
    /// freshly opened session.
    ///
    /// UI action failures are errors; verification failures and cancellation
    /// are reported in the returned [`FlowReport`].
    pub async fn execute(
        &self,
        fixture: &TransactionFixture,
        cancel: &CancellationToken,
    ) -> E2eResult<FlowReport> {
        let start = Instant::now();
        let tx = &fixture.transaction;
        tx.validate()?;
        let confirmation = confirmation_conditions(fixture)?;
        let mut report = FlowReport::new();

        if halted(&mut report, cancel, "login") {
            return Ok(report);
        }
        let phase = self.verify(Phase::Login, login_conditions(), cancel).await?;
        if !self.record(&mut report, phase, start) || halted(&mut report, cancel, "login") {
            return Ok(report);
        }

        info!("Logging in as {}", self.credentials.username);
        self.ui.login(&self.credentials).await?;

        let phase = self.verify(Phase::Home, home_conditions(fixture), cancel).await?;
        if !self.record(&mut report, phase, start) || halted(&mut report, cancel, "navigate") {
            return Ok(report);
        }

        self.ui.navigate(tx.kind.form_section()).await?;

        let phase = self
            .verify(Phase::Navigation, navigation_conditions(tx.kind), cancel)
            .await?;
        if !self.record(&mut report, phase, start) || halted(&mut report, cancel, "submit") {
            return Ok(report);
        }

        info!("{} of {}: submitting", tx.kind, tx.amount);
        self.ui.submit(tx).await?;

        let phase = self.verify(Phase::Confirmation, confirmation, cancel).await?;
        if !self.record(&mut report, phase, start) || halted(&mut report, cancel, "confirm") {
            return Ok(report);
        }

        report.reference = self.ui.confirm().await?;

        let phase = self.verify(Phase::Success, success_conditions(), cancel).await?;
        if !self.record(&mut report, phase, start) || halted(&mut report, cancel, "open history") {
            return Ok(report);
        }

        let phase = self
            .verify_history(fixture, report.reference.as_deref(), cancel)
            .await?;
        self.record(&mut report, phase, start);
        Ok(report)
    }

    fn record(&self, report: &mut FlowReport, phase: PhaseReport, start: Instant) -> bool {
        let succeeded = phase.outcome.succeeded();
        if !succeeded {
            warn!("Flow stopped at {}: {}", phase.phase, phase.outcome);
        }
        report.phases.push(phase);
        report.duration_ms = start.elapsed().as_millis() as u64;
        succeeded
    }
}

/// Mark the flow cancelled if the token fired; the next UI action is skipped
fn halted(report: &mut FlowReport, cancel: &CancellationToken, action: &str) -> bool {
    if !cancel.is_cancelled() {
        return false;
    }
    warn!("Flow cancelled before {}", action);
    report.cancelled_before = Some(action.to_string());
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimConfig, SimulatedBank};
    use crate::transaction::{Amount, Transaction};
    use bankflow_verify::Termination;
    use std::time::Duration;

    fn transfer_fixture() -> TransactionFixture {
        TransactionFixture::new(Transaction::transfer(
            Amount::from_dollars(100),
            "123456789",
            "We are transferring $100",
        ))
    }

    fn driver(bank: Arc<SimulatedBank>) -> FlowDriver {
        let policies = PhasePolicies::uniform(RetryPolicy::fixed(8, Duration::from_millis(1000)));
        FlowDriver::new(bank, policies)
    }

    #[test]
    fn test_history_conditions_are_ordered_coarse_to_fine() {
        let names: Vec<String> = history_conditions(&transfer_fixture(), Some("TXN-000001"))
            .unwrap()
            .iter()
            .map(Condition::name)
            .collect();
        assert_eq!(
            names,
            vec![
                "section-visible:transaction-history",
                "history-has-entries",
                "history-contains:Transfer to 123456789",
                "history-contains:-$100.00",
                "reference-in-history:TXN-000001",
                "balance-is:$9,900.00",
            ]
        );
    }

    #[test]
    fn test_confirmation_conditions_skip_duplicates() {
        let fixture = TransactionFixture::new(Transaction::deposit(Amount::from_dollars(100), "Deposit"));
        let conditions = confirmation_conditions(&fixture).unwrap();
        let names: HashSet<String> = conditions.iter().map(Condition::name).collect();
        assert_eq!(names.len(), conditions.len());
        assert!(names.contains("confirmation-contains:New Balance: $10,100.00"));
    }

    #[test]
    fn test_navigation_targets_the_kind_form() {
        assert_eq!(
            navigation_conditions(TransactionKind::BillPayment),
            vec![Condition::section(Section::BillPayments)]
        );
        assert_eq!(
            navigation_conditions(TransactionKind::Deposit),
            vec![Condition::section(Section::QuickTransactions)]
        );
        let names: Vec<String> = home_conditions(&transfer_fixture()).iter().map(Condition::name).collect();
        assert_eq!(names, vec!["section-visible:home", "balance-is:$10,000.00"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flow_passes_on_settled_bank() {
        let bank = Arc::new(SimulatedBank::default());
        let report = driver(bank.clone())
            .execute(&transfer_fixture(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(report.passed(), "{:?}", report.failed_phase());
        assert_eq!(report.reference.as_deref(), Some("TXN-000001"));
        assert_eq!(bank.balance(), Amount::from_dollars(9_900));
        let phases: Vec<Phase> = report.phases.iter().map(|p| p.phase).collect();
        assert_eq!(phases, Phase::FLOW.to_vec());
        for phase in &report.phases {
            assert_eq!(phase.outcome.attempts_used(), 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_flow_waits_for_history_lag() {
        let bank = Arc::new(SimulatedBank::new(SimConfig {
            history_lag: Duration::from_millis(2_500),
            ..Default::default()
        }));
        let report = driver(bank)
            .execute(&transfer_fixture(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(report.passed());
        let history = report.phase(Phase::History).unwrap();
        assert_eq!(history.outcome.attempts_used(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flow_waits_for_each_page_to_render() {
        let bank = Arc::new(SimulatedBank::new(SimConfig {
            render_lag: Duration::from_millis(1_500),
            ..Default::default()
        }));
        let report = driver(bank)
            .execute(&transfer_fixture(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(report.passed(), "{:?}", report.failed_phase());
        for phase in &report.phases {
            assert_eq!(phase.outcome.attempts_used(), 3, "{}", phase.phase);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_bill_payment_opens_bill_payments_form() {
        let bank = Arc::new(SimulatedBank::default());
        let fixture = TransactionFixture::new(Transaction::bill_payment(
            Amount::from_dollars(1_200),
            "Electricity",
            "Electricity bill",
        ));
        let report = driver(bank).execute(&fixture, &CancellationToken::new()).await.unwrap();

        assert!(report.passed(), "{:?}", report.failed_phase());
        let navigation = report.phase(Phase::Navigation).unwrap();
        assert_eq!(navigation.conditions, vec!["section-visible:bill-payments"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_transaction_exhausts_history_phase() {
        let bank = Arc::new(SimulatedBank::new(SimConfig {
            drop_transactions: true,
            ..Default::default()
        }));
        let report = driver(bank)
            .execute(&transfer_fixture(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(!report.passed());
        let failed = report.failed_phase().unwrap();
        assert_eq!(failed.phase, Phase::History);
        assert_eq!(failed.outcome.termination(), Termination::Exhausted);
        assert_eq!(failed.outcome.attempts_used(), 8);
        assert_eq!(
            failed.outcome.failed_probe(),
            Some("history-contains:Transfer to 123456789")
        );

        let err = report.into_result().unwrap_err();
        assert!(matches!(err, E2eError::VerificationFailed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_success_page_is_fatal_and_stops_flow() {
        let bank = Arc::new(SimulatedBank::new(SimConfig {
            missing_sections: vec![Section::Success],
            ..Default::default()
        }));
        let report = driver(bank)
            .execute(&transfer_fixture(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.phases.len(), 5);
        let failed = report.failed_phase().unwrap();
        assert_eq!(failed.phase, Phase::Success);
        assert!(failed.outcome.is_fatal());
        assert_eq!(failed.outcome.attempts_used(), 1);
        assert!(report.phase(Phase::History).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_start_touches_nothing() {
        let bank = Arc::new(SimulatedBank::default());
        let token = CancellationToken::new();
        token.cancel();
        let report = driver(bank.clone()).execute(&transfer_fixture(), &token).await.unwrap();

        assert!(report.phases.is_empty());
        assert_eq!(report.cancelled_before.as_deref(), Some("login"));
        assert!(!report.passed());
        assert_eq!(bank.current_section(), Section::Login);
        assert!(!bank.has_pending());
        assert_eq!(bank.evaluations(), 0);
        assert!(matches!(report.into_result(), Err(E2eError::Cancelled(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_mid_flow_never_submits() {
        let bank = Arc::new(SimulatedBank::new(SimConfig {
            render_lag: Duration::from_millis(1_500),
            ..Default::default()
        }));
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2_500)).await;
            trigger.cancel();
        });

        let report = driver(bank.clone()).execute(&transfer_fixture(), &token).await.unwrap();

        let failed = report.failed_phase().unwrap();
        assert_eq!(failed.phase, Phase::Home);
        assert!(failed.outcome.is_cancelled());
        assert_eq!(bank.current_section(), Section::Home);
        assert!(!bank.has_pending());
        assert_eq!(bank.balance(), Amount::from_dollars(10_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_login_is_error() {
        let bank = Arc::new(SimulatedBank::default());
        let wrong = Credentials {
            username: "someone-else".to_string(),
            ..Credentials::default()
        };
        let result = driver(bank)
            .with_credentials(wrong)
            .execute(&transfer_fixture(), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(E2eError::UiAction { .. })));
    }
}
