//! In-process simulated banking UI
//!
//! Behaves like the banking demo as seen through a browser: a session opens
//! on the login page, pages appear a short render delay after navigation, and
//! settled transactions only show up in the history (and in the displayed
//! balance) after a propagation lag. Both delays run on `tokio::time`, so a
//! paused test clock controls them and observing a condition never changes
//! what the next observation sees.
//!
//! Used by the test suites and by the harness when no real browser is
//! attached.

use async_trait::async_trait;
use bankflow_verify::{ProbeError, ProbeResult};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use regex::Regex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::condition::{Condition, Section};
use crate::error::{E2eError, E2eResult};
use crate::fixture::{TransactionFixture, DEMO_OPENING_BALANCE};
use crate::session::{BankingUi, Credentials, SessionFactory};
use crate::transaction::{Amount, Transaction};

/// Behaviour knobs for the simulated bank
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub opening_balance: Amount,

    /// The only credentials the login form accepts
    pub credentials: Credentials,

    /// Time from confirmation until the transaction shows in the history
    /// and the displayed balance
    pub history_lag: Duration,

    /// Time from navigation until the new page's heading renders
    pub render_lag: Duration,

    /// Confirmed transactions never reach the history
    pub drop_transactions: bool,

    /// Sections that do not exist at all; checking them is fatal
    pub missing_sections: Vec<Section>,

    /// Lookups fail with a transient error for this long after the session
    /// opens
    pub transient_window: Duration,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            opening_balance: DEMO_OPENING_BALANCE,
            credentials: Credentials::default(),
            history_lag: Duration::ZERO,
            render_lag: Duration::ZERO,
            drop_transactions: false,
            missing_sections: Vec::new(),
            transient_window: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone)]
struct HistoryEntry {
    at: DateTime<Utc>,
    visible_at: Instant,
    label: String,
    signed_amount: String,
    reference: String,
    balance_after: Amount,
}

impl HistoryEntry {
    fn render(&self) -> String {
        format!(
            "{} {} {} Ref: {} Balance: {}",
            self.at.format("%Y-%m-%d"),
            self.label,
            self.signed_amount,
            self.reference,
            self.balance_after
        )
    }
}

#[derive(Debug)]
struct Pending {
    transaction: Transaction,
    closing: Amount,
}

#[derive(Debug)]
struct BankState {
    logged_in: bool,
    section: Section,
    rendered_at: Instant,
    balance: Amount,
    pending: Option<Pending>,
    history: Vec<HistoryEntry>,
    next_reference: u32,
}

impl BankState {
    fn visible_history(&self, now: Instant) -> impl DoubleEndedIterator<Item = &HistoryEntry> {
        self.history.iter().filter(move |e| e.visible_at <= now)
    }

    fn displayed_balance(&self, now: Instant) -> Option<Amount> {
        self.visible_history(now).last().map(|e| e.balance_after)
    }

    fn rendered(&self, section: Section, now: Instant) -> bool {
        self.section == section && now >= self.rendered_at
    }
}

/// Simulated banking demo session
#[derive(Debug)]
pub struct SimulatedBank {
    config: SimConfig,
    opened_at: Instant,
    evaluations: AtomicU64,
    state: Mutex<BankState>,
}

impl Default for SimulatedBank {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl SimulatedBank {
    /// A logged-out session on the login page
    pub fn new(config: SimConfig) -> Self {
        let now = Instant::now();
        let opening = HistoryEntry {
            at: Utc::now(),
            visible_at: now,
            label: "Initial Balance".to_string(),
            signed_amount: format!("+{}", config.opening_balance),
            reference: "INIT".to_string(),
            balance_after: config.opening_balance,
        };
        let state = BankState {
            logged_in: false,
            section: Section::Login,
            rendered_at: now + config.render_lag,
            balance: config.opening_balance,
            pending: None,
            history: vec![opening],
            next_reference: 1,
        };
        Self {
            config,
            opened_at: now,
            evaluations: AtomicU64::new(0),
            state: Mutex::new(state),
        }
    }

    /// Number of `evaluate_condition` calls so far
    pub fn evaluations(&self) -> u64 {
        self.evaluations.load(Ordering::Relaxed)
    }

    /// Settled balance on the server side
    pub fn balance(&self) -> Amount {
        self.state.lock().balance
    }

    pub fn current_section(&self) -> Section {
        self.state.lock().section
    }

    /// A transaction has been submitted and awaits confirmation
    pub fn has_pending(&self) -> bool {
        self.state.lock().pending.is_some()
    }

    /// History text visible right now, as a scraper would read it
    pub fn history_text(&self) -> String {
        let state = self.state.lock();
        render_history(state.visible_history(Instant::now()))
    }

    fn go_to(&self, state: &mut BankState, section: Section) {
        debug!("sim: navigate {:?} -> {:?}", state.section, section);
        state.section = section;
        state.rendered_at = Instant::now() + self.config.render_lag;
    }

    fn confirmation_text(pending: &Pending, balance: Amount) -> String {
        let tx = &pending.transaction;
        let mut text = format!(
            "Transaction Type: {} Amount: {} Description: {}",
            tx.kind, tx.amount, tx.description
        );
        if let Some(account) = &tx.to_account {
            text.push_str(&format!(" Transfer to Account: {}", account));
        }
        if let Some(biller) = &tx.biller {
            text.push_str(&format!(" Biller: {}", biller));
        }
        text.push_str(&format!(
            " Current Balance: {} New Balance: {}",
            balance, pending.closing
        ));
        text
    }
}

fn render_history<'a>(entries: impl DoubleEndedIterator<Item = &'a HistoryEntry>) -> String {
    entries
        .rev()
        .map(HistoryEntry::render)
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl BankingUi for SimulatedBank {
    async fn login(&self, credentials: &Credentials) -> E2eResult<()> {
        let mut state = self.state.lock();
        if state.section != Section::Login {
            return Err(E2eError::ui("login", "login page is not open"));
        }
        if *credentials != self.config.credentials {
            return Err(E2eError::ui(
                "login",
                format!("invalid credentials for '{}'", credentials.username),
            ));
        }
        state.logged_in = true;
        self.go_to(&mut state, Section::Home);
        Ok(())
    }

    async fn navigate(&self, section: Section) -> E2eResult<()> {
        let mut state = self.state.lock();
        if !state.logged_in && section != Section::Login {
            return Err(E2eError::ui("navigate", format!("{} requires login", section)));
        }
        self.go_to(&mut state, section);
        Ok(())
    }

    async fn submit(&self, transaction: &Transaction) -> E2eResult<()> {
        transaction.validate()?;
        let mut state = self.state.lock();
        let form = transaction.kind.form_section();
        if !state.logged_in || state.section != form {
            return Err(E2eError::ui("submit", format!("{} form is not open", form)));
        }
        let closing = transaction
            .closing_balance(state.balance)
            .map_err(|e| E2eError::ui("submit", e.to_string()))?;
        state.pending = Some(Pending {
            transaction: transaction.clone(),
            closing,
        });
        self.go_to(&mut state, Section::Confirmation);
        Ok(())
    }

    async fn confirm(&self) -> E2eResult<Option<String>> {
        let mut state = self.state.lock();
        if state.section != Section::Confirmation {
            return Err(E2eError::ui("confirm", "confirmation page is not open"));
        }
        let pending = state
            .pending
            .take()
            .ok_or_else(|| E2eError::ui("confirm", "no transaction awaiting confirmation"))?;

        let reference = format!("TXN-{:06}", state.next_reference);
        state.next_reference += 1;
        state.balance = pending.closing;

        if !self.config.drop_transactions {
            state.history.push(HistoryEntry {
                at: Utc::now(),
                visible_at: Instant::now() + self.config.history_lag,
                label: pending.transaction.history_label(),
                signed_amount: pending.transaction.signed_amount(),
                reference: reference.clone(),
                balance_after: pending.closing,
            });
        }

        self.go_to(&mut state, Section::Success);
        Ok(Some(reference))
    }

    async fn evaluate_condition(&self, condition: &Condition) -> ProbeResult {
        self.evaluations.fetch_add(1, Ordering::Relaxed);
        let now = Instant::now();

        if now < self.opened_at + self.config.transient_window {
            return Err(ProbeError::transient(format!(
                "lookup for '{}' timed out",
                condition.name()
            )));
        }

        let state = self.state.lock();
        match condition {
            Condition::SectionVisible { section } => {
                if self.config.missing_sections.contains(section) {
                    return Err(ProbeError::fatal(format!(
                        "section '{}' does not exist on this page",
                        section
                    )));
                }
                Ok(state.rendered(*section, now))
            }
            Condition::ConfirmationContains { text } => {
                if !state.rendered(Section::Confirmation, now) {
                    return Err(ProbeError::transient("confirmation details not rendered"));
                }
                match &state.pending {
                    Some(pending) => {
                        let details = Self::confirmation_text(pending, state.balance);
                        Ok(details.contains(text.as_str()))
                    }
                    None => Ok(false),
                }
            }
            Condition::BalanceIs { amount } => Ok(state.displayed_balance(now) == Some(*amount)),
            Condition::HistoryHasEntries
            | Condition::HistoryContains { .. }
            | Condition::HistoryMatches { .. }
            | Condition::ReferenceInHistory { .. } => {
                if !state.rendered(Section::TransactionHistory, now) {
                    return Err(ProbeError::transient("history section not rendered"));
                }
                let text = render_history(state.visible_history(now));
                match condition {
                    Condition::HistoryMatches { pattern } => Regex::new(pattern)
                        .map(|re| re.is_match(&text))
                        .map_err(|e| ProbeError::fatal(format!("invalid pattern: {}", e))),
                    other => other
                        .matches_text(&text)
                        .map_err(|e| ProbeError::fatal(e.to_string())),
                }
            }
        }
    }
}

/// Opens one [`SimulatedBank`] per case, seeded with the case fixture's
/// opening balance
#[derive(Debug, Clone, Default)]
pub struct SimSessions {
    config: SimConfig,
}

impl SimSessions {
    pub fn new(config: SimConfig) -> Self {
        Self { config }
    }

    pub fn shared(config: SimConfig) -> Arc<dyn SessionFactory> {
        Arc::new(Self::new(config))
    }
}

impl SessionFactory for SimSessions {
    fn open(&self, fixture: &TransactionFixture) -> Arc<dyn BankingUi> {
        Arc::new(SimulatedBank::new(SimConfig {
            opening_balance: fixture.opening_balance,
            ..self.config.clone()
        }))
    }
}
