//! Money amounts and transaction descriptions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::condition::Section;
use crate::error::{E2eError, E2eResult};

/// Non-negative amount of money in cents
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "AmountRepr", into = "String")]
pub struct Amount(u64);

#[derive(Deserialize)]
#[serde(untagged)]
enum AmountRepr {
    Text(String),
    Number(f64),
}

impl TryFrom<AmountRepr> for Amount {
    type Error = E2eError;

    fn try_from(repr: AmountRepr) -> E2eResult<Self> {
        match repr {
            AmountRepr::Text(s) => s.parse(),
            AmountRepr::Number(n) if n.is_finite() && n >= 0.0 => {
                Ok(Amount((n * 100.0).round() as u64))
            }
            AmountRepr::Number(n) => Err(E2eError::InvalidAmount(n.to_string())),
        }
    }
}

impl From<Amount> for String {
    fn from(a: Amount) -> Self {
        a.plain()
    }
}

impl Amount {
    pub const fn from_cents(cents: u64) -> Self {
        Amount(cents)
    }

    pub const fn from_dollars(dollars: u64) -> Self {
        Amount(dollars * 100)
    }

    pub fn cents(&self) -> u64 {
        self.0
    }

    /// `9900.00`
    pub fn plain(&self) -> String {
        format!("{}.{:02}", self.0 / 100, self.0 % 100)
    }

    /// `9900` when there are no cents, otherwise `9900.50`
    pub fn compact(&self) -> String {
        if self.0 % 100 == 0 {
            (self.0 / 100).to_string()
        } else {
            self.plain()
        }
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }
}

/// `$9,900.00`
impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dollars = (self.0 / 100).to_string();
        let mut grouped = String::with_capacity(dollars.len() + dollars.len() / 3);
        for (i, ch) in dollars.chars().enumerate() {
            if i > 0 && (dollars.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        write!(f, "${}.{:02}", grouped, self.0 % 100)
    }
}

/// Accepts `100`, `100.5`, `1,200.50` and `$9,900.00`.
impl FromStr for Amount {
    type Err = E2eError;

    fn from_str(s: &str) -> E2eResult<Self> {
        let invalid = || E2eError::InvalidAmount(s.to_string());
        let cleaned: String = s
            .trim()
            .trim_start_matches('+')
            .trim_start_matches('$')
            .chars()
            .filter(|c| *c != ',')
            .collect();
        if cleaned.is_empty() {
            return Err(invalid());
        }

        let (whole, frac) = match cleaned.split_once('.') {
            Some((w, f)) => (w, f),
            None => (cleaned.as_str(), ""),
        };
        if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        if frac.len() > 2 || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let dollars: u64 = whole.parse().map_err(|_| invalid())?;
        let cents: u64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<u64>().map_err(|_| invalid())? * 10,
            _ => frac.parse().map_err(|_| invalid())?,
        };

        dollars
            .checked_mul(100)
            .and_then(|d| d.checked_add(cents))
            .map(Amount)
            .ok_or_else(invalid)
    }
}

/// Kinds of transaction the banking demo supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    #[serde(alias = "Transfer")]
    Transfer,
    #[serde(alias = "Deposit")]
    Deposit,
    #[serde(alias = "Withdrawal")]
    Withdrawal,
    #[serde(alias = "BillPayment", alias = "Bill Payment")]
    BillPayment,
}

impl TransactionKind {
    /// Label shown in the transaction type dropdown and on confirmation
    pub fn label(&self) -> &'static str {
        match self {
            TransactionKind::Transfer => "Transfer",
            TransactionKind::Deposit => "Deposit",
            TransactionKind::Withdrawal => "Withdrawal",
            TransactionKind::BillPayment => "Bill Payment",
        }
    }

    /// Whether the transaction reduces the balance
    pub fn is_debit(&self) -> bool {
        !matches!(self, TransactionKind::Deposit)
    }

    /// Section holding the form this kind is entered in
    pub fn form_section(&self) -> Section {
        match self {
            TransactionKind::BillPayment => Section::BillPayments,
            _ => Section::QuickTransactions,
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A transaction to submit through the UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "type")]
    pub kind: TransactionKind,

    pub amount: Amount,

    /// Destination account, required for transfers
    #[serde(default, rename = "toAccount", alias = "to_account")]
    pub to_account: Option<String>,

    /// Payee, required for bill payments
    #[serde(default)]
    pub biller: Option<String>,

    #[serde(default)]
    pub description: String,
}

impl Transaction {
    pub fn transfer(amount: Amount, to_account: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: TransactionKind::Transfer,
            amount,
            to_account: Some(to_account.into()),
            biller: None,
            description: description.into(),
        }
    }

    pub fn deposit(amount: Amount, description: impl Into<String>) -> Self {
        Self {
            kind: TransactionKind::Deposit,
            amount,
            to_account: None,
            biller: None,
            description: description.into(),
        }
    }

    pub fn withdrawal(amount: Amount, description: impl Into<String>) -> Self {
        Self {
            kind: TransactionKind::Withdrawal,
            amount,
            to_account: None,
            biller: None,
            description: description.into(),
        }
    }

    pub fn bill_payment(amount: Amount, biller: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: TransactionKind::BillPayment,
            amount,
            to_account: None,
            biller: Some(biller.into()),
            description: description.into(),
        }
    }

    /// Check that the fields the kind requires are present
    pub fn validate(&self) -> E2eResult<()> {
        let missing = |field: &str| E2eError::InvalidFixture {
            name: self.kind.label().to_string(),
            reason: format!("{} is required", field),
        };
        if self.amount.cents() == 0 {
            return Err(E2eError::InvalidAmount("amount must be greater than zero".to_string()));
        }
        match self.kind {
            TransactionKind::Transfer if blank(&self.to_account) => Err(missing("toAccount")),
            TransactionKind::BillPayment if blank(&self.biller) => Err(missing("biller")),
            _ => Ok(()),
        }
    }

    /// Text the history list shows for this transaction
    pub fn history_label(&self) -> String {
        match self.kind {
            TransactionKind::Transfer => {
                format!("Transfer to {}", self.to_account.as_deref().unwrap_or_default())
            }
            TransactionKind::BillPayment => {
                format!("Bill Payment - {}", self.biller.as_deref().unwrap_or_default())
            }
            TransactionKind::Deposit | TransactionKind::Withdrawal => {
                if self.description.is_empty() {
                    format!("{} {}", self.kind.label(), self.amount.compact())
                } else {
                    self.description.clone()
                }
            }
        }
    }

    /// `-$100.00` for debits, `+$100.00` for credits
    pub fn signed_amount(&self) -> String {
        let sign = if self.kind.is_debit() { '-' } else { '+' };
        format!("{}{}", sign, self.amount)
    }

    /// Balance expected after the transaction settles
    pub fn closing_balance(&self, opening: Amount) -> E2eResult<Amount> {
        let closing = if self.kind.is_debit() {
            opening.checked_sub(self.amount)
        } else {
            opening.checked_add(self.amount)
        };
        closing.ok_or_else(|| {
            E2eError::InvalidAmount(format!(
                "{} of {} does not fit opening balance {}",
                self.kind, self.amount, opening
            ))
        })
    }
}

fn blank(field: &Option<String>) -> bool {
    field.as_deref().map(str::trim).unwrap_or_default().is_empty()
}
