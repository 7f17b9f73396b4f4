//! Declarative post-condition descriptors
//!
//! A [`Condition`] names one observable fact about the banking UI. The UI
//! collaborator decides how to observe it; the flow driver decides which
//! conditions must eventually hold after an action.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{E2eError, E2eResult};
use crate::transaction::Amount;

/// Top-level sections of the banking demo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Login,
    Home,
    QuickTransactions,
    BillPayments,
    Confirmation,
    Success,
    TransactionHistory,
}

impl Section {
    /// Heading text the section renders
    pub fn heading(&self) -> &'static str {
        match self {
            Section::Login => "Login",
            Section::Home => "Sample Banking Application",
            Section::QuickTransactions => "Quick Transactions",
            Section::BillPayments => "Bill Payments",
            Section::Confirmation => "Transaction Confirmation",
            Section::Success => "Transaction Successful",
            Section::TransactionHistory => "Transaction History",
        }
    }

    fn slug(&self) -> &'static str {
        match self {
            Section::Login => "login",
            Section::Home => "home",
            Section::QuickTransactions => "quick-transactions",
            Section::BillPayments => "bill-payments",
            Section::Confirmation => "confirmation",
            Section::Success => "success",
            Section::TransactionHistory => "transaction-history",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.heading())
    }
}

/// One observable fact about the banking UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum Condition {
    /// The section's heading is visible
    SectionVisible { section: Section },

    /// The history list shows at least one entry
    HistoryHasEntries,

    /// The history text contains `text`
    HistoryContains { text: String },

    /// The history text matches a regular expression
    HistoryMatches { pattern: String },

    /// The confirmation details contain `text`
    ConfirmationContains { text: String },

    /// The displayed account balance equals `amount`
    BalanceIs { amount: Amount },

    /// A transaction reference appears in the history
    ReferenceInHistory { reference: String },
}

impl Condition {
    pub fn section(section: Section) -> Self {
        Condition::SectionVisible { section }
    }

    pub fn history_contains(text: impl Into<String>) -> Self {
        Condition::HistoryContains { text: text.into() }
    }

    pub fn confirmation_contains(text: impl Into<String>) -> Self {
        Condition::ConfirmationContains { text: text.into() }
    }

    /// Stable diagnostic name, unique within a plan for distinct conditions
    pub fn name(&self) -> String {
        match self {
            Condition::SectionVisible { section } => format!("section-visible:{}", section.slug()),
            Condition::HistoryHasEntries => "history-has-entries".to_string(),
            Condition::HistoryContains { text } => format!("history-contains:{}", text),
            Condition::HistoryMatches { pattern } => format!("history-matches:{}", pattern),
            Condition::ConfirmationContains { text } => format!("confirmation-contains:{}", text),
            Condition::BalanceIs { amount } => format!("balance-is:{}", amount),
            Condition::ReferenceInHistory { reference } => format!("reference-in-history:{}", reference),
        }
    }

    /// Reject descriptors that can never be evaluated
    pub fn validate(&self) -> E2eResult<()> {
        match self {
            Condition::HistoryContains { text } | Condition::ConfirmationContains { text }
                if text.trim().is_empty() =>
            {
                Err(E2eError::InvalidCondition(format!("{}: empty text", self.name())))
            }
            Condition::ReferenceInHistory { reference } if reference.trim().is_empty() => {
                Err(E2eError::InvalidCondition("reference-in-history: empty reference".to_string()))
            }
            Condition::HistoryMatches { pattern } => Regex::new(pattern)
                .map(|_| ())
                .map_err(|e| E2eError::InvalidCondition(format!("{}: {}", self.name(), e))),
            _ => Ok(()),
        }
    }

    /// Evaluate the text-based part of a condition against rendered text.
    ///
    /// Used by UI collaborators that can only scrape section text.
    pub fn matches_text(&self, text: &str) -> E2eResult<bool> {
        match self {
            Condition::HistoryContains { text: needle }
            | Condition::ConfirmationContains { text: needle }
            | Condition::ReferenceInHistory { reference: needle } => Ok(text.contains(needle.as_str())),
            Condition::HistoryMatches { pattern } => {
                let re = Regex::new(pattern)
                    .map_err(|e| E2eError::InvalidCondition(format!("{}: {}", self.name(), e)))?;
                Ok(re.is_match(text))
            }
            Condition::HistoryHasEntries => Ok(!text.trim().is_empty()),
            Condition::BalanceIs { amount } => {
                Ok(text.contains(&amount.to_string()) || text.contains(&amount.plain()))
            }
            Condition::SectionVisible { section } => Ok(text.contains(section.heading())),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_conditions_from_yaml() {
        let yaml = r#"
- check: section_visible
  section: transaction_history
- check: history_has_entries
- check: history_contains
  text: Transfer to 123456789
- check: history_matches
  pattern: '-\$?100\.?00'
- check: balance_is
  amount: "9,900.00"
"#;
        let conditions: Vec<Condition> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(conditions.len(), 5);
        assert_eq!(conditions[0], Condition::section(Section::TransactionHistory));
        assert_eq!(
            conditions[4],
            Condition::BalanceIs {
                amount: Amount::from_dollars(9_900)
            }
        );
        for c in &conditions {
            c.validate().unwrap();
        }
    }

    #[test]
    fn test_names_are_descriptive() {
        assert_eq!(
            Condition::section(Section::TransactionHistory).name(),
            "section-visible:transaction-history"
        );
        assert_eq!(
            Condition::BalanceIs {
                amount: Amount::from_dollars(9_900)
            }
            .name(),
            "balance-is:$9,900.00"
        );
    }

    #[test]
    fn test_invalid_regex_rejected() {
        let c = Condition::HistoryMatches {
            pattern: "(unclosed".to_string(),
        };
        assert!(c.validate().is_err());
        assert!(c.matches_text("anything").is_err());
    }

    #[test]
    fn test_empty_text_rejected() {
        assert!(Condition::history_contains("  ").validate().is_err());
    }

    #[test]
    fn test_matches_text() {
        let history = "Transfer to 123456789 -$100.00 REF-0001";
        assert!(Condition::history_contains("Transfer to 123456789")
            .matches_text(history)
            .unwrap());
        assert!(Condition::HistoryMatches {
            pattern: r"-\$?100\.?00".to_string()
        }
        .matches_text(history)
        .unwrap());
        assert!(!Condition::ReferenceInHistory {
            reference: "REF-0002".to_string()
        }
        .matches_text(history)
        .unwrap());
    }
}
