//! Transaction fixtures

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{E2eError, E2eResult};
use crate::transaction::{Amount, Transaction};

/// Opening balance of a freshly logged-in demo account
pub const DEMO_OPENING_BALANCE: Amount = Amount::from_dollars(10_000);

/// One named transaction scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionFixture {
    #[serde(flatten)]
    pub transaction: Transaction,

    /// Balance shown before the transaction is submitted
    #[serde(default = "default_opening_balance", rename = "openingBalance", alias = "opening_balance")]
    pub opening_balance: Amount,
}

fn default_opening_balance() -> Amount {
    DEMO_OPENING_BALANCE
}

impl TransactionFixture {
    pub fn new(transaction: Transaction) -> Self {
        Self {
            transaction,
            opening_balance: DEMO_OPENING_BALANCE,
        }
    }

    /// Balance expected once the transaction settles
    pub fn closing_balance(&self) -> E2eResult<Amount> {
        self.transaction.closing_balance(self.opening_balance)
    }
}

/// Fixture data sets keyed by name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FixtureSet {
    sets: BTreeMap<String, TransactionFixture>,
}

impl FixtureSet {
    /// Parse fixtures from JSON and validate every entry
    pub fn from_json(json: &str) -> E2eResult<Self> {
        let set: Self = serde_json::from_str(json)?;
        set.validate()?;
        Ok(set)
    }

    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Scenarios from the demo's own walkthroughs
    pub fn builtin() -> Self {
        let mut set = Self::default();
        set.insert(
            "transferTransaction",
            TransactionFixture::new(Transaction::transfer(
                Amount::from_dollars(100),
                "123456789",
                "We are transferring $100",
            )),
        );
        set.insert(
            "largeTransfer",
            TransactionFixture::new(Transaction::transfer(
                Amount::from_dollars(5_000),
                "987654321",
                "Large transfer test",
            )),
        );
        set.insert(
            "smallTransfer",
            TransactionFixture::new(Transaction::transfer(
                Amount::from_dollars(1),
                "111222333",
                "Small transfer test",
            )),
        );
        set.insert(
            "depositTransaction",
            TransactionFixture::new(Transaction::deposit(Amount::from_dollars(100), "We deposit $100")),
        );
        set.insert(
            "withdrawalTransaction",
            TransactionFixture::new(Transaction::withdrawal(Amount::from_dollars(100), "Withdrawal 100")),
        );
        set.insert(
            "electricityBill",
            TransactionFixture::new(Transaction::bill_payment(
                Amount::from_dollars(1_200),
                "Electricity",
                "Electricity bill",
            )),
        );
        set
    }

    pub fn insert(&mut self, name: impl Into<String>, fixture: TransactionFixture) {
        self.sets.insert(name.into(), fixture);
    }

    /// Look up a data set by name
    pub fn get(&self, name: &str) -> E2eResult<&TransactionFixture> {
        self.sets
            .get(name)
            .ok_or_else(|| E2eError::FixtureNotFound(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sets.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    fn validate(&self) -> E2eResult<()> {
        for (name, fixture) in &self.sets {
            fixture.transaction.validate().map_err(|e| E2eError::InvalidFixture {
                name: name.clone(),
                reason: e.to_string(),
            })?;
            fixture.closing_balance().map_err(|e| E2eError::InvalidFixture {
                name: name.clone(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }
}
