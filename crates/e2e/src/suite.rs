//! Declarative YAML suite specification

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::condition::Condition;
use crate::error::{E2eError, E2eResult};

/// A suite of transaction flows parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteSpec {
    /// Unique name for this suite
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags applied to every case in the suite
    #[serde(default)]
    pub tags: Vec<String>,

    /// Cases to run
    pub cases: Vec<SuiteCase>,
}

/// One transaction flow to drive and verify
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteCase {
    /// Unique name within the suite
    pub name: String,

    /// Fixture data set to use
    pub fixture: String,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Extra conditions the history must show after the flow
    #[serde(default)]
    pub expect: Vec<Condition>,

    /// Skipped cases are reported but not run
    #[serde(default)]
    pub skip: bool,
}

impl SuiteCase {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

impl SuiteSpec {
    /// Parse a suite from YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let spec: Self = serde_yaml::from_str(yaml)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Parse a suite from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content).map_err(|e| match e {
            E2eError::SpecParse(msg) => E2eError::SpecParse(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    /// Load all suites from a directory, sorted by path
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut specs = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            let spec = Self::from_file(entry.path())?;
            specs.push(spec);
        }

        Ok(specs)
    }

    /// Suite covering every built-in fixture
    pub fn builtin() -> Self {
        let case = |name: &str, fixture: &str, tags: &[&str]| SuiteCase {
            name: name.to_string(),
            fixture: fixture.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            expect: Vec::new(),
            skip: false,
        };
        Self {
            name: "banking-flows".to_string(),
            description: "Quick transactions and bill payments against a fresh account".to_string(),
            tags: vec!["builtin".to_string()],
            cases: vec![
                case("transfer-updates-history", "transferTransaction", &["transfer", "smoke"]),
                case("large-transfer", "largeTransfer", &["transfer"]),
                case("small-transfer", "smallTransfer", &["transfer"]),
                case("deposit-updates-history", "depositTransaction", &["deposit", "smoke"]),
                case("withdrawal-updates-history", "withdrawalTransaction", &["withdrawal"]),
                case("bill-payment-updates-history", "electricityBill", &["bill_payment"]),
            ],
        }
    }

    /// Tags of a case, including the suite's own
    pub fn case_tags<'a>(&'a self, case: &'a SuiteCase) -> impl Iterator<Item = &'a str> {
        self.tags.iter().chain(case.tags.iter()).map(String::as_str)
    }

    fn validate(&self) -> E2eResult<()> {
        if self.cases.is_empty() {
            return Err(E2eError::SpecParse(format!("suite '{}' has no cases", self.name)));
        }
        let mut names = HashSet::new();
        for case in &self.cases {
            if !names.insert(case.name.as_str()) {
                return Err(E2eError::SpecParse(format!(
                    "suite '{}' has duplicate case '{}'",
                    self.name, case.name
                )));
            }
            for condition in &case.expect {
                condition.validate()?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUITE: &str = r#"
name: transfers
description: Transfers show up in the history
tags:
  - transfer
cases:
  - name: standard-transfer
    fixture: transferTransaction
    tags: [smoke]
    expect:
      - check: history_matches
        pattern: 'Transfer to \d{9}'
  - name: tiny-transfer
    fixture: smallTransfer
    skip: true
"#;

    #[test]
    fn test_parse_suite() {
        let spec = SuiteSpec::from_yaml(SUITE).unwrap();
        assert_eq!(spec.name, "transfers");
        assert_eq!(spec.cases.len(), 2);
        assert_eq!(spec.cases[0].expect.len(), 1);
        assert!(spec.cases[1].skip);

        let tags: Vec<&str> = spec.case_tags(&spec.cases[0]).collect();
        assert_eq!(tags, vec!["transfer", "smoke"]);
    }

    #[test]
    fn test_duplicate_case_names_rejected() {
        let yaml = r#"
name: dupes
cases:
  - { name: a, fixture: transferTransaction }
  - { name: a, fixture: smallTransfer }
"#;
        assert!(matches!(SuiteSpec::from_yaml(yaml), Err(E2eError::SpecParse(_))));
    }

    #[test]
    fn test_invalid_expectation_rejected() {
        let yaml = r#"
name: bad
cases:
  - name: a
    fixture: transferTransaction
    expect:
      - check: history_matches
        pattern: '(unclosed'
"#;
        assert!(matches!(
            SuiteSpec::from_yaml(yaml),
            Err(E2eError::InvalidCondition(_))
        ));
    }

    #[test]
    fn test_load_all_walks_nested_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("payments");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("transfers.yaml"), SUITE).unwrap();
        std::fs::write(
            nested.join("bills.yml"),
            "name: bills\ncases:\n  - { name: electricity, fixture: electricityBill }\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let specs = SuiteSpec::load_all(dir.path()).unwrap();
        let names: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["bills", "transfers"]);
    }
}
