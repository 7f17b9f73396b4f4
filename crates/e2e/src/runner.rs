//! Suite runner: drives every selected case against its own session

use bankflow_verify::{CancellationToken, RetryVerifier};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

use crate::config::{HarnessConfig, PhasePolicies};
use crate::error::{E2eError, E2eResult};
use crate::fixture::FixtureSet;
use crate::flow::{FlowDriver, Phase, PhaseReport};
use crate::session::{Credentials, SessionFactory};
use crate::suite::{SuiteCase, SuiteSpec};

/// Result of running a single case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseResult {
    pub suite: String,
    pub name: String,
    pub fixture: String,
    pub success: bool,
    pub skipped: bool,
    pub duration_ms: u64,
    pub reference: Option<String>,
    pub phases: Vec<PhaseReport>,
    pub error: Option<String>,
}

/// Result of running all selected cases
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub started_at: DateTime<Utc>,
    pub results: Vec<CaseResult>,
}

impl SuiteResult {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Which cases to run
#[derive(Debug, Clone, Default)]
pub struct CaseFilter {
    /// Suite or case tag
    pub tag: Option<String>,

    /// Exact case name
    pub name: Option<String>,
}

impl CaseFilter {
    fn matches(&self, spec: &SuiteSpec, case: &SuiteCase) -> bool {
        let tag_ok = match &self.tag {
            Some(tag) => spec.case_tags(case).any(|t| t == tag.as_str()),
            None => true,
        };
        let name_ok = match &self.name {
            Some(name) => &case.name == name,
            None => true,
        };
        tag_ok && name_ok
    }
}

/// Runs suites of transaction flows
pub struct SuiteRunner {
    sessions: Arc<dyn SessionFactory>,
    fixtures: FixtureSet,
    policies: PhasePolicies,
    credentials: Credentials,
    verifier: RetryVerifier,
    output_dir: PathBuf,
    cancel: CancellationToken,
}

impl SuiteRunner {
    pub fn new(sessions: Arc<dyn SessionFactory>, fixtures: FixtureSet, policies: PhasePolicies) -> Self {
        Self {
            sessions,
            fixtures,
            policies,
            credentials: Credentials::default(),
            verifier: RetryVerifier::new(),
            output_dir: PathBuf::from("test-results"),
            cancel: CancellationToken::new(),
        }
    }

    /// Runner set up from harness configuration
    pub fn from_config(config: &HarnessConfig, sessions: Arc<dyn SessionFactory>) -> E2eResult<Self> {
        config.policies.validate()?;
        let fixtures = match &config.fixtures {
            Some(path) => FixtureSet::from_file(path)?,
            None => FixtureSet::builtin(),
        };
        Ok(Self::new(sessions, fixtures, config.policies.clone())
            .with_credentials(config.credentials.clone())
            .with_output_dir(&config.output_dir))
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_verifier(mut self, verifier: RetryVerifier) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn with_output_dir(mut self, dir: &Path) -> Self {
        self.output_dir = dir.to_path_buf();
        self
    }

    /// Token that aborts every in-flight verification when cancelled
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run all suites found in a directory
    pub async fn run_all(&self, specs_dir: &Path, filter: &CaseFilter) -> E2eResult<SuiteResult> {
        let specs = SuiteSpec::load_all(specs_dir)?;
        Ok(self.run_specs(&specs, filter).await)
    }

    /// Run the selected cases of the given suites concurrently
    pub async fn run_specs(&self, specs: &[SuiteSpec], filter: &CaseFilter) -> SuiteResult {
        let started_at = Utc::now();
        let start = Instant::now();

        let selected: Vec<(&SuiteSpec, &SuiteCase)> = specs
            .iter()
            .flat_map(|spec| spec.cases.iter().map(move |case| (spec, case)))
            .filter(|(spec, case)| filter.matches(spec, case))
            .collect();

        info!("Running {} case(s)...", selected.len());

        let results = join_all(selected.iter().map(|(spec, case)| self.run_case(spec, case))).await;

        let mut passed = 0;
        let mut failed = 0;
        let mut skipped = 0;
        for result in &results {
            if result.skipped {
                skipped += 1;
                info!("- {} (skipped)", result.name);
            } else if result.success {
                passed += 1;
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                failed += 1;
                error!("✗ {} - {}", result.name, result.error.as_deref().unwrap_or("unknown error"));
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Test Results: {} passed, {} failed, {} skipped ({} ms)",
            passed, failed, skipped, duration_ms
        );

        SuiteResult {
            total: results.len(),
            passed,
            failed,
            skipped,
            duration_ms,
            started_at,
            results,
        }
    }

    /// Run one case on a fresh session
    pub async fn run_case(&self, spec: &SuiteSpec, case: &SuiteCase) -> CaseResult {
        let start = Instant::now();
        let mut result = CaseResult {
            suite: spec.name.clone(),
            name: case.name.clone(),
            fixture: case.fixture.clone(),
            success: false,
            skipped: case.skip,
            duration_ms: 0,
            reference: None,
            phases: Vec::new(),
            error: None,
        };
        if case.skip {
            return result;
        }

        debug!("Running case: {}/{}", spec.name, case.name);
        match self.drive(case, &mut result).await {
            Ok(()) => {}
            Err(e) => result.error = Some(e.to_string()),
        }
        result.success = result.error.is_none();
        result.duration_ms = start.elapsed().as_millis() as u64;
        result
    }

    async fn drive(&self, case: &SuiteCase, result: &mut CaseResult) -> E2eResult<()> {
        let fixture = self.fixtures.get(&case.fixture)?;
        let driver = FlowDriver::new(self.sessions.open(fixture), self.policies.clone())
            .with_verifier(self.verifier.clone())
            .with_credentials(self.credentials.clone());

        let report = driver.execute(fixture, &self.cancel).await?;
        result.reference = report.reference.clone();
        result.phases = report.phases.clone();
        let report = report.into_result()?;

        if !case.expect.is_empty() {
            let extra = driver
                .verify(Phase::History, case.expect.clone(), &self.cancel)
                .await?;
            let outcome = extra.outcome.clone();
            result.phases.push(extra);
            if !outcome.succeeded() {
                return Err(E2eError::VerificationFailed(Box::new(outcome)));
            }
        }

        debug!("{}: passed in {} ms", case.name, report.duration_ms);
        Ok(())
    }

    /// Write results to `test-results.json` in the output directory
    pub fn write_results(&self, results: &SuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;

        let path = self.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimConfig, SimSessions};
    use bankflow_verify::RetryPolicy;
    use std::time::Duration;

    fn runner_with(config: SimConfig, fixtures: FixtureSet) -> SuiteRunner {
        let policies = PhasePolicies::uniform(RetryPolicy::fixed(5, Duration::from_millis(200)));
        SuiteRunner::new(SimSessions::shared(config), fixtures, policies)
    }

    fn runner(config: SimConfig) -> SuiteRunner {
        runner_with(config, FixtureSet::builtin())
    }

    #[tokio::test(start_paused = true)]
    async fn test_builtin_suite_passes() {
        let result = runner(SimConfig {
            history_lag: Duration::from_millis(500),
            render_lag: Duration::from_millis(100),
            ..Default::default()
        })
        .run_specs(&[SuiteSpec::builtin()], &CaseFilter::default())
        .await;

        assert_eq!(result.total, 6);
        assert_eq!(result.passed, 6, "{:#?}", result.results);
        assert!(result.success());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixture_opening_balance_seeds_session() {
        let fixtures = FixtureSet::from_json(
            r#"{
  "smallTransfer": {
    "type": "transfer",
    "amount": "1.00",
    "toAccount": "111222333",
    "description": "Small transfer",
    "openingBalance": "50.00"
  }
}"#,
        )
        .unwrap();
        let spec = SuiteSpec::from_yaml("name: s\ncases:\n  - { name: small, fixture: smallTransfer }\n").unwrap();

        let result = runner_with(SimConfig::default(), fixtures)
            .run_specs(&[spec], &CaseFilter::default())
            .await;

        assert_eq!(result.passed, 1, "{:#?}", result.results);
        let history = result.results[0]
            .phases
            .iter()
            .find(|p| p.phase == Phase::History)
            .unwrap();
        assert!(history.conditions.contains(&"balance-is:$49.00".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_filter_by_tag_and_name() {
        let runner = runner(SimConfig::default());
        let specs = [SuiteSpec::builtin()];

        let smoke = CaseFilter {
            tag: Some("smoke".to_string()),
            name: None,
        };
        assert_eq!(runner.run_specs(&specs, &smoke).await.total, 2);

        let one = CaseFilter {
            tag: None,
            name: Some("large-transfer".to_string()),
        };
        let result = runner.run_specs(&specs, &one).await;
        assert_eq!(result.total, 1);
        assert_eq!(result.results[0].fixture, "largeTransfer");
    }

    #[tokio::test]
    async fn test_unknown_fixture_fails_case() {
        let spec = SuiteSpec::from_yaml("name: s\ncases:\n  - { name: a, fixture: hugeTransfer }\n").unwrap();
        let result = runner(SimConfig::default())
            .run_specs(&[spec], &CaseFilter::default())
            .await;
        assert_eq!(result.failed, 1);
        assert!(result.results[0].error.as_deref().unwrap().contains("hugeTransfer"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_skipped_and_failing_cases_counted() {
        let spec = SuiteSpec::from_yaml(
            r#"
name: mixed
cases:
  - name: skipped
    fixture: transferTransaction
    skip: true
  - name: dropped
    fixture: transferTransaction
"#,
        )
        .unwrap();
        let result = runner(SimConfig {
            drop_transactions: true,
            ..Default::default()
        })
        .run_specs(&[spec], &CaseFilter::default())
        .await;

        assert_eq!(result.total, 2);
        assert_eq!(result.skipped, 1);
        assert_eq!(result.failed, 1);
        let dropped = &result.results[1];
        assert_eq!(dropped.phases.len(), Phase::FLOW.len());
        let history = dropped.phases.last().unwrap();
        assert_eq!(history.phase, Phase::History);
        assert_eq!(history.outcome.attempts_used(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_extra_expectations_run_after_flow() {
        let spec = SuiteSpec::from_yaml(
            r#"
name: expectations
cases:
  - name: reference-format
    fixture: transferTransaction
    expect:
      - check: history_matches
        pattern: 'TXN-\d{6}'
"#,
        )
        .unwrap();
        let result = runner(SimConfig::default())
            .run_specs(&[spec], &CaseFilter::default())
            .await;
        assert_eq!(result.passed, 1);
        assert_eq!(result.results[0].phases.len(), Phase::FLOW.len() + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_results() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner(SimConfig::default()).with_output_dir(dir.path());
        let result = runner
            .run_specs(&[SuiteSpec::builtin()], &CaseFilter::default())
            .await;

        let path = runner.write_results(&result).unwrap();
        let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(json["total"], 6);
        let history = &json["results"][0]["phases"][5];
        assert_eq!(history["phase"], "history");
        assert_eq!(history["outcome"]["termination"], "success");
    }
}
