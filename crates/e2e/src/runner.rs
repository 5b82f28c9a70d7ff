//! Scenario runner tying page objects, the browser session and the inbox together

use std::path::PathBuf;
use std::time::Instant;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::MailtrapConfig;
use crate::error::{E2eError, E2eResult};
use crate::mailtrap::MailtrapClient;
use crate::pages::DonateSuccessPage;
use crate::playwright::{PlaywrightConfig, PlaywrightDriver};
use crate::scenario::{display_amount, Scenario, Step};
use crate::support::PageDriver;

/// Result of executing a single step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub success: bool,
    pub step_name: String,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub steps: Vec<StepResult>,
    pub error: Option<String>,
}

/// Result of running all scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

impl SuiteResult {
    pub fn from_results(results: Vec<ScenarioResult>, duration_ms: u64) -> Self {
        let passed = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            passed,
            failed: results.len() - passed,
            duration_ms,
            results,
        }
    }
}

/// Environment variable naming the application under test
pub const BASE_URL_VAR: &str = "E2E_BASE_URL";

/// Whether the runner binary was asked to drive an application, either via
/// `--base-url` or [`BASE_URL_VAR`].
///
/// Decided before any argument parsing: under `cargo test` the binary also
/// receives libtest filters and flags it does not understand.
pub fn base_url_requested<I, S>(args: I, env_value: Option<&str>) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    if env_value.map(|v| !v.trim().is_empty()).unwrap_or(false) {
        return true;
    }

    args.into_iter().any(|a| {
        let a = a.as_ref();
        a == "--base-url" || a.starts_with("--base-url=")
    })
}

/// Configuration for the scenario runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub playwright: PlaywrightConfig,
    /// Needed only by scenarios with email steps
    pub mailtrap: Option<MailtrapConfig>,
    pub scenarios_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            playwright: PlaywrightConfig::default(),
            mailtrap: None,
            scenarios_dir: PathBuf::from("tests/scenarios"),
            output_dir: PathBuf::from("test-results"),
        }
    }
}

/// Runs scenarios one after another, each in a fresh browser session
pub struct ScenarioRunner {
    playwright_config: PlaywrightConfig,
    mailtrap: Option<MailtrapClient>,
    scenarios_dir: PathBuf,
    output_dir: PathBuf,
}

impl ScenarioRunner {
    pub fn with_config(config: RunnerConfig) -> E2eResult<Self> {
        let mailtrap = config.mailtrap.map(MailtrapClient::new).transpose()?;

        Ok(Self {
            playwright_config: config.playwright,
            mailtrap,
            scenarios_dir: config.scenarios_dir,
            output_dir: config.output_dir,
        })
    }

    /// Run all scenarios in the scenarios directory
    pub async fn run_all(&self) -> E2eResult<SuiteResult> {
        let scenarios = Scenario::load_all(&self.scenarios_dir)?;
        self.run_scenarios(&scenarios).await
    }

    /// Run scenarios matching a tag
    pub async fn run_tagged(&self, tag: &str) -> E2eResult<SuiteResult> {
        let scenarios = Scenario::load_all(&self.scenarios_dir)?;
        let filtered: Vec<Scenario> = Scenario::filter_by_tag(&scenarios, tag)
            .into_iter()
            .cloned()
            .collect();
        self.run_scenarios(&filtered).await
    }

    /// Run a specific scenario by name
    pub async fn run_named(&self, name: &str) -> E2eResult<SuiteResult> {
        let scenario = Scenario::load_all(&self.scenarios_dir)?
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| E2eError::ScenarioParse(format!("Scenario not found: {}", name)))?;

        self.run_scenarios(std::slice::from_ref(&scenario)).await
    }

    pub async fn run_scenarios(&self, scenarios: &[Scenario]) -> E2eResult<SuiteResult> {
        let start = Instant::now();
        let mut results = Vec::with_capacity(scenarios.len());

        info!("Running {} scenario(s)...", scenarios.len());

        for scenario in scenarios {
            let result = match self.run_scenario(scenario).await {
                Ok(result) => result,
                Err(e) => ScenarioResult {
                    name: scenario.name.clone(),
                    success: false,
                    duration_ms: 0,
                    steps: vec![],
                    error: Some(e.to_string()),
                },
            };

            if result.success {
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                error!("✗ {} - {}", result.name, result.error.as_deref().unwrap_or("unknown error"));
            }
            results.push(result);
        }

        let suite = SuiteResult::from_results(results, start.elapsed().as_millis() as u64);
        info!(
            "Scenario results: {} passed, {} failed ({} ms)",
            suite.passed, suite.failed, suite.duration_ms
        );
        Ok(suite)
    }

    /// Run a single scenario in its own browser session
    pub async fn run_scenario(&self, scenario: &Scenario) -> E2eResult<ScenarioResult> {
        if scenario.needs_mailbox() && self.mailtrap.is_none() {
            return Err(E2eError::Config(format!(
                "scenario '{}' checks email but no Mailtrap credentials were given",
                scenario.name
            )));
        }

        let driver = PlaywrightDriver::launch(self.playwright_config.clone()).await?;
        let result = run_steps(&scenario.name, &driver, self.mailtrap.as_ref(), &scenario.steps).await;

        Ok(keep_result_after_close(result, driver.close().await))
    }

    /// Write suite results to JSON file
    pub fn write_results(&self, results: &SuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;

        let path = self.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

/// A failed browser shutdown does not replace the outcome of the steps
fn keep_result_after_close(result: ScenarioResult, closed: E2eResult<()>) -> ScenarioResult {
    if let Err(e) = closed {
        warn!("Closing browser after '{}' failed: {}", result.name, e);
    }
    result
}

/// Execute `steps` in order against `driver`, stopping at the first failure
pub async fn run_steps<D: PageDriver + ?Sized>(
    name: &str,
    driver: &D,
    mailtrap: Option<&MailtrapClient>,
    steps: &[Step],
) -> ScenarioResult {
    let start = Instant::now();
    let mut step_results = Vec::with_capacity(steps.len());
    let mut scenario_error = None;

    debug!("Running scenario: {}", name);

    for step in steps {
        let step_start = Instant::now();
        let outcome = execute_step(driver, mailtrap, step).await;
        let duration_ms = step_start.elapsed().as_millis() as u64;

        let error = outcome.err().map(|e| {
            E2eError::StepFailed {
                step: step.name(),
                reason: e.to_string(),
            }
            .to_string()
        });
        let failed = error.is_some();

        step_results.push(StepResult {
            success: !failed,
            step_name: step.name(),
            duration_ms,
            error: error.clone(),
        });

        if failed {
            scenario_error = error;
            break; // Stop on first failure
        }
    }

    ScenarioResult {
        name: name.to_string(),
        success: scenario_error.is_none(),
        duration_ms: start.elapsed().as_millis() as u64,
        steps: step_results,
        error: scenario_error,
    }
}

async fn execute_step<D: PageDriver + ?Sized>(
    driver: &D,
    mailtrap: Option<&MailtrapClient>,
    step: &Step,
) -> E2eResult<()> {
    let page = DonateSuccessPage::new(driver);

    match step {
        Step::Navigate { url } => driver.navigate(url).await,
        Step::CheckReady => page.check_ready().await,
        Step::CheckBalance { amount } => page.check_balance(display_amount(amount)).await,
        Step::ClickSetPassword => page.click_on_set_password_button().await,
        Step::PopulatePassword => page.populate_password().await,
        Step::ClickCreateAccount => page.click_on_create_account_button().await,
        Step::EmailSubjectContains { text } => {
            if require_mailbox(mailtrap)?.any_subject_contains(text).await? {
                Ok(())
            } else {
                Err(E2eError::AssertionFailed(format!(
                    "no recent email subject contains {:?}",
                    text
                )))
            }
        }
        Step::EmailBodyContains { text } => {
            if require_mailbox(mailtrap)?.any_body_contains(text).await? {
                Ok(())
            } else {
                Err(E2eError::AssertionFailed(format!(
                    "no recent email body contains {:?}",
                    text
                )))
            }
        }
        Step::Log { message } => {
            info!("[SCENARIO LOG] {}", message);
            Ok(())
        }
    }
}

fn require_mailbox(mailtrap: Option<&MailtrapClient>) -> E2eResult<&MailtrapClient> {
    mailtrap.ok_or_else(|| E2eError::Config("Mailtrap credentials are not configured".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario(name: &str, success: bool) -> ScenarioResult {
        ScenarioResult {
            name: name.to_string(),
            success,
            duration_ms: 1,
            steps: vec![],
            error: None,
        }
    }

    #[test]
    fn test_suite_counts() {
        let suite = SuiteResult::from_results(
            vec![scenario("a", true), scenario("b", false), scenario("c", true)],
            10,
        );
        assert_eq!(suite.total, 3);
        assert_eq!(suite.passed, 2);
        assert_eq!(suite.failed, 1);
    }

    #[test]
    fn test_write_results() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScenarioRunner::with_config(RunnerConfig {
            output_dir: dir.path().join("out"),
            ..Default::default()
        })
        .unwrap();

        let suite = SuiteResult::from_results(vec![scenario("a", true)], 5);
        let path = runner.write_results(&suite).unwrap();

        let written: SuiteResult =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written.total, 1);
        assert_eq!(written.results[0].name, "a");
    }

    #[test]
    fn test_close_failure_keeps_step_outcome() {
        let mut failed = scenario("wrong-amount", false);
        failed.error = Some("Step failed: check_balance:42 - Assertion failed".to_string());

        let kept = keep_result_after_close(
            failed,
            Err(E2eError::Playwright("session script exited unexpectedly".to_string())),
        );
        assert!(!kept.success);
        assert!(kept.error.unwrap().contains("check_balance:42"));

        let kept = keep_result_after_close(scenario("ok", true), Ok(()));
        assert!(kept.success);
    }

    #[test]
    fn test_libtest_arguments_do_not_request_a_run() {
        let args = ["e2e", "some_name", "--test-threads=1", "--exact", "--format", "terse"];
        assert!(!base_url_requested(args, None));
        assert!(!base_url_requested(args, Some("  ")));
    }

    #[test]
    fn test_base_url_from_flag_or_env() {
        assert!(base_url_requested(["e2e", "--base-url", "http://localhost:3000"], None));
        assert!(base_url_requested(["e2e", "--base-url=http://localhost:3000"], None));
        assert!(base_url_requested(["e2e", "filter"], Some("https://staging.example.org")));
    }

    #[tokio::test]
    async fn test_email_scenario_without_mailtrap_is_config_error() {
        let runner = ScenarioRunner::with_config(RunnerConfig::default()).unwrap();
        let scenario = Scenario::from_yaml(
            "name: mail\nsteps:\n  - action: email_body_contains\n    text: receipt\n",
        )
        .unwrap();

        let err = runner.run_scenario(&scenario).await.unwrap_err();
        assert!(matches!(err, E2eError::Config(_)));
    }
}
