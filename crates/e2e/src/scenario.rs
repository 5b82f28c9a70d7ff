//! Declarative YAML checkout scenarios

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{E2eError, E2eResult};

/// A checkout scenario parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique name for this scenario
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering scenarios
    #[serde(default)]
    pub tags: Vec<String>,

    /// Steps to execute in order
    pub steps: Vec<Step>,
}

/// A single step in a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Navigate to a URL (relative to base)
    Navigate { url: String },

    /// The donation success page is showing
    CheckReady,

    /// The success page shows the donated amount, see [`display_amount`]
    CheckBalance { amount: serde_yaml::Number },

    ClickSetPassword,

    PopulatePassword,

    ClickCreateAccount,

    /// One of the latest emails has this text in its subject
    EmailSubjectContains { text: String },

    /// One of the latest emails has this text in its HTML body
    EmailBodyContains { text: String },

    /// Log a message (for debugging)
    Log { message: String },
}

impl Step {
    pub fn name(&self) -> String {
        match self {
            Step::Navigate { url } => format!("navigate:{}", url),
            Step::CheckReady => "check_ready".to_string(),
            Step::CheckBalance { amount } => format!("check_balance:{}", display_amount(amount)),
            Step::ClickSetPassword => "click_set_password".to_string(),
            Step::PopulatePassword => "populate_password".to_string(),
            Step::ClickCreateAccount => "click_create_account".to_string(),
            Step::EmailSubjectContains { text } => format!("email_subject_contains:{}", text),
            Step::EmailBodyContains { text } => format!("email_body_contains:{}", text),
            Step::Log { message } => format!("log:{}", message.chars().take(30).collect::<String>()),
        }
    }

    /// Whether this step talks to the Mailtrap inbox
    pub fn needs_mailbox(&self) -> bool {
        matches!(
            self,
            Step::EmailSubjectContains { .. } | Step::EmailBodyContains { .. }
        )
    }
}

/// Render an amount the way the page prints it: `42` and `42.0` both read
/// `42`, `12.5` stays `12.5`.
pub fn display_amount(amount: &serde_yaml::Number) -> String {
    match amount.as_f64() {
        Some(value) if amount.is_f64() && value.is_finite() && value.fract() == 0.0 => {
            format!("{:.0}", value)
        }
        _ => amount.to_string(),
    }
}

impl Scenario {
    /// Parse a scenario from YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let scenario: Self = serde_yaml::from_str(yaml)?;
        if scenario.steps.is_empty() {
            return Err(E2eError::ScenarioParse(format!(
                "scenario '{}' has no steps",
                scenario.name
            )));
        }
        Ok(scenario)
    }

    /// Parse a scenario from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content).map_err(|e| {
            E2eError::ScenarioParse(format!("{}: {}", path.display(), e))
        })
    }

    /// Load all scenarios from a directory
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut scenarios = Vec::new();

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
            scenarios.push(Self::from_file(entry.path())?);
        }

        Ok(scenarios)
    }

    /// Filter scenarios by tag
    pub fn filter_by_tag<'a>(scenarios: &'a [Self], tag: &str) -> Vec<&'a Self> {
        scenarios
            .iter()
            .filter(|s| s.tags.iter().any(|t| t == tag))
            .collect()
    }

    pub fn needs_mailbox(&self) -> bool {
        self.steps.iter().any(Step::needs_mailbox)
    }
}
