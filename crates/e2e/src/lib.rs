//! Donation checkout E2E support
//!
//! This crate provides the pieces checkout scenarios are written with:
//! - Page objects that name page interactions instead of raw selectors
//! - A Playwright-backed browser session implementing those interactions
//! - A Mailtrap client for asserting on the emails the flow sends
//! - A runner for declarative YAML scenarios
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Scenario Runner (Rust)                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ScenarioRunner                                             │
//! │    ├── PlaywrightDriver::launch() -> impl PageDriver        │
//! │    ├── DonateSuccessPage::new(&driver)                      │
//! │    │     ├── check_ready / check_balance(amount)            │
//! │    │     └── populate_password / click_on_*_button          │
//! │    └── MailtrapClient                                       │
//! │          ├── latest_messages(count)                         │
//! │          └── any_subject_contains / any_body_contains       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Scenario (YAML)                                            │
//! │    ├── name, description, tags                              │
//! │    └── steps: [Step]                                        │
//! │          ├── navigate { url }                               │
//! │          ├── check_ready / check_balance { amount }         │
//! │          ├── populate_password / click_create_account ...   │
//! │          └── email_subject_contains / email_body_contains   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod mailtrap;
pub mod pages;
pub mod playwright;
pub mod runner;
pub mod scenario;
pub mod support;

pub use config::MailtrapConfig;
pub use error::{E2eError, E2eResult};
pub use mailtrap::{MailtrapClient, Message};
pub use pages::DonateSuccessPage;
pub use playwright::PlaywrightDriver;
pub use runner::ScenarioRunner;
pub use scenario::{Scenario, Step};
pub use support::PageDriver;
