//! Checkout success page ("thanks" page shown after a donation)

use std::fmt::Display;

use tracing::debug;

use crate::error::E2eResult;
use crate::support::PageDriver;

// selectors
pub const CREATE_ACCOUNT_BUTTON_SELECTOR: &str = "#createAccountButton";
pub const SET_PASSWORD_BUTTON_SELECTOR: &str = "#setPasswordButton";
pub const STATUS_SELECTOR: &str = ".c-main .b-rt-0:first-of-type .b-bold";
pub const PASSWORD_SELECTOR: &str = "#password";

// checks
pub const BALANCE_PREFIX: &str = "£";
pub const URL_MARKER: &str = "thanks";

/// Value typed into the password field
pub const TEST_PASSWORD: &str = "0123456789";

/// Expected status text for a donation of `amount`, e.g. `£42`.
///
/// The amount is rendered as-is; no rounding or grouping is applied.
pub fn balance_text(amount: impl Display) -> String {
    format!("{}{}", BALANCE_PREFIX, amount)
}

pub struct DonateSuccessPage<'a, D: PageDriver + ?Sized> {
    driver: &'a D,
}

impl<'a, D: PageDriver + ?Sized> DonateSuccessPage<'a, D> {
    pub fn new(driver: &'a D) -> Self {
        Self { driver }
    }

    /// Check the browser has landed on the success page
    pub async fn check_ready(&self) -> E2eResult<()> {
        self.driver.check_url(URL_MARKER).await
    }

    /// Check the status element shows the donated amount
    pub async fn check_balance(&self, amount: impl Display) -> E2eResult<()> {
        let expected = balance_text(amount);
        debug!("Expecting balance {}", expected);
        self.driver
            .check_selector_content(STATUS_SELECTOR, &expected)
            .await
    }

    /// Clicks on the 'Set a password' button
    pub async fn click_on_set_password_button(&self) -> E2eResult<()> {
        self.driver.click_selector(SET_PASSWORD_BUTTON_SELECTOR).await
    }

    pub async fn populate_password(&self) -> E2eResult<()> {
        self.driver
            .input_selector_value(PASSWORD_SELECTOR, TEST_PASSWORD)
            .await
    }

    /// Clicks on the 'Create account' button
    pub async fn click_on_create_account_button(&self) -> E2eResult<()> {
        self.driver.click_selector(CREATE_ACCOUNT_BUTTON_SELECTOR).await
    }
}
