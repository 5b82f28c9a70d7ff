//! Browser interaction primitives shared by all page objects

use async_trait::async_trait;

use crate::error::E2eResult;

/// The check and action primitives page objects are written against.
///
/// Waiting and retrying, if any, belong to the implementation. A failed
/// check comes back as [`E2eError::AssertionFailed`](crate::E2eError::AssertionFailed)
/// or [`E2eError::Timeout`](crate::E2eError::Timeout).
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Load `url`, relative to the driver's base URL unless absolute
    async fn navigate(&self, url: &str) -> E2eResult<()>;

    /// The current URL contains `fragment`
    async fn check_url(&self, fragment: &str) -> E2eResult<()>;

    /// The element matched by `selector` has exactly `expected` as its text
    async fn check_selector_content(&self, selector: &str, expected: &str) -> E2eResult<()>;

    async fn click_selector(&self, selector: &str) -> E2eResult<()>;

    /// Replace the value of the input matched by `selector`
    async fn input_selector_value(&self, selector: &str, value: &str) -> E2eResult<()>;
}
