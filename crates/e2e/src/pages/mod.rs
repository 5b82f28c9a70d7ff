//! Page objects for the checkout flow

pub mod donate_success;

pub use donate_success::DonateSuccessPage;
