pub mod composer;
pub mod error;
pub mod format;
pub mod i18n;
pub mod models;
pub mod pricing;
pub mod rates;
pub mod store;

pub use error::{CoreError, Result};
pub use rust_decimal::Decimal;
