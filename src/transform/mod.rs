//! Reshape provider payloads into metric × period tables ready for a worksheet.

pub mod fundamentals;
pub mod yearly_prices;

pub use fundamentals::{fundamentals_table, FUNDAMENTAL_METRICS};
pub use yearly_prices::{yearly_price_table, YEARLY_PRICE_METRICS};
