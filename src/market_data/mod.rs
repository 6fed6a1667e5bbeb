pub mod price_buffer;
pub mod tick_stream;

// Re-export for convenient access (e.g. `use crate::market_data::PriceBook`).
pub use price_buffer::{PriceBook, PriceBuffer, PRICE_BUFFER_CAPACITY};
