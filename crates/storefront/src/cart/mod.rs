//! Cart page state: the debounced quantity synchronizer and its views.

pub mod sync;
pub mod view;

pub use sync::{CartBackend, CartSync, FailedUpdate, FlushReport, QuantityChange, SyncError};
pub use view::{CartRowView, CartView, SummaryView};
