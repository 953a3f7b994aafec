//! Sellers manager.

use marketplace_core::AccountKind;

use crate::components::{DataTableConfig, TableColumn};
use crate::routes::accounts::AccountCollection;

/// Seller accounts: list, delete, activate/deactivate.
pub struct Sellers;

impl AccountCollection for Sellers {
    const KIND: AccountKind = AccountKind::Seller;
    const TITLE: &'static str = "Sellers";
    const BASE_PATH: &'static str = "/sellers";
    const TOGGLES: bool = true;

    fn table() -> DataTableConfig {
        DataTableConfig::new("sellers", Self::BASE_PATH)
            .column(TableColumn::sortable("username", "Username"))
            .column(TableColumn::sortable("name", "Name"))
            .column(TableColumn::sortable("email", "Email"))
            .column(TableColumn::sortable("store", "Store"))
            .column(TableColumn::sortable("joined", "Joined"))
            .column(TableColumn::sortable("status", "Status"))
            .search_placeholder("Search sellers by name, email or store...")
            .empty_state("No sellers found")
    }
}
