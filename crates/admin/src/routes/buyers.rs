//! Buyers manager.

use marketplace_core::AccountKind;

use crate::components::{DataTableConfig, TableColumn};
use crate::routes::accounts::AccountCollection;

/// Buyer accounts: list, delete, activate/deactivate.
pub struct Buyers;

impl AccountCollection for Buyers {
    const KIND: AccountKind = AccountKind::Buyer;
    const TITLE: &'static str = "Buyers";
    const BASE_PATH: &'static str = "/buyers";
    const TOGGLES: bool = true;

    fn table() -> DataTableConfig {
        DataTableConfig::new("buyers", Self::BASE_PATH)
            .column(TableColumn::sortable("username", "Username"))
            .column(TableColumn::sortable("name", "Name"))
            .column(TableColumn::sortable("email", "Email"))
            .column(TableColumn::new("phone", "Phone"))
            .column(TableColumn::sortable("joined", "Joined"))
            .column(TableColumn::sortable("status", "Status"))
            .search_placeholder("Search buyers by name or email...")
            .empty_state("No buyers found")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_matches_row_cells() {
        // username, name, email, phone, joined, status + actions
        assert_eq!(Buyers::table().span(), 7);
    }
}
