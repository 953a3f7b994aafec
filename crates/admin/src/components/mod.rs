//! Reusable admin UI components.

pub mod data_table;

pub use data_table::{
    DataTableConfig, RemoveEmptyRow, SortKey, TableBody, TableColumn, TableQuery, TableRow, TableView,
};
