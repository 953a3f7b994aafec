//! Data table component types.
//!
//! Every entity manager renders its list through the same table: a
//! [`DataTableConfig`] describes the columns, and a [`TableQuery`] taken
//! from the request's query string filters and sorts the rows before they
//! are rendered. Search and sort run here, on the already-fetched list; the
//! backend's admin endpoints return whole collections.

use askama::Template;
use serde::Deserialize;

/// Column definition for a data table.
#[derive(Debug, Clone)]
pub struct TableColumn {
    /// Sort key, passed back as `?sort=`.
    pub key: &'static str,
    /// Display label for the column header.
    pub label: &'static str,
    /// Whether the column is sortable.
    pub sortable: bool,
}

impl TableColumn {
    /// Create a new sortable column.
    #[must_use]
    pub const fn sortable(key: &'static str, label: &'static str) -> Self {
        Self {
            key,
            label,
            sortable: true,
        }
    }

    /// Create a new non-sortable column.
    #[must_use]
    pub const fn new(key: &'static str, label: &'static str) -> Self {
        Self {
            key,
            label,
            sortable: false,
        }
    }
}

/// Configuration for a data table.
#[derive(Debug, Clone)]
pub struct DataTableConfig {
    /// Unique table identifier; the body is `#{table_id}-body`.
    pub table_id: &'static str,
    /// Page the table lives on, used for search and sort links.
    pub base_path: &'static str,
    pub columns: Vec<TableColumn>,
    pub search_placeholder: &'static str,
    pub empty_title: &'static str,
}

impl DataTableConfig {
    /// Create a new data table configuration.
    #[must_use]
    pub const fn new(table_id: &'static str, base_path: &'static str) -> Self {
        Self {
            table_id,
            base_path,
            columns: Vec::new(),
            search_placeholder: "Search...",
            empty_title: "No items found",
        }
    }

    /// Add a column.
    #[must_use]
    pub fn column(mut self, column: TableColumn) -> Self {
        self.columns.push(column);
        self
    }

    /// Set search placeholder.
    #[must_use]
    pub const fn search_placeholder(mut self, placeholder: &'static str) -> Self {
        self.search_placeholder = placeholder;
        self
    }

    /// Set the empty state title.
    #[must_use]
    pub const fn empty_state(mut self, title: &'static str) -> Self {
        self.empty_title = title;
        self
    }

    /// Number of columns including the trailing actions column.
    #[must_use]
    pub fn span(&self) -> usize {
        self.columns.len() + 1
    }

    fn is_sortable(&self, key: &str) -> bool {
        self.columns.iter().any(|c| c.sortable && c.key == key)
    }

    /// Render `rows` into the table body.
    ///
    /// # Errors
    ///
    /// Returns the first row's render error.
    pub fn body<R: Template>(&self, rows: &[R]) -> Result<TableBody, askama::Error> {
        let mut rows_html = String::new();
        for row in rows {
            row.render_into(&mut rows_html)?;
        }
        Ok(TableBody {
            table_id: self.table_id,
            rows_html,
            empty: rows.is_empty(),
            span: self.span(),
            empty_title: self.empty_title,
            oob: false,
        })
    }

    /// The full table around an already rendered body.
    ///
    /// # Errors
    ///
    /// Returns the body's render error.
    pub fn view(&self, query: &TableQuery, body: &TableBody) -> Result<TableView, askama::Error> {
        Ok(TableView {
            table_id: self.table_id,
            base_path: self.base_path,
            search_placeholder: self.search_placeholder,
            search: query.search().to_string(),
            sort: query
                .sort
                .clone()
                .filter(|key| self.is_sortable(key)),
            dir: query.dir.as_str(),
            headers: self
                .columns
                .iter()
                .map(|column| ColumnHeader {
                    label: column.label,
                    link: column
                        .sortable
                        .then(|| query.sort_link(self, column)),
                    indicator: query.indicator(column),
                })
                .collect(),
            body_html: body.render()?,
        })
    }
}

/// `<tbody>` of a data table; also the response to a search request.
#[derive(Debug, Clone, Template)]
#[template(path = "partials/table_body.html")]
pub struct TableBody {
    pub table_id: &'static str,
    pub rows_html: String,
    pub empty: bool,
    pub span: usize,
    pub empty_title: &'static str,
    pub oob: bool,
}

impl TableBody {
    /// Send this body out of band, replacing the table's current rows.
    #[must_use]
    pub fn out_of_band(mut self) -> Self {
        self.oob = true;
        self
    }
}

/// Removes a table's "No items found" row once a row is inserted.
#[derive(Debug, Clone, Copy, Template)]
#[template(
    source = r#"<tr id="{{ table_id }}-empty" hx-swap-oob="delete"></tr>"#,
    ext = "html"
)]
pub struct RemoveEmptyRow {
    pub table_id: &'static str,
}

/// A column header with its sort link.
#[derive(Debug, Clone)]
pub struct ColumnHeader {
    pub label: &'static str,
    pub link: Option<String>,
    pub indicator: &'static str,
}

/// Everything `partials/data_table.html` renders.
#[derive(Debug, Clone)]
pub struct TableView {
    pub table_id: &'static str,
    pub base_path: &'static str,
    pub search_placeholder: &'static str,
    pub search: String,
    /// Active sort column, carried through searches.
    pub sort: Option<String>,
    pub dir: &'static str,
    pub headers: Vec<ColumnHeader>,
    pub body_html: String,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

/// A value rows are ordered by.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortKey {
    Number(i64),
    /// Compared case-insensitively.
    Text(String),
}

impl SortKey {
    pub fn text(value: &str) -> Self {
        Self::Text(value.to_lowercase())
    }
}

/// A row that can be searched and sorted.
pub trait TableRow {
    /// Text matched against the search box.
    fn search_text(&self) -> String;

    /// Sort value for the column `key`.
    fn sort_key(&self, key: &str) -> SortKey;
}

/// Search and sort parameters from the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub dir: SortDirection,
}

impl TableQuery {
    /// Trimmed search text; empty when not searching.
    #[must_use]
    pub fn search(&self) -> &str {
        self.q.as_deref().map_or("", str::trim)
    }

    /// Filter `rows` by the search text and order them by the sort column.
    /// Unknown or unsortable columns leave the backend's order.
    #[must_use]
    pub fn apply<R: TableRow>(&self, config: &DataTableConfig, rows: Vec<R>) -> Vec<R> {
        let needle = self.search().to_lowercase();
        let mut rows: Vec<R> = if needle.is_empty() {
            rows
        } else {
            rows.into_iter()
                .filter(|row| row.search_text().to_lowercase().contains(&needle))
                .collect()
        };

        if let Some(key) = self.sort.as_deref().filter(|k| config.is_sortable(k)) {
            rows.sort_by(|a, b| {
                let ordering = a.sort_key(key).cmp(&b.sort_key(key));
                match self.dir {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }
        rows
    }

    /// Header link for `column`: toggles the direction when the table is
    /// already sorted by it.
    #[must_use]
    pub fn sort_link(&self, config: &DataTableConfig, column: &TableColumn) -> String {
        let dir = if self.sort.as_deref() == Some(column.key) {
            self.dir.flipped()
        } else {
            SortDirection::Asc
        };
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        if !self.search().is_empty() {
            query.append_pair("q", self.search());
        }
        query.append_pair("sort", column.key);
        query.append_pair("dir", dir.as_str());
        format!("{}?{}", config.base_path, query.finish())
    }

    /// Arrow shown next to the sorted column's label.
    #[must_use]
    pub fn indicator(&self, column: &TableColumn) -> &'static str {
        match (self.sort.as_deref() == Some(column.key), self.dir) {
            (false, _) => "",
            (true, SortDirection::Asc) => "\u{25b2}",
            (true, SortDirection::Desc) => "\u{25bc}",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    struct Fruit(&'static str, i64);

    impl TableRow for Fruit {
        fn search_text(&self) -> String {
            self.0.to_string()
        }

        fn sort_key(&self, key: &str) -> SortKey {
            match key {
                "stock" => SortKey::Number(self.1),
                _ => SortKey::text(self.0),
            }
        }
    }

    fn config() -> DataTableConfig {
        DataTableConfig::new("fruit", "/fruit")
            .column(TableColumn::sortable("name", "Name"))
            .column(TableColumn::sortable("stock", "Stock"))
            .column(TableColumn::new("notes", "Notes"))
    }

    fn rows() -> Vec<Fruit> {
        vec![Fruit("Dates", 4), Fruit("apricots", 9), Fruit("Figs", 1)]
    }

    fn names(rows: &[Fruit]) -> Vec<&str> {
        rows.iter().map(|r| r.0).collect()
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let query = TableQuery {
            q: Some(" FIG ".to_string()),
            ..TableQuery::default()
        };
        assert_eq!(names(&query.apply(&config(), rows())), ["Figs"]);
    }

    #[test]
    fn test_sort_by_number_descending() {
        let query = TableQuery {
            sort: Some("stock".to_string()),
            dir: SortDirection::Desc,
            ..TableQuery::default()
        };
        assert_eq!(
            names(&query.apply(&config(), rows())),
            ["apricots", "Dates", "Figs"]
        );
    }

    #[test]
    fn test_unsortable_column_keeps_order() {
        let query = TableQuery {
            sort: Some("notes".to_string()),
            ..TableQuery::default()
        };
        assert_eq!(
            names(&query.apply(&config(), rows())),
            ["Dates", "apricots", "Figs"]
        );
    }

    #[derive(Template)]
    #[template(source = "<tr><td>{{ name }}</td></tr>", ext = "html")]
    struct RowTemplate {
        name: &'static str,
    }

    #[test]
    fn test_body_renders_rows_or_empty_state() {
        let config = config().empty_state("No fruit yet");
        let body = config
            .body(&[RowTemplate { name: "Dates" }, RowTemplate { name: "Figs" }])
            .unwrap();
        let html = body.render().unwrap();
        assert!(html.contains(r#"id="fruit-body""#));
        assert!(html.contains("<td>Figs</td>"));
        assert!(!html.contains("No fruit yet"));

        let empty = config.body::<RowTemplate>(&[]).unwrap().out_of_band();
        let html = empty.render().unwrap();
        assert!(html.contains("No fruit yet"));
        assert!(html.contains(r#"colspan="4""#));
        assert!(html.contains(r#"hx-swap-oob="true""#));
    }

    #[test]
    fn test_view_headers() {
        let config = config();
        let query = TableQuery {
            sort: Some("stock".to_string()),
            ..TableQuery::default()
        };
        let body = config.body::<RowTemplate>(&[]).unwrap();
        let view = config.view(&query, &body).unwrap();
        assert_eq!(view.headers.len(), 3);
        assert_eq!(view.headers[1].indicator, "\u{25b2}");
        assert!(view.headers[2].link.is_none());
        assert_eq!(view.sort.as_deref(), Some("stock"));
    }

    #[test]
    fn test_sort_link_toggles_direction() {
        let config = config();
        let name = &config.columns[0];
        let query = TableQuery {
            q: Some("a b".to_string()),
            sort: Some("name".to_string()),
            dir: SortDirection::Asc,
        };
        assert_eq!(query.sort_link(&config, name), "/fruit?q=a+b&sort=name&dir=desc");
        assert_eq!(query.indicator(name), "\u{25b2}");
        assert_eq!(
            TableQuery::default().sort_link(&config, &config.columns[1]),
            "/fruit?sort=stock&dir=asc"
        );
    }
}
