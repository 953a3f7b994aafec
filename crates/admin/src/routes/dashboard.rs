//! Dashboard route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use marketplace_client::{ApiError, ProductQuery};
use marketplace_core::AccountKind;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::middleware::{PageContext, RequireAdminAuth};
use crate::state::AppState;

/// One entity count on the dashboard.
#[derive(Debug, Clone)]
pub struct MetricCard {
    pub label: &'static str,
    /// Count, or `-` when it could not be loaded.
    pub value: String,
    pub href: &'static str,
    pub failed: bool,
}

impl MetricCard {
    /// Card for a count that may have failed to load. An expired login is
    /// passed through so the whole page redirects.
    fn from_count(
        label: &'static str,
        href: &'static str,
        count: std::result::Result<u64, ApiError>,
    ) -> Result<Self> {
        match count {
            Ok(count) => Ok(Self {
                label,
                value: count.to_string(),
                href,
                failed: false,
            }),
            Err(ApiError::Unauthorized) => Err(ApiError::Unauthorized.into()),
            Err(e) => {
                tracing::warn!(error = %e, label, "Failed to load dashboard count");
                Ok(Self {
                    label,
                    value: "-".to_string(),
                    href,
                    failed: true,
                })
            }
        }
    }
}

/// Dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub ctx: PageContext,
    pub cards: Vec<MetricCard>,
}

/// Entity counts, loaded concurrently.
///
/// GET /
#[instrument(skip_all)]
pub async fn dashboard(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    ctx: PageContext,
) -> Result<DashboardTemplate> {
    let accounts = state.accounts(&admin);
    let catalog = state.catalog(&admin);
    let product_count = ProductQuery {
        size: 1,
        ..ProductQuery::default()
    };

    let (buyers, sellers, admins, products, categories) = tokio::join!(
        accounts.list(AccountKind::Buyer),
        accounts.list(AccountKind::Seller),
        accounts.list(AccountKind::Admin),
        catalog.list_products(&product_count),
        catalog.list_categories(),
    );

    let len = |items: usize| items as u64;
    let cards = vec![
        MetricCard::from_count("Buyers", "/buyers", buyers.map(|v| len(v.len())))?,
        MetricCard::from_count("Sellers", "/sellers", sellers.map(|v| len(v.len())))?,
        MetricCard::from_count("Products", "/products", products.map(|page| page.total_items))?,
        MetricCard::from_count(
            "Categories",
            "/categories",
            categories.map(|v| len(v.len())),
        )?,
        MetricCard::from_count("Admins", "/admins", admins.map(|v| len(v.len())))?,
    ];

    Ok(DashboardTemplate { ctx, cards })
}
