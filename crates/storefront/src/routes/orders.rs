//! Order pages (signed-in students only).

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::Path;
use axum::response::IntoResponse;

use super::context::PageContext;
use crate::filters;
use crate::middleware::RequireProfile;

/// Order page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/show.html")]
pub struct OrderShowTemplate {
    pub page: PageContext,
    pub id: String,
}

/// Order page. Guests are sent to the login page.
pub async fn show(
    RequireProfile(_profile): RequireProfile,
    page: PageContext,
    Path(id): Path<String>,
) -> impl IntoResponse {
    OrderShowTemplate { page, id }
}
