//! Login overlay visibility.

use axum::{
    Form,
    http::{HeaderMap, header::REFERER},
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;

use super::context::local_path;
use crate::error::Result;
use crate::stores::LoginModal;

/// Optional explicit return path; the referring page is used otherwise.
#[derive(Debug, Default, Deserialize)]
pub struct ModalForm {
    pub return_to: Option<String>,
}

/// Path of the page to go back to: the form's `return_to`, else the
/// referrer's path when it is on this site.
fn return_path(headers: &HeaderMap, form: &ModalForm) -> String {
    if let Some(path) = form.return_to.as_deref() {
        return local_path(Some(path)).to_string();
    }

    let referer = headers
        .get(REFERER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| url::Url::parse(v).ok());
    let path = referer.as_ref().map(|url| match url.query() {
        Some(query) => format!("{}?{query}", url.path()),
        None => url.path().to_string(),
    });
    local_path(path.as_deref()).to_string()
}

/// Show the login overlay.
pub async fn open(
    headers: HeaderMap,
    mut modal: LoginModal,
    Form(form): Form<ModalForm>,
) -> Result<impl IntoResponse> {
    modal.open().await?;
    Ok(Redirect::to(&return_path(&headers, &form)))
}

/// Hide the login overlay.
pub async fn close(
    headers: HeaderMap,
    mut modal: LoginModal,
    Form(form): Form<ModalForm>,
) -> Result<impl IntoResponse> {
    modal.close().await?;
    Ok(Redirect::to(&return_path(&headers, &form)))
}
