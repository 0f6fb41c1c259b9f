//! Cart route handlers.
//!
//! The cart lives in the visitor's session (see [`CartStore`]). Mutations
//! answer with HTMX fragments and fire a `cart-updated` event so the header
//! badge refreshes itself.

use std::str::FromStr;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    response::{AppendHeaders, IntoResponse},
};
use lunchbox_core::{Cart, CanteenId, MenuItem, MenuItemId, Price};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use super::context::PageContext;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::stores::CartStore;

const CART_UPDATED: (&str, &str) = ("HX-Trigger", "cart-updated");

/// Highest unit price accepted from the add-to-cart form, in rupees.
const MAX_ITEM_PRICE: Decimal = Decimal::from_parts(100_000, 0, 0, false, 0);

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    pub id: String,
    pub name: String,
    pub price: String,
    pub quantity: u32,
    pub line_total: String,
    pub image_url: Option<String>,
    pub is_veg: Option<bool>,
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: String,
    pub tax: String,
    pub total: String,
    pub item_count: u32,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart
                .items()
                .iter()
                .map(|item| CartItemView {
                    id: item.id.to_string(),
                    name: item.name.clone(),
                    price: item.price.display(),
                    quantity: item.quantity,
                    line_total: item
                        .line_total()
                        .map_or_else(String::new, |total| total.display()),
                    image_url: item.image_url.clone(),
                    is_veg: item.is_veg,
                })
                .collect(),
            subtotal: cart.subtotal().display(),
            tax: cart.tax().display(),
            total: cart.total().display(),
            item_count: cart.item_count(),
        }
    }
}

/// Add to cart form data. The menu item travels with the button that adds it.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub item_id: String,
    pub name: String,
    pub price: String,
    pub canteen_id: String,
    pub image_url: Option<String>,
    pub is_veg: Option<bool>,
}

impl AddToCartForm {
    fn into_menu_item(self) -> Result<MenuItem> {
        let id = MenuItemId::new(self.item_id.trim());
        let canteen_id = CanteenId::new(self.canteen_id.trim());
        if id.is_empty() || canteen_id.is_empty() {
            return Err(AppError::BadRequest(
                "Item and canteen are required".to_string(),
            ));
        }
        let price = Decimal::from_str(self.price.trim())
            .map_err(|_| AppError::BadRequest(format!("Invalid price: {}", self.price)))?;
        if price > MAX_ITEM_PRICE {
            return Err(AppError::BadRequest(format!(
                "Price above {}",
                Price::new(MAX_ITEM_PRICE)
            )));
        }

        Ok(MenuItem {
            id,
            name: self.name.trim().to_string(),
            price: Price::new(price),
            canteen_id,
            image_url: self.image_url.filter(|u| !u.trim().is_empty()),
            is_veg: self.is_veg,
        })
    }
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub item_id: String,
    pub quantity: i64,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub item_id: String,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub page: PageContext,
    pub cart: CartView,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

fn items_fragment(store: &CartStore) -> impl IntoResponse + use<> {
    (
        AppendHeaders([CART_UPDATED]),
        CartItemsTemplate {
            cart: CartView::from(store.cart()),
        },
    )
}

/// Display cart page.
#[instrument(skip_all)]
pub async fn show(page: PageContext, store: CartStore) -> impl IntoResponse {
    CartShowTemplate {
        page,
        cart: CartView::from(store.cart()),
    }
}

/// Add one unit of an item (HTMX).
///
/// Answers `409` with the one-canteen notice when the item is from a
/// different canteen than the cart; nothing changes in that case.
#[instrument(skip_all, fields(item_id = %form.item_id, canteen_id = %form.canteen_id))]
pub async fn add(
    mut store: CartStore,
    Form(form): Form<AddToCartForm>,
) -> Result<impl IntoResponse> {
    let item = form.into_menu_item()?;
    let item_id = item.id.to_string();
    store.add_item(item).await?;

    add_breadcrumb("cart", "Added item", Some(&[("item_id", item_id.as_str())]));

    Ok((
        AppendHeaders([CART_UPDATED]),
        CartCountTemplate {
            count: store.cart().item_count(),
        },
    ))
}

/// Set an item's quantity (HTMX).
#[instrument(skip_all, fields(item_id = %form.item_id, quantity = form.quantity))]
pub async fn update(
    mut store: CartStore,
    Form(form): Form<UpdateCartForm>,
) -> Result<impl IntoResponse> {
    store
        .update_quantity(&MenuItemId::new(form.item_id.as_str()), form.quantity)
        .await?;
    add_breadcrumb(
        "cart",
        "Updated quantity",
        Some(&[("item_id", form.item_id.as_str())]),
    );
    Ok(items_fragment(&store))
}

/// Remove an item (HTMX). Removing an item that isn't there is a no-op.
#[instrument(skip_all, fields(item_id = %form.item_id))]
pub async fn remove(
    mut store: CartStore,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<impl IntoResponse> {
    if store
        .remove_item(&MenuItemId::new(form.item_id.as_str()))
        .await?
    {
        add_breadcrumb(
            "cart",
            "Removed item",
            Some(&[("item_id", form.item_id.as_str())]),
        );
    }
    Ok(items_fragment(&store))
}

/// Empty the cart (HTMX).
#[instrument(skip_all)]
pub async fn clear(mut store: CartStore) -> Result<impl IntoResponse> {
    store.clear().await?;
    add_breadcrumb("cart", "Cleared cart", None);
    Ok(items_fragment(&store))
}

/// Cart count badge (HTMX).
pub async fn count(store: CartStore) -> impl IntoResponse {
    CartCountTemplate {
        count: store.cart().item_count(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(price: &str) -> AddToCartForm {
        AddToCartForm {
            item_id: " masala-dosa ".to_string(),
            name: "Masala Dosa".to_string(),
            price: price.to_string(),
            canteen_id: "C1".to_string(),
            image_url: Some(String::new()),
            is_veg: Some(true),
        }
    }

    #[test]
    fn test_form_becomes_menu_item() {
        let item = form("45.50").into_menu_item().unwrap();
        assert_eq!(item.id.as_str(), "masala-dosa");
        assert_eq!(item.price.display(), "₹45.50");
        assert!(item.image_url.is_none());
    }

    #[test]
    fn test_unparseable_price_is_bad_request() {
        let err = form("forty").into_menu_item().unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_absurd_price_is_bad_request() {
        let err = form("79228162514264337593543950335")
            .into_menu_item()
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let item = form("100000").into_menu_item().unwrap();
        assert_eq!(item.price.display(), "₹100000.00");
        assert!(form("100000.01").into_menu_item().is_err());
    }

    #[test]
    fn test_cart_view_formats_totals() {
        let mut cart = Cart::new();
        cart.add_item(form("100").into_menu_item().unwrap()).unwrap();
        cart.add_item(form("100").into_menu_item().unwrap()).unwrap();

        let view = CartView::from(&cart);
        assert_eq!(view.item_count, 2);
        assert_eq!(view.subtotal, "₹200.00");
        assert_eq!(view.tax, "₹10.00");
        assert_eq!(view.total, "₹210.00");
        assert_eq!(view.items[0].line_total, "₹200.00");
    }
}
