//! JSON wire format between the checkout proxy and its clients.
//!
//! Successful responses carry `{"checkout": {...}}` in the shape the
//! storefront front end has always consumed: `webUrl` for the checkout URL
//! and `lineItems.edges[].node` for lines. Failures carry an [`ErrorBody`]
//! whose `code` and HTTP status tell the client how to recover.
//!
//! The DTOs here are deliberately loose (`Option` everywhere). They are
//! turned into validated [`Cart`] values exactly once, via `TryFrom`.

use serde::{Deserialize, Serialize};

use crate::types::{
    Cart, CartCost, CartDataError, CartId, CartLine, CartLineId, Image, Merchandise,
    MerchandiseProduct, Money, Quantity, VariantId,
};

/// Proxy endpoint paths.
pub mod paths {
    /// Create a cart, optionally with a first line.
    pub const CREATE: &str = "/api/checkout/create";
    /// Add a line, creating the cart when no ID is given.
    pub const ADD: &str = "/api/checkout/add";
    /// Fetch a cart by ID.
    pub const GET: &str = "/api/checkout/get";
    /// Change a line's quantity.
    pub const UPDATE_QUANTITY: &str = "/api/checkout/update-quantity";
    /// Remove a line.
    pub const REMOVE_LINE: &str = "/api/checkout/remove-line";
}

// =============================================================================
// Requests
// =============================================================================

/// Body of `POST /api/checkout/create`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCartRequest {
    /// Variant for an initial line.
    pub variant_id: Option<String>,
    /// Quantity for the initial line (default 1).
    pub quantity: Option<i64>,
}

/// Body of `POST /api/checkout/add`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddLineRequest {
    /// Existing cart; `None` creates a new cart.
    pub checkout_id: Option<String>,
    /// Variant to add.
    pub variant_id: Option<String>,
    /// Quantity (default 1).
    pub quantity: Option<i64>,
}

/// Body of `POST /api/checkout/get`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetCartRequest {
    /// Cart to fetch.
    pub checkout_id: Option<String>,
}

/// Body of `POST /api/checkout/update-quantity`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuantityRequest {
    /// Cart containing the line.
    pub cart_id: Option<String>,
    /// Line to update.
    pub line_id: Option<String>,
    /// New quantity, at least 1.
    pub quantity: Option<i64>,
}

/// Body of `POST /api/checkout/remove-line`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveLineRequest {
    /// Cart containing the line.
    pub cart_id: Option<String>,
    /// Line to remove.
    pub line_id: Option<String>,
}

// =============================================================================
// Successful responses
// =============================================================================

/// `{"checkout": ...}` success envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutEnvelope {
    /// The cart.
    pub checkout: CheckoutDto,
}

/// Relay-style connection (`edges[].node`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection<T> {
    /// Edges in server order.
    #[serde(default = "Vec::new")]
    pub edges: Vec<Edge<T>>,
}

impl<T> Default for Connection<T> {
    fn default() -> Self {
        Self { edges: Vec::new() }
    }
}

/// A connection edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge<T> {
    /// The item.
    pub node: T,
}

/// Money as sent on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyDto {
    /// Decimal string.
    pub amount: String,
    /// ISO 4217 code.
    pub currency_code: String,
}

/// Image as sent on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDto {
    /// Image URL.
    pub url: String,
    /// Alt text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
}

/// Parent product of a line's variant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductDto {
    /// Product title.
    pub title: Option<String>,
    /// Product handle.
    pub handle: Option<String>,
}

/// `... on ProductVariant` merchandise selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MerchandiseDto {
    /// Variant ID.
    pub id: Option<String>,
    /// Variant title.
    pub title: Option<String>,
    /// Variant image.
    pub image: Option<ImageDto>,
    /// Unit price.
    #[serde(rename = "priceV2")]
    pub price: Option<MoneyDto>,
    /// Parent product.
    pub product: Option<ProductDto>,
}

/// Cost block of a line.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineCostDto {
    /// Line total.
    pub total_amount: Option<MoneyDto>,
}

/// A cart line node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LineItemDto {
    /// Line ID.
    pub id: Option<String>,
    /// Quantity.
    pub quantity: Option<i64>,
    /// Cost block.
    pub cost: Option<LineCostDto>,
    /// Variant snapshot.
    pub merchandise: Option<MerchandiseDto>,
}

/// Cost block of a cart.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartCostDto {
    /// Total amount.
    pub total_amount: Option<MoneyDto>,
    /// Subtotal amount.
    pub subtotal_amount: Option<MoneyDto>,
}

/// A cart in the proxy's checkout shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutDto {
    /// Cart ID.
    pub id: Option<String>,
    /// Checkout URL.
    pub web_url: Option<String>,
    /// Lines.
    #[serde(default)]
    pub line_items: Connection<LineItemDto>,
    /// Cost summary.
    pub cost: Option<CartCostDto>,
}

// =============================================================================
// Error responses
// =============================================================================

/// Machine-readable failure code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The cart ID no longer refers to a live cart.
    CartExpired,
    /// Shopify is throttling requests.
    Throttled,
    /// No cart with that ID.
    NotFound,
    /// Shopify accepted the request but could not allocate stock.
    OutOfStock,
    /// The request body was missing fields or Shopify rejected the input.
    InvalidInput,
    /// Anything else that went wrong upstream.
    UpstreamError,
    /// A code this client does not know.
    #[serde(other)]
    Unknown,
}

/// A `userErrors` entry forwarded from Shopify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserErrorDto {
    /// Human-readable message.
    pub message: String,
    /// Field path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<Vec<String>>,
    /// Shopify error code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// The `error` member, which older proxy versions sent as either a string or
/// the raw `userErrors` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorMessage {
    /// Plain message.
    Text(String),
    /// Shopify user errors.
    UserErrors(Vec<UserErrorDto>),
    /// Anything else (e.g. raw GraphQL errors).
    Other(serde_json::Value),
}

impl ErrorMessage {
    /// Flatten to a single display string.
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::UserErrors(errors) => errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; "),
            Self::Other(serde_json::Value::String(s)) => s.clone(),
            Self::Other(value) => value.to_string(),
        }
    }
}

/// Error body returned with every non-2xx proxy response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// What went wrong.
    pub error: ErrorMessage,
    /// Machine-readable code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    /// Longer explanation, when the proxy has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// The client must drop its stored cart ID.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub clear_cart: bool,
}

impl ErrorBody {
    /// Plain error with a code.
    #[must_use]
    pub fn new(message: impl Into<String>, code: ErrorCode) -> Self {
        Self {
            error: ErrorMessage::Text(message.into()),
            code: Some(code),
            details: None,
            clear_cart: code == ErrorCode::CartExpired,
        }
    }

    /// Attach details.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

// =============================================================================
// Validation
// =============================================================================

fn required(value: Option<String>, field: &'static str) -> Result<String, CartDataError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(CartDataError::MissingField(field)),
    }
}

fn money(dto: Option<MoneyDto>, field: &'static str) -> Result<Money, CartDataError> {
    let dto = dto.ok_or(CartDataError::MissingField(field))?;
    Money::parse(&dto.amount, &dto.currency_code)
        .map_err(|source| CartDataError::InvalidMoney { field, source })
}

impl TryFrom<LineItemDto> for CartLine {
    type Error = CartDataError;

    fn try_from(dto: LineItemDto) -> Result<Self, Self::Error> {
        let id = required(dto.id, "line.id")?;
        let quantity = dto
            .quantity
            .ok_or(CartDataError::MissingField("line.quantity"))
            .and_then(|q| {
                Quantity::from_i64(q).map_err(|source| CartDataError::InvalidQuantity {
                    line: id.clone(),
                    source,
                })
            })?;

        let merchandise = dto
            .merchandise
            .ok_or(CartDataError::MissingField("line.merchandise"))?;
        let product = merchandise.product.unwrap_or_default();

        let total_amount = match dto.cost.and_then(|c| c.total_amount) {
            Some(total) => Some(money(Some(total), "line.cost.totalAmount")?),
            None => None,
        };

        Ok(Self {
            id: CartLineId::new(id),
            quantity,
            merchandise: Merchandise {
                id: VariantId::new(required(merchandise.id, "line.merchandise.id")?),
                title: merchandise.title.unwrap_or_default(),
                image: merchandise.image.map(|img| Image {
                    url: img.url,
                    alt_text: img.alt_text,
                }),
                price: money(merchandise.price, "line.merchandise.priceV2")?,
                product: MerchandiseProduct {
                    title: product.title.unwrap_or_default(),
                    handle: product.handle.unwrap_or_default(),
                },
            },
            total_amount,
        })
    }
}

impl TryFrom<CheckoutDto> for Cart {
    type Error = CartDataError;

    fn try_from(dto: CheckoutDto) -> Result<Self, Self::Error> {
        let id = required(dto.id, "id")?;
        let checkout_url = required(dto.web_url, "webUrl")?;
        let cost = dto.cost.ok_or(CartDataError::MissingField("cost"))?;

        let lines = dto
            .line_items
            .edges
            .into_iter()
            .map(|edge| CartLine::try_from(edge.node))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id: CartId::new(id),
            checkout_url,
            cost: CartCost {
                subtotal: money(cost.subtotal_amount, "cost.subtotalAmount")?,
                total: money(cost.total_amount, "cost.totalAmount")?,
            },
            lines,
        })
    }
}

fn money_dto(money: &Money) -> MoneyDto {
    MoneyDto {
        amount: money.amount.to_string(),
        currency_code: money.currency_code.clone(),
    }
}

impl From<&Cart> for CheckoutDto {
    fn from(cart: &Cart) -> Self {
        Self {
            id: Some(cart.id.to_string()),
            web_url: Some(cart.checkout_url.clone()),
            line_items: Connection {
                edges: cart
                    .lines
                    .iter()
                    .map(|line| Edge {
                        node: LineItemDto {
                            id: Some(line.id.to_string()),
                            quantity: Some(i64::from(line.quantity)),
                            cost: Some(LineCostDto {
                                total_amount: line.total_amount.as_ref().map(money_dto),
                            }),
                            merchandise: Some(MerchandiseDto {
                                id: Some(line.merchandise.id.to_string()),
                                title: Some(line.merchandise.title.clone()),
                                image: line.merchandise.image.as_ref().map(|img| ImageDto {
                                    url: img.url.clone(),
                                    alt_text: img.alt_text.clone(),
                                }),
                                price: Some(money_dto(&line.merchandise.price)),
                                product: Some(ProductDto {
                                    title: Some(line.merchandise.product.title.clone()),
                                    handle: Some(line.merchandise.product.handle.clone()),
                                }),
                            }),
                        },
                    })
                    .collect(),
            },
            cost: Some(CartCostDto {
                total_amount: Some(money_dto(&cart.cost.total)),
                subtotal_amount: Some(money_dto(&cart.cost.subtotal)),
            }),
        }
    }
}

impl From<&Cart> for CheckoutEnvelope {
    fn from(cart: &Cart) -> Self {
        Self {
            checkout: CheckoutDto::from(cart),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::types::QuantityError;

    fn checkout_json(quantity: i64) -> serde_json::Value {
        json!({
            "checkout": {
                "id": "gid://shopify/Cart/c1",
                "webUrl": "https://shop.example/cart/c/c1",
                "cost": {
                    "totalAmount": { "amount": "20.0", "currencyCode": "USD" },
                    "subtotalAmount": { "amount": "20.0", "currencyCode": "USD" }
                },
                "lineItems": { "edges": [ { "node": {
                    "id": "gid://shopify/CartLine/l1",
                    "quantity": quantity,
                    "cost": { "totalAmount": { "amount": "20.0", "currencyCode": "USD" } },
                    "merchandise": {
                        "id": "gid://shopify/ProductVariant/v1",
                        "title": "Large",
                        "image": { "url": "https://cdn.example/v1.png", "altText": null },
                        "priceV2": { "amount": "10.0", "currencyCode": "USD" },
                        "product": { "title": "Candle", "handle": "candle" }
                    }
                } } ] }
            }
        })
    }

    #[test]
    fn test_checkout_envelope_validates() {
        let envelope: CheckoutEnvelope = serde_json::from_value(checkout_json(2)).unwrap();
        let cart = Cart::try_from(envelope.checkout).unwrap();
        assert_eq!(cart.id.as_str(), "gid://shopify/Cart/c1");
        assert_eq!(cart.total_quantity(), 2);
        let line = cart.lines.first().unwrap();
        assert_eq!(line.merchandise.product.handle, "candle");
        assert_eq!(line.line_total().to_string(), "20.00 USD");
    }

    #[test]
    fn test_zero_quantity_line_rejected() {
        let envelope: CheckoutEnvelope = serde_json::from_value(checkout_json(0)).unwrap();
        let err = Cart::try_from(envelope.checkout).unwrap_err();
        assert_eq!(
            err,
            CartDataError::InvalidQuantity {
                line: "gid://shopify/CartLine/l1".to_string(),
                source: QuantityError::Zero,
            }
        );
    }

    #[test]
    fn test_missing_cost_rejected() {
        let dto = CheckoutDto {
            id: Some("gid://shopify/Cart/c1".to_string()),
            web_url: Some("https://shop.example".to_string()),
            ..CheckoutDto::default()
        };
        assert_eq!(
            Cart::try_from(dto).unwrap_err(),
            CartDataError::MissingField("cost")
        );
    }

    #[test]
    fn test_blank_id_rejected() {
        let dto = CheckoutDto {
            id: Some("  ".to_string()),
            ..CheckoutDto::default()
        };
        assert_eq!(
            Cart::try_from(dto).unwrap_err(),
            CartDataError::MissingField("id")
        );
    }

    #[test]
    fn test_missing_line_total_is_allowed() {
        let mut value = checkout_json(3);
        value["checkout"]["lineItems"]["edges"][0]["node"]["cost"] = json!(null);
        let envelope: CheckoutEnvelope = serde_json::from_value(value).unwrap();
        let cart = Cart::try_from(envelope.checkout).unwrap();
        let line = cart.lines.first().unwrap();
        assert!(line.total_amount.is_none());
        assert_eq!(line.line_total().to_string(), "30.00 USD");
    }

    #[test]
    fn test_cart_back_to_wire_keeps_shape() {
        let envelope: CheckoutEnvelope = serde_json::from_value(checkout_json(1)).unwrap();
        let cart = Cart::try_from(envelope.checkout).unwrap();
        let json = serde_json::to_value(CheckoutEnvelope::from(&cart)).unwrap();
        assert_eq!(json["checkout"]["webUrl"], "https://shop.example/cart/c/c1");
        assert_eq!(
            json["checkout"]["lineItems"]["edges"][0]["node"]["merchandise"]["priceV2"]["amount"],
            "10.0"
        );
    }

    #[test]
    fn test_error_body_accepts_user_error_list() {
        let body: ErrorBody = serde_json::from_value(json!({
            "error": [ { "message": "Variant is sold out", "field": ["lines", "0"] } ]
        }))
        .unwrap();
        assert_eq!(body.error.text(), "Variant is sold out");
        assert_eq!(body.code, None);
        assert!(!body.clear_cart);
    }

    #[test]
    fn test_error_body_unknown_code() {
        let body: ErrorBody = serde_json::from_value(json!({
            "error": "nope",
            "code": "SOMETHING_NEW"
        }))
        .unwrap();
        assert_eq!(body.code, Some(ErrorCode::Unknown));
    }

    #[test]
    fn test_cart_expired_sets_clear_flag() {
        let json = serde_json::to_value(ErrorBody::new("Cart expired.", ErrorCode::CartExpired))
            .unwrap();
        assert_eq!(json["code"], "CART_EXPIRED");
        assert_eq!(json["clearCart"], true);

        let json = serde_json::to_value(ErrorBody::new("slow down", ErrorCode::Throttled)).unwrap();
        assert!(json.get("clearCart").is_none());
    }
}
