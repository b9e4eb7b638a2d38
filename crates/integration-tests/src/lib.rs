//! Test harness for shopcart.
//!
//! Runs the real checkout proxy against [`FakeShopify`], an in-process
//! stand-in for the Storefront Cart API that keeps carts in memory and can
//! be told to throttle, expire carts, or run out of stock.
//!
//! ```rust,no_run
//! use shopcart_integration_tests::{FakeShopify, TestProxy};
//!
//! # async fn demo() -> std::io::Result<()> {
//! let shop = FakeShopify::start().await?;
//! let proxy = TestProxy::start(&shop).await?;
//! let client = proxy.client().expect("valid base url");
//! # Ok(())
//! # }
//! ```

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{Json, Router, extract::State, routing::post};
use secrecy::SecretString;
use serde_json::{Value, json};
use shopcart_client::{ProxyClient, ProxyClientError};
use shopcart_storefront::config::{DEFAULT_API_VERSION, ShopifyStorefrontConfig};
use shopcart_storefront::state::AppState;
use tokio::net::TcpListener;
use url::Url;

/// Unit price of every fake variant, in cents.
pub const UNIT_PRICE_CENTS: i64 = 1200;
/// Currency of every fake cart.
pub const CURRENCY: &str = "USD";

const MISSING_CART_MESSAGE: &str = "The specified cart does not exist.";

#[derive(Debug, Clone)]
struct FakeLine {
    id: String,
    variant_id: String,
    quantity: i64,
}

#[derive(Debug, Default)]
struct ShopState {
    carts: HashMap<String, Vec<FakeLine>>,
    next_id: u64,
    throttle_next: usize,
    out_of_stock: HashSet<String>,
    operations: Vec<String>,
}

impl ShopState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn allocated(&self, variant_id: &str, quantity: i64) -> i64 {
        if self.out_of_stock.contains(variant_id) {
            0
        } else {
            quantity
        }
    }
}

/// In-memory Storefront Cart API.
#[derive(Debug, Clone)]
pub struct FakeShopify {
    url: Url,
    state: Arc<Mutex<ShopState>>,
}

impl FakeShopify {
    /// Serve the fake API on an ephemeral local port.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start() -> std::io::Result<Self> {
        let state = Arc::new(Mutex::new(ShopState::default()));
        let app = Router::new()
            .route("/api/graphql.json", post(graphql))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let url = Url::parse(&format!("http://{addr}/api/graphql.json"))
            .map_err(std::io::Error::other)?;
        Ok(Self { url, state })
    }

    /// GraphQL endpoint URL.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    fn lock(&self) -> MutexGuard<'_, ShopState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Forget a cart, as Shopify does when a cart expires.
    pub fn expire(&self, cart_id: &str) {
        self.lock().carts.remove(cart_id);
    }

    /// Answer the next `count` requests with a `THROTTLED` GraphQL error.
    pub fn throttle_next(&self, count: usize) {
        self.lock().throttle_next = count;
    }

    /// Allocate zero units of this variant from now on.
    pub fn mark_out_of_stock(&self, variant_id: &str) {
        self.lock().out_of_stock.insert(variant_id.to_string());
    }

    /// Operation names received so far, in order.
    #[must_use]
    pub fn operations(&self) -> Vec<String> {
        self.lock().operations.clone()
    }

    /// Number of live carts.
    #[must_use]
    pub fn cart_count(&self) -> usize {
        self.lock().carts.len()
    }
}

/// The checkout proxy wired to a [`FakeShopify`].
#[derive(Debug, Clone)]
pub struct TestProxy {
    base_url: String,
}

impl TestProxy {
    /// Serve the proxy router, without rate limiting, on an ephemeral port.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start(shop: &FakeShopify) -> std::io::Result<Self> {
        let config = ShopifyStorefrontConfig {
            store: "test-shop.myshopify.com".to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            storefront_private_token: SecretString::from("test-private-token"),
            endpoint_override: Some(shop.url().clone()),
        };
        let app = shopcart_storefront::router(AppState::new(&config), None);

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await;
        });

        Ok(Self {
            base_url: format!("http://{addr}"),
        })
    }

    /// Base URL, e.g. `http://127.0.0.1:41234`.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a proxy path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// A cart backend pointed at this proxy.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is rejected.
    pub fn client(&self) -> Result<ProxyClient, ProxyClientError> {
        ProxyClient::new(&self.base_url)
    }
}

// =============================================================================
// GraphQL handler
// =============================================================================

async fn graphql(State(state): State<Arc<Mutex<ShopState>>>, Json(body): Json<Value>) -> Json<Value> {
    let mut shop = state.lock().unwrap_or_else(PoisonError::into_inner);
    let operation = body["operationName"].as_str().unwrap_or_default().to_string();
    let variables = &body["variables"];
    shop.operations.push(operation.clone());

    if shop.throttle_next > 0 {
        shop.throttle_next -= 1;
        return Json(json!({
            "errors": [{
                "message": "Throttled",
                "extensions": { "code": "THROTTLED" }
            }]
        }));
    }

    let response = match operation.as_str() {
        "CreateCart" => {
            let id = format!("gid://shopify/Cart/{}", shop.next_id());
            let mut lines = Vec::new();
            for line in variables["input"]["lines"].as_array().into_iter().flatten() {
                let variant_id = line["merchandiseId"].as_str().unwrap_or_default();
                let quantity = shop.allocated(variant_id, line["quantity"].as_i64().unwrap_or(1));
                lines.push(FakeLine {
                    id: format!("gid://shopify/CartLine/{}", shop.next_id()),
                    variant_id: variant_id.to_string(),
                    quantity,
                });
            }
            let cart = cart_json(&id, &lines);
            shop.carts.insert(id, lines);
            json!({ "cartCreate": { "cart": cart, "userErrors": [] } })
        }
        "GetCart" => {
            let id = variables["cartId"].as_str().unwrap_or_default();
            let cart = shop.carts.get(id).map(|lines| cart_json(id, lines));
            json!({ "cart": cart })
        }
        "AddToCart" => mutate(&mut shop, "cartLinesAdd", variables, |shop, lines| {
            for line in variables["lines"].as_array().into_iter().flatten() {
                let variant_id = line["merchandiseId"].as_str().unwrap_or_default();
                let quantity = shop.allocated(variant_id, line["quantity"].as_i64().unwrap_or(1));
                match lines.iter_mut().find(|l| l.variant_id == variant_id) {
                    Some(existing) => existing.quantity += quantity,
                    None => lines.push(FakeLine {
                        id: format!("gid://shopify/CartLine/{}", shop.next_id()),
                        variant_id: variant_id.to_string(),
                        quantity,
                    }),
                }
            }
        }),
        "UpdateCartLines" => mutate(&mut shop, "cartLinesUpdate", variables, |_, lines| {
            for update in variables["lines"].as_array().into_iter().flatten() {
                let line_id = update["id"].as_str().unwrap_or_default();
                if let Some(line) = lines.iter_mut().find(|l| l.id == line_id) {
                    line.quantity = update["quantity"].as_i64().unwrap_or(line.quantity);
                }
            }
        }),
        "RemoveFromCart" => mutate(&mut shop, "cartLinesRemove", variables, |_, lines| {
            let ids: Vec<&str> = variables["lineIds"]
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(Value::as_str)
                .collect();
            lines.retain(|l| !ids.contains(&l.id.as_str()));
        }),
        other => {
            return Json(json!({
                "errors": [{ "message": format!("Unknown operation {other}") }]
            }));
        }
    };

    Json(json!({ "data": response }))
}

/// Apply a line mutation to an existing cart, or report the missing cart
/// the way Shopify does.
fn mutate(
    shop: &mut ShopState,
    field: &str,
    variables: &Value,
    apply: impl FnOnce(&mut ShopState, &mut Vec<FakeLine>),
) -> Value {
    let id = variables["cartId"].as_str().unwrap_or_default().to_string();
    let Some(mut lines) = shop.carts.remove(&id) else {
        return json!({
            (field): {
                "cart": null,
                "userErrors": [{
                    "message": MISSING_CART_MESSAGE,
                    "field": ["cartId"],
                    "code": "INVALID"
                }]
            }
        });
    };

    apply(shop, &mut lines);
    let cart = cart_json(&id, &lines);
    shop.carts.insert(id, lines);
    json!({ (field): { "cart": cart, "userErrors": [] } })
}

fn amount(cents: i64) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}

fn cart_json(id: &str, lines: &[FakeLine]) -> Value {
    let units: i64 = lines.iter().map(|l| l.quantity).sum();
    let total = amount(UNIT_PRICE_CENTS * units);

    let edges: Vec<Value> = lines
        .iter()
        .map(|line| {
            json!({ "node": {
                "id": line.id,
                "quantity": line.quantity,
                "cost": { "totalAmount": {
                    "amount": amount(UNIT_PRICE_CENTS * line.quantity),
                    "currencyCode": CURRENCY
                } },
                "merchandise": {
                    "id": line.variant_id,
                    "title": "Default Title",
                    "image": null,
                    "priceV2": { "amount": amount(UNIT_PRICE_CENTS), "currencyCode": CURRENCY },
                    "product": { "title": "Tee", "handle": "tee" }
                }
            } })
        })
        .collect();

    let token = id.rsplit('/').next().unwrap_or(id);
    json!({
        "id": id,
        "checkoutUrl": format!("https://test-shop.myshopify.com/cart/c/{token}"),
        "cost": {
            "totalAmount": { "amount": total, "currencyCode": CURRENCY },
            "subtotalAmount": { "amount": total, "currencyCode": CURRENCY }
        },
        "lines": { "edges": edges }
    })
}
