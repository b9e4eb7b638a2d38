//! GraphQL operations for the Storefront Cart API.
//!
//! Each operation implements [`GraphQLQuery`] with its query document and
//! typed variables/response data. Every cart-returning operation selects the
//! same `CartFields` fragment, so all of them produce the same payload.

use graphql_client::{GraphQLQuery, QueryBody};
use serde::{Deserialize, Serialize};
use shopcart_core::wire::{CartCostDto, CheckoutDto, Connection, LineItemDto, UserErrorDto};

macro_rules! cart_lines_limit {
    () => {
        50
    };
}

/// Lines fetched per cart.
pub const CART_LINES_LIMIT: u32 = cart_lines_limit!();

macro_rules! cart_fragment {
    () => {
        concat!(
            r"
fragment CartFields on Cart {
  id
  checkoutUrl
  cost {
    totalAmount { amount currencyCode }
    subtotalAmount { amount currencyCode }
  }
  lines(first: ",
            cart_lines_limit!(),
            r") {
    edges {
      node {
        id
        quantity
        cost {
          totalAmount { amount currencyCode }
        }
        merchandise {
          ... on ProductVariant {
            id
            title
            image { url altText }
            priceV2 { amount currencyCode }
            product { title handle }
          }
        }
      }
    }
  }
}
"
        )
    };
}

// =============================================================================
// Shared response types
// =============================================================================

/// A cart as selected by the `CartFields` fragment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartNode {
    pub id: String,
    pub checkout_url: String,
    pub cost: Option<CartCostDto>,
    #[serde(default)]
    pub lines: Connection<LineItemDto>,
}

impl CartNode {
    /// Whether any line came back with quantity 0, which is how Shopify
    /// reports a line it could not allocate stock for.
    #[must_use]
    pub fn has_unallocated_line(&self) -> bool {
        self.lines
            .edges
            .iter()
            .any(|edge| edge.node.quantity == Some(0))
    }
}

impl From<CartNode> for CheckoutDto {
    fn from(cart: CartNode) -> Self {
        Self {
            id: Some(cart.id),
            web_url: Some(cart.checkout_url),
            line_items: cart.lines,
            cost: cart.cost,
        }
    }
}

/// Payload shared by every cart mutation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartMutationPayload {
    pub cart: Option<CartNode>,
    #[serde(default)]
    pub user_errors: Vec<UserErrorDto>,
}

/// Input for a new cart line.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineInput {
    pub merchandise_id: String,
    pub quantity: i64,
}

/// Input for changing a line's quantity.
#[derive(Debug, Clone, Serialize)]
pub struct CartLineUpdateInput {
    pub id: String,
    pub quantity: i64,
}

// =============================================================================
// cartCreate
// =============================================================================

pub struct CreateCart;

pub mod create_cart {
    use super::{CartLineInput, CartMutationPayload, Deserialize, Serialize};

    pub const OPERATION_NAME: &str = "CreateCart";
    pub const QUERY: &str = concat!(
        r"
mutation CreateCart($input: CartInput!) {
  cartCreate(input: $input) {
    cart { ...CartFields }
    userErrors { message field code }
  }
}
",
        cart_fragment!()
    );

    #[derive(Debug, Clone, Serialize)]
    pub struct Variables {
        pub input: CartInput,
    }

    #[derive(Debug, Clone, Default, Serialize)]
    pub struct CartInput {
        pub lines: Vec<CartLineInput>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub cart_create: Option<CartMutationPayload>,
    }
}

impl GraphQLQuery for CreateCart {
    type Variables = create_cart::Variables;
    type ResponseData = create_cart::ResponseData;

    fn build_query(variables: Self::Variables) -> QueryBody<Self::Variables> {
        QueryBody {
            variables,
            query: create_cart::QUERY,
            operation_name: create_cart::OPERATION_NAME,
        }
    }
}

// =============================================================================
// cart(id)
// =============================================================================

pub struct GetCart;

pub mod get_cart {
    use super::{CartNode, Deserialize, Serialize};

    pub const OPERATION_NAME: &str = "GetCart";
    pub const QUERY: &str = concat!(
        r"
query GetCart($cartId: ID!) {
  cart(id: $cartId) { ...CartFields }
}
",
        cart_fragment!()
    );

    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub cart_id: String,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct ResponseData {
        pub cart: Option<CartNode>,
    }
}

impl GraphQLQuery for GetCart {
    type Variables = get_cart::Variables;
    type ResponseData = get_cart::ResponseData;

    fn build_query(variables: Self::Variables) -> QueryBody<Self::Variables> {
        QueryBody {
            variables,
            query: get_cart::QUERY,
            operation_name: get_cart::OPERATION_NAME,
        }
    }
}

// =============================================================================
// cartLinesAdd
// =============================================================================

pub struct AddToCart;

pub mod add_to_cart {
    use super::{CartLineInput, CartMutationPayload, Deserialize, Serialize};

    pub const OPERATION_NAME: &str = "AddToCart";
    pub const QUERY: &str = concat!(
        r"
mutation AddToCart($cartId: ID!, $lines: [CartLineInput!]!) {
  cartLinesAdd(cartId: $cartId, lines: $lines) {
    cart { ...CartFields }
    userErrors { message field code }
  }
}
",
        cart_fragment!()
    );

    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub cart_id: String,
        pub lines: Vec<CartLineInput>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub cart_lines_add: Option<CartMutationPayload>,
    }
}

impl GraphQLQuery for AddToCart {
    type Variables = add_to_cart::Variables;
    type ResponseData = add_to_cart::ResponseData;

    fn build_query(variables: Self::Variables) -> QueryBody<Self::Variables> {
        QueryBody {
            variables,
            query: add_to_cart::QUERY,
            operation_name: add_to_cart::OPERATION_NAME,
        }
    }
}

// =============================================================================
// cartLinesUpdate
// =============================================================================

pub struct UpdateCartLines;

pub mod update_cart_lines {
    use super::{CartLineUpdateInput, CartMutationPayload, Deserialize, Serialize};

    pub const OPERATION_NAME: &str = "UpdateCartLines";
    pub const QUERY: &str = concat!(
        r"
mutation UpdateCartLines($cartId: ID!, $lines: [CartLineUpdateInput!]!) {
  cartLinesUpdate(cartId: $cartId, lines: $lines) {
    cart { ...CartFields }
    userErrors { message field code }
  }
}
",
        cart_fragment!()
    );

    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub cart_id: String,
        pub lines: Vec<CartLineUpdateInput>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub cart_lines_update: Option<CartMutationPayload>,
    }
}

impl GraphQLQuery for UpdateCartLines {
    type Variables = update_cart_lines::Variables;
    type ResponseData = update_cart_lines::ResponseData;

    fn build_query(variables: Self::Variables) -> QueryBody<Self::Variables> {
        QueryBody {
            variables,
            query: update_cart_lines::QUERY,
            operation_name: update_cart_lines::OPERATION_NAME,
        }
    }
}

// =============================================================================
// cartLinesRemove
// =============================================================================

pub struct RemoveFromCart;

pub mod remove_from_cart {
    use super::{CartMutationPayload, Deserialize, Serialize};

    pub const OPERATION_NAME: &str = "RemoveFromCart";
    pub const QUERY: &str = concat!(
        r"
mutation RemoveFromCart($cartId: ID!, $lineIds: [ID!]!) {
  cartLinesRemove(cartId: $cartId, lineIds: $lineIds) {
    cart { ...CartFields }
    userErrors { message field code }
  }
}
",
        cart_fragment!()
    );

    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub cart_id: String,
        pub line_ids: Vec<String>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub cart_lines_remove: Option<CartMutationPayload>,
    }
}

impl GraphQLQuery for RemoveFromCart {
    type Variables = remove_from_cart::Variables;
    type ResponseData = remove_from_cart::ResponseData;

    fn build_query(variables: Self::Variables) -> QueryBody<Self::Variables> {
        QueryBody {
            variables,
            query: remove_from_cart::QUERY,
            operation_name: remove_from_cart::OPERATION_NAME,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_query_body_shape() {
        let body = AddToCart::build_query(add_to_cart::Variables {
            cart_id: "gid://shopify/Cart/1".to_string(),
            lines: vec![CartLineInput {
                merchandise_id: "gid://shopify/ProductVariant/2".to_string(),
                quantity: 3,
            }],
        });
        let value = serde_json::to_value(&body).unwrap();

        assert_eq!(value["operationName"], "AddToCart");
        assert_eq!(
            value["variables"],
            json!({
                "cartId": "gid://shopify/Cart/1",
                "lines": [{ "merchandiseId": "gid://shopify/ProductVariant/2", "quantity": 3 }]
            })
        );
        assert!(value["query"].as_str().unwrap().contains("fragment CartFields on Cart"));
    }

    #[test]
    fn test_every_operation_uses_fragment() {
        for query in [
            create_cart::QUERY,
            get_cart::QUERY,
            add_to_cart::QUERY,
            update_cart_lines::QUERY,
            remove_from_cart::QUERY,
        ] {
            assert!(query.contains("...CartFields"));
            assert!(query.contains(&format!("lines(first: {CART_LINES_LIMIT})")));
        }
    }

    #[test]
    fn test_cart_node_to_checkout() {
        let node: CartNode = serde_json::from_value(json!({
            "id": "gid://shopify/Cart/1",
            "checkoutUrl": "https://shop.example/cart/c/1",
            "cost": {
                "totalAmount": { "amount": "10.0", "currencyCode": "USD" },
                "subtotalAmount": { "amount": "10.0", "currencyCode": "USD" }
            },
            "lines": { "edges": [ { "node": { "id": "l1", "quantity": 0 } } ] }
        }))
        .unwrap();

        assert!(node.has_unallocated_line());

        let checkout = CheckoutDto::from(node);
        assert_eq!(checkout.web_url.as_deref(), Some("https://shop.example/cart/c/1"));
        assert_eq!(checkout.line_items.edges.len(), 1);
    }

    #[test]
    fn test_mutation_payload_defaults_user_errors() {
        let data: remove_from_cart::ResponseData =
            serde_json::from_value(json!({ "cartLinesRemove": { "cart": null } })).unwrap();
        let payload = data.cart_lines_remove.unwrap();
        assert!(payload.cart.is_none());
        assert!(payload.user_errors.is_empty());
    }
}
