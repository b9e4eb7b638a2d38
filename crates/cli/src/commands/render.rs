//! Plain-text cart rendering.

use std::fmt::Write;

use shopcart_client::CartState;

/// Render the cart as a small table.
pub fn cart_summary(state: &CartState) -> String {
    let Some(cart) = &state.cart else {
        return "Cart is empty.".to_string();
    };
    if cart.is_empty() {
        return format!("Cart {} is empty.", cart.id);
    }

    let mut out = format!("Cart {}\n", cart.id);
    for line in &cart.lines {
        let title = match line.merchandise.display_variant_title() {
            Some(variant) => format!("{} ({variant})", line.merchandise.product.title),
            None => line.merchandise.product.title.clone(),
        };
        let _ = writeln!(
            out,
            "  {:>3} x {title}  {}  [{}]",
            line.quantity,
            line.line_total(),
            line.id
        );
    }
    let _ = writeln!(out, "Items:    {}", state.item_count());
    if let Some(subtotal) = state.subtotal() {
        let _ = writeln!(out, "Subtotal: {subtotal}");
    }
    if let Some(total) = state.total_cost() {
        let _ = write!(out, "Total:    {total}");
    }
    out
}
