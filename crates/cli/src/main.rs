//! shopcart CLI - drive a cart through the checkout proxy.
//!
//! # Usage
//!
//! ```bash
//! # Show the current cart
//! shopcart show
//!
//! # Add two units of a variant
//! shopcart add gid://shopify/ProductVariant/123 -q 2
//!
//! # Change quantities
//! shopcart update gid://shopify/CartLine/abc 3
//! shopcart inc gid://shopify/CartLine/abc
//! shopcart dec gid://shopify/CartLine/abc
//!
//! # Remove a line, forget the cart, print the checkout URL
//! shopcart remove gid://shopify/CartLine/abc
//! shopcart clear
//! shopcart checkout
//! ```
//!
//! The cart ID persists in `$SHOPCART_STATE_DIR/cart.json` between runs.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "shopcart")]
#[command(author, version, about = "Storefront cart from the command line")]
struct Cli {
    /// Checkout proxy base URL
    #[arg(long, env = "SHOPCART_PROXY_URL", default_value = "http://127.0.0.1:3000")]
    proxy_url: String,

    /// Directory holding the persisted cart ID
    #[arg(long, env = "SHOPCART_STATE_DIR", default_value = ".shopcart")]
    state_dir: PathBuf,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 15)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current cart
    Show,
    /// Add a product variant to the cart
    Add {
        /// Variant ID (e.g. gid://shopify/ProductVariant/123)
        variant_id: String,

        /// Quantity to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set a line's quantity
    Update {
        /// Cart line ID
        line_id: String,

        /// New quantity (at least 1)
        quantity: u32,
    },
    /// Increase a line's quantity by one
    Inc {
        /// Cart line ID
        line_id: String,
    },
    /// Decrease a line's quantity by one (stops at 1)
    Dec {
        /// Cart line ID
        line_id: String,
    },
    /// Remove a line from the cart
    Remove {
        /// Cart line ID
        line_id: String,
    },
    /// Forget the current cart
    Clear,
    /// Print the checkout URL
    Checkout,
}

#[tokio::main]
async fn main() {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    let session = commands::Session::open(&cli.proxy_url, &cli.state_dir, cli.timeout).await?;

    match cli.command {
        Commands::Show => session.show(),
        Commands::Add {
            variant_id,
            quantity,
        } => session.add(&variant_id, quantity).await,
        Commands::Update { line_id, quantity } => session.update(&line_id, quantity).await,
        Commands::Inc { line_id } => session.increment(&line_id).await,
        Commands::Dec { line_id } => session.decrement(&line_id).await,
        Commands::Remove { line_id } => session.remove(&line_id).await,
        Commands::Clear => {
            session.clear();
            Ok(())
        }
        Commands::Checkout => session.checkout(),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_add_with_quantity() {
        let cli = Cli::parse_from(["shopcart", "add", "gid://shopify/ProductVariant/1", "-q", "3"]);
        assert!(matches!(
            cli.command,
            Commands::Add { ref variant_id, quantity: 3 } if variant_id == "gid://shopify/ProductVariant/1"
        ));
        assert_eq!(cli.timeout, 15);
    }
}
