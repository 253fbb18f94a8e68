//! Snack Shop CLI - Inspect and edit a persisted cart.
//!
//! # Usage
//!
//! ```bash
//! # Add two bags of chips
//! snack-cli cart add --id 12 --name "Banh trang tron" --price 75000 --quantity 2
//!
//! # Add a specific variant
//! snack-cli cart add --id 14-3 --name "Kho ga" --variant 500g --price 140000
//!
//! # Change or nudge a quantity
//! snack-cli cart set-quantity 12 5
//! snack-cli cart increment 12
//! snack-cli cart decrement 12
//!
//! # Remove a line, or everything
//! snack-cli cart remove 12
//! snack-cli cart clear
//!
//! # Show contents and totals
//! snack-cli cart show --express
//! ```
//!
//! The cart location and shipping fees come from the `CART_*` environment
//! variables (see `snack_shop_storefront::config`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "snack-cli")]
#[command(author, version, about = "Snack Shop CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the persisted cart
    Cart {
        #[command(subcommand)]
        action: CartCommand,
    },
}

#[derive(Subcommand)]
enum CartCommand {
    /// Add an item, merging with an existing line of the same ID
    Add {
        /// Line item ID (product, or product-variant)
        #[arg(long)]
        id: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Unit price
        #[arg(short, long)]
        price: Decimal,

        /// Number of units
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,

        /// Variant label
        #[arg(short, long)]
        variant: Option<String>,

        /// Display image reference
        #[arg(short, long)]
        image: Option<String>,
    },
    /// Remove a line
    Remove {
        /// Line item ID
        id: String,
    },
    /// Set the quantity of a line
    SetQuantity {
        /// Line item ID
        id: String,

        /// New quantity (values below 1 are ignored)
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Raise the quantity of a line by one
    Increment {
        /// Line item ID
        id: String,
    },
    /// Lower the quantity of a line by one
    Decrement {
        /// Line item ID
        id: String,
    },
    /// Empty the cart
    Clear,
    /// Show cart contents and totals
    Show {
        /// Price shipping as express
        #[arg(long)]
        express: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Cart { action } => {
            let mut session = commands::cart::Session::open()?;
            match action {
                CartCommand::Add {
                    id,
                    name,
                    price,
                    quantity,
                    variant,
                    image,
                } => session.add(id, name, price, quantity, variant, image)?,
                CartCommand::Remove { id } => session.remove(&id.into()),
                CartCommand::SetQuantity { id, quantity } => {
                    session.set_quantity(&id.into(), quantity);
                }
                CartCommand::Increment { id } => session.increment(&id.into()),
                CartCommand::Decrement { id } => session.decrement(&id.into()),
                CartCommand::Clear => session.clear(),
                CartCommand::Show { express } => session.show(express),
            }
        }
    }
    Ok(())
}
