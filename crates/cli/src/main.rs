//! Sokoni CLI - storefront console from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Create an account and sign in
//! sokoni account register -e jane@example.com -f Jane -l Doe
//!
//! # Sign in (prompts for the password)
//! sokoni account login -e jane@example.com
//!
//! # Browse the catalog
//! sokoni products list --page 2
//! sokoni products search "running shoes"
//! sokoni products show 42
//!
//! # Manage the cart
//! sokoni cart add 42 --quantity 2
//! sokoni cart show
//!
//! # Upload a product image
//! sokoni media upload photo.jpg --product-id 42 --compress
//! ```
//!
//! # Commands
//!
//! - `account` - Register, sign in and out, view and update the profile
//! - `products` - Browse, search, and inspect the catalog
//! - `cart` - Manage the locally persisted cart
//! - `media` - Upload and delete product images

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "sokoni")]
#[command(author, version, about = "Sokoni storefront console")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the signed-in account
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },
    /// Browse the product catalog
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Upload and delete product images
    Media {
        #[command(subcommand)]
        action: MediaAction,
    },
}

#[derive(Subcommand)]
enum AccountAction {
    /// Create a new account and sign in
    Register {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// First name
        #[arg(short, long)]
        first_name: String,

        /// Last name
        #[arg(short, long)]
        last_name: String,

        /// Phone number
        #[arg(long)]
        phone: Option<String>,

        /// Postal address
        #[arg(long)]
        address: Option<String>,

        /// Password (prompted when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Sign in with email and password
    Login {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Password (prompted when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Sign out and forget the stored tokens
    Logout,
    /// Show the signed-in user's profile
    Me,
    /// Update profile fields of the signed-in user
    Update {
        /// First name
        #[arg(short, long)]
        first_name: Option<String>,

        /// Last name
        #[arg(short, long)]
        last_name: Option<String>,

        /// Phone number
        #[arg(long)]
        phone: Option<String>,

        /// Postal address
        #[arg(long)]
        address: Option<String>,
    },
}

#[derive(Subcommand)]
enum ProductsAction {
    /// List a page of the catalog
    List {
        /// Page number (1-based)
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        /// Items per page
        #[arg(short = 's', long, default_value_t = 20)]
        page_size: u32,
    },
    /// Search the catalog
    Search {
        /// Search query
        query: String,

        /// Page number (1-based)
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        /// Items per page
        #[arg(short = 's', long, default_value_t = 20)]
        page_size: u32,
    },
    /// List a page of one category
    Category {
        /// Category name
        category: String,

        /// Page number (1-based)
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        /// Items per page
        #[arg(short = 's', long, default_value_t = 20)]
        page_size: u32,
    },
    /// Show one product in full
    Show {
        /// Product id
        id: String,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Add a product to the cart
    Add {
        /// Product id
        product_id: String,

        /// Quantity to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Remove a product from the cart
    Remove {
        /// Product id
        product_id: String,
    },
    /// Set the quantity of a cart line (0 removes it)
    Set {
        /// Product id
        product_id: String,

        /// New quantity
        quantity: i64,
    },
    /// Increase a cart line's quantity by one
    Increment {
        /// Product id
        product_id: String,
    },
    /// Decrease a cart line's quantity by one (floors at one)
    Decrement {
        /// Product id
        product_id: String,
    },
    /// Show the cart lines and total
    Show,
    /// Remove every cart line
    Clear,
}

#[derive(Subcommand)]
enum MediaAction {
    /// Upload a product image
    Upload {
        /// Path to the image file
        path: String,

        /// Product id to name the stored object after
        #[arg(short, long)]
        product_id: Option<String>,

        /// Downscale the image before uploading
        #[arg(short, long)]
        compress: bool,
    },
    /// Delete an object by download URL or storage path
    Delete {
        /// Download URL or storage path
        reference: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Account { action } => match action {
            AccountAction::Register {
                email,
                first_name,
                last_name,
                phone,
                address,
                password,
            } => {
                commands::account::register(email, first_name, last_name, phone, address, password)
                    .await?;
            }
            AccountAction::Login { email, password } => {
                commands::account::login(&email, password).await?;
            }
            AccountAction::Logout => commands::account::logout().await?,
            AccountAction::Me => commands::account::me().await?,
            AccountAction::Update {
                first_name,
                last_name,
                phone,
                address,
            } => {
                commands::account::update(first_name, last_name, phone, address).await?;
            }
        },
        Commands::Products { action } => match action {
            ProductsAction::List { page, page_size } => {
                commands::products::list(page, page_size).await?;
            }
            ProductsAction::Search {
                query,
                page,
                page_size,
            } => {
                commands::products::search(&query, page, page_size).await?;
            }
            ProductsAction::Category {
                category,
                page,
                page_size,
            } => {
                commands::products::category(&category, page, page_size).await?;
            }
            ProductsAction::Show { id } => commands::products::show(&id).await?,
        },
        Commands::Cart { action } => match action {
            CartAction::Add {
                product_id,
                quantity,
            } => commands::cart::add(&product_id, quantity).await?,
            CartAction::Remove { product_id } => commands::cart::remove(&product_id)?,
            CartAction::Set {
                product_id,
                quantity,
            } => commands::cart::set(&product_id, quantity)?,
            CartAction::Increment { product_id } => commands::cart::increment(&product_id)?,
            CartAction::Decrement { product_id } => commands::cart::decrement(&product_id)?,
            CartAction::Show => commands::cart::show()?,
            CartAction::Clear => commands::cart::clear()?,
        },
        Commands::Media { action } => match action {
            MediaAction::Upload {
                path,
                product_id,
                compress,
            } => {
                commands::media::upload(&path, product_id.as_deref(), compress).await?;
            }
            MediaAction::Delete { reference } => commands::media::delete(&reference).await?,
        },
    }
    Ok(())
}
