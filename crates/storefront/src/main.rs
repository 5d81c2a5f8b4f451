//! Storefront server binary.
//!
//! Configuration comes from the environment (and `.env`). See
//! [`storefront::config::vars`] for the recognised keys.

#[tokio::main]
async fn main() {
    // Startup errors can happen before logging exists, so stderr always gets them.
    if let Err(e) = storefront::run().await {
        eprintln!("storefront: {e:#}");
        std::process::exit(1);
    }
}
