//! services/client/src/bin/client.rs
//!
//! A terminal front end: prints the home page and the first page of public
//! lessons, signing in first when `AUTH_TOKEN` is set.

use client_lib::{
    config::Config,
    error::ClientError,
    views::{AppContext, DashboardView, HomeView, PublicLessonsView},
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!(backend = %config.api_base_url, "Configuration loaded.");

    // --- 2. Build the Shared Context ---
    let ctx = AppContext::from_config(Arc::clone(&config))?;

    // --- 3. Sign In, If a Credential Was Provided ---
    if let Some(token) = config.auth_token.as_deref() {
        match ctx.session.hydrate(token).await {
            Ok(user) => info!(user = %user.email, "Signed in."),
            Err(e) => warn!("Sign-in failed, continuing anonymously: {}", e),
        }
    }

    // --- 4. Home Page ---
    let home = HomeView::new(Arc::clone(&ctx));
    let (featured, contributors) = tokio::join!(home.featured(), home.top_contributors());

    println!("Featured lessons");
    for card in featured? {
        let lock = if card.blurred { " [premium]" } else { "" };
        println!("  * {}{} by {}", card.title, lock, card.author.display_name());
    }

    println!("\nTop contributors");
    for (rank, contributor) in contributors?.iter().enumerate() {
        println!(
            "  {}. {} ({} lessons)",
            rank + 1,
            contributor.name,
            contributor.lesson_count
        );
    }

    // --- 5. Public Lessons ---
    let browser = PublicLessonsView::new(Arc::clone(&ctx));
    let listing = browser.load().await?;
    println!(
        "\nPublic lessons (page {} of {}, {} total)",
        listing.page, listing.total_pages, listing.total
    );
    for card in &listing.cards {
        let body = card
            .excerpt(80)
            .unwrap_or_else(|| "Upgrade to Premium to read this lesson.".to_string());
        println!("  - [{}] {}: {}", card.category.as_str(), card.title, body);
    }

    // --- 6. Dashboard, When Signed In ---
    if ctx.session.is_signed_in() {
        let dashboard = DashboardView::new(Arc::clone(&ctx));
        let (mine, stats) = tokio::join!(dashboard.my_lessons(), dashboard.stats());
        let stats = stats?;
        println!(
            "\nYour lessons: {} ({} public, {} premium, {} saved)",
            mine?.len(),
            stats.public_lessons,
            stats.premium_lessons,
            stats.total_saved
        );
    }

    ctx.session.logout();
    Ok(())
}
