use anyhow::Context;
use estate_verify::api::{project_activity, QueueFilter};
use estate_verify::{ApiClient, ClientConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    dotenvy::dotenv().ok();

    info!("🏠 Estate Verify - Verification Queue");
    info!("=====================================");

    let config = ClientConfig::from_env().context("Failed to load configuration")?;
    info!("Backend: {}", config.base_url);
    let client = ApiClient::new(config).context("Failed to create API client")?;

    let city = std::env::var("ESTATE_QUEUE_CITY").ok();
    let filter = QueueFilter::new().with_city(city);

    let page = client
        .verification_queue(&filter)
        .await
        .context("Failed to fetch verification queue")?;

    info!(
        "\n✅ Page {}/{} ({} of {} pending properties)\n",
        page.meta.page, page.meta.total_pages, page.meta.count, page.meta.total
    );

    for (i, property) in page.items.iter().enumerate() {
        println!("{}. {} [{}]", i + 1, property.title, property.verification_status);
        println!(
            "   {} for {}, {}",
            property.property_type.as_str(),
            property.transaction_type.as_str(),
            property.visibility
        );
        if let Some(city) = property.city() {
            println!("   City: {}", city);
        }
        if let Some(feedback) = property.admin_feedback.as_deref().filter(|f| !f.is_empty()) {
            println!("   Feedback: {}", feedback);
        }
        println!(
            "   Evidence: {} image(s), {} document(s)",
            property.media.len(),
            property.documents.len()
        );
        println!("   ID: {}", property.id);
        println!();
    }

    let json = serde_json::to_string_pretty(&page)?;
    tokio::fs::write("verification_queue.json", json).await?;
    info!("💾 Saved queue page to verification_queue.json");

    let feed = project_activity(&client, 10).await;
    info!("Recent activity ({} items):", feed.len());
    for item in &feed {
        println!("{}  {} - {}", item.timestamp.format("%Y-%m-%d %H:%M"), item.title, item.description);
    }

    Ok(())
}
