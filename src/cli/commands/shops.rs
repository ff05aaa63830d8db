use clap::Subcommand;
use serde_json::json;

use crate::auth::sanitize_shop;
use crate::cli::{utils, OutputFormat};
use crate::config::AppConfig;
use crate::database::{DatabaseManager, PgSessionStore, PgTokenStore, SessionStore, TokenStore};

#[derive(Subcommand)]
pub enum ShopsCommands {
    #[command(about = "List shops with stored credentials")]
    List,

    #[command(about = "Delete a shop's stored token and sessions")]
    Remove {
        #[arg(help = "Shop domain, e.g. my-store.myshopify.com")]
        shop: String,
    },
}

pub async fn handle(
    config: AppConfig,
    cmd: ShopsCommands,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let pool = DatabaseManager::connect(&config.database).await?;
    let tokens = PgTokenStore::new(pool.clone());

    match cmd {
        ShopsCommands::List => {
            let shops = tokens.list_shops().await?;
            let rows = shops
                .iter()
                .map(|s| vec![s.shop.clone(), s.scope.clone()])
                .collect();
            utils::output_table(
                output_format,
                &["SHOP", "SCOPE"],
                rows,
                serde_json::to_value(&shops)?,
            )
        }
        ShopsCommands::Remove { shop } => {
            let shop = sanitize_shop(&shop)
                .ok_or_else(|| anyhow::anyhow!("invalid shop domain: {}", shop))?;
            let sessions = PgSessionStore::new(pool);

            let removed = tokens.delete_shop(&shop).await?;
            let session_count = sessions.delete_shop_sessions(&shop).await?;
            if !removed && session_count == 0 {
                anyhow::bail!("no stored data for {}", shop);
            }

            utils::output_success(
                output_format,
                &format!("Removed {}", shop),
                Some(json!({ "shop": shop, "sessions_removed": session_count })),
            )
        }
    }
}
