//! `config get|set`.

use queuectl_core::config::{denormalize_key, normalize_key, ConfigStore};

use super::{db_path, open_store, require_db};

pub async fn get(key: Option<String>) -> anyhow::Result<()> {
    require_db()?;

    let store = open_store(&db_path()).await?;

    match key {
        Some(key) => {
            let normalized = normalize_key(&key);
            let value = store.get_raw(&normalized).await?;
            match value {
                Some(value) => println!("{key}: {value}"),
                None => anyhow::bail!("Config key '{key}' not found"),
            }
        }
        None => {
            let mut configs = store.get_all_raw().await?;
            if configs.is_empty() {
                println!("No configuration found.");
                return Ok(());
            }
            configs.sort_by(|a, b| a.0.cmp(&b.0));

            println!("\n[CONFIGURATION]");
            for (key, value) in configs {
                println!("  {}: {value}", denormalize_key(&key));
            }
            println!();
        }
    }

    Ok(())
}

pub async fn set(key: &str, value: &str) -> anyhow::Result<()> {
    require_db()?;

    let store = open_store(&db_path()).await?;
    let normalized = normalize_key(key);
    store.set_raw(&normalized, value).await?;

    println!("[OK] Set {key} = {value}");
    Ok(())
}
