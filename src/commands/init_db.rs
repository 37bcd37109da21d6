//! `init-db`: create tables and seed defaults, prompting
//! before reinitializing an existing store.

use std::io::{self, Write};

use super::{db_path, open_store};

pub async fn run() -> anyhow::Result<()> {
    let path = db_path();

    if queuectl_store_sqlite::db_exists(&path) {
        println!("Database already exists at {}", path.display());
        if !confirm("Do you want to reinitialize it?")? {
            return Ok(());
        }
    }

    open_store(&path).await?;
    println!("[OK] Database initialized successfully at {}", path.display());
    Ok(())
}

fn confirm(prompt: &str) -> anyhow::Result<bool> {
    print!("{prompt} [y/N]: ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    let answer = answer.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}
