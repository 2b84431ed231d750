use chrono::{SecondsFormat, Utc};
use sqlx::SqlitePool;
use std::fs;
use std::path::Path;
use uuid::Uuid;

use crate::accounts;
use crate::routes::export::ExportData;

/// Import a `/export` download into an existing account. Entries and
/// comments get fresh ids; dates, categories and comment order are kept.
pub async fn import_entries(
    pool: &SqlitePool,
    file_path: &Path,
    email: &str,
) -> Result<usize, Box<dyn std::error::Error>> {
    let Some(user) = accounts::find_by_email(pool, email).await? else {
        return Err(format!("No account with email '{}'", email).into());
    };

    let content = fs::read_to_string(file_path)?;
    let data: ExportData = serde_json::from_str(&content)?;

    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
    let mut imported = 0;
    let mut tx = pool.begin().await?;

    for entry in data.entries {
        let id = Uuid::new_v4().to_string();
        let created_at = if entry.created_at.is_empty() {
            now.clone()
        } else {
            entry.created_at
        };

        sqlx::query(
            r#"
            INSERT INTO entries (id, user_id, text, date, category, image_url, ai_prompted, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&user.id)
        .bind(&entry.text)
        .bind(&entry.date)
        .bind(entry.category)
        .bind(&entry.image_url)
        .bind(entry.ai_prompted)
        .bind(&created_at)
        .execute(&mut *tx)
        .await?;

        for comment in entry.comments {
            sqlx::query(
                "INSERT INTO comments (id, entry_id, author, relation, text, created_at) VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&id)
            .bind(&comment.author)
            .bind(&comment.relation)
            .bind(&comment.text)
            .bind(comment.created_at)
            .execute(&mut *tx)
            .await?;
        }

        imported += 1;
    }

    tx.commit().await?;
    tracing::info!(imported, email, "import finished");
    Ok(imported)
}

pub async fn create_user(
    pool: &SqlitePool,
    email: &str,
    password: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let user = accounts::sign_up(pool, email, password).await?;

    println!("Created user:");
    println!("  ID: {}", user.id);
    println!("  Email: {}", user.email);

    Ok(())
}
