//! Creates the directory database ahead of the first service start.
//! Only needed when the service role cannot create databases itself.

use tokio_postgres::{Client, NoTls};

#[derive(Debug, PartialEq)]
enum Outcome {
    AlreadyExists,
    Created,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let admin_conn = std::env::var("PG_ADMIN_CONN")
        .unwrap_or_else(|_| "host=127.0.0.1 user=postgres dbname=postgres".into());
    let db_name = std::env::var("DB_NAME").unwrap_or_else(|_| "antigua_directory".into());

    if !is_valid_database_name(&db_name) {
        log::error!("Refusing to create database with invalid name '{db_name}'");
        return Err(format!("invalid database name '{db_name}'").into());
    }

    log::info!("Connecting to the maintenance database");
    let (client, connection) = tokio_postgres::connect(&admin_conn, NoTls).await?;
    tokio::spawn(async move {
        if let Err(err) = connection.await {
            log::error!("Admin connection closed with error: {err}");
        }
    });

    match ensure_database(&client, &db_name).await? {
        Outcome::AlreadyExists => log::info!("Database '{db_name}' already exists"),
        Outcome::Created => log::info!("Created database '{db_name}'"),
    }

    Ok(())
}

async fn ensure_database(client: &Client, db_name: &str) -> Result<Outcome, tokio_postgres::Error> {
    let existing = client
        .query_opt("SELECT 1 FROM pg_database WHERE datname = $1", &[&db_name])
        .await?;
    if existing.is_some() {
        return Ok(Outcome::AlreadyExists);
    }

    // Identifiers cannot be bound as parameters; the name was validated above.
    client
        .batch_execute(&format!("CREATE DATABASE \"{db_name}\""))
        .await?;
    Ok(Outcome::Created)
}

/// Plain Postgres identifiers only, within the 63-byte limit.
fn is_valid_database_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 63
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::is_valid_database_name;

    #[test]
    fn accepts_plain_identifiers() {
        assert!(is_valid_database_name("antigua_directory"));
    }

    #[test]
    fn rejects_quotes_and_empty_names() {
        assert!(!is_valid_database_name(""));
        assert!(!is_valid_database_name("dir\"; DROP"));
        assert!(!is_valid_database_name(&"a".repeat(64)));
    }
}
