//! Reset the lab database.
//!
//! Drops the `public` and session schemas, then migrates and seeds. The
//! login counters and tokens live in the server process, so restart the
//! server afterwards.

use std::io::{BufRead, Write};

use super::{CommandError, connect, migrate, seed};

fn confirm() -> bool {
    #[allow(clippy::print_stderr)]
    {
        eprint!("This deletes every shop record. Type 'yes' to continue: ");
    }
    let _ = std::io::stderr().flush();

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer).is_ok() && answer.trim() == "yes"
}

/// Drop and rebuild the schema.
pub async fn run(skip_confirm: bool) -> Result<(), CommandError> {
    if !skip_confirm && !confirm() {
        return Err(CommandError::Aborted);
    }

    let pool = connect().await?;

    tracing::info!("Dropping schemas...");
    sqlx::query("DROP SCHEMA IF EXISTS tower_sessions CASCADE")
        .execute(&pool)
        .await?;
    sqlx::query("DROP SCHEMA public CASCADE").execute(&pool).await?;
    sqlx::query("CREATE SCHEMA public").execute(&pool).await?;

    migrate::apply(&pool).await?;
    seed::apply(&pool).await?;

    tracing::info!("Reset complete! Restart the server to clear login counters.");
    Ok(())
}
