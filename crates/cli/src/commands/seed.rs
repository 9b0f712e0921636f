//! Seed demo data.
//!
//! Each table is only seeded when it is empty, so running the command twice
//! changes nothing.

use rust_decimal::Decimal;
use sqlx::PgPool;

use hackshop_server::db::{AdminRepository, GoodsRepository, UserRepository};
use hackshop_server::models::NewGoods;

use super::{CommandError, connect};

/// Default admin account.
pub const SEED_ADMIN: (&str, &str) = ("admin", "admin123");

/// Demo shopper: username, email, password.
pub const SEED_USER: (&str, &str, &str) = ("alice", "alice@test.com", "alice123");

/// Demo shopper's starting balance.
pub const SEED_BALANCE: i64 = 9999;

/// Seed whatever is missing in `pool`.
pub async fn apply(pool: &PgPool) -> Result<(), CommandError> {
    let admins = AdminRepository::new(pool);
    if admins.count().await? == 0 {
        let (username, password) = SEED_ADMIN;
        admins.create(username, password).await?;
        tracing::info!(username, "Seeded admin");
    } else {
        tracing::info!("Admins present, skipping");
    }

    let users = UserRepository::new(pool);
    if users.count().await? == 0 {
        let (username, email, password) = SEED_USER;
        users
            .create(username, email, password, Some(Decimal::from(SEED_BALANCE)))
            .await?;
        tracing::info!(username, email, "Seeded user");
    } else {
        tracing::info!("Users present, skipping");
    }

    let goods = GoodsRepository::new(pool);
    if goods.count().await? == 0 {
        let mut demo = NewGoods::basic(
            "Demo Product".to_owned(),
            "Demo".to_owned(),
            Decimal::new(9900, 2),
            100,
        );
        demo.content = "A product to practise on.".to_owned();
        let id = goods.create(&demo).await?;
        tracing::info!(goods_id = %id, "Seeded product");
    } else {
        tracing::info!("Goods present, skipping");
    }

    Ok(())
}

/// Seed the configured database.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;
    apply(&pool).await?;
    tracing::info!("Seeding complete!");
    Ok(())
}
