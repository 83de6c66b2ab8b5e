use anyhow::{Context, Result};
use diesel::{
    PgConnection,
    r2d2::{ConnectionManager, Pool},
};

pub type PgPoolSquad = Pool<ConnectionManager<PgConnection>>;

pub fn establish_connection(database_url: &str, max_connections: u32) -> Result<PgPoolSquad> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = Pool::builder()
        .max_size(max_connections)
        .build(manager)
        .context("failed to build postgres connection pool")?;
    Ok(pool)
}
