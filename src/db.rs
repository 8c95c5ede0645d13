//! Database connection and schema bootstrap.

use crate::orm::{
    candidate_policies, elections, electoral_candidates, legal_acts, legal_cases, messages,
    politician_statements, politicians, social_post_likes, social_posts, user_friends, users,
};
use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, Schema,
};
use std::time::Duration;

/// Open a connection pool.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(database_url.to_owned());
    opt.max_connections(20)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);

    // Every connection to `sqlite::memory:` is its own database.
    if database_url.starts_with("sqlite::memory:") {
        opt.max_connections(1).min_connections(1);
    }

    let db = Database::connect(opt).await?;
    log::info!("Connected to {:?} database", db.get_database_backend());
    Ok(db)
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<(), DbErr>
where
    E: EntityTrait,
{
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();
    db.execute(db.get_database_backend().build(&stmt)).await?;
    Ok(())
}

async fn create_index(db: &DatabaseConnection, stmt: IndexCreateStatement) -> Result<(), DbErr> {
    db.execute(db.get_database_backend().build(&stmt)).await?;
    Ok(())
}

/// Unique indexes backing the natural keys used by the ingestion upserts
/// and the friendship pair check.
fn natural_key_indexes() -> Vec<IndexCreateStatement> {
    vec![
        Index::create()
            .name("uq_elections_natural_key")
            .table(elections::Entity)
            .col(elections::Column::ElectionType)
            .col(elections::Column::Jurisdiction)
            .col(elections::Column::Title)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("uq_politicians_natural_key")
            .table(politicians::Entity)
            .col(politicians::Column::Name)
            .col(politicians::Column::Level)
            .col(politicians::Column::Jurisdiction)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("uq_legal_acts_natural_key")
            .table(legal_acts::Entity)
            .col(legal_acts::Column::Title)
            .col(legal_acts::Column::Jurisdiction)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("uq_user_friends_pair")
            .table(user_friends::Entity)
            .col(user_friends::Column::PairLow)
            .col(user_friends::Column::PairHigh)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("uq_social_post_likes_pair")
            .table(social_post_likes::Entity)
            .col(social_post_likes::Column::PostId)
            .col(social_post_likes::Column::UserId)
            .unique()
            .if_not_exists()
            .to_owned(),
    ]
}

/// Create every table and index that does not exist yet.
///
/// Parents are created before children so foreign keys resolve on Postgres.
pub async fn create_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, users::Entity).await?;
    create_table(db, &schema, user_friends::Entity).await?;
    create_table(db, &schema, messages::Entity).await?;
    create_table(db, &schema, social_posts::Entity).await?;
    create_table(db, &schema, social_post_likes::Entity).await?;
    create_table(db, &schema, politicians::Entity).await?;
    create_table(db, &schema, politician_statements::Entity).await?;
    create_table(db, &schema, elections::Entity).await?;
    create_table(db, &schema, electoral_candidates::Entity).await?;
    create_table(db, &schema, candidate_policies::Entity).await?;
    create_table(db, &schema, legal_acts::Entity).await?;
    create_table(db, &schema, legal_cases::Entity).await?;

    for index in natural_key_indexes() {
        create_index(db, index).await?;
    }

    log::debug!("Schema verified");
    Ok(())
}
