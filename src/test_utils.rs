use sea_orm::{ConnectionTrait, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

use crate::{catalog::title_key, models::NewMovie};

pub async fn test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    db.execute_unprepared("PRAGMA foreign_keys = ON").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    db
}

pub fn new_movie(title: &str) -> NewMovie {
    NewMovie {
        title: title.to_string(),
        title_key: title_key(title),
        director: None,
        release_year: None,
        rating: None,
        poster_url: None,
    }
}
