use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set, SqlErr, TransactionTrait,
    sea_query::{Expr, OnConflict},
};

use crate::{
    entities::{movie, user, user_movie},
    error::AppResult,
    models::{LinkOutcome, LinkPatch, LinkedMovie, Movie, NewMovie, User, UserMovie},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_users(&self) -> AppResult<Vec<User>>;

    async fn get_user(&self, user_id: i32) -> AppResult<Option<User>>;

    async fn insert_user(&self, name: &str) -> AppResult<User>;

    async fn rename_user(&self, user_id: i32, name: &str) -> AppResult<bool>;

    // Removes the user's links too.
    async fn delete_user(&self, user_id: i32) -> AppResult<bool>;

    async fn list_movies(&self) -> AppResult<Vec<Movie>>;

    // Find-or-create by title_key and the link insert share one transaction.
    async fn link_movie(
        &self,
        user_id: i32,
        movie: NewMovie,
        link: LinkPatch,
    ) -> AppResult<LinkOutcome>;

    async fn user_movies(&self, user_id: i32) -> AppResult<Vec<UserMovie>>;

    async fn user_movie(&self, user_id: i32, movie_id: i32) -> AppResult<Option<UserMovie>>;

    async fn update_link(&self, user_id: i32, movie_id: i32, patch: LinkPatch) -> AppResult<bool>;

    async fn delete_link(&self, user_id: i32, movie_id: i32) -> AppResult<bool>;
}

#[derive(Clone)]
pub struct DbStore {
    db: DatabaseConnection,
}

impl DbStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl CatalogStore for DbStore {
    async fn list_users(&self) -> AppResult<Vec<User>> {
        let rows = user::Entity::find().order_by_asc(user::Column::Id).all(&self.db).await?;
        Ok(rows.into_iter().map(to_user).collect::<Result<_, _>>()?)
    }

    async fn get_user(&self, user_id: i32) -> AppResult<Option<User>> {
        let row = user::Entity::find_by_id(user_id).one(&self.db).await?;
        Ok(row.map(to_user).transpose()?)
    }

    async fn insert_user(&self, name: &str) -> AppResult<User> {
        let today: jiff::civil::Date = jiff::Zoned::now().into();
        let model = user::ActiveModel {
            id: Default::default(),
            name: Set(name.to_string()),
            created_on: Set(today.to_string()),
        };
        let row = model.insert(&self.db).await?;
        Ok(to_user(row)?)
    }

    async fn rename_user(&self, user_id: i32, name: &str) -> AppResult<bool> {
        let res = user::Entity::update_many()
            .col_expr(user::Column::Name, name.into())
            .filter(user::Column::Id.eq(user_id))
            .exec(&self.db)
            .await?;
        Ok(res.rows_affected > 0)
    }

    async fn delete_user(&self, user_id: i32) -> AppResult<bool> {
        let txn = self.db.begin().await?;

        let links = user_movie::Entity::delete_many()
            .filter(user_movie::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;
        let res = user::Entity::delete_by_id(user_id).exec(&txn).await?;

        txn.commit().await?;

        tracing::debug!(user_id, links_removed = links.rows_affected, "deleted user");
        Ok(res.rows_affected > 0)
    }

    async fn list_movies(&self) -> AppResult<Vec<Movie>> {
        let rows = movie::Entity::find()
            .order_by_asc(movie::Column::TitleKey)
            .order_by_asc(movie::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(to_movie).collect())
    }

    async fn link_movie(
        &self,
        user_id: i32,
        movie: NewMovie,
        link: LinkPatch,
    ) -> AppResult<LinkOutcome> {
        let txn = self.db.begin().await?;

        let title_key = movie.title_key.clone();
        let model = movie::ActiveModel {
            id: Default::default(),
            title: Set(movie.title),
            title_key: Set(movie.title_key),
            director: Set(movie.director),
            release_year: Set(movie.release_year),
            rating: Set(movie.rating),
            poster_url: Set(movie.poster_url),
        };

        let inserted = movie::Entity::insert(model)
            .on_conflict(OnConflict::column(movie::Column::TitleKey).do_nothing().to_owned())
            .exec_without_returning(&txn)
            .await?;

        let row = movie::Entity::find()
            .filter(movie::Column::TitleKey.eq(title_key.as_str()))
            .one(&txn)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("movie with title key {title_key:?}")))?;
        let created = inserted > 0;

        let link_model = user_movie::ActiveModel {
            user_id: Set(user_id),
            movie_id: Set(row.id),
            notes: Set(link.notes),
            user_rating: Set(link.rating),
        };

        let linked = match user_movie::Entity::insert(link_model)
            .on_conflict(
                OnConflict::columns([user_movie::Column::UserId, user_movie::Column::MovieId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await
        {
            Ok(linked) => linked,
            // The user was deleted after the caller checked for it. Dropping txn rolls back.
            Err(err) if matches!(err.sql_err(), Some(SqlErr::ForeignKeyConstraintViolation(_))) => {
                return Ok(LinkOutcome::UserMissing);
            },
            Err(err) => return Err(err.into()),
        };

        txn.commit().await?;

        let movie = to_movie(row);
        if linked == 0 {
            return Ok(LinkOutcome::AlreadyLinked(movie));
        }
        Ok(LinkOutcome::Linked(LinkedMovie { movie, created }))
    }

    async fn user_movies(&self, user_id: i32) -> AppResult<Vec<UserMovie>> {
        let rows = user_movie::Entity::find()
            .filter(user_movie::Column::UserId.eq(user_id))
            .find_also_related(movie::Entity)
            .order_by_asc(movie::Column::TitleKey)
            .order_by_asc(movie::Column::Id)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(link, movie)| movie.map(|movie| to_user_movie(link, movie)))
            .collect())
    }

    async fn user_movie(&self, user_id: i32, movie_id: i32) -> AppResult<Option<UserMovie>> {
        let row = user_movie::Entity::find_by_id((user_id, movie_id))
            .find_also_related(movie::Entity)
            .one(&self.db)
            .await?;

        Ok(row.and_then(|(link, movie)| movie.map(|movie| to_user_movie(link, movie))))
    }

    async fn update_link(&self, user_id: i32, movie_id: i32, patch: LinkPatch) -> AppResult<bool> {
        if patch.is_empty() {
            let link = user_movie::Entity::find_by_id((user_id, movie_id)).one(&self.db).await?;
            return Ok(link.is_some());
        }

        let mut update = user_movie::Entity::update_many()
            .filter(user_movie::Column::UserId.eq(user_id))
            .filter(user_movie::Column::MovieId.eq(movie_id));
        if let Some(rating) = patch.rating {
            update = update.col_expr(user_movie::Column::UserRating, Expr::value(rating));
        }
        if let Some(notes) = patch.notes {
            let notes = (!notes.is_empty()).then_some(notes);
            update = update.col_expr(user_movie::Column::Notes, Expr::value(notes));
        }

        let res = update.exec(&self.db).await?;
        Ok(res.rows_affected > 0)
    }

    async fn delete_link(&self, user_id: i32, movie_id: i32) -> AppResult<bool> {
        let res = user_movie::Entity::delete_by_id((user_id, movie_id)).exec(&self.db).await?;
        Ok(res.rows_affected > 0)
    }
}

fn to_user(row: user::Model) -> Result<User, DbErr> {
    let created_on = row.created_on.parse().map_err(|e| {
        DbErr::Type(format!("user {} has invalid created_on {:?}: {e}", row.id, row.created_on))
    })?;
    Ok(User { id: row.id, name: row.name, created_on })
}

fn to_movie(row: movie::Model) -> Movie {
    Movie {
        id: row.id,
        title: row.title,
        director: row.director,
        release_year: row.release_year,
        rating: row.rating,
        poster_url: row.poster_url,
    }
}

fn to_user_movie(link: user_movie::Model, movie: movie::Model) -> UserMovie {
    UserMovie { movie: to_movie(movie), notes: link.notes, user_rating: link.user_rating }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{new_movie, test_db};

    async fn store_with_user(name: &str) -> (DbStore, User) {
        let store = DbStore::new(test_db().await);
        let user = store.insert_user(name).await.unwrap();
        (store, user)
    }

    fn expect_linked(outcome: LinkOutcome) -> LinkedMovie {
        match outcome {
            LinkOutcome::Linked(linked) => linked,
            other => panic!("expected a new link, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_user() {
        let (store, user) = store_with_user("Ada").await;

        assert_eq!(user.name, "Ada");
        let today: jiff::civil::Date = jiff::Zoned::now().into();
        assert_eq!(user.created_on, today);

        let fetched = store.get_user(user.id).await.unwrap();
        assert_eq!(fetched, Some(user));
        assert_eq!(store.get_user(999).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_rename_user() {
        let (store, user) = store_with_user("Ada").await;

        assert!(store.rename_user(user.id, "Grace").await.unwrap());
        assert_eq!(store.get_user(user.id).await.unwrap().unwrap().name, "Grace");
        assert!(!store.rename_user(999, "Nobody").await.unwrap());
    }

    #[tokio::test]
    async fn test_link_movie_creates_then_reuses_by_title_key() {
        let (store, ada) = store_with_user("Ada").await;
        let grace = store.insert_user("Grace").await.unwrap();

        let first = expect_linked(
            store.link_movie(ada.id, new_movie("Inception"), LinkPatch::default()).await.unwrap(),
        );
        assert!(first.created);

        let second = expect_linked(
            store.link_movie(grace.id, new_movie("INCEPTION"), LinkPatch::default()).await.unwrap(),
        );
        assert!(!second.created);
        assert_eq!(second.movie.id, first.movie.id);
        assert_eq!(second.movie.title, "Inception");

        assert_eq!(store.list_movies().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_link_movie_reports_existing_link() {
        let (store, ada) = store_with_user("Ada").await;
        let patch = LinkPatch { rating: Some(7.0), notes: Some("first".to_string()) };
        let first = expect_linked(store.link_movie(ada.id, new_movie("Heat"), patch).await.unwrap());

        let again = LinkPatch { rating: Some(1.0), notes: Some("second".to_string()) };
        let outcome = store.link_movie(ada.id, new_movie("heat"), again).await.unwrap();
        assert_eq!(outcome, LinkOutcome::AlreadyLinked(first.movie.clone()));

        let entry = store.user_movie(ada.id, first.movie.id).await.unwrap().unwrap();
        assert_eq!(entry.user_rating, Some(7.0));
        assert_eq!(entry.notes.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_link_movie_unknown_user_rolls_back_movie() {
        let store = DbStore::new(test_db().await);

        let outcome = store.link_movie(42, new_movie("Alien"), LinkPatch::default()).await.unwrap();
        assert_eq!(outcome, LinkOutcome::UserMissing);
        assert!(store.list_movies().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_link_movie_after_user_deleted() {
        let (store, ada) = store_with_user("Ada").await;
        assert!(store.delete_user(ada.id).await.unwrap());

        let outcome =
            store.link_movie(ada.id, new_movie("Alien"), LinkPatch::default()).await.unwrap();
        assert_eq!(outcome, LinkOutcome::UserMissing);
        assert!(store.list_movies().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_user_movies_sorted_by_title() {
        let (store, ada) = store_with_user("Ada").await;
        for title in ["zodiac", "Alien", "Memento"] {
            store.link_movie(ada.id, new_movie(title), LinkPatch::default()).await.unwrap();
        }

        let titles: Vec<String> = store
            .user_movies(ada.id)
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.movie.title)
            .collect();
        assert_eq!(titles, ["Alien", "Memento", "zodiac"]);
    }

    #[tokio::test]
    async fn test_update_link_is_partial() {
        let (store, ada) = store_with_user("Ada").await;
        let patch = LinkPatch { rating: Some(6.5), notes: Some("slow start".to_string()) };
        let linked = expect_linked(store.link_movie(ada.id, new_movie("Heat"), patch).await.unwrap());
        let movie_id = linked.movie.id;

        let notes_only = LinkPatch { rating: None, notes: Some("great ending".to_string()) };
        assert!(store.update_link(ada.id, movie_id, notes_only).await.unwrap());
        let entry = store.user_movie(ada.id, movie_id).await.unwrap().unwrap();
        assert_eq!(entry.user_rating, Some(6.5));
        assert_eq!(entry.notes.as_deref(), Some("great ending"));

        let rating_only = LinkPatch { rating: Some(9.0), notes: None };
        assert!(store.update_link(ada.id, movie_id, rating_only).await.unwrap());
        let entry = store.user_movie(ada.id, movie_id).await.unwrap().unwrap();
        assert_eq!(entry.user_rating, Some(9.0));
        assert_eq!(entry.notes.as_deref(), Some("great ending"));

        let clear_notes = LinkPatch { rating: None, notes: Some(String::new()) };
        assert!(store.update_link(ada.id, movie_id, clear_notes).await.unwrap());
        let entry = store.user_movie(ada.id, movie_id).await.unwrap().unwrap();
        assert_eq!(entry.notes, None);

        assert!(store.update_link(ada.id, movie_id, LinkPatch::default()).await.unwrap());
        assert!(!store.update_link(ada.id, movie_id + 1, LinkPatch::default()).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_link_after_delete_is_not_found() {
        let (store, ada) = store_with_user("Ada").await;
        let linked = expect_linked(
            store.link_movie(ada.id, new_movie("Heat"), LinkPatch::default()).await.unwrap(),
        );
        assert!(store.delete_link(ada.id, linked.movie.id).await.unwrap());

        let rating = LinkPatch { rating: Some(8.0), notes: None };
        assert!(!store.update_link(ada.id, linked.movie.id, rating).await.unwrap());
        let both = LinkPatch { rating: Some(8.0), notes: Some("rewatch".to_string()) };
        assert!(!store.update_link(ada.id, linked.movie.id, both).await.unwrap());
        assert_eq!(store.user_movie(ada.id, linked.movie.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_link_leaves_other_links_alone() {
        let (store, ada) = store_with_user("Ada").await;
        let grace = store.insert_user("Grace").await.unwrap();
        let patch = LinkPatch { rating: Some(5.0), notes: Some("fine".to_string()) };
        let linked =
            expect_linked(store.link_movie(ada.id, new_movie("Heat"), patch.clone()).await.unwrap());
        store.link_movie(grace.id, new_movie("Heat"), patch).await.unwrap();

        let change = LinkPatch { rating: Some(10.0), notes: Some(String::new()) };
        assert!(store.update_link(ada.id, linked.movie.id, change).await.unwrap());

        let other = store.user_movie(grace.id, linked.movie.id).await.unwrap().unwrap();
        assert_eq!(other.user_rating, Some(5.0));
        assert_eq!(other.notes.as_deref(), Some("fine"));
    }

    #[tokio::test]
    async fn test_delete_link_keeps_movie() {
        let (store, ada) = store_with_user("Ada").await;
        let linked = expect_linked(
            store.link_movie(ada.id, new_movie("Heat"), LinkPatch::default()).await.unwrap(),
        );

        assert!(store.delete_link(ada.id, linked.movie.id).await.unwrap());
        assert!(!store.delete_link(ada.id, linked.movie.id).await.unwrap());
        assert_eq!(store.user_movie(ada.id, linked.movie.id).await.unwrap(), None);
        assert_eq!(store.list_movies().await.unwrap(), vec![linked.movie]);
    }

    #[tokio::test]
    async fn test_delete_user_removes_only_their_links() {
        let (store, ada) = store_with_user("Ada").await;
        let grace = store.insert_user("Grace").await.unwrap();
        let linked = expect_linked(
            store.link_movie(ada.id, new_movie("Heat"), LinkPatch::default()).await.unwrap(),
        );
        store.link_movie(grace.id, new_movie("Heat"), LinkPatch::default()).await.unwrap();

        assert!(store.delete_user(ada.id).await.unwrap());
        assert!(!store.delete_user(ada.id).await.unwrap());

        assert_eq!(store.get_user(ada.id).await.unwrap(), None);
        assert!(store.user_movies(ada.id).await.unwrap().is_empty());
        let remaining = store.user_movies(grace.id).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].movie.id, linked.movie.id);
    }
}
