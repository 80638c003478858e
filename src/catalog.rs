use tracing::{debug, info, instrument};

use crate::{
    error::{AppError, AppResult, Missing},
    models::{AddMovie, LinkOutcome, LinkPatch, LinkedMovie, Movie, NewMovie, User, UserMovie},
    omdb::MetadataProvider,
    store::CatalogStore,
};

pub struct Catalog<S, M> {
    store: S,
    metadata: M,
}

impl<S: CatalogStore, M: MetadataProvider> Catalog<S, M> {
    pub fn new(store: S, metadata: M) -> Self {
        Self { store, metadata }
    }

    #[instrument(skip(self))]
    pub async fn add_user(&self, name: &str) -> AppResult<User> {
        let name = require_text("name", name)?;
        let user = self.store.insert_user(&name).await.inspect_err(log_storage_failure)?;
        info!(user_id = user.id, "added user");
        Ok(user)
    }

    pub async fn list_users(&self) -> AppResult<Vec<User>> {
        self.store.list_users().await.inspect_err(log_storage_failure)
    }

    pub async fn get_user(&self, user_id: i32) -> AppResult<User> {
        self.store
            .get_user(user_id)
            .await
            .inspect_err(log_storage_failure)?
            .ok_or(AppError::NotFound(Missing::User(user_id)))
    }

    // Without a name this only checks that the user exists.
    #[instrument(skip(self))]
    pub async fn update_user(&self, user_id: i32, name: Option<&str>) -> AppResult<()> {
        let Some(name) = name else {
            self.get_user(user_id).await?;
            return Ok(());
        };
        let name = require_text("name", name)?;

        if !self.store.rename_user(user_id, &name).await.inspect_err(log_storage_failure)? {
            return Err(AppError::NotFound(Missing::User(user_id)));
        }
        info!("renamed user");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete_user(&self, user_id: i32) -> AppResult<()> {
        if !self.store.delete_user(user_id).await.inspect_err(log_storage_failure)? {
            return Err(AppError::NotFound(Missing::User(user_id)));
        }
        info!("deleted user");
        Ok(())
    }

    pub async fn list_movies(&self) -> AppResult<Vec<Movie>> {
        self.store.list_movies().await.inspect_err(log_storage_failure)
    }

    #[instrument(skip(self, req), fields(title = %req.title, year = ?req.release_year))]
    pub async fn add_user_movie(&self, user_id: i32, req: AddMovie) -> AppResult<LinkedMovie> {
        let title = require_text("title", &req.title)?;
        let user_rating = check_rating(req.user_rating)?;
        let notes = req.notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());

        self.get_user(user_id).await?;

        let Some(metadata) = self.metadata.lookup(&title, req.release_year).await? else {
            debug!("no metadata match");
            return Err(AppError::NotFound(Missing::Metadata { title, year: req.release_year }));
        };
        debug!(matched = %metadata.title, "metadata found");

        let movie = NewMovie {
            title_key: title_key(&title),
            title,
            director: metadata.director,
            release_year: req.release_year.or(metadata.year),
            rating: metadata.rating,
            poster_url: metadata.poster_url,
        };
        let link = LinkPatch { rating: user_rating, notes };

        match self.store.link_movie(user_id, movie, link).await.inspect_err(log_storage_failure)? {
            LinkOutcome::Linked(linked) => {
                info!(movie_id = linked.movie.id, created = linked.created, "linked movie");
                Ok(linked)
            },
            LinkOutcome::AlreadyLinked(movie) => {
                Err(AppError::AlreadyLinked { user_id, movie_id: movie.id })
            },
            LinkOutcome::UserMissing => Err(AppError::NotFound(Missing::User(user_id))),
        }
    }

    pub async fn user_movies(&self, user_id: i32) -> AppResult<Vec<UserMovie>> {
        self.get_user(user_id).await?;
        self.store.user_movies(user_id).await.inspect_err(log_storage_failure)
    }

    pub async fn user_movie(&self, user_id: i32, movie_id: i32) -> AppResult<UserMovie> {
        self.store
            .user_movie(user_id, movie_id)
            .await
            .inspect_err(log_storage_failure)?
            .ok_or(AppError::NotFound(Missing::Link { user_id, movie_id }))
    }

    // Blank notes clear the stored notes.
    #[instrument(skip(self))]
    pub async fn update_user_movie(
        &self,
        user_id: i32,
        movie_id: i32,
        patch: LinkPatch,
    ) -> AppResult<()> {
        let patch = LinkPatch {
            rating: check_rating(patch.rating)?,
            notes: patch.notes.map(|n| n.trim().to_string()),
        };

        if !self
            .store
            .update_link(user_id, movie_id, patch)
            .await
            .inspect_err(log_storage_failure)?
        {
            return Err(AppError::NotFound(Missing::Link { user_id, movie_id }));
        }
        info!("updated movie in list");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn remove_user_movie(&self, user_id: i32, movie_id: i32) -> AppResult<()> {
        if !self.store.delete_link(user_id, movie_id).await.inspect_err(log_storage_failure)? {
            return Err(AppError::NotFound(Missing::Link { user_id, movie_id }));
        }
        info!("removed movie from list");
        Ok(())
    }
}

pub fn title_key(title: &str) -> String {
    title.trim().to_lowercase()
}

fn require_text(field: &str, value: &str) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::validation(format!("{field} must not be blank")));
    }
    Ok(value.to_string())
}

fn check_rating(rating: Option<f64>) -> AppResult<Option<f64>> {
    match rating {
        Some(r) if !(0.0..=10.0).contains(&r) => {
            Err(AppError::validation(format!("rating must be between 0 and 10, got {r}")))
        },
        other => Ok(other),
    }
}

fn log_storage_failure(err: &AppError) {
    if let AppError::Storage(source) = err {
        tracing::error!(error = %source, "storage operation failed");
    }
}
