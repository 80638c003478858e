use std::fmt;

#[derive(Clone, Debug, PartialEq)]
pub enum Missing {
    User(i32),
    Link { user_id: i32, movie_id: i32 },
    Metadata { title: String, year: Option<i32> },
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Missing::User(id) => write!(f, "user {id} not found"),
            Missing::Link { user_id, movie_id } => {
                write!(f, "movie {movie_id} is not in user {user_id}'s list")
            },
            Missing::Metadata { title, year: Some(year) } => {
                write!(f, "no movie matching \"{title}\" ({year}) was found")
            },
            Missing::Metadata { title, year: None } => {
                write!(f, "no movie matching \"{title}\" was found")
            },
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(Missing),

    #[error("movie {movie_id} is already in user {user_id}'s list")]
    AlreadyLinked { user_id: i32, movie_id: i32 },

    #[error("metadata provider unavailable: {0}")]
    TransientProvider(String),

    #[error("metadata provider rejected the request: {0}")]
    ProviderRejected(String),

    #[error("storage error: {0}")]
    Storage(#[from] sea_orm::DbErr),
}

impl AppError {
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::TransientProvider(_))
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::TransientProvider("request timed out".to_string())
        } else if err.is_builder() {
            // A request that cannot be built fails the same way on every retry.
            AppError::ProviderRejected(err.to_string())
        } else {
            AppError::TransientProvider(err.to_string())
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
