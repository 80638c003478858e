use std::fmt;

use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::{
    catalog::Catalog,
    error::{AppError, AppResult},
    models::{AddMovie, LinkPatch, LinkedMovie, Movie, User, UserMovie},
    omdb::MetadataProvider,
    store::CatalogStore,
};

#[derive(Debug, Parser)]
#[command(name = "movielist", version, about = "Personal movie lists over a shared catalog")]
pub struct Cli {
    /// Print results as JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage users
    #[command(subcommand)]
    Users(UserCommand),

    /// Manage movie lists and browse the catalog
    #[command(subcommand)]
    Movies(MovieCommand),
}

#[derive(Debug, Subcommand)]
pub enum UserCommand {
    List,
    Add {
        name: String,
    },
    Rename {
        id: i32,
        name: Option<String>,
    },
    /// Delete a user and everything in their list
    Delete {
        id: i32,
    },
}

#[derive(Debug, Subcommand)]
pub enum MovieCommand {
    /// Every movie any user has added
    Catalog,
    List {
        user: i32,
    },
    Show {
        user: i32,
        movie: i32,
    },
    /// Look a movie up and add it to a user's list
    Add {
        user: i32,
        title: String,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long, allow_negative_numbers = true)]
        rating: Option<f64>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Change the rating and/or notes of a movie in a user's list
    Update {
        user: i32,
        movie: i32,
        #[arg(long, allow_negative_numbers = true)]
        rating: Option<f64>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Remove a movie from a user's list; the catalog entry stays
    Remove {
        user: i32,
        movie: i32,
    },
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Output {
    Users(Vec<User>),
    User(User),
    Movies(Vec<Movie>),
    UserMovies(Vec<UserMovie>),
    UserMovie(UserMovie),
    Linked(LinkedMovie),
    Done(String),
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Users(users) if users.is_empty() => f.write_str("no users yet"),
            Output::Users(users) => write_lines(f, users),
            Output::User(user) => write!(f, "{user}"),
            Output::Movies(movies) if movies.is_empty() => f.write_str("the catalog is empty"),
            Output::Movies(movies) => write_lines(f, movies),
            Output::UserMovies(entries) if entries.is_empty() => f.write_str("no movies in this list"),
            Output::UserMovies(entries) => write_lines(f, entries),
            Output::UserMovie(entry) => write!(f, "{entry}"),
            Output::Linked(LinkedMovie { movie, created: true }) => {
                write!(f, "added {movie} (new to the catalog)")
            },
            Output::Linked(LinkedMovie { movie, created: false }) => write!(f, "added {movie}"),
            Output::Done(msg) => f.write_str(msg),
        }
    }
}

fn write_lines<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            writeln!(f)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

pub async fn run<S: CatalogStore, M: MetadataProvider>(
    catalog: &Catalog<S, M>,
    command: Command,
) -> AppResult<Output> {
    match command {
        Command::Users(cmd) => run_users(catalog, cmd).await,
        Command::Movies(cmd) => run_movies(catalog, cmd).await,
    }
}

async fn run_users<S: CatalogStore, M: MetadataProvider>(
    catalog: &Catalog<S, M>,
    command: UserCommand,
) -> AppResult<Output> {
    Ok(match command {
        UserCommand::List => Output::Users(catalog.list_users().await?),
        UserCommand::Add { name } => Output::User(catalog.add_user(&name).await?),
        UserCommand::Rename { id, name } => {
            catalog.update_user(id, name.as_deref()).await?;
            Output::User(catalog.get_user(id).await?)
        },
        UserCommand::Delete { id } => {
            catalog.delete_user(id).await?;
            Output::Done(format!("deleted user {id}"))
        },
    })
}

async fn run_movies<S: CatalogStore, M: MetadataProvider>(
    catalog: &Catalog<S, M>,
    command: MovieCommand,
) -> AppResult<Output> {
    Ok(match command {
        MovieCommand::Catalog => Output::Movies(catalog.list_movies().await?),
        MovieCommand::List { user } => Output::UserMovies(catalog.user_movies(user).await?),
        MovieCommand::Show { user, movie } => Output::UserMovie(catalog.user_movie(user, movie).await?),
        MovieCommand::Add { user, title, year, rating, notes } => {
            let req = AddMovie { title, release_year: year, user_rating: rating, notes };
            Output::Linked(catalog.add_user_movie(user, req).await?)
        },
        MovieCommand::Update { user, movie, rating, notes } => {
            catalog.update_user_movie(user, movie, LinkPatch { rating, notes }).await?;
            Output::UserMovie(catalog.user_movie(user, movie).await?)
        },
        MovieCommand::Remove { user, movie } => {
            catalog.remove_user_movie(user, movie).await?;
            Output::Done(format!("removed movie {movie} from user {user}'s list"))
        },
    })
}

// Storage causes are logged, not shown.
pub fn failure_message(err: &AppError) -> String {
    match err {
        AppError::Storage(_) => "failed: the movie database could not be read or updated".to_string(),
        err if err.is_transient() => format!("failed: {err}; try again later"),
        err => format!("failed: {err}"),
    }
}
