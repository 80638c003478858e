use std::fmt;

use jiff::civil::Date;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub created_on: Date,
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {} (created on {})", self.id, self.name, self.created_on)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Movie {
    pub id: i32,
    pub title: String,
    pub director: Option<String>,
    pub release_year: Option<i32>,
    pub rating: Option<f64>,
    pub poster_url: Option<String>,
}

impl fmt::Display for Movie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}", self.id, self.title)?;
        if let Some(year) = self.release_year {
            write!(f, " ({year})")?;
        }
        if let Some(rating) = self.rating {
            write!(f, " {rating}/10")?;
        }
        if let Some(director) = &self.director {
            write!(f, ", directed by {director}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UserMovie {
    pub movie: Movie,
    pub notes: Option<String>,
    pub user_rating: Option<f64>,
}

impl fmt::Display for UserMovie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.movie)?;
        if let Some(rating) = self.user_rating {
            write!(f, " · rated {rating}/10")?;
        }
        if let Some(notes) = &self.notes {
            write!(f, " · {notes}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MovieMetadata {
    pub title: String,
    pub year: Option<i32>,
    pub director: Option<String>,
    pub rating: Option<f64>,
    pub poster_url: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct AddMovie {
    pub title: String,
    pub release_year: Option<i32>,
    pub user_rating: Option<f64>,
    pub notes: Option<String>,
}

// `None` leaves the stored value alone.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LinkPatch {
    pub rating: Option<f64>,
    pub notes: Option<String>,
}

impl LinkPatch {
    pub fn is_empty(&self) -> bool {
        self.rating.is_none() && self.notes.is_none()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewMovie {
    pub title: String,
    pub title_key: String,
    pub director: Option<String>,
    pub release_year: Option<i32>,
    pub rating: Option<f64>,
    pub poster_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LinkedMovie {
    pub movie: Movie,
    // false when an existing catalog row was reused
    pub created: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LinkOutcome {
    Linked(LinkedMovie),
    AlreadyLinked(Movie),
    UserMissing,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inception() -> Movie {
        Movie {
            id: 1,
            title: "Inception".to_string(),
            director: Some("Christopher Nolan".to_string()),
            release_year: Some(2010),
            rating: Some(8.8),
            poster_url: None,
        }
    }

    #[test]
    fn test_movie_display() {
        assert_eq!(inception().to_string(), "1. Inception (2010) 8.8/10, directed by Christopher Nolan");

        let bare = Movie {
            id: 2,
            title: "Primer".to_string(),
            director: None,
            release_year: None,
            rating: None,
            poster_url: None,
        };
        assert_eq!(bare.to_string(), "2. Primer");
    }

    #[test]
    fn test_user_movie_display() {
        let entry = UserMovie {
            movie: inception(),
            notes: Some("rewatch".to_string()),
            user_rating: Some(9.0),
        };
        assert_eq!(
            entry.to_string(),
            "1. Inception (2010) 8.8/10, directed by Christopher Nolan · rated 9/10 · rewatch"
        );
    }

    #[test]
    fn test_user_display() {
        let user =
            User { id: 4, name: "Ada".to_string(), created_on: "2025-03-01".parse().unwrap() };
        assert_eq!(user.to_string(), "4. Ada (created on 2025-03-01)");
    }

    #[test]
    fn test_link_patch_is_empty() {
        assert!(LinkPatch::default().is_empty());
        assert!(!LinkPatch { rating: Some(0.0), notes: None }.is_empty());
        assert!(!LinkPatch { rating: None, notes: Some(String::new()) }.is_empty());
    }
}
