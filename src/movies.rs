//! Movie backend the assistant's functions call into.
//!
//! [`StubMovieBackend`] serves fixed synthetic data; nothing here talks to a
//! real listing or ticketing service.

use anyhow::Result;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};

#[cfg_attr(test, mockall::automock)]
pub trait MovieBackend: Send + Sync {
    fn get_now_playing_movies(&self) -> Result<Value>;

    fn get_showtimes(&self, title: &str, location: &str) -> Result<Value>;

    fn buy_ticket(&self, theater: &str, movie: &str, showtime: &str) -> Result<Value>;

    fn get_reviews(&self, movie_id: &str) -> Result<Value>;
}

struct CatalogEntry {
    id: u32,
    title: &'static str,
    release_date: &'static str,
    overview: &'static str,
    reviews: &'static [(&'static str, u8, &'static str)],
}

const CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        id: 693134,
        title: "Dune: Part Two",
        release_date: "2024-02-27",
        overview: "Paul Atreides unites with the Fremen while on a path of revenge against the conspirators who destroyed his family.",
        reviews: &[
            ("Mara K.", 9, "Enormous in every sense. The sound design alone is worth the ticket."),
            ("J. Ortega", 8, "Slower than the first half of the story, but the payoff lands."),
        ],
    },
    CatalogEntry {
        id: 1011985,
        title: "Kung Fu Panda 4",
        release_date: "2024-03-02",
        overview: "Po must train a new Dragon Warrior while facing a shape-shifting sorceress.",
        reviews: &[("Sam P.", 6, "Fun for the kids, a little thin for everyone else.")],
    },
    CatalogEntry {
        id: 823464,
        title: "Godzilla x Kong: The New Empire",
        release_date: "2024-03-27",
        overview: "Two titans team up against a colossal threat hidden deep within Hollow Earth.",
        reviews: &[
            ("Dee W.", 7, "Exactly the monster brawl it promises."),
            ("Lee C.", 5, "Great fights, forgettable humans."),
        ],
    },
    CatalogEntry {
        id: 929590,
        title: "Civil War",
        release_date: "2024-04-10",
        overview: "A team of journalists travels across a fractured United States during a second civil war.",
        reviews: &[],
    },
];

const THEATERS: &[(&str, u32, &[&str])] = &[
    ("AMC 10", 120, &["1:00pm", "4:15pm", "7:30pm"]),
    ("Regal Cinema 8", 455, &["2:10pm", "5:40pm", "9:05pm"]),
    ("Alamo Drafthouse", 38, &["12:30pm", "6:00pm", "10:20pm"]),
];

/// Deterministic in-memory backend.
#[derive(Debug, Default)]
pub struct StubMovieBackend {
    confirmations: AtomicU64,
}

impl StubMovieBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn find_title(title: &str) -> Option<&'static CatalogEntry> {
        let needle = title.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        CATALOG
            .iter()
            .find(|entry| entry.title.to_lowercase().contains(&needle))
    }
}

impl MovieBackend for StubMovieBackend {
    fn get_now_playing_movies(&self) -> Result<Value> {
        let movies: Vec<Value> = CATALOG
            .iter()
            .map(|entry| {
                json!({
                    "id": entry.id,
                    "title": entry.title,
                    "release_date": entry.release_date,
                    "overview": entry.overview,
                })
            })
            .collect();
        Ok(Value::Array(movies))
    }

    fn get_showtimes(&self, title: &str, location: &str) -> Result<Value> {
        let Some(entry) = Self::find_title(title) else {
            return Ok(json!([]));
        };

        let showtimes: Vec<Value> = THEATERS
            .iter()
            .map(|(theater, street_number, times)| {
                json!({
                    "theater": theater,
                    "address": format!("{street_number} Main St, {location}"),
                    "movie": entry.title,
                    "location": location,
                    "times": times,
                })
            })
            .collect();
        Ok(Value::Array(showtimes))
    }

    fn buy_ticket(&self, theater: &str, movie: &str, showtime: &str) -> Result<Value> {
        let number = self.confirmations.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(json!({
            "confirmation": format!("CONF-{number:06}"),
            "theater": theater,
            "movie": movie,
            "showtime": showtime,
            "status": "confirmed",
        }))
    }

    fn get_reviews(&self, movie_id: &str) -> Result<Value> {
        let reviews: Vec<Value> = CATALOG
            .iter()
            .find(|entry| entry.id.to_string() == movie_id.trim())
            .map(|entry| {
                entry
                    .reviews
                    .iter()
                    .map(|(author, rating, content)| {
                        json!({ "author": author, "rating": rating, "content": content })
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(Value::Array(reviews))
    }
}
