//! Immutable city and challenge data. The engine only ever reads from
//! here; hunts reference catalog challenges by id and nothing in the
//! service mutates them.
//!
//! A built-in catalog ships with the binary so the server runs without
//! any provisioning; deployments point `HUNT_CATALOG_PATH` at a JSON file
//! to serve their own cities.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;

use contracts::{Challenge, City};
use serde::Deserialize;

pub const CATALOG_PATH_ENV: &str = "HUNT_CATALOG_PATH";

#[derive(Debug)]
pub enum CatalogError {
    Io(std::io::Error),
    Serde(serde_json::Error),
    Invalid(String),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "catalog io error: {err}"),
            Self::Serde(err) => write!(f, "catalog parse error: {err}"),
            Self::Invalid(detail) => write!(f, "invalid catalog: {detail}"),
        }
    }
}

impl std::error::Error for CatalogError {}

impl From<std::io::Error> for CatalogError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serde(value)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogFile {
    cities: Vec<CityEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CityEntry {
    id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    country: Option<String>,
    challenges: Vec<Challenge>,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    cities: Vec<City>,
    challenges: Vec<(String, Vec<Challenge>)>,
}

impl Catalog {
    /// Environment-selected catalog: `HUNT_CATALOG_PATH` if set and
    /// non-blank, else the built-in cities.
    pub fn load() -> Result<Self, CatalogError> {
        match std::env::var(CATALOG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_json_file(path),
            _ => Ok(Self::builtin()),
        }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path)?;
        let file: CatalogFile = serde_json::from_str(&raw)?;
        Self::from_entries(file.cities)
    }

    fn from_entries(entries: Vec<CityEntry>) -> Result<Self, CatalogError> {
        let mut cities = Vec::with_capacity(entries.len());
        let mut challenges = Vec::with_capacity(entries.len());
        let mut seen_cities = BTreeSet::new();

        for entry in entries {
            if !seen_cities.insert(entry.id.clone()) {
                return Err(CatalogError::Invalid(format!(
                    "duplicate city id {}",
                    entry.id
                )));
            }

            let mut seen_ids = BTreeSet::new();
            for challenge in &entry.challenges {
                if !seen_ids.insert(challenge.id) {
                    return Err(CatalogError::Invalid(format!(
                        "duplicate challenge id {} in city {}",
                        challenge.id, entry.id
                    )));
                }
            }

            cities.push(City {
                id: entry.id.clone(),
                name: entry.name,
                description: entry.description,
                country: entry.country,
                challenge_count: entry.challenges.len() as u32,
            });
            challenges.push((entry.id, entry.challenges));
        }

        Ok(Self { cities, challenges })
    }

    pub fn cities(&self) -> &[City] {
        &self.cities
    }

    pub fn city(&self, city_id: &str) -> Option<&City> {
        self.cities.iter().find(|city| city.id == city_id)
    }

    pub fn challenges(&self, city_id: &str) -> Option<&[Challenge]> {
        self.challenges
            .iter()
            .find(|(id, _)| id == city_id)
            .map(|(_, challenges)| challenges.as_slice())
    }

    /// The pool hunts draw from: the city's challenges minus placeholders.
    pub fn eligible_pool(&self, city_id: &str) -> Option<Vec<Challenge>> {
        self.challenges(city_id).map(|challenges| {
            challenges
                .iter()
                .filter(|challenge| !challenge.placeholder)
                .cloned()
                .collect()
        })
    }

    pub fn builtin() -> Self {
        let entries = vec![
            CityEntry {
                id: "caracas".to_string(),
                name: "Caracas".to_string(),
                description: Some("Hillside murals and mountain views".to_string()),
                country: Some("Venezuela".to_string()),
                challenges: vec![
                    challenge(101, "Find the oldest mural on Calle Lincoln", &[]),
                    challenge(102, "Order an arepa from a street stand", &[]),
                    challenge(103, "Photograph the Avila from a rooftop", &[]),
                    challenge(104, "Spot a parakeet in Parque del Este", &[]),
                    challenge(105, "Find the brutalist towers of Parque Central", &[]),
                    challenge(106, "Count the fountains in Plaza Venezuela", &[]),
                    challenge(107, "Ride the cable car toward the summit", &[]),
                    challenge(108, "Find a book stall on Sabana Grande", &[]),
                    challenge(109, "Hear live music in a cafe", &[]),
                    challenge(110, "Sketch the cathedral facade", &[]),
                ],
            },
            CityEntry {
                id: "lisbon".to_string(),
                name: "Lisbon".to_string(),
                description: Some("Tiles, trams, and seven hills".to_string()),
                country: Some("Portugal".to_string()),
                challenges: vec![
                    challenge(201, "Ride tram 28 up to Graca", &["movement"]),
                    challenge(202, "Taste a pastel de nata still warm", &["food"]),
                    challenge(203, "Find an azulejo older than 1900", &["culture", "art"]),
                    challenge(204, "Photograph the 25 de Abril bridge at dusk", &["photo"]),
                    challenge(205, "Climb to the Sao Jorge castle walls", &["culture", "movement"]),
                    challenge(206, "Hear fado drifting from an Alfama window", &["audio", "nightlife"]),
                    challenge(207, "Haggle at the Feira da Ladra flea market", &["shopping", "social"]),
                    challenge(208, "Find the smallest bookshop in the world", &["puzzles", "shopping"]),
                    challenge(209, "Sketch the Belem tower from the water line", &["art"]),
                    challenge(210, "Share a ginjinha with a stranger", &["food", "social"]),
                    challenge(211, "Find the rhino on the Belem monastery", &["puzzles", "culture"]),
                    challenge(212, "Watch surfers from the Cascais train", &["nature", "sports"]),
                    challenge(213, "Climb the Santa Justa lift stairs instead", &["movement", "sports"]),
                    challenge(214, "Record one minute of Rossio square", &["audio", "photo"]),
                    challenge(215, "Picnic under the Eduardo VII hedges", &["nature", "food"]),
                    challenge(216, "Find a ship on a building older than Pombal", &["puzzles", "culture"]),
                    challenge(217, "Dance at a rooftop bar in Bairro Alto", &["nightlife", "group"]),
                    challenge(218, "Trace the aqueduct across the valley", &["nature", "movement"]),
                    placeholder(219, "Coming soon: Parque das Nacoes route"),
                ],
            },
            CityEntry {
                id: "tokyo".to_string(),
                name: "Tokyo".to_string(),
                description: Some("Neon crossings and quiet shrines".to_string()),
                country: Some("Japan".to_string()),
                challenges: vec![
                    challenge(301, "Cross Shibuya scramble in a group photo", &["photo", "group"]),
                    challenge(302, "Slurp ramen standing up", &["food"]),
                    challenge(303, "Find the oldest torii in Ueno", &["culture", "puzzles"]),
                    challenge(304, "Record the Yamanote line jingle", &["audio"]),
                    challenge(305, "Spot Fuji from a free observation deck", &["nature", "photo"]),
                    challenge(306, "Buy one strange thing in Akihabara", &["shopping"]),
                    challenge(307, "Sketch a bonsai at a garden", &["art", "nature"]),
                    challenge(308, "Join a karaoke box for one song", &["social", "nightlife", "group"]),
                    challenge(309, "Walk the Meiji shrine gravel path at dawn", &["culture", "movement"]),
                    challenge(310, "Win anything from a claw machine", &["sports", "puzzles"]),
                    challenge(311, "Find the golden flame across the river", &["puzzles", "photo"]),
                    challenge(312, "Taste something from a depachika basement", &["food", "shopping"]),
                    challenge(313, "Catch street fashion on Takeshita street", &["photo", "social"]),
                    challenge(314, "Ride a bicycle along the Sumida", &["movement", "nature"]),
                    challenge(315, "Find a shrine wedged between skyscrapers", &["culture", "puzzles"]),
                    challenge(316, "Cheer one inning of baseball on a screen", &["sports", "social"]),
                    challenge(317, "Listen to the Shinjuku bird crossing signal", &["audio", "puzzles"]),
                    challenge(318, "Toast with a vending-machine drink at night", &["nightlife", "food"]),
                ],
            },
        ];

        Self::from_entries(entries).expect("built-in catalog is valid")
    }
}

fn challenge(id: u32, caption: &str, tags: &[&str]) -> Challenge {
    Challenge {
        id,
        caption: caption.to_string(),
        image_url: format!("/assets/challenges/{id}.jpg"),
        interest_tags: tags.iter().map(|tag| tag.to_string()).collect(),
        placeholder: false,
    }
}

fn placeholder(id: u32, caption: &str) -> Challenge {
    Challenge {
        placeholder: true,
        ..challenge(id, caption, &[])
    }
}
