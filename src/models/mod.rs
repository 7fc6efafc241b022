use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Display;

pub mod arm;

pub use arm::Arm;

/// Kind of content a candidate represents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Song,
    #[default]
    Movie,
}

impl Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentType::Song => write!(f, "song"),
            ContentType::Movie => write!(f, "movie"),
        }
    }
}

/// Genre field as delivered by the catalog
///
/// Movie catalogs use pipe-delimited strings (`"Comedy|Romance"`) or lists,
/// song catalogs mostly use a single label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawGenre {
    One(String),
    Many(Vec<String>),
}

impl From<&str> for RawGenre {
    fn from(value: &str) -> Self {
        RawGenre::One(value.to_string())
    }
}

/// A content item produced by candidate retrieval
///
/// Only the content type and genre are interpreted here; everything else is
/// carried through untouched so it can be echoed back to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "type", default)]
    pub content_type: ContentType,
    #[serde(default, alias = "genres", skip_serializing_if = "Option::is_none")]
    pub genre: Option<RawGenre>,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl Candidate {
    pub fn new(content_type: ContentType, genre: impl Into<RawGenre>) -> Self {
        Self {
            content_type,
            genre: Some(genre.into()),
            metadata: Map::new(),
        }
    }

    pub fn movie(genre: &str) -> Self {
        Self::new(ContentType::Movie, genre)
    }

    pub fn song(genre: &str) -> Self {
        Self::new(ContentType::Song, genre)
    }
}

/// Emotion labels produced by the text classifier, in feature order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Anger,
    Fear,
    Joy,
    Love,
    Neutral,
    Sadness,
    Surprise,
}

impl Emotion {
    pub const ALL: [Emotion; 7] = [
        Emotion::Anger,
        Emotion::Fear,
        Emotion::Joy,
        Emotion::Love,
        Emotion::Neutral,
        Emotion::Sadness,
        Emotion::Surprise,
    ];

    /// Parses a classifier label; unknown labels yield `None`
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "anger" => Some(Emotion::Anger),
            "fear" => Some(Emotion::Fear),
            "joy" => Some(Emotion::Joy),
            "love" => Some(Emotion::Love),
            "neutral" => Some(Emotion::Neutral),
            "sadness" => Some(Emotion::Sadness),
            "surprise" => Some(Emotion::Surprise),
            _ => None,
        }
    }

    /// Position within the one-hot block
    pub fn index(&self) -> usize {
        *self as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_candidate_from_movie_json() {
        let candidate: Candidate = serde_json::from_value(json!({
            "type": "movie",
            "genres": "Comedy|Romance",
            "title": "Groundhog Day",
            "year": 1993
        }))
        .unwrap();

        assert_eq!(candidate.content_type, ContentType::Movie);
        assert_eq!(candidate.genre, Some(RawGenre::One("Comedy|Romance".to_string())));
        assert_eq!(candidate.metadata["title"], "Groundhog Day");
    }

    #[test]
    fn test_candidate_from_song_json_with_list() {
        let candidate: Candidate = serde_json::from_value(json!({
            "type": "song",
            "genre": ["Hip Hop", "Rap"],
            "name": "Juicy"
        }))
        .unwrap();

        assert_eq!(candidate.content_type, ContentType::Song);
        assert_eq!(
            candidate.genre,
            Some(RawGenre::Many(vec!["Hip Hop".to_string(), "Rap".to_string()]))
        );
    }

    #[test]
    fn test_candidate_defaults_to_movie_without_genre() {
        let candidate: Candidate = serde_json::from_value(json!({ "title": "Mystery" })).unwrap();
        assert_eq!(candidate.content_type, ContentType::Movie);
        assert!(candidate.genre.is_none());
    }

    #[test]
    fn test_candidate_serializes_metadata_flat() {
        let mut candidate = Candidate::song("pop");
        candidate.metadata.insert("name".to_string(), json!("Toxic"));

        let value = serde_json::to_value(&candidate).unwrap();
        assert_eq!(value, json!({ "type": "song", "genre": "pop", "name": "Toxic" }));
    }

    #[test]
    fn test_emotion_parse() {
        assert_eq!(Emotion::parse("Joy"), Some(Emotion::Joy));
        assert_eq!(Emotion::parse(" sadness "), Some(Emotion::Sadness));
        assert_eq!(Emotion::parse("boredom"), None);
    }

    #[test]
    fn test_emotion_index_follows_vocabulary_order() {
        for (i, emotion) in Emotion::ALL.iter().enumerate() {
            assert_eq!(emotion.index(), i);
        }
    }
}
