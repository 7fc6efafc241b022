use crate::models::{Arm, Candidate, ContentType, RawGenre};

/// Maps a raw catalog genre onto one of the fixed arms
///
/// Lists contribute their first element and pipe-delimited strings their first
/// segment. Lookup is case-insensitive and ignores surrounding whitespace.
/// Anything unrecognised lands in the content type's fallback bucket, so this
/// never fails.
pub fn normalize(content_type: ContentType, raw: Option<&RawGenre>) -> Arm {
    let token = raw.and_then(primary_token).unwrap_or_default();

    match content_type {
        ContentType::Movie => movie_arm(&token),
        ContentType::Song => song_arm(&token),
    }
}

/// Arm for a candidate, derived from its content type and genre field
pub fn arm_for(candidate: &Candidate) -> Arm {
    normalize(candidate.content_type, candidate.genre.as_ref())
}

fn primary_token(raw: &RawGenre) -> Option<String> {
    let first = match raw {
        RawGenre::One(value) => value.split('|').next()?,
        RawGenre::Many(values) => values.first()?.as_str(),
    };
    Some(first.trim().to_lowercase())
}

fn movie_arm(token: &str) -> Arm {
    match token {
        "drama" | "war" | "history" => Arm::Drama,
        "comedy" | "animation" | "family" | "musical" => Arm::Comedy,
        "action" | "adventure" | "sci-fi" | "science fiction" | "fantasy" | "western" => {
            Arm::Action
        }
        "romance" => Arm::Romance,
        "thriller" | "horror" | "crime" | "mystery" => Arm::Thriller,
        _ => Arm::OtherMovie,
    }
}

fn song_arm(token: &str) -> Arm {
    match token {
        "pop" | "electronic" | "dance" | "edm" | "latin" => Arm::Pop,
        "rock" | "alternative" | "indie" | "metal" | "punk" => Arm::Rock,
        "hip hop" | "hip-hop" | "rap" => Arm::Hiphop,
        "r&b" | "rnb" | "soul" | "blues" => Arm::Rnb,
        "country" | "folk" => Arm::Country,
        _ => Arm::OtherSong,
    }
}
