use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// A genre bucket the bandit can choose among
///
/// Movie buckets and song buckets never overlap, so an arm implicitly
/// identifies the content type as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arm {
    Drama,
    Comedy,
    Action,
    Romance,
    Thriller,
    OtherMovie,
    Pop,
    Rock,
    Hiphop,
    Rnb,
    Country,
    OtherSong,
}

impl Arm {
    /// Every arm in its canonical order (six movie buckets, then six song buckets)
    pub const ALL: [Arm; 12] = [
        Arm::Drama,
        Arm::Comedy,
        Arm::Action,
        Arm::Romance,
        Arm::Thriller,
        Arm::OtherMovie,
        Arm::Pop,
        Arm::Rock,
        Arm::Hiphop,
        Arm::Rnb,
        Arm::Country,
        Arm::OtherSong,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Arm::Drama => "drama",
            Arm::Comedy => "comedy",
            Arm::Action => "action",
            Arm::Romance => "romance",
            Arm::Thriller => "thriller",
            Arm::OtherMovie => "other_movie",
            Arm::Pop => "pop",
            Arm::Rock => "rock",
            Arm::Hiphop => "hiphop",
            Arm::Rnb => "rnb",
            Arm::Country => "country",
            Arm::OtherSong => "other_song",
        }
    }

    pub fn is_movie(&self) -> bool {
        matches!(
            self,
            Arm::Drama | Arm::Comedy | Arm::Action | Arm::Romance | Arm::Thriller | Arm::OtherMovie
        )
    }
}

impl Display for Arm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
