use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// The role an artist plays on a track.
///
/// One artist may be linked to the same track several times with
/// different roles, so positions are indexed separately per link type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtistLinkType {
    Artist,
    Arranger,
    Composer,
    Conductor,
    Lyricist,
    Mixer,
    Performer,
    Producer,
    ReleaseArtist,
    Remixer,
    Writer,
}

impl ArtistLinkType {
    /// Number of link types.
    pub const COUNT: usize = 11;

    /// Every link type, in ordinal order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Artist,
        Self::Arranger,
        Self::Composer,
        Self::Conductor,
        Self::Lyricist,
        Self::Mixer,
        Self::Performer,
        Self::Producer,
        Self::ReleaseArtist,
        Self::Remixer,
        Self::Writer,
    ];

    /// Stable ordinal, usable as an array index.
    #[must_use]
    pub const fn ordinal(self) -> usize {
        self as usize
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Artist => "artist",
            Self::Arranger => "arranger",
            Self::Composer => "composer",
            Self::Conductor => "conductor",
            Self::Lyricist => "lyricist",
            Self::Mixer => "mixer",
            Self::Performer => "performer",
            Self::Producer => "producer",
            Self::ReleaseArtist => "release_artist",
            Self::Remixer => "remixer",
            Self::Writer => "writer",
        }
    }
}

impl fmt::Display for ArtistLinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtistLinkType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|link_type| link_type.as_str() == s)
            .ok_or_else(|| Error::InvalidData(format!("unknown artist link type: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinals_match_all_order() {
        for (i, link_type) in ArtistLinkType::ALL.iter().enumerate() {
            assert_eq!(link_type.ordinal(), i);
        }
    }

    #[test]
    fn test_parse_round_trip() {
        for link_type in ArtistLinkType::ALL {
            assert_eq!(link_type.as_str().parse::<ArtistLinkType>().unwrap(), link_type);
        }
    }

    #[test]
    fn test_parse_unknown() {
        assert!("drummer".parse::<ArtistLinkType>().is_err());
    }
}
