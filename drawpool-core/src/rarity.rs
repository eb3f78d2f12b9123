use std::{fmt, str::FromStr};

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("unknown rarity")]
pub struct ParseRarityError;

/// Grouping tier used to hand out probability mass.
///
/// The ordering only decides where a tier lands on the search line; it carries
/// no meaning beyond that.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    FromPrimitive,
)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Rarity {
    #[default]
    ZeroStar,
    OneStar,
    TwoStar,
    ThreeStar,
    FourStar,
    FiveStar,
    SixStar,
    SevenStar,
    EightStar,
    NineStar,
    TenStar,
}

impl Rarity {
    pub const ALL: [Self; 11] = [
        Self::ZeroStar,
        Self::OneStar,
        Self::TwoStar,
        Self::ThreeStar,
        Self::FourStar,
        Self::FiveStar,
        Self::SixStar,
        Self::SevenStar,
        Self::EightStar,
        Self::NineStar,
        Self::TenStar,
    ];

    pub const fn stars(self) -> u8 {
        self as u8
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ZeroStar => "zero_star",
            Self::OneStar => "one_star",
            Self::TwoStar => "two_star",
            Self::ThreeStar => "three_star",
            Self::FourStar => "four_star",
            Self::FiveStar => "five_star",
            Self::SixStar => "six_star",
            Self::SevenStar => "seven_star",
            Self::EightStar => "eight_star",
            Self::NineStar => "nine_star",
            Self::TenStar => "ten_star",
        }
    }
}

impl TryFrom<u8> for Rarity {
    type Error = ParseRarityError;

    fn try_from(stars: u8) -> Result<Self, Self::Error> {
        Self::from_u8(stars).ok_or(ParseRarityError)
    }
}

impl FromStr for Rarity {
    type Err = ParseRarityError;

    /// Accepts either the snake case name (`three_star`) or the star count (`3`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(stars) = s.parse::<u8>() {
            return Self::try_from(stars);
        }
        Self::ALL
            .into_iter()
            .find(|rarity| rarity.as_str() == s)
            .ok_or(ParseRarityError)
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}★", self.stars())
    }
}
