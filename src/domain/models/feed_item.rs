#[cfg(test)]
#[path = "feed_item_test.rs"]
mod tests;

use std::fmt;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use super::Author;

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("rating must be between 1 and 5, got {0}")]
pub struct RatingOutOfRange(pub u8);

/// Star rating of a recommendation. Can only be constructed within
/// `MIN_RATING..=MAX_RATING`, which also makes decoding fail for anything
/// outside that range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub fn value(&self) -> u8 {
        return self.0;
    }

    /// Renders the rating as five stars, filled up to the rating.
    pub fn stars(&self) -> String {
        return (MIN_RATING..=MAX_RATING)
            .map(|idx| {
                if idx <= self.0 {
                    return '★';
                }
                return '☆';
            })
            .collect();
    }
}

impl Default for Rating {
    fn default() -> Rating {
        return Rating(3);
    }
}

impl TryFrom<u8> for Rating {
    type Error = RatingOutOfRange;

    fn try_from(value: u8) -> Result<Rating, RatingOutOfRange> {
        if !(MIN_RATING..=MAX_RATING).contains(&value) {
            return Err(RatingOutOfRange(value));
        }

        return Ok(Rating(value));
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> u8 {
        return rating.0;
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "{}", self.0);
    }
}

/// A shared book recommendation. Items are never edited client side once
/// fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub title: String,
    pub caption: String,
    pub rating: Rating,
    pub image: String,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "user")]
    pub author: Author,
}

/// One server page of feed items alongside the backend's current page count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedPage {
    pub items: Vec<FeedItem>,
    pub total_pages: u32,
}
