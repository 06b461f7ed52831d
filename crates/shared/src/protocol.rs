use serde::{Deserialize, Serialize};

use crate::domain::{InteractionKind, ProductId, UserId};

pub const MAX_PRODUCT_RATING: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub preferences: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: f64,
    pub image_url: String,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub tags: String,
}

impl Product {
    pub fn star_count(&self) -> usize {
        let rating = if self.rating.is_finite() {
            self.rating.clamp(0.0, MAX_PRODUCT_RATING)
        } else {
            0.0
        };
        rating.round() as usize
    }
}

/// One ranked entry. Rank is the position in the list the server returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub product: Product,
    pub score: f64,
    pub explanation: String,
}

impl Recommendation {
    pub fn match_percent(&self) -> i64 {
        (self.score * 100.0).round() as i64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRequest {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub interaction_type: InteractionKind,
}

impl InteractionRequest {
    pub fn new(user_id: UserId, product_id: ProductId, kind: InteractionKind) -> Self {
        Self {
            user_id,
            product_id,
            interaction_type: kind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageQuery {
    pub skip: u32,
    pub limit: u32,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self { skip: 0, limit: 100 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationQuery {
    pub num_recommendations: u32,
}

impl Default for RecommendationQuery {
    fn default() -> Self {
        Self {
            num_recommendations: 5,
        }
    }
}
