//! Venue relevance scoring
//!
//! A venue's score is the sum of independent [`ScoringFactor`]s, clamped to
//! [0, 1]. Factor weights can add up to more than 1.0 (rating boost, cluster
//! bonus on top of proximity, context bonus); the final clamp is the only
//! normalization.

use crate::models::{
    CategoryId, RecommendationContext, RecommendationResult, UserPreferenceProfile, Venue,
};

pub mod factors;

pub use factors::{
    AmenityFactor, CategoryFactor, ClusterFactor, ContextFactor, FeaturedFactor, PriceFactor,
    ProximityFactor, RatingFactor, SocialFactor,
};

/// Everything a factor may look at when scoring one venue
#[derive(Debug, Clone, Copy)]
pub struct ScoringInput<'a> {
    pub venue: &'a Venue,
    pub profile: &'a UserPreferenceProfile,
    pub context: &'a RecommendationContext,
    /// Positive reviews of this venue written by users the requester follows
    pub positive_reviews_from_followed: u32,
}

/// Contribution of a single factor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactorScore {
    pub contribution: f64,
    pub reason: Option<&'static str>,
}

impl FactorScore {
    pub const ZERO: FactorScore = FactorScore {
        contribution: 0.0,
        reason: None,
    };

    pub fn new(contribution: f64, reason: Option<&'static str>) -> Self {
        Self {
            contribution,
            reason,
        }
    }

    pub fn silent(contribution: f64) -> Self {
        Self::new(contribution, None)
    }

    pub fn explained(contribution: f64, reason: &'static str) -> Self {
        Self::new(contribution, Some(reason))
    }
}

/// One independently testable component of a venue's score
pub trait ScoringFactor: Send + Sync {
    fn name(&self) -> &'static str;

    fn evaluate(&self, input: &ScoringInput<'_>) -> FactorScore;
}

/// Category ids the context bonus looks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextRules {
    pub nightlife_category_id: CategoryId,
    pub cafe_category_id: CategoryId,
}

impl Default for ContextRules {
    fn default() -> Self {
        Self {
            nightlife_category_id: 2,
            cafe_category_id: 3,
        }
    }
}

/// Sums an ordered list of factors into a clamped score with reasons
pub struct Scorer {
    factors: Vec<Box<dyn ScoringFactor>>,
}

impl Default for Scorer {
    fn default() -> Self {
        Self::standard(ContextRules::default())
    }
}

impl Scorer {
    pub fn new(factors: Vec<Box<dyn ScoringFactor>>) -> Self {
        Self { factors }
    }

    /// The production factor set, in the order reasons are reported
    pub fn standard(rules: ContextRules) -> Self {
        Self::new(vec![
            Box::new(CategoryFactor),
            Box::new(RatingFactor),
            Box::new(ProximityFactor),
            Box::new(ClusterFactor),
            Box::new(PriceFactor),
            Box::new(AmenityFactor),
            Box::new(SocialFactor),
            Box::new(FeaturedFactor),
            Box::new(ContextFactor::new(rules)),
        ])
    }

    pub fn factor_names(&self) -> Vec<&'static str> {
        self.factors.iter().map(|f| f.name()).collect()
    }

    /// Scores one venue; pure and deterministic for a given input
    pub fn score(&self, input: &ScoringInput<'_>) -> RecommendationResult {
        let mut total = 0.0;
        let mut reasons = Vec::new();

        for factor in &self.factors {
            let FactorScore {
                contribution,
                reason,
            } = factor.evaluate(input);
            total += contribution;
            if let Some(reason) = reason {
                reasons.push(reason.to_string());
            }
        }

        RecommendationResult {
            venue: input.venue.clone(),
            score: total.clamp(0.0, 1.0),
            reasons,
        }
    }
}

/// Drops non-positive scores, sorts descending (stable) and keeps `limit`
pub fn rank(mut results: Vec<RecommendationResult>, limit: usize) -> Vec<RecommendationResult> {
    results.retain(|r| r.score > 0.0);
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    results.truncate(limit);
    results
}
