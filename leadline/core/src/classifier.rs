//! Category Classifier
//!
//! Keyword-tier classification of inbound messages into a lead temperature.
//!
//! Tiers are checked in order and the first tier with any match wins:
//!
//! 1. **Hot** - price, purchase or urgency signals. Always `hot`.
//! 2. **Cold** - disinterest, deferral, already covered. Always `cold`.
//! 3. **Warm** - curiosity or comparison. Lifts `cold` to `warm`, otherwise
//!    leaves the category alone.
//!
//! A message that says both "not interested" and "how much" is hot: a purchase
//! signal outranks hesitation. Matching is lower-cased substring containment,
//! so "interested" also appears inside "not interested"; the cold tier is
//! checked first, which is what makes that work.

use crate::lead::Category;

/// Intent-to-buy signals
pub const HOT_KEYWORDS: &[&str] = &[
    "quote",
    "price",
    "premium",
    "cost",
    "buy",
    "purchase",
    "proceed",
    "call me",
    "sign up",
    "ready",
    "how much",
    "let's do it",
];

/// Disinterest and deferral signals
pub const COLD_KEYWORDS: &[&str] = &[
    "not interested",
    "no thanks",
    "later",
    "maybe",
    "busy",
    "don't need",
    "already have",
];

/// Curiosity and comparison signals
pub const WARM_KEYWORDS: &[&str] = &[
    "interested",
    "comparing",
    "options",
    "benefits",
    "tell me more",
    "curious",
    "thinking",
];

/// Which keyword tier a message matched
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeywordTier {
    /// Matched a hot keyword
    Hot,
    /// Matched a cold keyword (and no hot one)
    Cold,
    /// Matched a warm keyword only
    Warm,
}

/// Find the highest-precedence tier with a keyword contained in `text`
pub fn matched_tier(text: &str) -> Option<KeywordTier> {
    let lower = text.to_lowercase();
    let contains_any = |keywords: &[&str]| keywords.iter().any(|kw| lower.contains(kw));

    if contains_any(HOT_KEYWORDS) {
        Some(KeywordTier::Hot)
    } else if contains_any(COLD_KEYWORDS) {
        Some(KeywordTier::Cold)
    } else if contains_any(WARM_KEYWORDS) {
        Some(KeywordTier::Warm)
    } else {
        None
    }
}

/// Derive the new category for a lead from an inbound message
pub fn classify(previous: Category, text: &str) -> Category {
    match matched_tier(text) {
        Some(KeywordTier::Hot) => Category::Hot,
        Some(KeywordTier::Cold) => Category::Cold,
        Some(KeywordTier::Warm) if previous == Category::Cold => Category::Warm,
        Some(KeywordTier::Warm) | None => previous,
    }
}
