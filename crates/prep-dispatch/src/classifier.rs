//! Category classification boundary.
//!
//! The classifier scores an event's text against the user's category
//! labels. It is strictly best-effort: any failure here degrades to "no
//! category applied" and the run continues.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use prep_engine::types::{CalendarEvent, Category, Reminder};

/// Per-label scores for one classification call.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationScores {
    pub labels: Vec<String>,
    pub scores: Vec<f64>,
}

#[derive(Error, Debug)]
#[error("Classifier call failed: {0}")]
pub struct ClassifierError(pub String);

#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(
        &self,
        text: &str,
        labels: &[String],
    ) -> std::result::Result<ClassificationScores, ClassifierError>;
}

/// A label only counts as a match above this score.
const MIN_CATEGORY_SCORE: f64 = 0.5;

/// Pick the best-scoring category for an event, or `None` -- including on
/// classifier failure, which is logged and swallowed by design.
pub async fn best_match_category<'a, C: Classifier + ?Sized>(
    classifier: &C,
    event: &CalendarEvent,
    categories: &'a [Category],
) -> Option<&'a Category> {
    if categories.is_empty() {
        return None;
    }

    let text = match (&event.title, event.id.as_str()) {
        (Some(title), _) => title.clone(),
        (None, id) => id.to_string(),
    };
    let labels: Vec<String> = categories.iter().map(|c| c.name.clone()).collect();

    let scores = match classifier.classify(&text, &labels).await {
        Ok(scores) => scores,
        Err(e) => {
            tracing::warn!(event = %event.id, error = %e, "classifier failed; no category applied");
            return None;
        }
    };

    let mut best: Option<(&str, f64)> = None;
    for (label, score) in scores.labels.iter().zip(scores.scores.iter()) {
        if *score >= MIN_CATEGORY_SCORE && best.is_none_or(|(_, s)| *score > s) {
            best = Some((label.as_str(), *score));
        }
    }

    best.and_then(|(label, _)| categories.iter().find(|c| c.name == label))
}

/// Synthesize reminder rows for an event from a list of minute offsets
/// (category or preference defaults). In-memory only; the caller decides
/// whether to commit them through the store.
pub fn reminders_from_minutes(
    event: &CalendarEvent,
    minutes: &[i64],
    use_default: bool,
) -> Vec<Reminder> {
    minutes
        .iter()
        .map(|&m| Reminder {
            id: Uuid::new_v4(),
            user_id: event.user_id.clone(),
            event_id: event.id.clone(),
            timezone: event.timezone,
            minutes: m,
            use_default,
        })
        .collect()
}
