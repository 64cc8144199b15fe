//! News/announcement events with optional company association.

use chrono::NaiveDate;

/// One row in `events`. `company_id` is nullable and goes to NULL when the
/// company is deleted, so the event trail outlives coverage changes.
#[derive(Debug, Clone)]
pub struct Event {
    pub company_id: Option<i64>,
    pub event_date: NaiveDate,
    pub event_type: Option<String>,
    pub event_source: Option<String>,
    pub headline: Option<String>,
    /// Scale-8 sentiment metric, typically in [-1, 1].
    pub sentiment_score: Option<f64>,
}

impl Event {
    pub fn new(event_date: NaiveDate) -> Self {
        Self {
            company_id: None,
            event_date,
            event_type: None,
            event_source: None,
            headline: None,
            sentiment_score: None,
        }
    }

    pub fn for_company(mut self, company_id: i64) -> Self {
        self.company_id = Some(company_id);
        self
    }

    pub fn with_headline(mut self, headline: &str) -> Self {
        self.headline = Some(headline.to_string());
        self
    }

    pub fn with_sentiment(mut self, score: f64) -> Self {
        self.sentiment_score = Some(score);
        self
    }
}
