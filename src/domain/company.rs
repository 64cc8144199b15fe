//! Company reference entity. Root of all per-security relationships.

use chrono::{NaiveDate, NaiveDateTime};

/// A listed company as stored in `companies`.
///
/// `(symbol, exchange)` is unique, as is `isin` when present. Every
/// per-company fact table hangs off `id` with ON DELETE CASCADE, except
/// `events`, which detaches (SET NULL) so event history survives delisting.
#[derive(Debug, Clone)]
pub struct Company {
    pub id: i64,
    pub symbol: String,
    pub name: Option<String>,
    pub exchange: String,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub isin: Option<String>,
    pub listing_date: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Insert payload for a company; timestamps are assigned by the store.
#[derive(Debug, Clone, Default)]
pub struct NewCompany {
    pub symbol: String,
    pub name: Option<String>,
    pub exchange: String,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub isin: Option<String>,
    pub listing_date: Option<NaiveDate>,
}

impl NewCompany {
    pub fn new(symbol: &str, exchange: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            exchange: exchange.to_string(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_isin(mut self, isin: &str) -> Self {
        self.isin = Some(isin.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_fills_optionals() {
        let c = NewCompany::new("RELIANCE", "NSE")
            .with_name("Reliance Industries")
            .with_isin("INE002A01018");
        assert_eq!(c.symbol, "RELIANCE");
        assert_eq!(c.exchange, "NSE");
        assert_eq!(c.name.as_deref(), Some("Reliance Industries"));
        assert_eq!(c.isin.as_deref(), Some("INE002A01018"));
        assert!(c.sector.is_none());
    }
}
