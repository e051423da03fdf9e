use crate::error::{SpiderError, SpiderResult};
use std::collections::HashMap;

/// Countries queried on every job, in request order.
pub const COUNTRIES: [&str; 2] = ["Canada", "US"];

lazy_static::lazy_static! {
    /// Static country -> ISO 4217 currency code table.
    pub(crate) static ref CURRENCIES: HashMap<&'static str, &'static str> = {
        let mut map = HashMap::new();
        map.insert("Canada", "CAD");
        map.insert("US", "USD");
        map.insert("UK", "GBP");
        map
    };
}

/// Currency code of a TipRanks country name.
pub fn country_currency(country: &str) -> SpiderResult<&'static str> {
    CURRENCIES
        .get(country)
        .copied()
        .ok_or_else(|| SpiderError::LookupMiss {
            table: "currency",
            key: country.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn currencies() {
        assert_eq!(country_currency("Canada").unwrap(), "CAD");
        assert_eq!(country_currency("US").unwrap(), "USD");
        assert_eq!(country_currency("UK").unwrap(), "GBP");

        let err = country_currency("Atlantis").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LookupMiss);
    }

    #[test]
    fn every_scraped_country_has_a_currency() {
        for country in COUNTRIES {
            assert!(country_currency(country).is_ok(), "{country}");
        }
    }
}
