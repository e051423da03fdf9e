use crate::error::{SpiderError, SpiderResult};
use crate::lookup::COUNTRIES;
use crate::tiprank::fetch::DomainLimit;
use dotenv::var;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

/// Key of the dividend-history table within [`StoreConfig::colnames`].
pub const TIPRANK_DIVIDEND_LIST_COLLECTION: &str = "tiprank_dividend_list";

pub const ALLOW_DOMAIN: &str = "www.tipranks.com";
pub const DOMAIN_GLOB: &str = "*tipranks.*";

/// Fetch-side settings.
#[derive(Clone, Debug)]
pub struct SpiderConfig {
    pub base_url: String,
    pub allowed_domain: String,
    pub limit: DomainLimit,
    pub request_timeout: Duration,
    pub countries: Vec<String>,
}

impl Default for SpiderConfig {
    fn default() -> Self {
        Self {
            base_url: format!("https://{ALLOW_DOMAIN}"),
            allowed_domain: ALLOW_DOMAIN.to_string(),
            limit: DomainLimit {
                glob: DOMAIN_GLOB.to_string(),
                parallelism: 2,
                random_delay: Duration::from_secs(10),
            },
            request_timeout: Duration::from_secs(30),
            countries: COUNTRIES.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl SpiderConfig {
    /// Read overrides from the environment (and `.env`), falling back to the defaults.
    pub fn from_env() -> SpiderResult<Self> {
        let default = Self::default();
        Ok(Self {
            base_url: var("DIVVY_BASE_URL").unwrap_or(default.base_url),
            allowed_domain: var("DIVVY_ALLOWED_DOMAIN").unwrap_or(default.allowed_domain),
            limit: DomainLimit {
                glob: var("DIVVY_DOMAIN_GLOB").unwrap_or(default.limit.glob),
                parallelism: env_or("DIVVY_PARALLELISM", default.limit.parallelism)?,
                random_delay: Duration::from_millis(env_or(
                    "DIVVY_RANDOM_DELAY_MS",
                    default.limit.random_delay.as_millis() as u64,
                )?),
            },
            request_timeout: Duration::from_millis(env_or(
                "DIVVY_REQUEST_TIMEOUT_MS",
                default.request_timeout.as_millis() as u64,
            )?),
            countries: default.countries,
        })
    }
}

/// Storage-side settings.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub url: String,
    pub min_pool_size: usize,
    pub max_pool_size: usize,
    pub idle_timeout: Option<Duration>,
    pub op_timeout: Duration,
    pub schema_version: String,
    pub colnames: HashMap<String, String>,
}

impl StoreConfig {
    pub fn from_env() -> SpiderResult<Self> {
        let url = var("DIVIDEND_DB_URL")
            .map_err(|_| SpiderError::Config("environment variable DIVIDEND_DB_URL".into()))?;

        let idle_ms: u64 = env_or("DIVVY_POOL_IDLE_MS", 0)?;
        let colnames = parse_colnames(&var("DIVVY_COLNAMES").unwrap_or_else(|_| {
            format!("{TIPRANK_DIVIDEND_LIST_COLLECTION}=tiprank_dividends")
        }))?;

        Ok(Self {
            url,
            min_pool_size: env_or("DIVVY_POOL_MIN", 0)?,
            max_pool_size: env_or("DIVVY_POOL_MAX", 8)?,
            idle_timeout: (idle_ms > 0).then(|| Duration::from_millis(idle_ms)),
            op_timeout: Duration::from_millis(env_or("DIVVY_OP_TIMEOUT_MS", 10_000)?),
            schema_version: var("DIVVY_SCHEMA_VERSION").unwrap_or_else(|_| "1.0.0".to_string()),
            colnames,
        })
    }

    /// Resolve a logical collection name to its table.
    pub fn colname(&self, key: &str) -> SpiderResult<&str> {
        self.colnames
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| SpiderError::MissingCollection(key.to_string()))
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> SpiderResult<T> {
    match var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| SpiderError::Config(format!("{key} has an invalid value \"{raw}\""))),
        Err(_) => Ok(default),
    }
}

/// Parses `name=table,name=table`. Table names end up inside SQL text, so they are limited to
/// `[A-Za-z0-9_.]`.
pub fn parse_colnames(raw: &str) -> SpiderResult<HashMap<String, String>> {
    let mut colnames = HashMap::new();
    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (key, table) = pair
            .split_once('=')
            .ok_or_else(|| SpiderError::Config(format!("colname entry \"{pair}\" has no '='")))?;
        let table = table.trim();
        if table.is_empty()
            || !table
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        {
            return Err(SpiderError::Config(format!("invalid table name \"{table}\"")));
        }
        colnames.insert(key.trim().to_string(), table.to_string());
    }
    Ok(colnames)
}
