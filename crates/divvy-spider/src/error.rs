pub type SpiderResult<T> = Result<T, SpiderError>;

/// Coarse classification of a [`SpiderError`]; callers branch on this rather than on the
/// concrete variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Timeouts, refused connections, bad statuses, disallowed domains.
    Transport,
    /// A response body that is not a JSON array of dividend records.
    Decode,
    /// A single field of a single record could not be parsed.
    FieldParse,
    /// A static lookup (e.g. country -> currency) had no entry; a fallback was used.
    LookupMiss,
    /// Reads or writes against the history store.
    Storage,
    /// Startup configuration.
    Config,
}

impl ErrorKind {
    /// Non-crucial kinds are logged and ingestion carries on.
    pub fn is_ignorable(&self) -> bool {
        matches!(self, ErrorKind::FieldParse | ErrorKind::LookupMiss)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SpiderError {
    #[error("[HTTP Request Error] {0}")]
    HttpRequest(#[from] reqwest::Error),

    #[error("[HTTP Status Error] [{url}] {status}")]
    HttpStatus { status: String, url: String },

    #[error("[Disallowed Domain] {0}")]
    DisallowedDomain(String),

    #[error("[Parse URL Error] {0}")]
    ParseUrl(#[from] url::ParseError),

    #[error("[Decode Error] {0}")]
    Decode(#[from] serde_json::Error),

    #[error("[Field Parse Error] {field}: {message}")]
    FieldParse { field: &'static str, message: String },

    #[error("[Lookup Miss] {table}: {key}")]
    LookupMiss { table: &'static str, key: String },

    #[error("[SQL Error] {0}")]
    Sql(#[from] tokio_postgres::Error),

    #[error("[Pool Error] {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("[Storage Timeout] {0}")]
    StorageTimeout(String),

    #[error("[Write Conflict] {ticker} changed concurrently")]
    Conflict { ticker: String },

    #[error("[Missing Collection] {0}")]
    MissingCollection(String),

    #[error("[Config Error] {0}")]
    Config(String),
}

impl SpiderError {
    pub fn kind(&self) -> ErrorKind {
        use SpiderError::*;
        match self {
            HttpRequest(_) | HttpStatus { .. } | DisallowedDomain(_) | ParseUrl(_) => {
                ErrorKind::Transport
            }
            Decode(_) => ErrorKind::Decode,
            FieldParse { .. } => ErrorKind::FieldParse,
            LookupMiss { .. } => ErrorKind::LookupMiss,
            Sql(_) | Pool(_) | StorageTimeout(_) | Conflict { .. } | MissingCollection(_) => {
                ErrorKind::Storage
            }
            Config(_) => ErrorKind::Config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        let err = SpiderError::FieldParse {
            field: "exDate",
            message: "bad".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::FieldParse);
        assert!(err.kind().is_ignorable());

        let err = SpiderError::Conflict {
            ticker: "ABC".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(!err.kind().is_ignorable());

        let err: SpiderError = serde_json::from_str::<Vec<u8>>("not-json")
            .unwrap_err()
            .into();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }
}
