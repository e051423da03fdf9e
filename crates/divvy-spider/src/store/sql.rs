//////////////////////////////////////////////////////////////////
// dividend histories
//////////////////////////////////////////////////////////////////

/// One row per ticker; the dividend history itself is a JSONB object keyed by ex-dividend
/// unix seconds.
static CREATE_HISTORY_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS {table} (
        ticker TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        dividend_yield DOUBLE PRECISION NOT NULL,
        currency TEXT NOT NULL,
        schema_version TEXT NOT NULL,
        enabled BOOLEAN NOT NULL,
        deleted BOOLEAN NOT NULL,
        created_at BIGINT NOT NULL,
        modified_at BIGINT NOT NULL,
        revision BIGINT NOT NULL,
        dividend_history JSONB NOT NULL
    )
";

static SELECT_HISTORY: &str = "
    SELECT ticker, name, dividend_yield, currency, schema_version, enabled, deleted,
           created_at, modified_at, revision, dividend_history
    FROM {table}
    WHERE ticker = $1
";

/// Insert-on-absent, replace-on-match. `created_at` is only written by the INSERT branch, and
/// the UPDATE branch only fires while the stored revision is still `$10`; a mismatch returns no
/// row.
static UPSERT_HISTORY: &str = "
    INSERT INTO {table} AS stored (
        ticker,
        name,
        dividend_yield,
        currency,
        schema_version,
        enabled,
        deleted,
        created_at,
        modified_at,
        revision,
        dividend_history
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8, 0, $9)
    ON CONFLICT (ticker) DO UPDATE SET
        name = EXCLUDED.name,
        dividend_yield = EXCLUDED.dividend_yield,
        currency = EXCLUDED.currency,
        schema_version = EXCLUDED.schema_version,
        enabled = EXCLUDED.enabled,
        deleted = EXCLUDED.deleted,
        modified_at = EXCLUDED.modified_at,
        revision = stored.revision + 1,
        dividend_history = EXCLUDED.dividend_history
    WHERE stored.revision = $10
    RETURNING revision
";

/// Statements bound to one table name.
#[derive(Clone, Debug)]
pub(crate) struct Statements {
    pub(crate) create: String,
    pub(crate) select: String,
    pub(crate) upsert: String,
}

impl Statements {
    pub(crate) fn for_table(table: &str) -> Self {
        Self {
            create: CREATE_HISTORY_TABLE.replace("{table}", table),
            select: SELECT_HISTORY.replace("{table}", table),
            upsert: UPSERT_HISTORY.replace("{table}", table),
        }
    }
}
