use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Which table family the writer targets. The canonical schema stores
/// `DateTime64(3, 'UTC')` timestamps plus an `ingested_at` version column;
/// the dev schema mirrors the shape with `ts_millis Int64` and no version
/// column under `dev_`-prefixed table names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaKind {
    #[default]
    Canonical,
    Dev,
}

impl SchemaKind {
    pub fn table(&self, base: &str) -> String {
        match self {
            SchemaKind::Canonical => base.to_string(),
            SchemaKind::Dev => format!("dev_{base}"),
        }
    }
}

impl FromStr for SchemaKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "canonical" => Ok(SchemaKind::Canonical),
            "dev" => Ok(SchemaKind::Dev),
            other => Err(format!("unknown schema '{other}', expected 'canonical' or 'dev'")),
        }
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaKind::Canonical => write!(f, "canonical"),
            SchemaKind::Dev => write!(f, "dev"),
        }
    }
}
