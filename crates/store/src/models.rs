use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Category namespaces partitioning a container's keys.
///
/// Scripts stay out of each other's way by keeping general key/value data
/// separate from metadata lifted out of the job description headers.
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// General script configuration. The default.
    #[default]
    #[display("config")]
    Config,
    /// Metadata derived from the job's description headers.
    #[display("nzb")]
    Nzb,
}

impl Category {
    /// Stable identifier stored in the `category` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Config => "config",
            Category::Nzb => "nzb",
        }
    }
}

/// One key/value pair as listed out of a container's category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Entry {
    pub key: String,
    pub value: String,
}
