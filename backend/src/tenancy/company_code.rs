use std::fmt;

use serde::{Deserialize, Serialize};

/// Normalized company identifier: surrounding spaces removed, ASCII letters
/// upper-cased.
///
/// Every lookup and every cache key goes through this type, so `acme`, ` ACME `
/// and `Acme` all address the same tenant. The registry applies the same rule
/// with `UPPER(TRIM(company_code) COLLATE "C")`, which also only strips spaces
/// and only maps ASCII letters.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct CompanyCode(String);

impl CompanyCode {
    #[must_use]
    pub fn new(raw: &str) -> Self {
        Self(raw.trim_matches(' ').to_ascii_uppercase())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CompanyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CompanyCode {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for CompanyCode {
    fn from(raw: String) -> Self {
        Self::new(&raw)
    }
}

impl From<CompanyCode> for String {
    fn from(code: CompanyCode) -> Self {
        code.0
    }
}
