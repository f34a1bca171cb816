use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Payment types tracked for every chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Monthly membership fee
    Mensalidade,
    /// Barbecue, split between whoever joins
    Churrasco,
    /// Single-day fee for guests
    Diaria,
}

impl Category {
    pub const ALL: [Self; 3] = [Self::Mensalidade, Self::Churrasco, Self::Diaria];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mensalidade => "mensalidade",
            Self::Churrasco => "churrasco",
            Self::Diaria => "diaria",
        }
    }

    /// Title of the roster list, including the fixed fee where there is one.
    #[must_use]
    pub const fn list_title(self) -> &'static str {
        match self {
            Self::Mensalidade => "Mensalidade (R$45,00)",
            Self::Churrasco => "Racha do Churrasco",
            Self::Diaria => "Diária (R$20,00)",
        }
    }

    /// Upper-case label used in confirmations.
    #[must_use]
    pub const fn shout_label(self) -> &'static str {
        match self {
            Self::Mensalidade => "MENSALIDADE",
            Self::Churrasco => "CHURRASCO",
            Self::Diaria => "DIÁRIA",
        }
    }

    #[must_use]
    pub const fn status_label(self) -> &'static str {
        match self {
            Self::Mensalidade => "Mensalidade",
            Self::Churrasco => "Churrasco",
            Self::Diaria => "Diária",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mensalidade" | "mensal" => Ok(Self::Mensalidade),
            "churrasco" | "churras" => Ok(Self::Churrasco),
            "diaria" => Ok(Self::Diaria),
            other => Err(format!(
                "unknown category '{other}' (expected mensalidade, churrasco or diaria)"
            )),
        }
    }
}
