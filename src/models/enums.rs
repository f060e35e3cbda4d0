use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(SourceFormat {
    Pdf => "pdf",
    Docx => "docx",
    PlainText => "plain_text",
});

str_enum!(DocumentStatus {
    Pending => "pending",
    Extracted => "extracted",
    Failed => "failed",
});

str_enum!(Category {
    Team => "team",
    Market => "market",
    Technology => "technology",
});

str_enum!(Recommendation {
    Strong => "strong",
    Moderate => "moderate",
    Pass => "pass",
    InsufficientEvidence => "insufficient_evidence",
});

str_enum!(UnscoredKind {
    OracleUnavailable => "oracle_unavailable",
    MalformedResponse => "malformed_response",
    HallucinatedCitation => "hallucinated_citation",
});

impl Category {
    /// Fixed presentation order of the rubric categories.
    pub const ALL: [Category; 3] = [Category::Team, Category::Market, Category::Technology];
}

impl SourceFormat {
    /// Map a declared format label (extension, short name or MIME type) to a
    /// supported format. Returns `None` for anything the extractor cannot read.
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = label.trim().trim_start_matches('.').to_ascii_lowercase();
        match normalized.as_str() {
            "pdf" | "application/pdf" => Some(Self::Pdf),
            "docx"
            | "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(Self::Docx)
            }
            "txt" | "text" | "plain_text" | "plaintext" | "md" | "markdown" | "text/plain"
            | "text/markdown" => Some(Self::PlainText),
            _ => None,
        }
    }
}
