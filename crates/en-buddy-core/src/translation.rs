//! Translation result model.

use serde::{Deserialize, Serialize};

/// Output of the translation endpoint. The backend detects the source
/// language and picks the target itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Translation {
    pub translated_text: String,
    #[serde(default)]
    pub source_language: Option<String>,
    #[serde(default)]
    pub target_language: Option<String>,
}
