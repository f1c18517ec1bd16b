use praytell_chat::SaveRequest;
use serde::{Deserialize, Serialize};

/// `POST /chat` body; `datetime` is RFC 3339
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatBody {
    pub message: String,
    pub location: String,
    pub datetime: String,
}

/// `POST /save-message` body.
///
/// Fields are optional here so that a missing field reaches validation and is
/// reported like an empty one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaveMessageBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub datetime: Option<String>,
}

impl From<SaveMessageBody> for SaveRequest {
    fn from(body: SaveMessageBody) -> Self {
        SaveRequest::new(
            body.message.unwrap_or_default(),
            body.role.unwrap_or_default(),
            body.location.unwrap_or_default(),
            body.datetime.unwrap_or_default(),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveMessageResponse {
    pub success: bool,
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarBody {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarResponse {
    pub similar: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
