use serde::{Deserialize, Serialize};

/// Response of `GET csrf`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsrfResponse {
    /// The anti-forgery token to echo in `X-CSRFToken`.
    #[serde(rename = "csrfToken")]
    pub csrf_token: String,
}
