use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUrlRequest {
    /// Missing and empty values are both rejected by the service.
    #[serde(default)]
    pub long_url: String,
}
