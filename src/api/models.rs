use serde::Serialize;

/// Response for GET /views
#[derive(Serialize)]
pub struct ViewsResponse {
    pub keys: Vec<String>,
}

/// Response for GET /views/{key}
#[derive(Serialize)]
pub struct ViewResponse {
    pub key: String,
    pub value: serde_json::Value,
}
