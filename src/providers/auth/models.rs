use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct TokenRequestBody<'a> {
    pub code: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponseBody {
    pub account_id: String,
    pub access_token: String,
}

#[derive(Debug, Serialize)]
pub struct SessionRequestBody<'a> {
    pub access_token: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct SessionResponseBody {
    pub account_id: String,
}

#[derive(Debug, Deserialize)]
pub struct AuthErrorBody {
    pub error: String,
}
