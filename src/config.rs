pub const APP_ID: &str = "chat.solace.Solace";
pub const APP_NAME: &str = "solace";

pub const GREETING: &str = "Hello! I'm Solace, your counselling companion. \
I'm here to listen and offer support whenever you need it. \
How can I help you today?";

const DEFAULT_MODEL_URL: &str = "https://api.solace.chat/v1";
const DEFAULT_AUTH_URL: &str = "https://auth.solace.chat/v1";

/// Endpoint configuration, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub model_base_url: String,
    pub model_api_key: Option<String>,
    pub auth_base_url: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            model_base_url: base_url_var("SOLACE_MODEL_URL", DEFAULT_MODEL_URL),
            model_api_key: std::env::var("SOLACE_MODEL_API_KEY").ok(),
            auth_base_url: base_url_var("SOLACE_AUTH_URL", DEFAULT_AUTH_URL),
        }
    }
}

fn base_url_var(name: &str, default: &str) -> String {
    let url = std::env::var(name).unwrap_or_else(|_| default.to_string());
    url.trim_end_matches('/').to_string()
}
