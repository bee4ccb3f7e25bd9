// Default URLs
pub static DEFAULT_API_URL: &str = "https://api.finlink.io";
pub static DEFAULT_SANDBOX_API_URL: &str = "https://api.finlink-sandbox.io";

// Header names
pub static APP_ID_HEADER: &str = "App-id";
pub static APP_SECRET_HEADER: &str = "Secret";
pub static CONNECTION_SECRET_HEADER: &str = "Connection-secret";
pub static REQUEST_ID_HEADER: &str = "X-Request-Id";
