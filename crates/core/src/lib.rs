pub mod ai;
pub mod analysis;
pub mod domain;
pub mod market;
pub mod storage;

pub mod config {
    use anyhow::Context;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub anthropic_api_key: Option<String>,
        pub google_api_key: Option<String>,
        pub ep_online_api_key: Option<String>,
        pub sentry_dsn: Option<String>,
        pub ai_provider: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                database_url: std::env::var("DATABASE_URL").ok(),
                anthropic_api_key: std::env::var("ANTHROPIC_API_KEY").ok(),
                google_api_key: std::env::var("GOOGLE_API_KEY").ok(),
                ep_online_api_key: std::env::var("EP_ONLINE_API_KEY").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                ai_provider: std::env::var("AI_PROVIDER").ok(),
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }

        pub fn require_anthropic_api_key(&self) -> anyhow::Result<&str> {
            self.anthropic_api_key
                .as_deref()
                .context("ANTHROPIC_API_KEY is required")
        }

        pub fn require_google_api_key(&self) -> anyhow::Result<&str> {
            self.google_api_key
                .as_deref()
                .context("GOOGLE_API_KEY is required")
        }
    }
}
