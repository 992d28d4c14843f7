use std::sync::Arc;
use std::time::Duration;

use crate::core::config::AppConfig;
use crate::core::shared::utils::DbPool;
use crate::geocoding::VWorldClient;
#[cfg(feature = "ai")]
use crate::llm::{LLMProvider, OpenAIClient};
use crate::security::SupabaseJwt;
#[cfg(feature = "telegram")]
use crate::telegram::TelegramClient;
#[cfg(feature = "weather")]
use crate::weather::KmaClient;

pub struct AppState {
    pub conn: DbPool,
    pub config: AppConfig,
    pub jwt: SupabaseJwt,
    pub geocoder: VWorldClient,
    #[cfg(feature = "weather")]
    pub weather: KmaClient,
    #[cfg(feature = "ai")]
    pub llm: Arc<dyn LLMProvider>,
    #[cfg(feature = "telegram")]
    pub telegram: TelegramClient,
}

impl AppState {
    pub fn new(config: AppConfig, conn: DbPool) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            jwt: SupabaseJwt::new(&config.auth),
            geocoder: VWorldClient::new(http.clone(), &config.vworld),
            #[cfg(feature = "weather")]
            weather: KmaClient::new(http.clone(), &config.kma),
            #[cfg(feature = "ai")]
            llm: Arc::new(OpenAIClient::new(http.clone(), &config.openai)),
            #[cfg(feature = "telegram")]
            telegram: TelegramClient::new(http, &config.telegram),
            conn,
            config,
        })
    }

    #[cfg(feature = "ai")]
    pub fn with_llm(mut self, llm: Arc<dyn LLMProvider>) -> Self {
        self.llm = llm;
        self
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("server", &self.config.server)
            .field("jwt", &self.jwt)
            .finish()
    }
}
