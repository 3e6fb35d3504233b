// インフラストラクチャ層モジュール
pub mod api_types;
pub mod bot_config;
pub mod config;
pub mod filtered_stream;
pub mod logging;
pub mod oauth;
pub mod reply_publisher;
pub mod rule_api;
pub mod twitter_client;

// 再エクスポート
pub use bot_config::{failure_policies_from_env, BotConfig};
pub use config::{ConfigError, TwitterApiConfig, DEFAULT_API_URL};
pub use filtered_stream::{FilteredStream, PostStream, StreamReadError, StreamSubscriber};
pub use logging::{init_cli_logging, init_logging};
pub use oauth::OAuthSigner;
pub use reply_publisher::ReplyPublisher;
pub use rule_api::StreamRuleApi;
pub use twitter_client::{TwitterApiClient, TwitterApiError};
