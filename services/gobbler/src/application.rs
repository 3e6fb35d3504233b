// アプリケーション層モジュール
pub mod rule_manager;
pub mod stream_consumer;
pub mod stream_job;

// 再エクスポート
pub use rule_manager::{RuleManager, RuleManagerError};
pub use stream_consumer::{
    ConsumeSummary, ConsumerState, SkipCounts, StopReason, StreamConsumer, StreamConsumerError,
};
pub use stream_job::{build_stream_consumer, run_consumer, run_stream_job, StreamJobOutput};
