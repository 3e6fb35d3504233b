// ストリーム実行ジョブ
//
// 設定からコンシューマーを組み立てて1回実行し、購読失敗に経路別ポリシーを適用する。
// Lambda関数とCLIの両方から使う。

use serde::Serialize;
use tracing::{error, info};

use super::stream_consumer::{ConsumeSummary, StreamConsumer, StreamConsumerError};
use crate::domain::FailurePolicy;
use crate::infrastructure::{
    BotConfig, ReplyPublisher, StreamSubscriber, TwitterApiClient, TwitterApiConfig,
};

/// ストリーム実行の結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamJobOutput {
    /// 処理成功フラグ
    pub success: bool,
    /// 受信の集計（購読できなかった場合はなし）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<ConsumeSummary>,
    /// エラーメッセージ（報告ポリシーで処理した失敗のみ）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// 設定からTwitter APIを使うコンシューマーを組み立てる
pub fn build_stream_consumer(
    bot_config: &BotConfig,
    api_config: &TwitterApiConfig,
) -> Result<StreamConsumer<TwitterApiClient, TwitterApiClient>, StreamConsumerError> {
    let client =
        TwitterApiClient::for_stream(api_config).map_err(StreamConsumerError::Subscribe)?;

    Ok(StreamConsumer::new(
        client.clone(),
        client,
        bot_config.reply_filter(),
        bot_config.reply_budget(),
    )
    .with_reply_policy(bot_config.failure_policies().reply))
}

/// 設定からコンシューマーを組み立てて実行
pub async fn run_stream_job(
    bot_config: &BotConfig,
    api_config: &TwitterApiConfig,
) -> Result<StreamJobOutput, StreamConsumerError> {
    let subscribe_policy = bot_config.failure_policies().subscribe;

    match build_stream_consumer(bot_config, api_config) {
        Ok(consumer) => run_consumer(consumer, subscribe_policy).await,
        Err(e) => settle_outcome(Err(e), subscribe_policy),
    }
}

/// コンシューマーを実行し、購読失敗にポリシーを適用
pub async fn run_consumer<S, P>(
    mut consumer: StreamConsumer<S, P>,
    subscribe_policy: FailurePolicy,
) -> Result<StreamJobOutput, StreamConsumerError>
where
    S: StreamSubscriber,
    P: ReplyPublisher,
{
    info!(subscribe_policy = subscribe_policy.as_str(), "ストリーム実行を開始");
    let outcome = consumer.run().await;
    settle_outcome(outcome, subscribe_policy)
}

fn settle_outcome(
    outcome: Result<ConsumeSummary, StreamConsumerError>,
    subscribe_policy: FailurePolicy,
) -> Result<StreamJobOutput, StreamConsumerError> {
    match outcome {
        Ok(summary) => Ok(StreamJobOutput {
            success: true,
            summary: Some(summary),
            error_message: None,
        }),
        Err(StreamConsumerError::Subscribe(source))
            if subscribe_policy == FailurePolicy::Report =>
        {
            error!(error = %source, "ストリームへの接続に失敗（報告のみで終了）");
            Ok(StreamJobOutput {
                success: false,
                summary: None,
                error_message: Some(StreamConsumerError::Subscribe(source).to_string()),
            })
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FailurePolicies, MatchedPost, ReplyBudget, ReplyFilter};
    use crate::infrastructure::filtered_stream::tests::MockStreamSubscriber;
    use crate::infrastructure::reply_publisher::tests::MockReplyPublisher;
    use crate::infrastructure::TwitterApiError;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn consumer(
        subscriber: &MockStreamSubscriber,
        publisher: &MockReplyPublisher,
    ) -> StreamConsumer<MockStreamSubscriber, MockReplyPublisher> {
        StreamConsumer::new(
            subscriber.clone(),
            publisher.clone(),
            ReplyFilter::new("1510513502628331522", ["1343113027139284992"]),
            ReplyBudget::default(),
        )
    }

    fn unavailable() -> TwitterApiError {
        TwitterApiError::Http {
            status: 503,
            message: "Service Unavailable".to_string(),
        }
    }

    #[tokio::test]
    async fn test_successful_run() {
        let subscriber =
            MockStreamSubscriber::with_posts(vec![MatchedPost::new("42", "999", "hello")]);
        let publisher = MockReplyPublisher::new();

        let output = run_consumer(consumer(&subscriber, &publisher), FailurePolicy::Report)
            .await
            .unwrap();

        assert!(output.success);
        assert_eq!(output.summary.map(|s| s.replied), Some(1));
        assert_eq!(output.error_message, None);
    }

    /// 報告ポリシーでは購読失敗を正常終了扱いにする
    #[tokio::test]
    async fn test_subscribe_failure_reported() {
        let subscriber = MockStreamSubscriber::failing(unavailable());
        let publisher = MockReplyPublisher::new();

        let output = run_consumer(consumer(&subscriber, &publisher), FailurePolicy::Report)
            .await
            .unwrap();

        assert!(!output.success);
        assert!(output.summary.is_none());
        assert!(output.error_message.unwrap().contains("Service Unavailable"));
    }

    #[tokio::test]
    async fn test_subscribe_failure_aborts() {
        let subscriber = MockStreamSubscriber::failing(unavailable());
        let publisher = MockReplyPublisher::new();

        let result = run_consumer(consumer(&subscriber, &publisher), FailurePolicy::Abort).await;

        assert_eq!(
            result.unwrap_err(),
            StreamConsumerError::Subscribe(unavailable())
        );
    }

    /// リプライ失敗は購読ポリシーに関係なく呼び出し元へ返る
    #[tokio::test]
    async fn test_reply_failure_is_not_settled_by_subscribe_policy() {
        let subscriber =
            MockStreamSubscriber::with_posts(vec![MatchedPost::new("42", "999", "hello")]);
        let publisher = MockReplyPublisher::always_failing(unavailable());

        let result = run_consumer(consumer(&subscriber, &publisher), FailurePolicy::Report).await;

        assert!(matches!(result, Err(StreamConsumerError::Reply { .. })));
    }

    #[test]
    fn test_output_serialization_skips_empty_fields() {
        let output = StreamJobOutput {
            success: false,
            summary: None,
            error_message: Some("接続失敗".to_string()),
        };

        let json = serde_json::to_value(&output).unwrap();

        assert_eq!(
            json,
            serde_json::json!({"success": false, "error_message": "接続失敗"})
        );
    }

    /// 設定から組み立てたコンシューマーでモックサーバーに対して実行
    #[tokio::test]
    async fn test_run_stream_job_against_mock_server() {
        let mock_server = MockServer::start().await;

        let body = concat!(
            r#"{"data":{"id":"42","author_id":"999","text":"hello"}}"#,
            "\r\n",
            r#"{"data":{"id":"43","author_id":"1510513502628331522","text":"hello"}}"#,
            "\r\n"
        );

        Mock::given(method("GET"))
            .and(path("/2/tweets/search/stream"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "data": {"id": "1600000000000000001", "text": "Robble, Robble, Good Gobble"}
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let api_config = TwitterApiConfig::new("key", "secret")
            .with_api_url(mock_server.uri())
            .with_access_token("token", "token-secret")
            .with_bearer_token("bearer");
        let bot_config = BotConfig::new("1510513502628331522");

        let output = run_stream_job(&bot_config, &api_config).await.unwrap();

        assert!(output.success);
        let summary = output.summary.unwrap();
        assert_eq!(summary.received, 2);
        assert_eq!(summary.replied, 1);
        assert_eq!(summary.skipped.own_account, 1);
    }

    /// 中断ポリシーではストリーム接続の失敗をエラーとして返す
    #[tokio::test]
    async fn test_run_stream_job_aborts_on_subscribe_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2/tweets/search/stream"))
            .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&mock_server)
            .await;

        let api_config = TwitterApiConfig::new("key", "secret")
            .with_api_url(mock_server.uri())
            .with_access_token("token", "token-secret")
            .with_bearer_token("bearer");
        let bot_config = BotConfig::new("1510513502628331522")
            .with_failure_policies(FailurePolicies::uniform(FailurePolicy::Abort));

        let result = run_stream_job(&bot_config, &api_config).await;

        assert!(matches!(
            result,
            Err(StreamConsumerError::Subscribe(TwitterApiError::Http { status: 503, .. }))
        ));
    }
}
