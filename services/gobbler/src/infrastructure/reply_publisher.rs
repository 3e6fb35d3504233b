// リプライ投稿
use async_trait::async_trait;
use tracing::{info, warn};

use super::twitter_client::{TwitterApiClient, TwitterApiError};
use crate::domain::ReplyPost;

/// リプライを投稿するもの
#[async_trait]
pub trait ReplyPublisher: Send + Sync {
    /// リプライを投稿
    ///
    /// # 戻り値
    /// * 成功時は作成された投稿のID
    async fn publish(&self, reply: &ReplyPost) -> Result<String, TwitterApiError>;
}

#[async_trait]
impl ReplyPublisher for TwitterApiClient {
    async fn publish(&self, reply: &ReplyPost) -> Result<String, TwitterApiError> {
        match self.create_tweet(reply.text()).await {
            Ok(created) => {
                info!(tweet_id = %created.id, "リプライを投稿");
                Ok(created.id)
            }
            Err(e) => {
                warn!(error = %e, "リプライの投稿に失敗");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::MatchedPost;
    use crate::infrastructure::config::TwitterApiConfig;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    // ユニットテスト用のモック投稿
    #[derive(Debug, Clone, Default)]
    pub struct MockReplyPublisher {
        /// 投稿を試みた本文
        attempts: Arc<Mutex<Vec<String>>>,
        /// 次の投稿で返すエラー（先頭から順に消費）
        queued_errors: Arc<Mutex<VecDeque<TwitterApiError>>>,
        /// 常に失敗する場合のエラー
        always_fail: Option<TwitterApiError>,
    }

    impl MockReplyPublisher {
        pub fn new() -> Self {
            Self::default()
        }

        /// すべての投稿が失敗する
        pub fn always_failing(error: TwitterApiError) -> Self {
            Self {
                always_fail: Some(error),
                ..Self::default()
            }
        }

        /// 次の投稿を失敗させる
        pub fn fail_next(&self, error: TwitterApiError) {
            self.queued_errors.lock().unwrap().push_back(error);
        }

        pub fn attempts(&self) -> Vec<String> {
            self.attempts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ReplyPublisher for MockReplyPublisher {
        async fn publish(&self, reply: &ReplyPost) -> Result<String, TwitterApiError> {
            let attempt = {
                let mut attempts = self.attempts.lock().unwrap();
                attempts.push(reply.text().to_string());
                attempts.len()
            };

            if let Some(error) = &self.always_fail {
                return Err(error.clone());
            }
            if let Some(error) = self.queued_errors.lock().unwrap().pop_front() {
                return Err(error);
            }

            Ok(format!("reply-{attempt}"))
        }
    }

    #[tokio::test]
    async fn test_publish_returns_created_id() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "data": {"id": "1600000000000000001", "text": "Robble, Robble, Good Gobble"}
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let config = TwitterApiConfig::new("key", "secret")
            .with_api_url(mock_server.uri())
            .with_access_token("token", "token-secret");
        let client = TwitterApiClient::for_stream(&config).unwrap();
        let reply = ReplyPost::for_post(&MatchedPost::new("42", "999", "gobble"));

        let id = client.publish(&reply).await.unwrap();

        assert_eq!(id, "1600000000000000001");
    }

    #[tokio::test]
    async fn test_mock_publisher_records_attempts() {
        let publisher = MockReplyPublisher::new();
        publisher.fail_next(TwitterApiError::Network("timeout".to_string()));
        let reply = ReplyPost::for_post(&MatchedPost::new("42", "999", "gobble"));

        assert!(publisher.publish(&reply).await.is_err());
        assert_eq!(publisher.publish(&reply).await.unwrap(), "reply-2");
        assert_eq!(
            publisher.attempts(),
            vec![
                "Robble, Robble, Good Gobble https://twitter.com/999/status/42".to_string();
                2
            ]
        );
    }
}
