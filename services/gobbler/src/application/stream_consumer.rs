/// ストリームコンシューマー
///
/// フィルタードストリームを1本購読し、受信した投稿ごとにリプライ対象かを判定して
/// 定型リプライを投稿する。リプライ数が上限を超えるか、接続が終了すると停止する。
///
/// # 状態遷移
/// `Idle → Subscribing → Consuming ⇄ (Filtering → Replying) → Consuming → Stopped`
/// 停止後に`Idle`へは戻らない。1実行につき1インスタンス。
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::domain::{
    FailurePolicy, FilterDecision, MatchedPost, ReplyBudget, ReplyFilter, ReplyPost,
    StreamPayload,
};
use crate::infrastructure::{
    PostStream, ReplyPublisher, StreamReadError, StreamSubscriber, TwitterApiError,
};

/// コンシューマーの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Idle,
    Subscribing,
    Consuming,
    Filtering,
    Replying,
    Stopped,
}

/// 停止理由
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// リプライ数が上限を超えたため購読を停止した
    CeilingReached,
    /// リモートが接続を終了した（転送エラー・タイムアウトを含む）
    StreamClosed,
}

/// フィルター理由ごとのスキップ数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SkipCounts {
    pub own_account: u32,
    pub excluded_account: u32,
    pub retweet: u32,
}

impl SkipCounts {
    fn record(&mut self, decision: FilterDecision) {
        match decision {
            FilterDecision::OwnAccount => self.own_account += 1,
            FilterDecision::ExcludedAccount => self.excluded_account += 1,
            FilterDecision::Retweet => self.retweet += 1,
            FilterDecision::Eligible => {}
        }
    }

    pub fn total(&self) -> u32 {
        self.own_account + self.excluded_account + self.retweet
    }
}

/// 1回の購読の集計
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsumeSummary {
    /// 受信した投稿数
    pub received: u32,
    /// 投稿に成功したリプライ数
    pub replied: u32,
    /// 投稿に失敗したリプライ数
    pub reply_failures: u32,
    /// スキップした投稿数
    pub skipped: SkipCounts,
    /// 読み取りエラー数
    pub read_errors: u32,
    /// 停止理由
    pub stop_reason: StopReason,
}

impl ConsumeSummary {
    fn new() -> Self {
        Self {
            received: 0,
            replied: 0,
            reply_failures: 0,
            skipped: SkipCounts::default(),
            read_errors: 0,
            stop_reason: StopReason::StreamClosed,
        }
    }
}

/// ストリームコンシューマーのエラー型
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StreamConsumerError {
    /// 購読の開始に失敗
    #[error("ストリームへの接続に失敗: {0}")]
    Subscribe(#[source] TwitterApiError),

    /// リプライの投稿に失敗（中断ポリシー）
    #[error("リプライの投稿に失敗: post_id={post_id}, {source}")]
    Reply {
        /// リプライ対象の投稿ID
        post_id: String,
        #[source]
        source: TwitterApiError,
    },

    /// 停止済みのコンシューマーを再実行しようとした
    #[error("コンシューマーは停止済みです")]
    AlreadyStopped,
}

/// ストリームコンシューマー
pub struct StreamConsumer<S, P>
where
    S: StreamSubscriber,
    P: ReplyPublisher,
{
    subscriber: S,
    publisher: P,
    filter: ReplyFilter,
    budget: ReplyBudget,
    /// リプライ失敗時のポリシー（デフォルト: 中断）
    reply_policy: FailurePolicy,
    state: ConsumerState,
}

impl<S, P> StreamConsumer<S, P>
where
    S: StreamSubscriber,
    P: ReplyPublisher,
{
    /// 新しいStreamConsumerを作成
    pub fn new(subscriber: S, publisher: P, filter: ReplyFilter, budget: ReplyBudget) -> Self {
        Self {
            subscriber,
            publisher,
            filter,
            budget,
            reply_policy: FailurePolicy::Abort,
            state: ConsumerState::Idle,
        }
    }

    /// リプライ失敗時のポリシーを設定
    pub fn with_reply_policy(mut self, reply_policy: FailurePolicy) -> Self {
        self.reply_policy = reply_policy;
        self
    }

    pub fn state(&self) -> ConsumerState {
        self.state
    }

    pub fn budget(&self) -> &ReplyBudget {
        &self.budget
    }

    /// 購読を開始し、停止するまで投稿を処理する
    ///
    /// # 戻り値
    /// * 正常停止時は集計
    /// * 購読開始の失敗は`Subscribe`（呼び出し側がポリシーを適用する）
    /// * 中断ポリシーでのリプライ失敗は`Reply`（購読は停止済み）
    pub async fn run(&mut self) -> Result<ConsumeSummary, StreamConsumerError> {
        if self.state != ConsumerState::Idle {
            return Err(StreamConsumerError::AlreadyStopped);
        }

        self.state = ConsumerState::Subscribing;
        let mut stream = match self.subscriber.subscribe().await {
            Ok(stream) => stream,
            Err(e) => {
                self.state = ConsumerState::Stopped;
                return Err(StreamConsumerError::Subscribe(e));
            }
        };

        info!(
            reply_ceiling = self.budget.ceiling(),
            reply_policy = self.reply_policy.as_str(),
            "ストリームの受信を開始"
        );
        self.state = ConsumerState::Consuming;

        let mut summary = ConsumeSummary::new();

        while let Some(item) = stream.next_post().await {
            let payload = match item {
                Ok(payload) => payload,
                Err(e) => {
                    summary.read_errors += 1;
                    log_read_error(&e);
                    continue;
                }
            };
            summary.received += 1;

            if let Err(e) = self.process(&payload, &mut summary).await {
                stream.stop().await;
                self.state = ConsumerState::Stopped;
                return Err(e);
            }

            if self.budget.is_exhausted() {
                info!(
                    reply_count = self.budget.count(),
                    reply_ceiling = self.budget.ceiling(),
                    "リプライ上限を超えたため購読を停止"
                );
                stream.stop().await;
                summary.stop_reason = StopReason::CeilingReached;
                break;
            }
        }

        self.state = ConsumerState::Stopped;

        info!(
            received = summary.received,
            replied = summary.replied,
            reply_failures = summary.reply_failures,
            skipped = summary.skipped.total(),
            read_errors = summary.read_errors,
            stop_reason = ?summary.stop_reason,
            "ストリームの受信を終了"
        );

        Ok(summary)
    }

    /// 1件の投稿を判定し、対象ならリプライする
    async fn process(
        &mut self,
        payload: &StreamPayload,
        summary: &mut ConsumeSummary,
    ) -> Result<(), StreamConsumerError> {
        let post = &payload.data;

        self.state = ConsumerState::Filtering;
        let decision = self.filter.evaluate(post);
        if !decision.is_eligible() {
            debug!(
                post_id = %post.id,
                author_id = %post.author_id,
                decision = decision.as_str(),
                "リプライ対象外"
            );
            summary.skipped.record(decision);
            self.state = ConsumerState::Consuming;
            return Ok(());
        }

        // 投稿の成否にかかわらず試行をカウントする
        let reply_count = self.budget.record();
        info!(
            post_id = %post.id,
            author_id = %post.author_id,
            matching_tags = ?payload.matching_tags(),
            reply_count,
            "リプライ対象の投稿を受信"
        );

        self.state = ConsumerState::Replying;
        let result = self.reply(post).await;
        self.state = ConsumerState::Consuming;

        match self.reply_policy.settle("reply", result) {
            Ok(Some(reply_id)) => {
                summary.replied += 1;
                debug!(post_id = %post.id, reply_id = %reply_id, "リプライ完了");
                Ok(())
            }
            Ok(None) => {
                summary.reply_failures += 1;
                Ok(())
            }
            Err(source) => {
                summary.reply_failures += 1;
                error!(post_id = %post.id, error = %source, "リプライに失敗したため中断");
                Err(StreamConsumerError::Reply {
                    post_id: post.id.clone(),
                    source,
                })
            }
        }
    }

    async fn reply(&self, post: &MatchedPost) -> Result<String, TwitterApiError> {
        let reply = ReplyPost::for_post(post);
        self.publisher.publish(&reply).await
    }
}

fn log_read_error(error: &StreamReadError) {
    match error {
        StreamReadError::Remote(message) => {
            warn!(message = %message, "ストリームでエラーを受信、受信を継続")
        }
        StreamReadError::Malformed(message) => {
            warn!(error = %message, "ストリームデータの解析に失敗、受信を継続")
        }
    }
}
