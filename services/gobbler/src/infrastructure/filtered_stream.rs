// フィルタードストリーム
//
// 改行区切りのJSONを1行ずつ取り出し、投稿ペイロードに変換する。
// 空行はキープアライブとして読み飛ばす。
// 転送エラーや接続終了はストリームの終了として扱い、バッファに残った行を処理してから終わる。

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{BoxStream, Stream, StreamExt};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::api_types::ApiErrorBody;
use super::twitter_client::{TwitterApiClient, TwitterApiError};
use crate::domain::StreamPayload;

/// ストリーム1行の読み取りエラー
///
/// 読み取りエラーはストリームを終了させない。
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StreamReadError {
    /// 投稿として解析できない行
    #[error("ストリームデータの解析に失敗: {0}")]
    Malformed(String),

    /// リモートから配信されたエラー
    #[error("ストリームでエラーを受信: {0}")]
    Remote(String),
}

/// 投稿の受信ストリーム
#[async_trait]
pub trait PostStream: Send {
    /// 次の要素を受信
    ///
    /// # 戻り値
    /// * `Some(Ok(payload))` - 投稿を受信
    /// * `Some(Err(_))` - 1行の読み取りに失敗（続けて受信できる）
    /// * `None` - ストリームが終了
    async fn next_post(&mut self) -> Option<Result<StreamPayload, StreamReadError>>;

    /// 購読を停止（停止後の`next_post`は`None`を返す）
    async fn stop(&mut self);
}

/// ストリームの購読を開始するもの
#[async_trait]
pub trait StreamSubscriber: Send + Sync {
    type Stream: PostStream;

    /// 購読を開始
    async fn subscribe(&self) -> Result<Self::Stream, TwitterApiError>;
}

/// HTTPレスポンスボディから読み取るフィルタードストリーム
pub struct FilteredStream {
    /// 受信中のボディ（終了・停止後はNone）
    body: Option<BoxStream<'static, Result<Bytes, String>>>,
    /// 改行待ちのバイト列
    buffer: Vec<u8>,
}

impl std::fmt::Debug for FilteredStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilteredStream")
            .field("open", &self.body.is_some())
            .field("buffered_bytes", &self.buffer.len())
            .finish()
    }
}

impl FilteredStream {
    /// 接続済みレスポンスから作成
    pub fn from_response(response: reqwest::Response) -> Self {
        Self::from_chunks(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(|e| e.to_string())),
        )
    }

    /// 任意のバイト列ストリームから作成
    pub fn from_chunks<S>(chunks: S) -> Self
    where
        S: Stream<Item = Result<Bytes, String>> + Send + 'static,
    {
        Self {
            body: Some(chunks.boxed()),
            buffer: Vec::new(),
        }
    }

    /// バッファから改行までの1行を取り出す
    fn take_line(&mut self) -> Option<Vec<u8>> {
        let newline = self.buffer.iter().position(|byte| *byte == b'\n')?;
        Some(self.buffer.drain(..=newline).collect())
    }
}

#[async_trait]
impl PostStream for FilteredStream {
    async fn next_post(&mut self) -> Option<Result<StreamPayload, StreamReadError>> {
        loop {
            while let Some(line) = self.take_line() {
                if let Some(decoded) = decode_line(&line) {
                    return Some(decoded);
                }
            }

            let Some(body) = self.body.as_mut() else {
                // 終了済み: 改行で終わらなかった最後の行だけ処理する
                let rest = std::mem::take(&mut self.buffer);
                return decode_line(&rest);
            };

            match body.next().await {
                Some(Ok(chunk)) => self.buffer.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    warn!(error = %e, "ストリームの受信に失敗、接続を終了");
                    self.body = None;
                }
                None => {
                    info!("ストリームが終了");
                    self.body = None;
                }
            }
        }
    }

    async fn stop(&mut self) {
        if self.body.take().is_some() {
            info!("フィルタードストリームの購読を停止");
        }
        self.buffer.clear();
    }
}

/// 1行をペイロードに変換（空行はNone）
fn decode_line(line: &[u8]) -> Option<Result<StreamPayload, StreamReadError>> {
    let text = match std::str::from_utf8(line) {
        Ok(text) => text.trim(),
        Err(e) => return Some(Err(StreamReadError::Malformed(e.to_string()))),
    };

    if text.is_empty() {
        debug!("キープアライブを受信");
        return None;
    }

    let decoded = serde_json::from_str::<StreamPayload>(text).map_err(|parse_error| {
        // エラーオブジェクトの行はリモートエラーとして区別する
        serde_json::from_str::<ApiErrorBody>(text)
            .ok()
            .and_then(|body| body.describe())
            .map(StreamReadError::Remote)
            .unwrap_or_else(|| StreamReadError::Malformed(parse_error.to_string()))
    });

    Some(decoded)
}

#[async_trait]
impl StreamSubscriber for TwitterApiClient {
    type Stream = FilteredStream;

    async fn subscribe(&self) -> Result<FilteredStream, TwitterApiError> {
        let response = self.open_stream().await?;
        Ok(FilteredStream::from_response(response))
    }
}
