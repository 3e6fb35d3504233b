/// フィルタードストリーム自動リプライLambda関数
///
/// フィルタードストリームを1本購読し、マッチした投稿に定型リプライを返す。
/// Lambda関数としても、ローカルスクリプトとしても実行可能。
///
/// # 環境変数
/// - TWITTER_API_KEY / TWITTER_API_KEY_SECRET: コンシューマーキー（必須）
/// - TWITTER_ACCESS_TOKEN / TWITTER_ACCESS_TOKEN_SECRET: リプライ投稿用
/// - TWITTER_BEARER_TOKEN: アプリ認証トークン（未設定時は自動取得）
/// - BOT_ACCOUNT_ID: bot自身のアカウントID（必須）
/// - BOT_EXCLUDED_ACCOUNT_IDS: リプライしないアカウントID（カンマ区切り）
/// - BOT_REPLY_CEILING: リプライ上限（デフォルト: 10）
/// - BOT_FAILURE_POLICY: abort / report
///
/// # Lambda実行
/// 任意のペイロードでトリガーする。結果の集計をJSONで返す。
///
/// # ローカル実行
/// ```bash
/// export TWITTER_API_KEY=...
/// export TWITTER_API_KEY_SECRET=...
/// export TWITTER_ACCESS_TOKEN=...
/// export TWITTER_ACCESS_TOKEN_SECRET=...
/// export BOT_ACCOUNT_ID=1510513502628331522
///
/// cargo run --bin stream
/// ```
use gobbler::application::{run_stream_job, StreamJobOutput};
use gobbler::infrastructure::{init_logging, BotConfig, TwitterApiConfig};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Error> {
    // 構造化ログを初期化
    init_logging();

    // Lambda環境かどうかを判定
    if std::env::var("AWS_LAMBDA_FUNCTION_NAME").is_ok() {
        info!("Lambda関数として起動");
        let func = service_fn(handler);
        lambda_runtime::run(func).await?;
    } else {
        info!("ローカルスクリプトとして起動");
        let output = run().await?;
        info!(
            success = output.success,
            summary = ?output.summary,
            "ストリーム実行完了"
        );
    }

    Ok(())
}

/// Lambda関数のメインハンドラー（ペイロードは使わない）
async fn handler(_event: LambdaEvent<Value>) -> Result<StreamJobOutput, Error> {
    run().await
}

/// 設定を読み込んでストリームを1回実行
async fn run() -> Result<StreamJobOutput, Error> {
    let api_config = TwitterApiConfig::from_env().map_err(|e| {
        error!(error = %e, "Twitter API設定の読み込みに失敗");
        Error::from(e)
    })?;
    let bot_config = BotConfig::from_env().map_err(|e| {
        error!(error = %e, "bot設定の読み込みに失敗");
        Error::from(e)
    })?;

    info!(
        api_config = ?api_config,
        bot_config = ?bot_config,
        "設定を読み込み"
    );

    run_stream_job(&bot_config, &api_config).await.map_err(|e| {
        error!(error = %e, "ストリーム実行を中断");
        Error::from(e)
    })
}
