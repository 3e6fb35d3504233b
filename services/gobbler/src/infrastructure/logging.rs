/// ログ基盤モジュール
///
/// Lambda環境向けのJSON構造化ログと、CLI向けの人間が読みやすいログを提供する。
/// CLIでは標準出力をルール一覧の出力に使うため、ログは標準エラー出力へ送る。
use std::sync::Once;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// ログサブスクライバー初期化用の同期プリミティブ
static INIT: Once = Once::new();

/// 環境変数`RUST_LOG`のフィルター、未設定時はinfo
fn default_env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Lambda環境向けのログサブスクライバーを初期化する
///
/// JSON形式での構造化ログ出力を設定する。
/// 複数回呼び出しても安全で、最初の呼び出しのみ初期化を実行する。
///
/// # 使用例
/// ```ignore
/// use gobbler::infrastructure::init_logging;
///
/// init_logging();
/// tracing::info!("Lambda function started");
/// ```
pub fn init_logging() {
    INIT.call_once(|| {
        // JSON形式のログレイヤー（Lambda/CloudWatch向け）
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .flatten_event(true)
            .with_current_span(false);

        tracing_subscriber::registry()
            .with(default_env_filter())
            .with(json_layer)
            .init();
    });
}

/// CLI向けのログサブスクライバーを初期化する
///
/// コンパクト形式で標準エラー出力に書き出す。
pub fn init_cli_logging() {
    INIT.call_once(|| {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact();

        tracing_subscriber::registry()
            .with(default_env_filter())
            .with(fmt_layer)
            .init();
    });
}

/// テスト用のログサブスクライバーを初期化する（人間が読みやすい形式）
///
/// # 注意
/// この関数はテスト専用であり、本番環境では`init_logging`を使用すること。
#[cfg(test)]
pub fn init_test_logging() {
    static TEST_INIT: Once = Once::new();

    TEST_INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_test_writer()
            .with_target(true)
            .compact();

        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_idempotent() {
        // 複数回呼び出してもパニックしない
        init_test_logging();
        init_test_logging();
        init_test_logging();
    }

    /// コンテキスト情報付きログが出力できることを確認
    #[test]
    fn test_log_with_context() {
        init_test_logging();

        tracing::info!(
            post_id = "42",
            author_id = "999",
            decision = "eligible",
            "投稿を判定"
        );

        tracing::warn!(error = "invalid JSON", "ストリームデータの解析に失敗");
    }

    #[test]
    fn test_json_logging_configuration() {
        // JSON形式設定自体がエラーにならないことを確認
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .flatten_event(true);

        let _subscriber = tracing_subscriber::registry()
            .with(EnvFilter::new("info"))
            .with(json_layer);
    }

    #[test]
    fn test_span_context() {
        init_test_logging();

        let span = tracing::info_span!("stream", reply_ceiling = 10);
        let _guard = span.enter();

        tracing::info!("ストリーム受信中");
        tracing::debug!(reply_count = 1, "リプライを記録");
    }
}
