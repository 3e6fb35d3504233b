/// ルール管理・ストリーム実行CLI
///
/// # 使い方
/// ```bash
/// gobbler list               # 登録済みルールを一覧表示
/// gobbler create <keyword>   # キーワードからルールを作成
/// gobbler delete <ruleID>    # ルールをIDで削除
/// gobbler stream             # ストリームを購読して自動リプライ
/// ```
///
/// ルールの出力は標準出力、ログは標準エラー出力に書き出す。
/// ルール管理の失敗は`BOT_FAILURE_POLICY`に従う（未設定時は報告のみで正常終了）。
use clap::builder::NonEmptyStringValueParser;
use clap::{Parser, Subcommand};
use gobbler::application::{run_stream_job, RuleManager, RuleManagerError};
use gobbler::domain::{FailurePolicy, RuleSet};
use gobbler::infrastructure::{
    failure_policies_from_env, init_cli_logging, BotConfig, TwitterApiClient, TwitterApiConfig,
};
use lambda_runtime::Error;
use tracing::{error, info};

/// コマンドライン引数
#[derive(Parser, Debug)]
#[command(name = "gobbler")]
#[command(about = "フィルタードストリームのルール管理と自動リプライ")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 登録済みのルールを一覧表示
    List,
    /// キーワードからルールを作成（マッチ条件とタグはキーワード）
    Create {
        /// ルールにするキーワード
        #[arg(value_parser = NonEmptyStringValueParser::new())]
        keyword: String,
    },
    /// ルールをIDで削除
    Delete {
        /// 削除するルールのID
        #[arg(value_name = "ruleID", value_parser = NonEmptyStringValueParser::new())]
        rule_id: String,
    },
    /// ストリームを購読して自動リプライ
    Stream,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let cli = Cli::parse();

    init_cli_logging();

    match cli.command {
        Command::Stream => run_stream().await,
        command => run_rule_command(command).await,
    }
}

/// ルール管理コマンドを実行し、結果を標準出力に書き出す
async fn run_rule_command(command: Command) -> Result<(), Error> {
    let api_config = TwitterApiConfig::from_env()?;
    let policy = failure_policies_from_env()?.management;
    let manager = RuleManager::new(TwitterApiClient::for_management(&api_config)?);

    let (operation, result) = match command {
        Command::List => ("list", manager.list().await),
        Command::Create { keyword } => ("create", manager.create(&keyword).await),
        Command::Delete { rule_id } => ("delete", manager.delete(&rule_id).await),
        Command::Stream => return run_stream().await,
    };

    for line in settle_rule_result(policy, operation, result)? {
        println!("{line}");
    }

    Ok(())
}

/// ルール操作の結果にポリシーを適用し、出力する行を返す
///
/// 報告ポリシーで処理した失敗は何も出力しない。
fn settle_rule_result(
    policy: FailurePolicy,
    operation: &str,
    result: Result<RuleSet, RuleManagerError>,
) -> Result<Vec<String>, RuleManagerError> {
    Ok(policy
        .settle(operation, result)?
        .map(|rule_set| rule_set.display_lines())
        .unwrap_or_default())
}

/// ストリームを1回実行
async fn run_stream() -> Result<(), Error> {
    let api_config = TwitterApiConfig::from_env()?;
    let bot_config = BotConfig::from_env()?;

    let output = run_stream_job(&bot_config, &api_config).await.map_err(|e| {
        error!(error = %e, "ストリーム実行を中断");
        Error::from(e)
    })?;

    info!(
        success = output.success,
        summary = ?output.summary,
        "ストリーム実行完了"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use gobbler::domain::{RuleChangeSummary, StreamRule};
    use gobbler::infrastructure::TwitterApiError;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(args)
    }

    fn api_failure() -> RuleManagerError {
        RuleManagerError::Api(TwitterApiError::Http {
            status: 503,
            message: "Service Unavailable".to_string(),
        })
    }

    // ==================== 引数解析テスト ====================

    #[test]
    fn test_parse_list_and_stream() {
        assert!(matches!(parse(&["gobbler", "list"]).unwrap().command, Command::List));
        assert!(matches!(
            parse(&["gobbler", "stream"]).unwrap().command,
            Command::Stream
        ));
    }

    #[test]
    fn test_parse_create_keyword() {
        let cli = parse(&["gobbler", "create", "turkey"]).unwrap();

        assert!(matches!(cli.command, Command::Create { keyword } if keyword == "turkey"));
    }

    #[test]
    fn test_parse_delete_rule_id() {
        let cli = parse(&["gobbler", "delete", "123"]).unwrap();

        assert!(matches!(cli.command, Command::Delete { rule_id } if rule_id == "123"));
    }

    /// 引数が足りなければ使い方エラー（終了コード2）
    #[test]
    fn test_create_without_keyword_is_usage_error() {
        let err = parse(&["gobbler", "create"]).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_delete_without_rule_id_is_usage_error() {
        let err = parse(&["gobbler", "delete"]).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert!(err.to_string().contains("<ruleID>"));
    }

    #[test]
    fn test_unknown_subcommand_is_usage_error() {
        let err = parse(&["gobbler", "frobnicate"]).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_missing_subcommand_is_usage_error() {
        let err = parse(&["gobbler"]).unwrap_err();

        assert!(matches!(
            err.kind(),
            ErrorKind::MissingSubcommand | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
        ));
        assert_eq!(err.exit_code(), 2);
    }

    /// 空のキーワードやルールIDはAPIを呼ぶ前に拒否する
    #[test]
    fn test_empty_arguments_are_rejected() {
        let err = parse(&["gobbler", "create", ""]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);

        let err = parse(&["gobbler", "delete", ""]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
    }

    // ==================== 結果出力テスト ====================

    #[test]
    fn test_settle_success_returns_display_lines() {
        let rule_set = RuleSet {
            rules: vec![StreamRule {
                id: Some("1".to_string()),
                ..StreamRule::from_keyword("turkey")
            }],
            summary: Some(RuleChangeSummary {
                created: 1,
                ..Default::default()
            }),
        };

        let lines = settle_rule_result(FailurePolicy::Abort, "create", Ok(rule_set)).unwrap();

        assert_eq!(
            lines,
            vec![
                "ID: 1, Value: turkey, Tag: turkey".to_string(),
                "Summary: created=1, not_created=0, deleted=0, not_deleted=0".to_string(),
            ]
        );
    }

    /// 報告ポリシーでは失敗しても何も出力せず正常終了する
    #[test]
    fn test_settle_failure_with_report_policy() {
        let lines = settle_rule_result(FailurePolicy::Report, "list", Err(api_failure())).unwrap();

        assert!(lines.is_empty());
    }

    #[test]
    fn test_settle_failure_with_abort_policy() {
        let result = settle_rule_result(FailurePolicy::Abort, "delete", Err(api_failure()));

        assert_eq!(result, Err(api_failure()));
    }
}
