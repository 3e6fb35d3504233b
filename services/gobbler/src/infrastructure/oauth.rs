//! OAuth 1.0a署名モジュール
//!
//! 投稿APIはユーザーコンテキストでの署名が必要。
//! リクエストごとに新しいタイムスタンプとnonceで署名ヘッダーを生成する。

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use rand::RngCore;
use sha1::Sha1;

use super::config::TwitterApiConfig;
use super::twitter_client::TwitterApiError;

/// RFC 3986の非予約文字（英数字と "-" "." "_" "~"）以外をすべてエンコードする
const OAUTH_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'!')
    .add(b'"')
    .add(b'#')
    .add(b'$')
    .add(b'%')
    .add(b'&')
    .add(b'\'')
    .add(b'(')
    .add(b')')
    .add(b'*')
    .add(b'+')
    .add(b',')
    .add(b'/')
    .add(b':')
    .add(b';')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'?')
    .add(b'@')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// OAuth 1.0a署名器
///
/// アクセストークンが未設定の場合、署名時に認証情報エラーを返す。
#[derive(Clone)]
pub struct OAuthSigner {
    consumer_key: String,
    consumer_secret: String,
    access_token: Option<String>,
    access_token_secret: Option<String>,
}

impl std::fmt::Debug for OAuthSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthSigner")
            .field("has_access_token", &self.access_token.is_some())
            .finish_non_exhaustive()
    }
}

impl OAuthSigner {
    /// 設定から署名器を作成
    pub fn new(config: &TwitterApiConfig) -> Self {
        Self {
            consumer_key: config.api_key().to_string(),
            consumer_secret: config.api_key_secret().to_string(),
            access_token: config.access_token().map(ToString::to_string),
            access_token_secret: config.access_token_secret().map(ToString::to_string),
        }
    }

    /// Authorizationヘッダー値を生成
    ///
    /// # 引数
    /// * `method` - HTTPメソッド
    /// * `url` - クエリを含まないURL
    /// * `params` - 署名対象のクエリ・フォームパラメータ（JSONボディは対象外）
    pub fn sign(
        &self,
        method: &str,
        url: &str,
        params: &[(String, String)],
    ) -> Result<String, TwitterApiError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        self.sign_with(method, url, params, &timestamp, &generate_nonce())
    }

    /// タイムスタンプとnonceを指定して署名
    pub(crate) fn sign_with(
        &self,
        method: &str,
        url: &str,
        params: &[(String, String)],
        timestamp: &str,
        nonce: &str,
    ) -> Result<String, TwitterApiError> {
        let (access_token, access_token_secret) =
            match (&self.access_token, &self.access_token_secret) {
                (Some(token), Some(secret)) => (token, secret),
                _ => {
                    return Err(TwitterApiError::Credential(
                        "TWITTER_ACCESS_TOKEN / TWITTER_ACCESS_TOKEN_SECRET が設定されていません"
                            .to_string(),
                    ));
                }
            };

        let mut oauth_params = vec![
            ("oauth_consumer_key".to_string(), self.consumer_key.clone()),
            ("oauth_nonce".to_string(), nonce.to_string()),
            (
                "oauth_signature_method".to_string(),
                "HMAC-SHA1".to_string(),
            ),
            ("oauth_timestamp".to_string(), timestamp.to_string()),
            ("oauth_token".to_string(), access_token.clone()),
            ("oauth_version".to_string(), "1.0".to_string()),
        ];

        let mut all_params = oauth_params.clone();
        all_params.extend(params.iter().cloned());

        let base_string = signature_base_string(method, url, &all_params);
        let signing_key = format!(
            "{}&{}",
            percent_encode(&self.consumer_secret),
            percent_encode(access_token_secret)
        );
        let signature = hmac_sha1(&signing_key, &base_string)?;

        oauth_params.push(("oauth_signature".to_string(), signature));

        let header = oauth_params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
            .collect::<Vec<_>>()
            .join(", ");

        Ok(format!("OAuth {header}"))
    }
}

/// 署名ベース文字列を生成（パラメータはエンコード後にキー・値の順でソート）
pub(crate) fn signature_base_string(
    method: &str,
    url: &str,
    params: &[(String, String)],
) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();

    let param_string = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        percent_encode(url),
        percent_encode(&param_string)
    )
}

/// RFC 3986に従ってパーセントエンコード
pub(crate) fn percent_encode(s: &str) -> String {
    utf8_percent_encode(s, OAUTH_ENCODE_SET).to_string()
}

/// ランダムなnonce（32文字の16進数）を生成
fn generate_nonce() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// HMAC-SHA1を計算してBase64で返す
fn hmac_sha1(key: &str, data: &str) -> Result<String, TwitterApiError> {
    type HmacSha1 = Hmac<Sha1>;

    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .map_err(|e| TwitterApiError::Credential(e.to_string()))?;
    mac.update(data.as_bytes());

    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Twitter開発者ドキュメント「Creating a signature」の例
    const CONSUMER_KEY: &str = "xvz1evFS4wEEPTGEFPHBog";
    const CONSUMER_SECRET: &str = "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw";
    const ACCESS_TOKEN: &str = "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb";
    const ACCESS_TOKEN_SECRET: &str = "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE";
    const NONCE: &str = "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg";
    const TIMESTAMP: &str = "1318622958";
    const URL: &str = "https://api.twitter.com/1.1/statuses/update.json";

    fn reference_signer() -> OAuthSigner {
        let config = TwitterApiConfig::new(CONSUMER_KEY, CONSUMER_SECRET)
            .with_access_token(ACCESS_TOKEN, ACCESS_TOKEN_SECRET);
        OAuthSigner::new(&config)
    }

    fn reference_params() -> Vec<(String, String)> {
        vec![
            (
                "status".to_string(),
                "Hello Ladies + Gentlemen, a signed OAuth request!".to_string(),
            ),
            ("include_entities".to_string(), "true".to_string()),
        ]
    }

    #[test]
    fn test_percent_encode() {
        assert_eq!(percent_encode("hello world"), "hello%20world");
        assert_eq!(percent_encode("foo=bar&baz"), "foo%3Dbar%26baz");
        assert_eq!(percent_encode("test-value_123.txt"), "test-value_123.txt");
        assert_eq!(percent_encode("~tilde"), "~tilde");
        assert_eq!(percent_encode("☃"), "%E2%98%83");
    }

    #[test]
    fn test_generate_nonce() {
        let nonce1 = generate_nonce();
        let nonce2 = generate_nonce();

        assert_ne!(nonce1, nonce2);
        assert_eq!(nonce1.len(), 32);
        assert!(nonce1.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_signature_base_string_reference() {
        let mut params = reference_params();
        params.extend([
            ("oauth_consumer_key".to_string(), CONSUMER_KEY.to_string()),
            ("oauth_nonce".to_string(), NONCE.to_string()),
            ("oauth_signature_method".to_string(), "HMAC-SHA1".to_string()),
            ("oauth_timestamp".to_string(), TIMESTAMP.to_string()),
            ("oauth_token".to_string(), ACCESS_TOKEN.to_string()),
            ("oauth_version".to_string(), "1.0".to_string()),
        ]);

        let base_string = signature_base_string("post", URL, &params);

        assert_eq!(
            base_string,
            "POST&https%3A%2F%2Fapi.twitter.com%2F1.1%2Fstatuses%2Fupdate.json&\
             include_entities%3Dtrue%26\
             oauth_consumer_key%3Dxvz1evFS4wEEPTGEFPHBog%26\
             oauth_nonce%3DkYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg%26\
             oauth_signature_method%3DHMAC-SHA1%26\
             oauth_timestamp%3D1318622958%26\
             oauth_token%3D370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb%26\
             oauth_version%3D1.0%26\
             status%3DHello%2520Ladies%2520%252B%2520Gentlemen%252C%2520a%2520signed%2520OAuth%2520request%2521"
        );
    }

    #[test]
    fn test_sign_reference_signature() {
        let header = reference_signer()
            .sign_with("POST", URL, &reference_params(), TIMESTAMP, NONCE)
            .unwrap();

        // hCtSmYh+iHYCEqBWrE7C7hYmtUk= をエンコードした値
        assert!(header.contains("oauth_signature=\"hCtSmYh%2BiHYCEqBWrE7C7hYmtUk%3D\""));
    }

    #[test]
    fn test_sign_creates_valid_header() {
        let header = reference_signer()
            .sign("POST", "https://api.twitter.com/2/tweets", &[])
            .unwrap();

        assert!(header.starts_with("OAuth "));
        assert!(header.contains("oauth_consumer_key=\"xvz1evFS4wEEPTGEFPHBog\""));
        assert!(header.contains("oauth_signature="));
        assert!(header.contains("oauth_timestamp="));
        assert!(header.contains("oauth_nonce="));
        assert!(header.contains("oauth_version=\"1.0\""));
    }

    /// アクセストークン未設定は認証情報エラー
    #[test]
    fn test_sign_without_access_token_fails() {
        let config = TwitterApiConfig::new(CONSUMER_KEY, CONSUMER_SECRET);
        let signer = OAuthSigner::new(&config);

        let result = signer.sign("POST", "https://api.twitter.com/2/tweets", &[]);

        assert!(matches!(result, Err(TwitterApiError::Credential(_))));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let debug_str = format!("{:?}", reference_signer());

        assert!(!debug_str.contains(CONSUMER_SECRET));
        assert!(!debug_str.contains(ACCESS_TOKEN_SECRET));
    }
}
