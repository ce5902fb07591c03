//! レジストリ認証の解決
//!
//! クラスタ管理のdockercfg型シークレット群から、対象ホストの
//! プッシュ認証情報を探します。シークレットは渡された順に走査し、
//! 最初にホストが一致したエントリを返します。

use std::collections::BTreeMap;

use base64::Engine;
use bollard::auth::DockerCredentials;
use k8s_openapi::api::core::v1::Secret;
use serde::Deserialize;
use url::Url;

use crate::error::{BuildError, BuildResult};

/// dockercfg型シークレット内の認証ドキュメントのキー
pub const DOCKER_CONFIG_KEY: &str = ".dockercfg";

/// dockercfgドキュメントの1エントリ
///
/// キーはレジストリのURL、値が認証情報です。`auth` は
/// Base64エンコードされた "username:password"。
#[derive(Debug, Deserialize)]
struct DockerCfgEntry {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    auth: Option<String>,
    #[serde(default)]
    serveraddress: Option<String>,
}

/// 対象ホストのレジストリ認証情報を解決
///
/// ドキュメントのパースに失敗したシークレットはスキップせず、解決
/// 全体を設定エラーとして打ち切ります。全シークレットを走査しても
/// 一致が無ければ [`BuildError::NoCredentials`] を返します。
pub fn registry_auth(host: &str, secrets: &[Secret]) -> BuildResult<DockerCredentials> {
    for secret in secrets {
        let secret_name = secret
            .metadata
            .name
            .clone()
            .unwrap_or_else(|| "<unnamed>".to_string());

        let data = secret
            .data
            .as_ref()
            .and_then(|data| data.get(DOCKER_CONFIG_KEY))
            .map(|bytes| bytes.0.as_slice())
            .unwrap_or_default();

        let entries: BTreeMap<String, DockerCfgEntry> =
            serde_json::from_slice(data).map_err(|e| BuildError::MalformedDockerCfg {
                secret: secret_name.clone(),
                message: e.to_string(),
            })?;

        for (key, entry) in &entries {
            // URLとして解釈できないキーは対象外
            let Ok(parsed) = Url::parse(key) else {
                continue;
            };

            if parsed.host_str() == Some(host) {
                tracing::debug!(host = %host, secret = %secret_name, "Resolved registry credentials");
                return credentials(entry, host, &secret_name);
            }
        }
    }

    Err(BuildError::NoCredentials(host.to_string()))
}

/// エントリを [`DockerCredentials`] に変換
///
/// `auth` フィールドがあればそちらを優先してデコードします。
fn credentials(
    entry: &DockerCfgEntry,
    host: &str,
    secret_name: &str,
) -> BuildResult<DockerCredentials> {
    let (username, password) = match &entry.auth {
        Some(auth_b64) => {
            let decoded = base64::engine::general_purpose::STANDARD
                .decode(auth_b64)
                .map_err(|e| BuildError::MalformedDockerCfg {
                    secret: secret_name.to_string(),
                    message: format!("failed to decode auth: {e}"),
                })?;

            let auth_str =
                String::from_utf8(decoded).map_err(|e| BuildError::MalformedDockerCfg {
                    secret: secret_name.to_string(),
                    message: format!("invalid UTF-8 in auth: {e}"),
                })?;

            match auth_str.split_once(':') {
                Some((username, password)) => (Some(username.to_string()), Some(password.to_string())),
                None => {
                    return Err(BuildError::MalformedDockerCfg {
                        secret: secret_name.to_string(),
                        message: "auth is not username:password".to_string(),
                    });
                }
            }
        }
        None => (entry.username.clone(), entry.password.clone()),
    };

    Ok(DockerCredentials {
        username,
        password,
        serveraddress: entry
            .serveraddress
            .clone()
            .or_else(|| Some(host.to_string())),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::ByteString;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn dockercfg_secret(name: &str, document: &str) -> Secret {
        let mut data = BTreeMap::new();
        data.insert(
            DOCKER_CONFIG_KEY.to_string(),
            ByteString(document.as_bytes().to_vec()),
        );

        Secret {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            data: Some(data),
            type_: Some("kubernetes.io/dockercfg".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_first_matching_secret_wins() {
        let first = dockercfg_secret(
            "first",
            r#"{"https://registry.example.com/v1/": {"username": "alice", "password": "one"}}"#,
        );
        let second = dockercfg_secret(
            "second",
            r#"{"https://registry.example.com/v1/": {"username": "bob", "password": "two"}}"#,
        );

        let creds = registry_auth("registry.example.com", &[first, second]).unwrap();
        assert_eq!(creds.username.as_deref(), Some("alice"));
        assert_eq!(creds.password.as_deref(), Some("one"));
    }

    #[test]
    fn test_no_match_names_the_host() {
        let secret = dockercfg_secret(
            "only",
            r#"{"https://quay.io/v1/": {"username": "alice", "password": "one"}}"#,
        );

        let result = registry_auth("registry.example.com", &[secret]);
        match result {
            Err(BuildError::NoCredentials(host)) => assert_eq!(host, "registry.example.com"),
            other => panic!("expected NoCredentials, got {other:?}"),
        }
    }

    #[test]
    fn test_no_credentials_even_with_no_secrets() {
        assert!(matches!(
            registry_auth("registry.example.com", &[]),
            Err(BuildError::NoCredentials(_))
        ));
    }

    #[test]
    fn test_malformed_document_aborts_resolution() {
        let broken = dockercfg_secret("broken", "not-json");
        let matching = dockercfg_secret(
            "matching",
            r#"{"https://registry.example.com/v1/": {"username": "alice", "password": "one"}}"#,
        );

        // 後ろに一致があっても壊れたシークレットで打ち切る
        let result = registry_auth("registry.example.com", &[broken, matching]);
        assert!(matches!(
            result,
            Err(BuildError::MalformedDockerCfg { .. })
        ));
    }

    #[test]
    fn test_base64_auth_field_is_decoded() {
        let auth = base64::engine::general_purpose::STANDARD.encode("alice:s3cret");
        let secret = dockercfg_secret(
            "b64",
            &format!(r#"{{"https://registry.example.com/v1/": {{"auth": "{auth}"}}}}"#),
        );

        let creds = registry_auth("registry.example.com", &[secret]).unwrap();
        assert_eq!(creds.username.as_deref(), Some("alice"));
        assert_eq!(creds.password.as_deref(), Some("s3cret"));
        assert_eq!(
            creds.serveraddress.as_deref(),
            Some("registry.example.com")
        );
    }

    #[test]
    fn test_non_url_keys_are_ignored() {
        let secret = dockercfg_secret(
            "mixed",
            r#"{"not a url": {"username": "x", "password": "y"}}"#,
        );

        assert!(matches!(
            registry_auth("registry.example.com", &[secret]),
            Err(BuildError::NoCredentials(_))
        ));
    }
}
