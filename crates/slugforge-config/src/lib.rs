//! slugforge の設定管理
//!
//! ビルダープロセスの設定は環境変数から読み込みます。
//! クラスタ内ではレジストリのhost/portがサービス環境変数として
//! 注入される前提です。

pub mod error;

pub use error::*;

/// ベースランタイムイメージ名
const SLUGRUNNER_IMAGE_VAR: &str = "SLUGRUNNER_IMAGE_NAME";
/// レジストリサービスのホスト
const REGISTRY_HOST_VAR: &str = "DEIS_REGISTRY_SERVICE_HOST";
/// レジストリサービスのポート
const REGISTRY_PORT_VAR: &str = "DEIS_REGISTRY_SERVICE_PORT";
/// デバッグモード（"1" または "true" で有効）
const DEBUG_VAR: &str = "DEIS_DEBUG";
/// buildpack URLの上書き（任意）
const BUILDPACK_URL_VAR: &str = "BUILDPACK_URL";
/// dockercfg型シークレット名のカンマ区切りリスト（任意）
const PULL_SECRETS_VAR: &str = "PULL_SECRETS";

/// ビルダープロセス全体の設定
#[derive(Debug, Clone)]
pub struct BuilderConfig {
    /// slugを実行するベースランタイムイメージ
    pub slugrunner_image: String,
    /// プッシュ先レジストリのホスト
    pub registry_host: String,
    /// プッシュ先レジストリのポート
    pub registry_port: String,
    /// ビルダーPodに DEIS_DEBUG=1 を注入するかどうか
    pub debug: bool,
    /// slugbuilderに渡すbuildpack URLの上書き
    pub buildpack_url: Option<String>,
    /// レジストリ認証に使うシークレット名
    pub pull_secrets: Vec<String>,
}

impl BuilderConfig {
    /// 環境変数から設定を読み込む
    ///
    /// 必須: `SLUGRUNNER_IMAGE_NAME`, `DEIS_REGISTRY_SERVICE_HOST`,
    /// `DEIS_REGISTRY_SERVICE_PORT`。それ以外は未設定でも動作します。
    pub fn from_env() -> Result<Self> {
        let config = Self {
            slugrunner_image: require_var(SLUGRUNNER_IMAGE_VAR)?,
            registry_host: require_var(REGISTRY_HOST_VAR)?,
            registry_port: require_var(REGISTRY_PORT_VAR)?,
            debug: flag_var(DEBUG_VAR),
            buildpack_url: optional_var(BUILDPACK_URL_VAR),
            pull_secrets: list_var(PULL_SECRETS_VAR),
        };

        tracing::debug!(
            registry = %config.registry_host,
            port = %config.registry_port,
            debug = config.debug,
            "Loaded builder configuration"
        );

        Ok(config)
    }

    /// レジストリ上のアプリケーションイメージ名（タグなし）
    ///
    /// 例: `registry:5000/myapp`
    pub fn registry_image(&self, app_name: &str) -> String {
        format!("{}:{}/{}", self.registry_host, self.registry_port, app_name)
    }
}

fn require_var(name: &'static str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::MissingVar(name)),
    }
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn flag_var(name: &str) -> bool {
    matches!(
        std::env::var(name).as_deref(),
        Ok("1") | Ok("true") | Ok("TRUE")
    )
}

fn list_var(name: &str) -> Vec<String> {
    std::env::var(name)
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
