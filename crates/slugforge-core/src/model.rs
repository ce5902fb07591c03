use crate::error::{ModelError, Result};
use serde::{Deserialize, Serialize};

/// 短縮形コミット参照の桁数
pub const SHORT_SHA_LEN: usize = 8;

/// 検証済みのgitコミット参照
///
/// 完全形（40桁の16進数）を保持し、短縮形は先頭8桁を返します。
/// Pod名とイメージタグの両方がこの短縮形から組み立てられるため、
/// 呼び出し側が別の短縮形を渡すことはできません。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sha {
    full: String,
}

impl Sha {
    pub fn new(full: impl Into<String>) -> Result<Self> {
        let full = full.into();

        if full.len() != 40
            || !full
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        {
            return Err(ModelError::InvalidSha(full));
        }

        Ok(Self { full })
    }

    /// 完全形（40桁）
    pub fn full(&self) -> &str {
        &self.full
    }

    /// 短縮形（先頭8桁）
    pub fn short(&self) -> &str {
        &self.full[..SHORT_SHA_LEN]
    }
}

/// ビルダー種別
///
/// Podの `buildType` ラベル値に対応します。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildType {
    SlugBuilder,
    DockerBuilder,
}

impl BuildType {
    pub fn as_label(&self) -> &'static str {
        match self {
            BuildType::SlugBuilder => "slugBuilder",
            BuildType::DockerBuilder => "dockerBuilder",
        }
    }
}

/// ビルド1回分のコンテキスト
///
/// アプリケーション名・コミット参照・オブジェクトストレージ上の
/// アーティファクトパスを保持します。レジストリ認証の上書きは任意で、
/// 指定がなければプッシュは匿名で行われます。
///
/// 構築後は不変で、イメージ組み立てパイプラインの1回の呼び出しが所有します。
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub app_name: String,
    pub sha: Sha,
    /// オブジェクトストレージ上のアーティファクト（tar.gz）のパス
    pub tgz_path: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub server_address: Option<String>,
}

impl BuildContext {
    pub fn new(app_name: impl Into<String>, sha: Sha, tgz_path: impl Into<String>) -> Result<Self> {
        let app_name = app_name.into();
        let tgz_path = tgz_path.into();

        if app_name.is_empty() {
            return Err(ModelError::EmptyAppName);
        }
        if tgz_path.is_empty() {
            return Err(ModelError::EmptyArtifactPath);
        }

        Ok(Self {
            app_name,
            sha,
            tgz_path,
            username: None,
            password: None,
            server_address: None,
        })
    }

    /// レジストリ認証の上書きを設定
    pub fn with_registry_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
        server_address: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self.server_address = Some(server_address.into());
        self
    }
}
