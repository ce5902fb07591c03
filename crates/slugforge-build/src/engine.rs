//! イメージエンジンの境界とDocker実装
//!
//! ビルドとプッシュの2操作だけをトレイトに切り出し、本番では
//! Docker API（bollard）で実装します。ビルド出力はストリーム表示、
//! プッシュ出力は取り込んでdebugログに回します。

// Bollard 0.19.4 の非推奨APIを一時的に使用
#![allow(deprecated)]

use std::path::Path;

use async_trait::async_trait;
use bollard::Docker;
use bollard::auth::DockerCredentials;
use bollard::image::{BuildImageOptions, PushImageOptions};
use colored::Colorize;
use futures_util::StreamExt;

use crate::error::{BuildError, BuildResult};

/// コンテナイメージエンジン
///
/// 1回のビルド/プッシュを単一の成否を持つブロッキング呼び出しとして
/// 扱います。エンジン内部の並行性はここでは関知しません。
#[async_trait]
pub trait ImageEngine: Send + Sync {
    /// `context_dir` をルートにイメージをビルドし `tag` を付ける
    async fn build_image(&self, tag: &str, context_dir: &Path) -> BuildResult<()>;

    /// `image:tag` をレジストリにプッシュ
    async fn push_image(
        &self,
        image: &str,
        tag: &str,
        credentials: DockerCredentials,
    ) -> BuildResult<()>;
}

/// Docker APIによる実装
pub struct DockerEngine {
    docker: Docker,
}

impl DockerEngine {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    /// ローカルのDockerデーモンに接続
    pub fn connect() -> BuildResult<Self> {
        Ok(Self::new(Docker::connect_with_local_defaults()?))
    }

    /// ステージングディレクトリをtar.gzのビルドコンテキストに変換
    fn create_context(context_dir: &Path) -> BuildResult<Vec<u8>> {
        use flate2::Compression;
        use flate2::write::GzEncoder;

        let mut archive_data = Vec::new();
        {
            let encoder = GzEncoder::new(&mut archive_data, Compression::default());
            let mut tar = tar::Builder::new(encoder);
            tar.append_dir_all(".", context_dir)
                .map_err(BuildError::Staging)?;
            tar.finish().map_err(BuildError::Staging)?;
        }

        tracing::debug!(bytes = archive_data.len(), "Created build context archive");
        Ok(archive_data)
    }

    /// ビルド出力の処理
    fn handle_build_output(output: bollard::models::BuildInfo) -> BuildResult<()> {
        if let Some(stream) = output.stream {
            print!("{}", stream);
        }

        if let Some(error) = output.error {
            return Err(BuildError::BuildFailed(error));
        }

        if let Some(error_detail) = output.error_detail {
            let message = error_detail
                .message
                .unwrap_or_else(|| "unknown build error".to_string());
            return Err(BuildError::BuildFailed(message));
        }

        if let Some(status) = output.status {
            println!("{}", status.cyan());
        }

        Ok(())
    }
}

#[async_trait]
impl ImageEngine for DockerEngine {
    async fn build_image(&self, tag: &str, context_dir: &Path) -> BuildResult<()> {
        tracing::info!(tag = %tag, "Building image");

        let context_data = Self::create_context(context_dir)?;

        let options = BuildImageOptions {
            dockerfile: "Dockerfile",
            t: tag,
            rm: true,
            forcerm: true,
            ..Default::default()
        };

        use bytes::Bytes;
        use http_body_util::{Either, Full};
        let body = Full::new(Bytes::from(context_data));
        let mut stream = self
            .docker
            .build_image(options, None, Some(Either::Left(body)));

        while let Some(msg) = stream.next().await {
            match msg {
                Ok(output) => Self::handle_build_output(output)?,
                Err(e) => return Err(BuildError::DockerConnection(e)),
            }
        }

        tracing::info!(tag = %tag, "Successfully built image");
        Ok(())
    }

    async fn push_image(
        &self,
        image: &str,
        tag: &str,
        credentials: DockerCredentials,
    ) -> BuildResult<()> {
        let options = PushImageOptions::<String> {
            tag: tag.to_string(),
        };

        let mut stream = self
            .docker
            .push_image(image, Some(options), Some(credentials));

        let mut captured = Vec::new();
        let mut error_message: Option<String> = None;

        while let Some(result) = stream.next().await {
            match result {
                Ok(info) => {
                    if let Some(err) = info.error {
                        error_message = Some(err);
                    } else if let Some(status) = info.status {
                        captured.push(status);
                    }
                }
                Err(e) => {
                    return Err(BuildError::PushFailed {
                        image: format!("{image}:{tag}"),
                        message: e.to_string(),
                    });
                }
            }
        }

        // プッシュ出力はストリーム表示せず取り込むだけ
        tracing::debug!(image = %image, tag = %tag, output = %captured.join("\n"), "Push output");

        if let Some(message) = error_message {
            return Err(BuildError::PushFailed {
                image: format!("{image}:{tag}"),
                message,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_create_context_archives_staging_dir() {
        let staging = tempfile::tempdir().unwrap();
        fs::write(staging.path().join("Dockerfile"), "FROM alpine\n").unwrap();
        fs::write(staging.path().join("slug.tgz"), b"artifact-bytes").unwrap();

        let archive = DockerEngine::create_context(staging.path()).unwrap();
        assert!(!archive.is_empty());

        // tar.gzとして展開でき、両ファイルが含まれること
        let extract = tempfile::tempdir().unwrap();
        let decoder = flate2::read::GzDecoder::new(std::io::Cursor::new(archive));
        let mut tar = tar::Archive::new(decoder);
        tar.unpack(extract.path()).unwrap();

        assert!(extract.path().join("Dockerfile").exists());
        assert!(extract.path().join("slug.tgz").exists());
    }

    #[test]
    fn test_create_context_missing_dir_fails() {
        let staging = tempfile::tempdir().unwrap();
        let gone = staging.path().join("nope");

        assert!(matches!(
            DockerEngine::create_context(&gone),
            Err(BuildError::Staging(_))
        ));
    }
}
