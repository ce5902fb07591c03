//! イメージ組み立てパイプライン
//!
//! 完了したビルドアーティファクトを、レジストリにプッシュ済みの
//! 実行可能イメージへ変換します。失敗した段階で即座に打ち切り、
//! ステージングディレクトリは調査用に残します。

use bollard::auth::DockerCredentials;

use slugforge_config::BuilderConfig;
use slugforge_core::BuildContext;

use crate::dockerfile::render_dockerfile;
use crate::engine::ImageEngine;
use crate::error::{BuildError, BuildResult};
use crate::storage::SlugStorage;

/// ステージングディレクトリ内のアーティファクトのファイル名
const SLUG_FILE_NAME: &str = "slug.tgz";
const DOCKERFILE_NAME: &str = "Dockerfile";
const STAGING_PREFIX: &str = "build-app-";

/// アーティファクトをイメージとしてレジストリに公開
///
/// 手順: ビルド記述子のレンダリング → ステージング → アーティファクト
/// 取得 → イメージビルド → 認証決定 → プッシュ。成功時は使用した
/// 完全なイメージ参照（`<host>:<port>/<app>:git-<short>`）を返します。
///
/// 認証は [`BuildContext`] の明示的な上書きを優先し、無ければ匿名で
/// プッシュします（認証を帯域外で注入する構成向け）。
pub async fn assemble_image(
    storage: &dyn SlugStorage,
    engine: &dyn ImageEngine,
    config: &BuilderConfig,
    context: &BuildContext,
) -> BuildResult<String> {
    let dockerfile = render_dockerfile(&config.slugrunner_image, context.sha.full())?;

    // 同一ホストで並行するビルドが干渉しないよう、毎回固有の
    // ディレクトリに展開する。失敗時の調査用に自動削除はしない。
    let staging = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempdir()?
        .into_path();
    tracing::debug!(dir = %staging.display(), "Staging build context");

    let artifact = storage
        .get_content(&context.tgz_path)
        .await
        .map_err(|e| BuildError::Fetch {
            path: context.tgz_path.clone(),
            message: e.to_string(),
        })?;
    std::fs::write(staging.join(SLUG_FILE_NAME), &artifact)?;

    std::fs::write(staging.join(DOCKERFILE_NAME), dockerfile.as_bytes())?;
    tracing::debug!(dockerfile = %dockerfile, "Rendered build descriptor");

    let image = config.registry_image(&context.app_name);
    let tag = format!("git-{}", context.sha.short());
    let image_with_tag = format!("{image}:{tag}");

    tracing::info!(image = %image_with_tag, "Building application image");
    engine.build_image(&image_with_tag, &staging).await?;

    let credentials = push_credentials(context);

    tracing::info!(image = %image_with_tag, "Publishing application image");
    engine.push_image(&image, &tag, credentials).await?;

    Ok(image_with_tag)
}

/// プッシュに使う認証情報を決定
///
/// 上書きが無い場合は空の認証情報になります。認証不要のレジストリ
/// （またはエンジン側で認証が注入される構成）を前提とした設定判断
/// です。
fn push_credentials(context: &BuildContext) -> DockerCredentials {
    match &context.server_address {
        Some(server) => DockerCredentials {
            username: context.username.clone(),
            password: context.password.clone(),
            serveraddress: Some(server.clone()),
            ..Default::default()
        },
        None => {
            tracing::debug!("No registry auth override, pushing anonymously");
            DockerCredentials::default()
        }
    }
}
