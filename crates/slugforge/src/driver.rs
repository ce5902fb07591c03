//! ビルド1回分の実行
//!
//! Pod投入 → 起動待ち → 完了待ち → イメージ組み立て、の一連の流れを
//! 束ねます。git受信フック側はspecを組み立ててこの関数を呼ぶだけで
//! よく、Pod監視の詳細には触れません。

use std::sync::Arc;
use std::time::Duration;

use k8s_openapi::api::core::v1::Pod;
use thiserror::Error;

use slugforge_build::{
    BuildError, BuildProgress, ImageEngine, ProgressTicker, SlugStorage, assemble_image,
};
use slugforge_cluster::{
    BuildPodWatcher, ClusterClient, ClusterError, PodPhase, wait_for_pod, wait_for_pod_end,
};
use slugforge_config::BuilderConfig;
use slugforge_core::BuildContext;

#[derive(Debug, Error)]
pub enum BuildRunError {
    #[error("build pod has no name")]
    UnnamedPod,

    #[error(transparent)]
    Cluster(#[from] ClusterError),

    #[error("build pod {pod} finished in failed phase")]
    BuildPodFailed { pod: String },

    #[error(transparent)]
    Build(#[from] BuildError),
}

/// ビルド実行の各段階のタイムアウト
#[derive(Debug, Clone)]
pub struct BuildTimeouts {
    /// Pod起動待ちの上限
    pub start: Duration,
    /// ビルド完了待ちの上限
    pub finish: Duration,
    /// キャッシュのポーリング間隔
    pub poll_interval: Duration,
    /// 接続維持メッセージの間隔
    pub keepalive: Duration,
}

impl Default for BuildTimeouts {
    fn default() -> Self {
        Self {
            start: Duration::from_secs(120),
            finish: Duration::from_secs(600),
            poll_interval: Duration::from_secs(1),
            keepalive: Duration::from_secs(5),
        }
    }
}

/// ビルドPodを実行し、成果物をイメージとして公開する
///
/// Podは投入前に構築済みであること（名前・ラベルを含む）。起動待ちは
/// failedを致命として扱い、完了待ちでは failed を「ビルド失敗」として
/// [`BuildRunError::BuildPodFailed`] に変換します。成功時は公開した
/// イメージ参照を返します。
#[allow(clippy::too_many_arguments)]
pub async fn run_build(
    client: Arc<dyn ClusterClient>,
    watcher: &BuildPodWatcher,
    storage: &dyn SlugStorage,
    engine: &dyn ImageEngine,
    config: &BuilderConfig,
    context: &BuildContext,
    namespace: &str,
    pod: Pod,
    timeouts: &BuildTimeouts,
) -> Result<String, BuildRunError> {
    let pod_name = pod.metadata.name.clone().ok_or(BuildRunError::UnnamedPod)?;

    tracing::info!(pod = %pod_name, namespace = %namespace, "Submitting build pod");
    client.create_pod(namespace, pod).await?;

    wait_for_pod(watcher, &pod_name, timeouts.poll_interval, timeouts.start).await?;
    tracing::debug!(pod = %pod_name, "Build pod started");

    let ticker = ProgressTicker::start("Still building...", timeouts.keepalive);
    let finished = wait_for_pod_end(watcher, &pod_name, timeouts.poll_interval, timeouts.finish).await;
    ticker.stop().await;

    match finished? {
        PodPhase::Succeeded => {}
        phase => {
            tracing::warn!(pod = %pod_name, phase = ?phase, "Build pod did not succeed");
            return Err(BuildRunError::BuildPodFailed { pod: pod_name });
        }
    }

    let progress = BuildProgress::new(&context.app_name);
    progress.set_message("Assembling application image...");

    match assemble_image(storage, engine, config, context).await {
        Ok(image) => {
            progress.finish_success();
            tracing::info!(image = %image, "Build finished");
            Ok(image)
        }
        Err(e) => {
            progress.finish_error(&e.to_string());
            Err(e.into())
        }
    }
}
