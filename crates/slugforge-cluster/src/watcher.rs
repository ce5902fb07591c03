//! ビルドPodのローカルキャッシュ
//!
//! list + watch + 定期resyncでクラスタのPod状態を手元に複製します。
//! 参照系はネットワークに一切触れず、キャッシュが未同期なら空を返す
//! だけです。watchストリームが切れてもresyncが30秒ごとに全量を
//! 取り直すため、欠落イベントによるずれはresync周期で収束します。

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use futures_util::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use tokio::task::JoinHandle;

use slugforge_core::BuildType;

use crate::client::{ClusterClient, PodEvent};
use crate::error::Result;
use crate::podspec::BUILD_TYPE_LABEL;

/// 全量再取得の周期
const RESYNC_PERIOD: Duration = Duration::from_secs(30);
/// watch切断後の再接続待ち
const WATCH_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Podの観測フェーズ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl PodPhase {
    pub fn parse(phase: &str) -> Self {
        match phase {
            "Pending" => PodPhase::Pending,
            "Running" => PodPhase::Running,
            "Succeeded" => PodPhase::Succeeded,
            "Failed" => PodPhase::Failed,
            _ => PodPhase::Unknown,
        }
    }
}

/// キャッシュされたPodのスナップショット
///
/// 読み手に渡るのはこのコピーだけで、キャッシュ本体が書き換えられても
/// 影響を受けません。
#[derive(Debug, Clone)]
pub struct PodRecord {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub phase: PodPhase,
}

impl PodRecord {
    fn from_pod(pod: &Pod) -> Option<Self> {
        let name = pod.metadata.name.clone()?;
        let labels = pod.metadata.labels.clone().unwrap_or_default();
        let phase = pod
            .status
            .as_ref()
            .and_then(|s| s.phase.as_deref())
            .map(PodPhase::parse)
            .unwrap_or(PodPhase::Unknown);

        Some(Self {
            name,
            labels,
            phase,
        })
    }
}

type PodIndex = Arc<RwLock<HashMap<String, Pod>>>;

/// ビルドPodを監視するローカルキャッシュ
///
/// 構築時にラベルセレクタで初期リストを取得し（失敗したら構築ごと
/// 失敗）、以後はwatch購読タスクとresyncタスクがインデックスを
/// 更新し続けます。両タスクは `shutdown`（またはdrop）で停止します。
pub struct BuildPodWatcher {
    pods: PodIndex,
    watch_task: JoinHandle<()>,
    resync_task: JoinHandle<()>,
}

impl BuildPodWatcher {
    /// キャッシュを開始
    ///
    /// セレクタは `buildType=<種別>` 固定。初期リストに失敗した場合は
    /// ベースラインが取れないためエラーを返します。
    pub async fn start(
        client: Arc<dyn ClusterClient>,
        namespace: impl Into<String>,
        build_type: BuildType,
    ) -> Result<Self> {
        let namespace = namespace.into();
        let selector = format!("{}={}", BUILD_TYPE_LABEL, build_type.as_label());

        let initial = client.list_pods(&namespace, &selector).await?;
        tracing::debug!(
            namespace = %namespace,
            selector = %selector,
            pods = initial.len(),
            "Primed build pod cache"
        );

        let pods: PodIndex = Arc::new(RwLock::new(index_pods(initial)));

        let watch_task = tokio::spawn(watch_loop(
            client.clone(),
            namespace.clone(),
            selector.clone(),
            pods.clone(),
        ));
        let resync_task = tokio::spawn(resync_loop(client, namespace, selector, pods.clone()));

        Ok(Self {
            pods,
            watch_task,
            resync_task,
        })
    }

    /// ラベル等値クエリでキャッシュを検索
    ///
    /// 結果は名前順。キャッシュ未同期なら空が返るだけで、エラーには
    /// なりません。
    pub fn pods_by_label(&self, key: &str, value: &str) -> Vec<PodRecord> {
        let index = self.pods.read().expect("pod index lock poisoned");

        let mut records: Vec<PodRecord> = index
            .values()
            .filter(|pod| {
                pod.metadata
                    .labels
                    .as_ref()
                    .and_then(|labels| labels.get(key))
                    .is_some_and(|v| v == value)
            })
            .filter_map(PodRecord::from_pod)
            .collect();

        records.sort_by(|a, b| a.name.cmp(&b.name));
        records
    }

    /// 背景タスクを停止
    pub fn shutdown(&self) {
        self.watch_task.abort();
        self.resync_task.abort();
    }
}

impl Drop for BuildPodWatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn index_pods(pods: Vec<Pod>) -> HashMap<String, Pod> {
    pods.into_iter()
        .filter_map(|pod| pod.metadata.name.clone().map(|name| (name, pod)))
        .collect()
}

async fn watch_loop(
    client: Arc<dyn ClusterClient>,
    namespace: String,
    selector: String,
    pods: PodIndex,
) {
    loop {
        match client.watch_pods(&namespace, &selector).await {
            Ok(mut stream) => {
                while let Some(event) = stream.next().await {
                    apply_event(&pods, event);
                }
                tracing::debug!(selector = %selector, "Pod watch stream ended, reconnecting");
            }
            Err(e) => {
                tracing::warn!(selector = %selector, error = %e, "Pod watch failed, retrying");
            }
        }

        tokio::time::sleep(WATCH_RETRY_DELAY).await;
    }
}

async fn resync_loop(
    client: Arc<dyn ClusterClient>,
    namespace: String,
    selector: String,
    pods: PodIndex,
) {
    let mut ticker = tokio::time::interval(RESYNC_PERIOD);
    // intervalの初回tickは即時に完了するため読み捨てる
    ticker.tick().await;

    loop {
        ticker.tick().await;

        match client.list_pods(&namespace, &selector).await {
            Ok(listed) => {
                let fresh = index_pods(listed);
                let mut index = pods.write().expect("pod index lock poisoned");
                *index = fresh;
            }
            Err(e) => {
                // キャッシュはstaleのまま維持し、次の周期で再試行する
                tracing::warn!(selector = %selector, error = %e, "Pod resync failed");
            }
        }
    }
}

fn apply_event(pods: &PodIndex, event: PodEvent) {
    let mut index = pods.write().expect("pod index lock poisoned");

    match event {
        PodEvent::Added(pod) | PodEvent::Modified(pod) => {
            if let Some(name) = pod.metadata.name.clone() {
                index.insert(name, pod);
            } else {
                tracing::warn!("Ignoring pod event without a name");
            }
        }
        PodEvent::Deleted(pod) => {
            if let Some(name) = pod.metadata.name.as_deref() {
                index.remove(name);
            }
        }
    }
}
