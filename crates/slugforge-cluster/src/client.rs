//! クラスタAPIクライアントの境界
//!
//! このcrateが必要とする操作だけを持つ狭いインターフェースです。
//! list/watch/createPod/getSecret 以外は要求しません。実装を
//! 差し替えやすくし、テストではイベント注入可能なフェイクを使います。

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use k8s_openapi::api::core::v1::{Pod, Secret};

use crate::error::Result;

/// Pod変更購読で流れてくるイベント
#[derive(Debug, Clone)]
pub enum PodEvent {
    Added(Pod),
    Modified(Pod),
    Deleted(Pod),
}

pub type PodEventStream = BoxStream<'static, PodEvent>;

/// クラスタAPIクライアント
///
/// watchストリームは途中で終端してよい。購読の再確立は
/// [`crate::watcher::BuildPodWatcher`] 側が行います。
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// ラベルセレクタに一致するPodを列挙
    async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<Pod>>;

    /// ラベルセレクタに一致するPodの変更購読を開始
    async fn watch_pods(&self, namespace: &str, label_selector: &str) -> Result<PodEventStream>;

    /// Podを作成
    async fn create_pod(&self, namespace: &str, pod: Pod) -> Result<Pod>;

    /// シークレットを名前で取得
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret>;
}
