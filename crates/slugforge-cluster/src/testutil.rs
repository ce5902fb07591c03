//! テスト用のフェイククラスタクライアント

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::stream;
use k8s_openapi::api::core::v1::{Pod, PodStatus, Secret};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use tokio::sync::mpsc;

use crate::client::{ClusterClient, PodEvent, PodEventStream};
use crate::error::{ClusterError, Result};
use crate::podspec::{BUILD_TYPE_LABEL, HERITAGE_LABEL};

/// `heritage=<name>`, `buildType=slugBuilder` ラベルつきのPodを作る
pub(crate) fn test_pod(name: &str, phase: &str) -> Pod {
    let mut labels = BTreeMap::new();
    labels.insert(HERITAGE_LABEL.to_string(), name.to_string());
    labels.insert(BUILD_TYPE_LABEL.to_string(), "slugBuilder".to_string());

    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("deis".to_string()),
            labels: Some(labels),
            ..Default::default()
        },
        status: Some(PodStatus {
            phase: Some(phase.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// イベント注入可能なフェイククライアント
///
/// `event_sender` から送ったイベントが最初のwatch購読に流れます。
/// `set_pods` でlist応答を差し替えられるため、resyncの収束も再現
/// できます。
pub(crate) struct FakeClusterClient {
    pods: Mutex<Vec<Pod>>,
    events: Mutex<Option<mpsc::UnboundedReceiver<PodEvent>>>,
    sender: mpsc::UnboundedSender<PodEvent>,
    secrets: Mutex<BTreeMap<String, Secret>>,
    fail_list: bool,
}

impl FakeClusterClient {
    pub fn new(pods: Vec<Pod>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            pods: Mutex::new(pods),
            events: Mutex::new(Some(receiver)),
            sender,
            secrets: Mutex::new(BTreeMap::new()),
            fail_list: false,
        }
    }

    /// listが常に失敗するクライアント
    pub fn failing() -> Self {
        let mut client = Self::new(vec![]);
        client.fail_list = true;
        client
    }

    pub fn event_sender(&self) -> mpsc::UnboundedSender<PodEvent> {
        self.sender.clone()
    }

    pub fn set_pods(&self, pods: Vec<Pod>) {
        *self.pods.lock().unwrap() = pods;
    }

    pub fn add_secret(&self, name: &str, secret: Secret) {
        self.secrets.lock().unwrap().insert(name.to_string(), secret);
    }
}

#[async_trait]
impl ClusterClient for FakeClusterClient {
    async fn list_pods(&self, _namespace: &str, _label_selector: &str) -> Result<Vec<Pod>> {
        if self.fail_list {
            return Err(ClusterError::api("list pods", "fake list failure"));
        }
        Ok(self.pods.lock().unwrap().clone())
    }

    async fn watch_pods(
        &self,
        _namespace: &str,
        _label_selector: &str,
    ) -> Result<PodEventStream> {
        match self.events.lock().unwrap().take() {
            Some(receiver) => {
                let stream = stream::unfold(receiver, |mut rx| async move {
                    rx.recv().await.map(|event| (event, rx))
                });
                Ok(Box::pin(stream))
            }
            // 再接続は黙ってぶら下げておく（イベントは初回購読にのみ流す）
            None => Ok(Box::pin(stream::pending::<PodEvent>())),
        }
    }

    async fn create_pod(&self, _namespace: &str, pod: Pod) -> Result<Pod> {
        self.pods.lock().unwrap().push(pod.clone());
        Ok(pod)
    }

    async fn get_secret(&self, _namespace: &str, name: &str) -> Result<Secret> {
        self.secrets
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| ClusterError::api("get secret", format!("secret {name} not found")))
    }
}
