//! 統合テスト用のフェイク一式

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use bollard::auth::DockerCredentials;
use futures_util::stream;
use k8s_openapi::api::core::v1::{Pod, PodStatus, Secret};
use tokio::sync::mpsc;

use slugforge_build::{BuildResult, ImageEngine, SlugStorage};
use slugforge_cluster::{ClusterClient, ClusterError, PodEvent, PodEventStream};
use slugforge_config::BuilderConfig;

/// Pod投入後に台本どおりのフェーズ遷移イベントを流すフェイククラスタ
pub struct FakeCluster {
    pods: Mutex<Vec<Pod>>,
    events: Mutex<Option<mpsc::UnboundedReceiver<PodEvent>>>,
    sender: mpsc::UnboundedSender<PodEvent>,
    script: Vec<String>,
    /// イベント間の間隔。ゼロなら一括で流す
    spacing: std::time::Duration,
}

impl FakeCluster {
    pub fn with_script(phases: &[&str]) -> Self {
        Self::with_paced_script(phases, std::time::Duration::ZERO)
    }

    /// 各遷移を `spacing` 空けて流す（途中フェーズも観測させたい場合）
    pub fn with_paced_script(phases: &[&str], spacing: std::time::Duration) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            pods: Mutex::new(Vec::new()),
            events: Mutex::new(Some(receiver)),
            sender,
            script: phases.iter().map(|p| p.to_string()).collect(),
            spacing,
        }
    }

    #[allow(dead_code)]
    pub fn event_sender(&self) -> mpsc::UnboundedSender<PodEvent> {
        self.sender.clone()
    }
}

fn pod_with_phase(pod: &Pod, phase: &str) -> Pod {
    let mut pod = pod.clone();
    pod.status = Some(PodStatus {
        phase: Some(phase.to_string()),
        ..Default::default()
    });
    pod
}

#[async_trait]
impl ClusterClient for FakeCluster {
    async fn list_pods(
        &self,
        _namespace: &str,
        _label_selector: &str,
    ) -> slugforge_cluster::Result<Vec<Pod>> {
        Ok(self.pods.lock().unwrap().clone())
    }

    async fn watch_pods(
        &self,
        _namespace: &str,
        _label_selector: &str,
    ) -> slugforge_cluster::Result<PodEventStream> {
        match self.events.lock().unwrap().take() {
            Some(receiver) => {
                let stream = stream::unfold(receiver, |mut rx| async move {
                    rx.recv().await.map(|event| (event, rx))
                });
                Ok(Box::pin(stream))
            }
            None => Ok(Box::pin(stream::pending::<PodEvent>())),
        }
    }

    async fn create_pod(&self, _namespace: &str, pod: Pod) -> slugforge_cluster::Result<Pod> {
        let sender = self.sender.clone();
        let script = self.script.clone();
        let spacing = self.spacing;
        let submitted = pod.clone();

        tokio::spawn(async move {
            for (i, phase) in script.iter().enumerate() {
                if i > 0 && !spacing.is_zero() {
                    tokio::time::sleep(spacing).await;
                }
                let staged = pod_with_phase(&submitted, phase);
                let event = if i == 0 {
                    PodEvent::Added(staged)
                } else {
                    PodEvent::Modified(staged)
                };
                let _ = sender.send(event);
            }
        });

        self.pods.lock().unwrap().push(pod.clone());
        Ok(pod)
    }

    async fn get_secret(&self, _namespace: &str, name: &str) -> slugforge_cluster::Result<Secret> {
        Err(ClusterError::api(
            "get secret",
            format!("secret {name} not found"),
        ))
    }
}

/// 固定バイト列を返すストレージ
pub struct FixedStorage {
    pub bytes: Vec<u8>,
}

#[async_trait]
impl SlugStorage for FixedStorage {
    async fn get_content(&self, _path: &str) -> anyhow::Result<Vec<u8>> {
        Ok(self.bytes.clone())
    }
}

/// ビルド/プッシュ呼び出しを記録するエンジン
#[derive(Default)]
pub struct RecordingEngine {
    pub built: Mutex<Vec<(String, PathBuf)>>,
    pub pushed: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl ImageEngine for RecordingEngine {
    async fn build_image(&self, tag: &str, context_dir: &Path) -> BuildResult<()> {
        self.built
            .lock()
            .unwrap()
            .push((tag.to_string(), context_dir.to_path_buf()));
        Ok(())
    }

    async fn push_image(
        &self,
        image: &str,
        tag: &str,
        _credentials: DockerCredentials,
    ) -> BuildResult<()> {
        self.pushed
            .lock()
            .unwrap()
            .push((image.to_string(), tag.to_string()));
        Ok(())
    }
}

pub fn test_config() -> BuilderConfig {
    BuilderConfig {
        slugrunner_image: "slugrunner:v2".to_string(),
        registry_host: "registry".to_string(),
        registry_port: "5000".to_string(),
        debug: false,
        buildpack_url: None,
        pull_secrets: Vec::new(),
    }
}
