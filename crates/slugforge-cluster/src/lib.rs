//! slugforge のクラスタ統合
//!
//! ビルドPodのspec構築、Pod状態のローカルキャッシュ、フェーズ述語に
//! よる同期待ちを提供します。クラスタAPIへのアクセスは
//! [`ClusterClient`] の実装に委ねます。

pub mod client;
pub mod error;
pub mod podspec;
pub mod secrets;
pub mod waiter;
pub mod watcher;

#[cfg(test)]
pub(crate) mod testutil;

pub use client::{ClusterClient, PodEvent, PodEventStream};
pub use error::{ClusterError, Result};
pub use podspec::{
    BUILD_TYPE_LABEL, DOCKER_SOCKET_PATH, HERITAGE_LABEL, PodParams, PullPolicy,
    docker_builder_pod, docker_builder_pod_name, slug_builder_pod, slug_builder_pod_name,
};
pub use secrets::{DOCKERCFG_SECRET_TYPE, image_pull_secrets};
pub use waiter::{PodCheck, wait_for_pod, wait_for_pod_condition, wait_for_pod_end};
pub use watcher::{BuildPodWatcher, PodPhase, PodRecord};
