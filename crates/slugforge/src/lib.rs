//! slugforge — git-push-to-deployのビルドオーケストレーション
//!
//! プッシュされたコミットからビルドPodを起動し、Podの終了を待って、
//! 成果物をレジストリ公開済みのコンテナイメージに変換します。
//!
//! - Pod spec構築とPod監視: [`slugforge_cluster`]
//! - イメージ組み立てとレジストリ認証: [`slugforge_build`]
//! - 設定: [`slugforge_config`]
//!
//! 一連の流れは [`driver::run_build`] が束ねます。

pub mod driver;

pub use driver::{BuildRunError, BuildTimeouts, run_build};

pub use slugforge_build as build;
pub use slugforge_cluster as cluster;
pub use slugforge_config as config;
pub use slugforge_core as model;
