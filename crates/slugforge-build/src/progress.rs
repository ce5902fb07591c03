//! ビルド進捗の表示
//!
//! gitクライアントへ接続維持のメッセージを流す周期タスクと、
//! 対話端末向けのスピナーを提供します。

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// 一定間隔でメッセージを出力し続ける周期タスク
///
/// [`ProgressTicker::start`] で開始し、所有スコープの全ての出口で
/// [`ProgressTicker::stop`] を呼んで止めます。stopを忘れてdropされた
/// 場合はタスクをabortします。
pub struct ProgressTicker {
    stop: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl ProgressTicker {
    pub fn start(message: impl Into<String>, interval: Duration) -> Self {
        let message = message.into();
        let (stop, mut stopped) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // intervalの初回tickは即時に完了するため読み捨てる
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = stopped.changed() => break,
                    _ = ticker.tick() => println!("{message}"),
                }
            }
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// タスクを停止し、終了を待つ
    pub async fn stop(mut self) {
        let _ = self.stop.send(true);
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// 対話端末向けのビルドスピナー
pub struct BuildProgress {
    progress_bar: ProgressBar,
}

impl BuildProgress {
    pub fn new(app_name: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap(),
        );
        pb.set_message(format!("Building {}...", app_name));

        Self { progress_bar: pb }
    }

    pub fn set_message(&self, msg: &str) {
        self.progress_bar.set_message(msg.to_string());
    }

    pub fn finish_success(&self) {
        self.progress_bar.finish_with_message("Build completed ✓");
    }

    pub fn finish_error(&self, error: &str) {
        self.progress_bar
            .finish_with_message(format!("Build failed: {}", error));
    }
}
