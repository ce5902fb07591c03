//! Pod状態の同期待ち
//!
//! キャッシュを一定間隔でポーリングし、フェーズ述語が満たされるまで
//! 呼び出し側をブロックします。クラスタAPIには触れないため、多数の
//! 待機を並行実行してもAPI負荷は増えません。

use std::time::Duration;

use tokio::time::{Instant, sleep};

use crate::error::{ClusterError, Result};
use crate::podspec::HERITAGE_LABEL;
use crate::watcher::{BuildPodWatcher, PodPhase, PodRecord};

/// 述語の判定結果
#[derive(Debug)]
pub enum PodCheck {
    /// まだ条件を満たしていない（次の周期で再判定）
    NotReady,
    /// 条件を満たした
    Ready,
    /// 回復不能。待機を打ち切り理由を返す
    Fatal(String),
}

/// Podが起動した（running / succeeded / failed に到達した）ことを待つ
///
/// failedは致命扱いで、Podの観測内容を添えてエラーを返します。
/// 「起動したか」と「終わったか」では failed の意味が異なるため、
/// 完了待ちには [`wait_for_pod_end`] を使ってください。
pub async fn wait_for_pod(
    watcher: &BuildPodWatcher,
    pod_name: &str,
    interval: Duration,
    timeout: Duration,
) -> Result<()> {
    let condition = |record: &PodRecord| match record.phase {
        PodPhase::Running | PodPhase::Succeeded => PodCheck::Ready,
        PodPhase::Failed => PodCheck::Fatal(format!("{record:#?}")),
        _ => PodCheck::NotReady,
    };

    wait_for_pod_condition(watcher, pod_name, condition, interval, timeout).await?;
    Ok(())
}

/// Podが終了した（succeeded / failed に到達した）ことを待つ
///
/// failedもここでは条件成立であり、どちらの終端に達したかは戻り値の
/// フェーズで呼び出し側が判定します。
pub async fn wait_for_pod_end(
    watcher: &BuildPodWatcher,
    pod_name: &str,
    interval: Duration,
    timeout: Duration,
) -> Result<PodPhase> {
    let condition = |record: &PodRecord| match record.phase {
        PodPhase::Succeeded | PodPhase::Failed => PodCheck::Ready,
        _ => PodCheck::NotReady,
    };

    wait_for_pod_condition(watcher, pod_name, condition, interval, timeout).await
}

/// 任意の述語でPodを待つ
///
/// 最初の判定は即時に行い、以後 `interval` ごとにキャッシュを再読み
/// します。キャッシュに該当Podがまだ無い場合は「未達」として扱います
/// （watchがまだ拾っていないだけかもしれない）。期限超過は
/// [`ClusterError::DeadlineExceeded`] として、Pod失敗とは区別して
/// 返します。
pub async fn wait_for_pod_condition<F>(
    watcher: &BuildPodWatcher,
    pod_name: &str,
    condition: F,
    interval: Duration,
    timeout: Duration,
) -> Result<PodPhase>
where
    F: Fn(&PodRecord) -> PodCheck,
{
    let started = Instant::now();

    loop {
        let records = watcher.pods_by_label(HERITAGE_LABEL, pod_name);

        if records.len() > 1 {
            // heritage衝突。先頭を正とみなし、残りは記録だけ残す
            tracing::warn!(
                pod = %pod_name,
                matches = records.len(),
                "Multiple pods share one heritage label, using the first"
            );
        }

        if let Some(record) = records.first() {
            match condition(record) {
                PodCheck::Ready => return Ok(record.phase),
                PodCheck::Fatal(detail) => {
                    return Err(ClusterError::PodFailed {
                        pod: pod_name.to_string(),
                        detail,
                    });
                }
                PodCheck::NotReady => {}
            }
        }

        if started.elapsed() >= timeout {
            return Err(ClusterError::DeadlineExceeded {
                pod: pod_name.to_string(),
                waited: timeout,
            });
        }

        sleep(interval).await;
    }
}
