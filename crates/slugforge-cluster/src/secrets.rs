//! pullシークレットの取得
//!
//! 設定に列挙された名前のシークレットをクラスタから引き、dockercfg型の
//! ものだけを認証解決に回します。

use k8s_openapi::api::core::v1::Secret;

use crate::client::ClusterClient;

/// dockercfg型シークレットのtype値
pub const DOCKERCFG_SECRET_TYPE: &str = "kubernetes.io/dockercfg";

/// 名前で指定されたdockercfg型シークレットを集める
///
/// 見つからない名前や型違いはスキップするだけで、失敗にはしません。
/// 返る順序は `names` の順序のままです（認証解決は先勝ちのため）。
pub async fn image_pull_secrets(
    client: &dyn ClusterClient,
    namespace: &str,
    names: &[String],
) -> Vec<Secret> {
    let mut secrets = Vec::new();

    for name in names {
        match client.get_secret(namespace, name).await {
            Ok(secret) => {
                if secret.type_.as_deref() == Some(DOCKERCFG_SECRET_TYPE) {
                    secrets.push(secret);
                } else {
                    tracing::debug!(secret = %name, "Skipping non-dockercfg secret");
                }
            }
            Err(e) => {
                tracing::warn!(secret = %name, error = %e, "Failed to fetch pull secret");
            }
        }
    }

    secrets
}
