//! オブジェクトストレージの境界
//!
//! イメージ組み立てパイプラインが必要とするのはアーティファクトの
//! 取得だけです。ストレージプロトコルの実装は外部に委ねます。

use async_trait::async_trait;

/// ビルドアーティファクトの取得元
#[async_trait]
pub trait SlugStorage: Send + Sync {
    /// 指定パスのオブジェクトのバイト列を取得
    async fn get_content(&self, path: &str) -> anyhow::Result<Vec<u8>>;
}
