//! ビルドPodのspec構築
//!
//! slugビルダー/ dockerビルダーそれぞれのPod specを決定的に
//! 組み立てます。どちらの種別でも共通の骨格（restart policy Never、
//! heritageラベル、オブジェクトストレージ認証のread-onlyマウント）が
//! 必ず入るよう、共通部分を1つのコンストラクタに寄せています。

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    Container, EnvVar, HostPathVolumeSource, Pod, PodSpec, SecretVolumeSource, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

/// Pod名と相関させるためのラベルキー
pub const HERITAGE_LABEL: &str = "heritage";
/// ビルダー種別の分類ラベルキー
pub const BUILD_TYPE_LABEL: &str = "buildType";

const SLUG_BUILDER_NAME: &str = "slugbuilder";
const DOCKER_BUILDER_NAME: &str = "dockerbuilder";

const TAR_PATH_KEY: &str = "TAR_PATH";
const PUT_PATH_KEY: &str = "PUT_PATH";
const IMG_NAME_KEY: &str = "IMG_NAME";
const BUILDER_STORAGE_KEY: &str = "BUILDER_STORAGE";
const BUILDPACK_URL_KEY: &str = "BUILDPACK_URL";
const DEBUG_KEY: &str = "DEIS_DEBUG";

/// オブジェクトストレージ認証のシークレット名（ボリューム名と兼用）
const OBJECT_STORE_NAME: &str = "objectstorage-keyfile";
/// シークレットをマウントする固定パス
const OBJECT_STORE_MOUNT_PATH: &str = "/var/run/secrets/objectstore/creds";

const DOCKER_SOCKET_NAME: &str = "docker-socket";
/// コンテナエンジンのソケット（dockerビルダーにホストからマウント）
pub const DOCKER_SOCKET_PATH: &str = "/var/run/docker.sock";

/// Pod名の乱数サフィックスの桁数
const NAME_SUFFIX_LEN: usize = 8;

/// イメージのpullポリシー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullPolicy {
    Always,
    IfNotPresent,
    Never,
}

impl PullPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PullPolicy::Always => "Always",
            PullPolicy::IfNotPresent => "IfNotPresent",
            PullPolicy::Never => "Never",
        }
    }
}

/// 両ビルダー共通のパラメータ
#[derive(Debug, Clone)]
pub struct PodParams {
    pub name: String,
    pub namespace: String,
    /// ビルダーコンテナのイメージ
    pub image: String,
    pub pull_policy: PullPolicy,
    /// ビルダーイメージの冗長モードを有効化するか
    pub debug: bool,
    /// 呼び出し側が追加する環境変数（キーは重複禁止）
    pub env: Vec<(String, String)>,
    /// アーティファクトの取得元パス
    pub tar_key: String,
    /// オブジェクトストレージのバックエンド識別子
    pub storage_type: String,
}

/// slugビルダーPodのspecを構築
///
/// `put_key` はビルド成果物（slug）の格納先、`buildpack_url` は
/// 空でない場合のみ `BUILDPACK_URL` として注入されます。
pub fn slug_builder_pod(params: &PodParams, put_key: &str, buildpack_url: Option<&str>) -> Pod {
    let mut pod = build_pod(params, SLUG_BUILDER_NAME);

    add_env(&mut pod, TAR_PATH_KEY, &params.tar_key);
    add_env(&mut pod, PUT_PATH_KEY, put_key);
    add_env(&mut pod, BUILDER_STORAGE_KEY, &params.storage_type);

    if let Some(url) = buildpack_url.filter(|u| !u.is_empty()) {
        add_env(&mut pod, BUILDPACK_URL_KEY, url);
    }

    set_build_type(&mut pod, "slugBuilder");
    pod
}

/// dockerビルダーPodのspecを構築
///
/// クラスタ内からイメージビルドを実行できるよう、ホストの
/// コンテナエンジンソケットをread-writeでマウントします。
pub fn docker_builder_pod(params: &PodParams, image_name: &str) -> Pod {
    let mut pod = build_pod(params, DOCKER_BUILDER_NAME);

    add_env(&mut pod, TAR_PATH_KEY, &params.tar_key);
    add_env(&mut pod, IMG_NAME_KEY, image_name);
    add_env(&mut pod, BUILDER_STORAGE_KEY, &params.storage_type);

    if let Some(spec) = pod.spec.as_mut() {
        spec.containers[0]
            .volume_mounts
            .get_or_insert_with(Vec::new)
            .push(VolumeMount {
                name: DOCKER_SOCKET_NAME.to_string(),
                mount_path: DOCKER_SOCKET_PATH.to_string(),
                ..Default::default()
            });
        spec.volumes.get_or_insert_with(Vec::new).push(Volume {
            name: DOCKER_SOCKET_NAME.to_string(),
            host_path: Some(HostPathVolumeSource {
                path: DOCKER_SOCKET_PATH.to_string(),
                type_: None,
            }),
            ..Default::default()
        });
    }

    set_build_type(&mut pod, "dockerBuilder");
    pod
}

/// slugビルダーPodの一意な名前を生成
pub fn slug_builder_pod_name(app_name: &str, short_sha: &str) -> String {
    format!("slugbuild-{}-{}-{}", app_name, short_sha, name_suffix())
}

/// dockerビルダーPodの一意な名前を生成
pub fn docker_builder_pod_name(app_name: &str, short_sha: &str) -> String {
    format!("dockerbuild-{}-{}-{}", app_name, short_sha, name_suffix())
}

fn name_suffix() -> String {
    let uid = uuid::Uuid::new_v4().simple().to_string();
    uid[..NAME_SUFFIX_LEN].to_string()
}

/// 共通骨格を構築
///
/// 1コンテナ、restart policy Never、`heritage=<Pod名>` ラベル、
/// オブジェクトストレージ認証のread-onlyマウント。debug時は
/// `DEIS_DEBUG=1` を注入します。
fn build_pod(params: &PodParams, container_name: &str) -> Pod {
    let mut labels = BTreeMap::new();
    labels.insert(HERITAGE_LABEL.to_string(), params.name.clone());

    let container = Container {
        name: container_name.to_string(),
        image: Some(params.image.clone()),
        image_pull_policy: Some(params.pull_policy.as_str().to_string()),
        volume_mounts: Some(vec![VolumeMount {
            name: OBJECT_STORE_NAME.to_string(),
            mount_path: OBJECT_STORE_MOUNT_PATH.to_string(),
            read_only: Some(true),
            ..Default::default()
        }]),
        ..Default::default()
    };

    let mut pod = Pod {
        metadata: ObjectMeta {
            name: Some(params.name.clone()),
            namespace: Some(params.namespace.clone()),
            labels: Some(labels),
            ..Default::default()
        },
        spec: Some(PodSpec {
            restart_policy: Some("Never".to_string()),
            containers: vec![container],
            volumes: Some(vec![Volume {
                name: OBJECT_STORE_NAME.to_string(),
                secret: Some(SecretVolumeSource {
                    secret_name: Some(OBJECT_STORE_NAME.to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    };

    for (key, value) in &params.env {
        add_env(&mut pod, key, value);
    }

    if params.debug {
        add_env(&mut pod, DEBUG_KEY, "1");
    }

    pod
}

fn set_build_type(pod: &mut Pod, build_type: &str) {
    pod.metadata
        .labels
        .get_or_insert_with(BTreeMap::new)
        .insert(BUILD_TYPE_LABEL.to_string(), build_type.to_string());
}

fn add_env(pod: &mut Pod, key: &str, value: &str) {
    if let Some(spec) = pod.spec.as_mut() {
        let env = spec.containers[0].env.get_or_insert_with(Vec::new);

        // コンテナ内でキーは一意でなければならない
        debug_assert!(
            env.iter().all(|var| var.name != key),
            "duplicate env key {key}"
        );

        env.push(EnvVar {
            name: key.to_string(),
            value: Some(value.to_string()),
            ..Default::default()
        });
    }
}
