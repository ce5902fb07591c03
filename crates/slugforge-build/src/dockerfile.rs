//! ビルド記述子のレンダリング
//!
//! slugをベースランタイムイメージに載せるための最小のDockerfileを
//! 生成します。同じ入力からは必ず同じバイト列が得られます。

use tera::{Context, Tera};

use crate::error::BuildResult;

const APP_DOCKERFILE: &str = "FROM {{ base_image }}\n\nENV GIT_SHA {{ git_sha }}\n\n";

/// ビルド記述子を生成
pub fn render_dockerfile(base_image: &str, git_sha: &str) -> BuildResult<String> {
    let mut context = Context::new();
    context.insert("base_image", base_image);
    context.insert("git_sha", git_sha);

    Ok(Tera::one_off(APP_DOCKERFILE, &context, false)?)
}
