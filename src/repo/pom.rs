//! Dependency version rewriting for `pom.xml` files

use regex::{NoExpand, Regex};
use std::sync::LazyLock;

static VERSION_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<version>.*</version>").expect("valid version regex"));

/// Rewrite the version of one dependency in a pom.
///
/// The dependency is recognised by a `<groupId>` line immediately followed by
/// its `<artifactId>` line; the version tag is expected on the line after
/// that. Returns the new content, or `None` when nothing changed.
pub fn bump_version(content: &str, group_id: &str, artifact_id: &str, version: &str) -> Option<String> {
    let group_tag = format!("<groupId>{}</groupId>", group_id);
    let artifact_tag = format!("<artifactId>{}</artifactId>", artifact_id);
    let version_tag = format!("<version>{}</version>", version);

    let mut lines: Vec<String> = content.split_inclusive('\n').map(str::to_string).collect();
    let mut changed = false;

    for i in 0..lines.len() {
        if i + 2 >= lines.len() {
            break;
        }
        if !lines[i].contains(&group_tag) || !lines[i + 1].contains(&artifact_tag) {
            continue;
        }

        let updated = VERSION_TAG
            .replace(&lines[i + 2], NoExpand(&version_tag))
            .into_owned();
        if updated != lines[i + 2] {
            lines[i + 2] = updated;
            changed = true;
        }
    }

    changed.then(|| lines.concat())
}
