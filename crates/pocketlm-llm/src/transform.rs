//! Post-processing of final generated text.

use std::sync::LazyLock;

use regex::Regex;

static THINK_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>(.*?)</think>").unwrap());

/// Rewrites `<think>...</think>` reasoning spans as `<blockquote>` spans,
/// preserving the inner text, so Markdown renderers show the model's
/// reasoning as a quoted block.
///
/// Must be applied to the complete final text, never per fragment: a
/// delimiter can be split across fragment boundaries.
pub fn rewrite_reasoning(text: &str) -> String {
    THINK_TAG
        .replace_all(text, "<blockquote>$1</blockquote>")
        .into_owned()
}
