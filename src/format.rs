//! MarkdownV2 rendering of the user list.

use std::sync::LazyLock;

use regex::Regex;

use crate::teamspeak::UserList;

static MARKDOWN_V2_RESERVED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[_*\[\]()~`>#+\-=|{}.!\\]").expect("static regex")
});

/// Escape text for Telegram MarkdownV2.
pub fn escape_markdown_v2(text: &str) -> String {
    MARKDOWN_V2_RESERVED.replace_all(text, r"\$0").into_owned()
}

/// Render `"{active}\+_{away}_: a, b, _c_"`: counts, active names, then away
/// names in italics.
pub fn format_user_list(list: &UserList) -> String {
    let names: Vec<String> = list
        .active
        .iter()
        .map(|name| escape_markdown_v2(name))
        .chain(list.away.iter().map(|name| format!("_{}_", escape_markdown_v2(name))))
        .collect();

    format!(
        "{}\\+_{}_: {}",
        list.active.len(),
        list.away.len(),
        names.join(", ")
    )
}
