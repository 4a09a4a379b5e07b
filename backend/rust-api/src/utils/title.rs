use lazy_static::lazy_static;
use regex::Regex;

pub const MAX_TITLE_LENGTH: usize = 60;

lazy_static! {
    static ref MARKUP_TAG: Regex = Regex::new(r"<[^>]+>").unwrap();
}

/// Plain-text title derived from a prompt that may contain markup.
pub fn create_title(raw: &str, max_length: usize) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let title = MARKUP_TAG.replace_all(raw, "");
    if title.chars().count() > max_length {
        let kept: String = title.chars().take(max_length.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        title.into_owned()
    }
}
