use unicode_segmentation::UnicodeSegmentation;

const DEFAULT_SOURCE: &str = "website";
const MAX_SOURCE_LENGTH: usize = 64;
const MAX_TAG_LENGTH: usize = 32;
const ALLOWED_SYMBOLS: [char; 4] = ['-', '_', '.', ':'];

/// Where a signup came from, e.g. `homepage` or `countdown:footer`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SubscriptionSource(String);

/// Free-form label attached to a subscription, e.g. `beta` or `pc`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SubscriptionTag(String);

fn parse_label(kind: &str, value: &str, max_length: usize) -> Result<String, String> {
    let value = value.trim();
    let is_empty = value.is_empty();
    let is_too_long = value.graphemes(true).count() > max_length;
    let contains_forbidden_chars = value
        .chars()
        .any(|char| !(char.is_ascii_alphanumeric() || ALLOWED_SYMBOLS.contains(&char)));

    if is_empty || is_too_long || contains_forbidden_chars {
        return Err(format!("{} is not a valid subscription {}", value, kind));
    }

    Ok(value.to_string())
}

impl SubscriptionSource {
    pub fn parse(source: String) -> Result<SubscriptionSource, String> {
        parse_label("source", &source, MAX_SOURCE_LENGTH).map(Self)
    }
}

impl Default for SubscriptionSource {
    fn default() -> Self {
        Self(String::from(DEFAULT_SOURCE))
    }
}

impl AsRef<str> for SubscriptionSource {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl SubscriptionTag {
    pub fn parse(tag: String) -> Result<SubscriptionTag, String> {
        parse_label("tag", &tag, MAX_TAG_LENGTH).map(Self)
    }
}

impl AsRef<str> for SubscriptionTag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
