use serde::Deserialize;

use crate::domain::subscriber_email::SubscriberEmail;
use crate::domain::subscription_source::{SubscriptionSource, SubscriptionTag};

const MAX_TAGS: usize = 10;
const MAX_METADATA_BYTES: usize = 4096;

#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub email: SubscriberEmail,
    pub source: SubscriptionSource,
    pub tags: Vec<SubscriptionTag>,
    pub metadata: serde_json::Value,
}

#[derive(Deserialize, Debug)]
pub struct NewSubscriptionBody {
    pub email: String,
    pub source: Option<String>,
    pub tags: Option<Vec<String>>,
    pub metadata: Option<serde_json::Value>,
}

impl TryFrom<NewSubscriptionBody> for NewSubscription {
    type Error = String;

    fn try_from(body: NewSubscriptionBody) -> Result<Self, Self::Error> {
        let email = SubscriberEmail::parse(body.email)?;
        let source = match body.source {
            Some(source) if !source.trim().is_empty() => SubscriptionSource::parse(source)?,
            _ => SubscriptionSource::default(),
        };
        let tags = parse_tags(body.tags.unwrap_or_default())?;
        let metadata = parse_metadata(body.metadata)?;

        Ok(NewSubscription {
            email,
            source,
            tags,
            metadata,
        })
    }
}

fn parse_tags(raw_tags: Vec<String>) -> Result<Vec<SubscriptionTag>, String> {
    let mut tags: Vec<SubscriptionTag> = Vec::with_capacity(raw_tags.len());

    for raw_tag in raw_tags {
        let tag = SubscriptionTag::parse(raw_tag)?;

        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }

    if tags.len() > MAX_TAGS {
        return Err(format!("a subscription cannot have more than {} tags", MAX_TAGS));
    }

    Ok(tags)
}

fn parse_metadata(metadata: Option<serde_json::Value>) -> Result<serde_json::Value, String> {
    let metadata = match metadata {
        None | Some(serde_json::Value::Null) => return Ok(serde_json::json!({})),
        Some(metadata) => metadata,
    };

    if !metadata.is_object() {
        return Err(String::from("metadata must be a JSON object"));
    }

    if metadata.to_string().len() > MAX_METADATA_BYTES {
        return Err(format!(
            "metadata cannot be larger than {} bytes",
            MAX_METADATA_BYTES
        ));
    }

    Ok(metadata)
}
