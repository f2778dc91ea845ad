//! The slice of WordPress resource schemas the tool surface reads.
//!
//! Every field defaults so partial `_fields` responses and older WordPress
//! versions still decode.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rendered {
    pub rendered: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

/// Posts and pages share this shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Post {
    pub id: u64,
    pub date: Option<String>,
    pub modified: Option<String>,
    pub slug: String,
    pub status: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub link: String,
    pub title: Rendered,
    pub excerpt: Rendered,
    pub author: u64,
    pub parent: u64,
    pub featured_media: u64,
    pub categories: Vec<u64>,
    pub tags: Vec<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Comment {
    pub id: u64,
    pub post: u64,
    pub parent: u64,
    pub author_name: String,
    pub date: Option<String>,
    pub status: String,
    pub content: Rendered,
    pub link: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaItem {
    pub id: u64,
    pub date: Option<String>,
    pub slug: String,
    pub title: Rendered,
    pub media_type: String,
    pub mime_type: String,
    pub source_url: String,
    pub alt_text: String,
    pub post: Option<u64>,
}

/// Category or tag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Term {
    pub id: u64,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub count: u64,
    pub taxonomy: String,
    pub parent: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub slug: String,
    pub link: String,
    pub description: String,
    pub email: Option<String>,
    pub roles: Vec<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn post_decodes_with_missing_fields() {
        let post: Post = serde_json::from_value(json!({
            "id": 5,
            "status": "draft",
            "type": "post",
            "title": { "rendered": "Hello" }
        }))
        .unwrap();
        assert_eq!(post.id, 5);
        assert_eq!(post.kind, "post");
        assert_eq!(post.title.rendered, "Hello");
        assert!(post.categories.is_empty());
    }

    #[test]
    fn media_post_may_be_null() {
        let media: MediaItem = serde_json::from_value(json!({
            "id": 3,
            "post": null,
            "mime_type": "image/png"
        }))
        .unwrap();
        assert_eq!(media.post, None);
        assert_eq!(media.mime_type, "image/png");
    }
}
