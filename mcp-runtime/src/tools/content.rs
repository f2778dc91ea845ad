//! Posts and pages. Both share one schema, so one set of handlers serves both.

use serde_json::{Map, Value, json};

use super::args::{
    arg_bool, arg_optional_choice, arg_optional_string, arg_optional_string_array,
    arg_optional_text, arg_optional_u64, arg_optional_u64_array, arg_per_page, required_string,
    required_u64,
};
use super::{ToolDefinition, ToolError, list_header};
use crate::util::{html_to_text, to_pretty_json, truncate_chars};
use crate::wordpress::models::Post;
use crate::wordpress::{QueryParams, ResourceKind, WpClient};

const STATUSES: [&str; 6] = ["publish", "future", "draft", "pending", "private", "trash"];
const ORDERS: [&str; 2] = ["asc", "desc"];
const ORDER_BY: [&str; 7] = ["date", "modified", "title", "id", "slug", "author", "menu_order"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Post,
    Page,
}

impl ContentKind {
    fn resource(self) -> ResourceKind {
        match self {
            ContentKind::Post => ResourceKind::Posts,
            ContentKind::Page => ResourceKind::Pages,
        }
    }

    fn noun(self) -> &'static str {
        self.resource().noun()
    }

    fn plural(self) -> &'static str {
        match self {
            ContentKind::Post => "posts",
            ContentKind::Page => "pages",
        }
    }
}

/// Filters for `list_posts` / `list_pages`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListContentParams {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub search: Option<String>,
    pub status: Option<Vec<String>>,
    pub author: Option<Vec<u64>>,
    pub categories: Option<Vec<u64>>,
    pub tags: Option<Vec<u64>>,
    pub parent: Option<u64>,
    pub order: Option<String>,
    pub orderby: Option<String>,
}

impl ListContentParams {
    pub fn from_args(kind: ContentKind, args: &Map<String, Value>) -> Result<Self, ToolError> {
        let is_post = kind == ContentKind::Post;
        Ok(Self {
            page: arg_optional_u64(args, "page")?,
            per_page: arg_per_page(args)?,
            search: arg_optional_string(args, "search")?,
            status: arg_optional_string_array(args, "status")?,
            author: arg_optional_u64_array(args, "author")?,
            categories: if is_post {
                arg_optional_u64_array(args, "categories")?
            } else {
                None
            },
            tags: if is_post {
                arg_optional_u64_array(args, "tags")?
            } else {
                None
            },
            parent: if is_post {
                None
            } else {
                arg_optional_u64(args, "parent")?
            },
            order: arg_optional_choice(args, "order", &ORDERS)?,
            orderby: arg_optional_choice(args, "orderby", &ORDER_BY)?,
        })
    }

    pub fn to_query(&self) -> QueryParams {
        QueryParams::new()
            .opt("page", self.page)
            .opt("per_page", self.per_page)
            .opt("search", self.search.as_ref())
            .opt("status", self.status.as_ref())
            .opt("author", self.author.as_ref())
            .opt("categories", self.categories.as_ref())
            .opt("tags", self.tags.as_ref())
            .opt("parent", self.parent)
            .opt("order", self.order.as_ref())
            .opt("orderby", self.orderby.as_ref())
    }
}

/// Writable fields for create/update. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentFields {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub status: Option<String>,
    pub slug: Option<String>,
    pub date: Option<String>,
    pub author: Option<u64>,
    pub featured_media: Option<u64>,
    pub categories: Option<Vec<u64>>,
    pub tags: Option<Vec<u64>>,
    pub parent: Option<u64>,
    pub menu_order: Option<u64>,
}

impl ContentFields {
    pub fn from_args(kind: ContentKind, args: &Map<String, Value>) -> Result<Self, ToolError> {
        let is_post = kind == ContentKind::Post;
        let mut fields = Self {
            title: arg_optional_text(args, "title")?,
            content: arg_optional_text(args, "content")?,
            excerpt: arg_optional_text(args, "excerpt")?,
            status: arg_optional_choice(args, "status", &STATUSES)?,
            slug: arg_optional_string(args, "slug")?,
            date: arg_optional_string(args, "date")?,
            author: arg_optional_u64(args, "author")?,
            featured_media: arg_optional_u64(args, "featured_media")?,
            ..Default::default()
        };
        if is_post {
            fields.categories = arg_optional_u64_array(args, "categories")?;
            fields.tags = arg_optional_u64_array(args, "tags")?;
        } else {
            fields.parent = arg_optional_u64(args, "parent")?;
            fields.menu_order = arg_optional_u64(args, "menu_order")?;
        }
        Ok(fields)
    }

    pub fn is_empty(&self) -> bool {
        self.to_body().is_empty()
    }

    pub fn to_body(&self) -> Map<String, Value> {
        let mut body = Map::new();
        let mut put = |key: &str, value: Option<Value>| {
            if let Some(value) = value {
                body.insert(key.to_string(), value);
            }
        };
        put("title", self.title.clone().map(Value::from));
        put("content", self.content.clone().map(Value::from));
        put("excerpt", self.excerpt.clone().map(Value::from));
        put("status", self.status.clone().map(Value::from));
        put("slug", self.slug.clone().map(Value::from));
        put("date", self.date.clone().map(Value::from));
        put("author", self.author.map(Value::from));
        put("featured_media", self.featured_media.map(Value::from));
        put("categories", self.categories.clone().map(Value::from));
        put("tags", self.tags.clone().map(Value::from));
        put("parent", self.parent.map(Value::from));
        put("menu_order", self.menu_order.map(Value::from));
        body
    }
}

fn summary_line(post: &Post) -> String {
    let title = html_to_text(&post.title.rendered);
    let title = if title.is_empty() { "(no title)".to_string() } else { title };
    let mut line = format!("#{} [{}] {}", post.id, post.status, title);
    if let Some(date) = &post.date {
        line.push_str(&format!(" ({date})"));
    }
    if !post.link.is_empty() {
        line.push_str(&format!("\n   {}", post.link));
    }
    let excerpt = html_to_text(&post.excerpt.rendered);
    if !excerpt.is_empty() {
        line.push_str(&format!("\n   {}", truncate_chars(&excerpt, 160)));
    }
    line
}

pub async fn list(
    client: &WpClient,
    kind: ContentKind,
    args: &Map<String, Value>,
) -> Result<String, ToolError> {
    let params = ListContentParams::from_args(kind, args)?;
    let result = client
        .list::<Post>(kind.resource(), &params.to_query())
        .await?;
    let mut lines = vec![list_header(&result, kind.plural(), params.page)];
    lines.extend(result.items.iter().map(summary_line));
    Ok(lines.join("\n"))
}

pub async fn get(
    client: &WpClient,
    kind: ContentKind,
    args: &Map<String, Value>,
) -> Result<String, ToolError> {
    let id = required_u64(args, "id")?;
    let query = QueryParams::new().opt("context", arg_optional_choice(args, "context", &["view", "edit"])?);
    let item: Value = client.get(kind.resource(), id, &query).await?;
    Ok(to_pretty_json(&item))
}

pub async fn create(
    client: &WpClient,
    kind: ContentKind,
    args: &Map<String, Value>,
) -> Result<String, ToolError> {
    required_string(args, "title")?;
    let fields = ContentFields::from_args(kind, args)?;
    let created: Post = client
        .create(kind.resource(), Value::Object(fields.to_body()))
        .await?;
    Ok(format!(
        "Created {} {}\n{}",
        kind.noun(),
        summary_line(&created),
        json!({ "id": created.id, "status": created.status, "link": created.link })
    ))
}

pub async fn update(
    client: &WpClient,
    kind: ContentKind,
    args: &Map<String, Value>,
) -> Result<String, ToolError> {
    let id = required_u64(args, "id")?;
    let fields = ContentFields::from_args(kind, args)?;
    if fields.is_empty() {
        return Err(ToolError::no_fields_to_update());
    }
    let updated: Post = client
        .update(kind.resource(), id, Value::Object(fields.to_body()))
        .await?;
    Ok(format!("Updated {} {}", kind.noun(), summary_line(&updated)))
}

pub async fn delete(
    client: &WpClient,
    kind: ContentKind,
    args: &Map<String, Value>,
) -> Result<String, ToolError> {
    let id = required_u64(args, "id")?;
    let force = arg_bool(args, "force", false)?;
    client.delete(kind.resource(), id, force).await?;
    Ok(if force {
        format!("Permanently deleted {} #{id}.", kind.noun())
    } else {
        format!("Moved {} #{id} to the trash.", kind.noun())
    })
}

pub fn definitions() -> Vec<ToolDefinition> {
    let mut tools = Vec::new();
    for kind in [ContentKind::Post, ContentKind::Page] {
        let (list_name, get_name, create_name, update_name, delete_name) = match kind {
            ContentKind::Post => ("list_posts", "get_post", "create_post", "update_post", "delete_post"),
            ContentKind::Page => ("list_pages", "get_page", "create_page", "update_page", "delete_page"),
        };
        let mut list_props = json!({
            "page": { "type": "integer", "minimum": 1 },
            "per_page": { "type": "integer", "minimum": 1, "maximum": 100 },
            "search": { "type": "string" },
            "status": { "type": "array", "items": { "type": "string", "enum": STATUSES } },
            "author": { "type": "array", "items": { "type": "integer" } },
            "order": { "type": "string", "enum": ORDERS },
            "orderby": { "type": "string", "enum": ORDER_BY }
        });
        let mut write_props = json!({
            "title": { "type": "string" },
            "content": { "type": "string", "description": "HTML or block markup" },
            "excerpt": { "type": "string" },
            "status": { "type": "string", "enum": STATUSES },
            "slug": { "type": "string" },
            "date": { "type": "string", "description": "ISO 8601 publish date (site timezone)" },
            "author": { "type": "integer" },
            "featured_media": { "type": "integer" }
        });
        match kind {
            ContentKind::Post => {
                for props in [&mut list_props, &mut write_props] {
                    props["categories"] = json!({ "type": "array", "items": { "type": "integer" } });
                    props["tags"] = json!({ "type": "array", "items": { "type": "integer" } });
                }
            }
            ContentKind::Page => {
                list_props["parent"] = json!({ "type": "integer" });
                write_props["parent"] = json!({ "type": "integer" });
                write_props["menu_order"] = json!({ "type": "integer" });
            }
        }
        let mut update_props = write_props.clone();
        update_props["id"] = json!({ "type": "integer" });

        let (list_desc, get_desc, create_desc, update_desc, delete_desc) = match kind {
            ContentKind::Post => (
                "List posts with optional search, status, author, category and tag filters.",
                "Get a single post by id (full JSON).",
                "Create a post. Defaults to draft unless status is given.",
                "Update fields of an existing post.",
                "Delete a post. Moves to trash unless force=true.",
            ),
            ContentKind::Page => (
                "List pages with optional search, status, author and parent filters.",
                "Get a single page by id (full JSON).",
                "Create a page. Defaults to draft unless status is given.",
                "Update fields of an existing page.",
                "Delete a page. Moves to trash unless force=true.",
            ),
        };

        tools.push(ToolDefinition {
            name: list_name,
            description: list_desc,
            input_schema: json!({ "type": "object", "properties": list_props }),
        });
        tools.push(ToolDefinition {
            name: get_name,
            description: get_desc,
            input_schema: json!({
                "type": "object",
                "properties": {
                    "id": { "type": "integer" },
                    "context": { "type": "string", "enum": ["view", "edit"] }
                },
                "required": ["id"]
            }),
        });
        tools.push(ToolDefinition {
            name: create_name,
            description: create_desc,
            input_schema: json!({ "type": "object", "properties": write_props, "required": ["title"] }),
        });
        tools.push(ToolDefinition {
            name: update_name,
            description: update_desc,
            input_schema: json!({ "type": "object", "properties": update_props, "required": ["id"] }),
        });
        tools.push(ToolDefinition {
            name: delete_name,
            description: delete_desc,
            input_schema: json!({
                "type": "object",
                "properties": {
                    "id": { "type": "integer" },
                    "force": { "type": "boolean", "default": false }
                },
                "required": ["id"]
            }),
        });
    }
    tools
}
