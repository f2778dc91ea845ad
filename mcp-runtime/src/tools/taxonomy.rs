use serde_json::{Map, Value, json};

use super::args::{
    arg_bool, arg_optional_choice, arg_optional_string, arg_optional_text, arg_optional_u64,
    arg_per_page, required_string,
};
use super::{ToolDefinition, ToolError, list_header};
use crate::wordpress::models::Term;
use crate::wordpress::{QueryParams, ResourceKind, WpClient};

const ORDER_BY: [&str; 5] = ["id", "name", "slug", "count", "term_group"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Taxonomy {
    Category,
    Tag,
}

impl Taxonomy {
    fn resource(self) -> ResourceKind {
        match self {
            Taxonomy::Category => ResourceKind::Categories,
            Taxonomy::Tag => ResourceKind::Tags,
        }
    }

    fn plural(self) -> &'static str {
        match self {
            Taxonomy::Category => "categories",
            Taxonomy::Tag => "tags",
        }
    }

    /// Tags are flat; only categories have parents.
    fn hierarchical(self) -> bool {
        matches!(self, Taxonomy::Category)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListTermsParams {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub search: Option<String>,
    pub hide_empty: Option<bool>,
    pub parent: Option<u64>,
    pub orderby: Option<String>,
}

impl ListTermsParams {
    pub fn from_args(taxonomy: Taxonomy, args: &Map<String, Value>) -> Result<Self, ToolError> {
        Ok(Self {
            page: arg_optional_u64(args, "page")?,
            per_page: arg_per_page(args)?,
            search: arg_optional_string(args, "search")?,
            hide_empty: arg_bool(args, "hide_empty", false)?.then_some(true),
            parent: if taxonomy.hierarchical() {
                arg_optional_u64(args, "parent")?
            } else {
                None
            },
            orderby: arg_optional_choice(args, "orderby", &ORDER_BY)?,
        })
    }

    pub fn to_query(&self) -> QueryParams {
        QueryParams::new()
            .opt("page", self.page)
            .opt("per_page", self.per_page)
            .opt("search", self.search.as_ref())
            .opt("hide_empty", self.hide_empty)
            .opt("parent", self.parent)
            .opt("orderby", self.orderby.as_ref())
    }
}

fn summary_line(term: &Term) -> String {
    let mut line = format!("#{} {} ({}) - {} items", term.id, term.name, term.slug, term.count);
    if term.parent != 0 {
        line.push_str(&format!(", parent #{}", term.parent));
    }
    line
}

pub async fn list(
    client: &WpClient,
    taxonomy: Taxonomy,
    args: &Map<String, Value>,
) -> Result<String, ToolError> {
    let params = ListTermsParams::from_args(taxonomy, args)?;
    let result = client
        .list::<Term>(taxonomy.resource(), &params.to_query())
        .await?;
    let mut lines = vec![list_header(&result, taxonomy.plural(), params.page)];
    lines.extend(result.items.iter().map(summary_line));
    Ok(lines.join("\n"))
}

pub async fn create(
    client: &WpClient,
    taxonomy: Taxonomy,
    args: &Map<String, Value>,
) -> Result<String, ToolError> {
    let mut body = Map::new();
    body.insert("name".into(), required_string(args, "name")?.into());
    if let Some(slug) = arg_optional_string(args, "slug")? {
        body.insert("slug".into(), slug.into());
    }
    if let Some(description) = arg_optional_text(args, "description")? {
        body.insert("description".into(), description.into());
    }
    if taxonomy.hierarchical() {
        if let Some(parent) = arg_optional_u64(args, "parent")? {
            body.insert("parent".into(), parent.into());
        }
    }
    let term: Term = client
        .create(taxonomy.resource(), Value::Object(body))
        .await?;
    Ok(format!(
        "Created {} {}",
        taxonomy.resource().noun(),
        summary_line(&term)
    ))
}

pub fn definitions() -> Vec<ToolDefinition> {
    let list_props = |hierarchical: bool| {
        let mut props = json!({
            "page": { "type": "integer", "minimum": 1 },
            "per_page": { "type": "integer", "minimum": 1, "maximum": 100 },
            "search": { "type": "string" },
            "hide_empty": { "type": "boolean", "default": false },
            "orderby": { "type": "string", "enum": ORDER_BY }
        });
        if hierarchical {
            props["parent"] = json!({ "type": "integer" });
        }
        props
    };
    let create_props = |hierarchical: bool| {
        let mut props = json!({
            "name": { "type": "string" },
            "slug": { "type": "string" },
            "description": { "type": "string" }
        });
        if hierarchical {
            props["parent"] = json!({ "type": "integer" });
        }
        props
    };

    vec![
        ToolDefinition {
            name: "list_categories",
            description: "List post categories with post counts.",
            input_schema: json!({ "type": "object", "properties": list_props(true) }),
        },
        ToolDefinition {
            name: "create_category",
            description: "Create a category, optionally under a parent category.",
            input_schema: json!({
                "type": "object",
                "properties": create_props(true),
                "required": ["name"]
            }),
        },
        ToolDefinition {
            name: "list_tags",
            description: "List post tags with post counts.",
            input_schema: json!({ "type": "object", "properties": list_props(false) }),
        },
        ToolDefinition {
            name: "create_tag",
            description: "Create a tag.",
            input_schema: json!({
                "type": "object",
                "properties": create_props(false),
                "required": ["name"]
            }),
        },
    ]
}
