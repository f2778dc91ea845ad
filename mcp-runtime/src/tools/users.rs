use serde_json::{Map, Value, json};

use super::args::{
    arg_optional_choice, arg_optional_string, arg_optional_string_array, arg_optional_u64,
    arg_per_page, required_u64,
};
use super::{ToolDefinition, ToolError, list_header};
use crate::util::to_pretty_json;
use crate::wordpress::models::User;
use crate::wordpress::{QueryParams, ResourceKind, WpClient};

const ROLES: [&str; 5] = ["administrator", "editor", "author", "contributor", "subscriber"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListUsersParams {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub search: Option<String>,
    pub roles: Option<Vec<String>>,
    pub orderby: Option<String>,
}

impl ListUsersParams {
    pub fn from_args(args: &Map<String, Value>) -> Result<Self, ToolError> {
        Ok(Self {
            page: arg_optional_u64(args, "page")?,
            per_page: arg_per_page(args)?,
            search: arg_optional_string(args, "search")?,
            roles: arg_optional_string_array(args, "roles")?,
            orderby: arg_optional_choice(args, "orderby", &["id", "name", "registered_date", "email"])?,
        })
    }

    pub fn to_query(&self) -> QueryParams {
        QueryParams::new()
            .opt("page", self.page)
            .opt("per_page", self.per_page)
            .opt("search", self.search.as_ref())
            .opt("roles", self.roles.as_ref())
            .opt("orderby", self.orderby.as_ref())
    }
}

fn summary_line(user: &User) -> String {
    let mut line = format!("#{} {} (@{})", user.id, user.name, user.slug);
    if !user.roles.is_empty() {
        line.push_str(&format!(" [{}]", user.roles.join(", ")));
    }
    if let Some(email) = &user.email {
        line.push_str(&format!(" <{email}>"));
    }
    line
}

pub async fn list(client: &WpClient, args: &Map<String, Value>) -> Result<String, ToolError> {
    let params = ListUsersParams::from_args(args)?;
    let result = client
        .list::<User>(ResourceKind::Users, &params.to_query())
        .await?;
    let mut lines = vec![list_header(&result, "users", params.page)];
    lines.extend(result.items.iter().map(summary_line));
    Ok(lines.join("\n"))
}

pub async fn get(client: &WpClient, args: &Map<String, Value>) -> Result<String, ToolError> {
    let id = required_u64(args, "id")?;
    let user: Value = client
        .get(ResourceKind::Users, id, &QueryParams::new())
        .await?;
    Ok(to_pretty_json(&user))
}

/// The account behind the configured application password.
pub async fn current(client: &WpClient) -> Result<String, ToolError> {
    let user: User = client.current_user().await?;
    Ok(format!("Authenticated as {}", summary_line(&user)))
}

pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "list_users",
            description: "List site users, optionally filtered by role or search text.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "page": { "type": "integer", "minimum": 1 },
                    "per_page": { "type": "integer", "minimum": 1, "maximum": 100 },
                    "search": { "type": "string" },
                    "roles": { "type": "array", "items": { "type": "string", "enum": ROLES } },
                    "orderby": { "type": "string", "enum": ["id", "name", "registered_date", "email"] }
                }
            }),
        },
        ToolDefinition {
            name: "get_user",
            description: "Get a single user by id (full JSON).",
            input_schema: json!({
                "type": "object",
                "properties": { "id": { "type": "integer" } },
                "required": ["id"]
            }),
        },
        ToolDefinition {
            name: "get_current_user",
            description: "Show which WordPress account the gateway is authenticated as.",
            input_schema: json!({ "type": "object", "properties": {} }),
        },
    ]
}

#[cfg(test)]
mod tests {
    use axum::Router;
    use axum::extract::RawQuery;
    use axum::routing::get as get_route;

    use super::*;
    use crate::wordpress::client::tests::{spawn_site, test_client};

    #[test]
    fn roles_are_joined_into_one_value() {
        let args = json!({ "roles": ["editor", "author"] });
        let params = ListUsersParams::from_args(args.as_object().unwrap()).unwrap();
        assert_eq!(params.to_query().encode(), "?roles=editor,author");
    }

    #[tokio::test]
    async fn current_user_uses_edit_context() {
        let router = Router::new().route(
            "/wp-json/wp/v2/users/me",
            get_route(|RawQuery(query): RawQuery| async move {
                assert_eq!(query.as_deref(), Some("context=edit"));
                axum::Json(json!({
                    "id": 1,
                    "name": "Site Admin",
                    "slug": "admin",
                    "email": "admin@example.com",
                    "roles": ["administrator"]
                }))
            }),
        );
        let client = test_client(&spawn_site(router).await);

        let text = current(&client).await.unwrap();
        assert_eq!(
            text,
            "Authenticated as #1 Site Admin (@admin) [administrator] <admin@example.com>"
        );
    }
}
