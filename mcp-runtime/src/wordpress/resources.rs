use serde::de::DeserializeOwned;
use serde_json::Value;

use super::client::{ApiRequest, MediaUpload, WpClient};
use super::error::WpError;
use super::pagination::ListResult;
use super::query::QueryParams;

/// Collection endpoints exposed by the tool surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Posts,
    Pages,
    Comments,
    Media,
    Categories,
    Tags,
    Users,
}

impl ResourceKind {
    pub fn path(self) -> &'static str {
        match self {
            ResourceKind::Posts => "/posts",
            ResourceKind::Pages => "/pages",
            ResourceKind::Comments => "/comments",
            ResourceKind::Media => "/media",
            ResourceKind::Categories => "/categories",
            ResourceKind::Tags => "/tags",
            ResourceKind::Users => "/users",
        }
    }

    /// Singular noun for messages ("post", "media item", ...).
    pub fn noun(self) -> &'static str {
        match self {
            ResourceKind::Posts => "post",
            ResourceKind::Pages => "page",
            ResourceKind::Comments => "comment",
            ResourceKind::Media => "media item",
            ResourceKind::Categories => "category",
            ResourceKind::Tags => "tag",
            ResourceKind::Users => "user",
        }
    }

    /// Media has no trash: deletes are only accepted with `force=true`.
    pub fn requires_force_delete(self) -> bool {
        matches!(self, ResourceKind::Media)
    }

    fn item_path(self, id: u64) -> String {
        format!("{}/{id}", self.path())
    }
}

const SETTINGS_PATH: &str = "/settings";
const CURRENT_USER_PATH: &str = "/users/me";

fn decode<T: DeserializeOwned>(body: Value) -> Result<T, WpError> {
    serde_json::from_value(body).map_err(|e| WpError::Decode {
        status: 200,
        message: e.to_string(),
    })
}

impl WpClient {
    pub async fn list<T: DeserializeOwned>(
        &self,
        kind: ResourceKind,
        query: &QueryParams,
    ) -> Result<ListResult<T>, WpError> {
        let target = format!("{}{}", kind.path(), query.encode());
        let response = self.execute_with_metadata(ApiRequest::get(target)).await?;
        let items: Vec<T> = decode(response.body)?;
        Ok(ListResult::new(items, response.page))
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        kind: ResourceKind,
        id: u64,
        query: &QueryParams,
    ) -> Result<T, WpError> {
        let target = format!("{}{}", kind.item_path(id), query.encode());
        decode(self.execute(ApiRequest::get(target)).await?)
    }

    pub async fn create<T: DeserializeOwned>(
        &self,
        kind: ResourceKind,
        body: Value,
    ) -> Result<T, WpError> {
        decode(self.execute(ApiRequest::post(kind.path(), body)).await?)
    }

    /// WordPress accepts updates as POST to the item URL.
    pub async fn update<T: DeserializeOwned>(
        &self,
        kind: ResourceKind,
        id: u64,
        body: Value,
    ) -> Result<T, WpError> {
        decode(self.execute(ApiRequest::post(kind.item_path(id), body)).await?)
    }

    /// Without `force` WordPress moves trashable items to the trash and
    /// returns the item; with `force` it returns `{deleted, previous}`.
    pub async fn delete(&self, kind: ResourceKind, id: u64, force: bool) -> Result<Value, WpError> {
        let force = force || kind.requires_force_delete();
        let query = QueryParams::new().opt("force", force.then_some(true));
        let target = format!("{}{}", kind.item_path(id), query.encode());
        self.execute(ApiRequest::delete(target)).await
    }

    pub async fn upload_media<T: DeserializeOwned>(&self, upload: MediaUpload) -> Result<T, WpError> {
        decode(
            self.execute(ApiRequest::upload(ResourceKind::Media.path(), upload))
                .await?,
        )
    }

    pub async fn current_user<T: DeserializeOwned>(&self) -> Result<T, WpError> {
        let query = QueryParams::new().set("context", "edit");
        let target = format!("{CURRENT_USER_PATH}{}", query.encode());
        decode(self.execute(ApiRequest::get(target)).await?)
    }

    pub async fn settings(&self) -> Result<Value, WpError> {
        self.execute(ApiRequest::get(SETTINGS_PATH)).await
    }

    pub async fn update_settings(&self, body: Value) -> Result<Value, WpError> {
        self.execute(ApiRequest::post(SETTINGS_PATH, body)).await
    }
}
