//! Typed remote operations. Each one is a fixed method/path template sent
//! through the request pipeline; none of them carry session state.

use reqwest::multipart::{Form, Part};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::debug;

use super::client::RequestEnvelope;
use super::{ApiClient, ApiError};
use crate::models::{
    AnalysisReport, Character, LoginRequest, Profile, ProfileUpdate, RegisterRequest, Resource,
    TextSource, Upload, Work, WorkQuery, WorkUpdate, WorkUpload, World,
};

pub const LOGIN_PATH: &str = "/auth/login";
pub const REGISTER_PATH: &str = "/auth/register";
pub const PROFILE_PATH: &str = "/users/me";

fn file_part(upload: Upload) -> Result<Part, ApiError> {
    let part = Part::bytes(upload.bytes).file_name(upload.file_name);
    match upload.mime {
        Some(mime) => part.mime_str(&mime).map_err(|e| ApiError::InvalidRequest {
            message: format!("Invalid upload content type '{}': {}", mime, e),
        }),
        None => Ok(part),
    }
}

impl ApiClient {
    // ===== Authentication =====

    /// Exchange credentials for a token-bearing payload. The payload shape
    /// varies by server, so it is returned as-is for token resolution.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<Value, ApiError> {
        self.post(LOGIN_PATH, credentials).await
    }

    /// Register an account, filling in a placeholder email when none is given.
    pub async fn register(&self, payload: &RegisterRequest) -> Result<Value, ApiError> {
        self.post(REGISTER_PATH, &payload.with_effective_email()).await
    }

    pub async fn current_user(&self) -> Result<Profile, ApiError> {
        self.get(PROFILE_PATH).await
    }

    pub async fn update_current_user(&self, payload: &ProfileUpdate) -> Result<Profile, ApiError> {
        self.put(PROFILE_PATH, payload).await
    }

    // ===== Works =====

    pub async fn list_works(&self, query: &WorkQuery) -> Result<Vec<Work>, ApiError> {
        self.request(RequestEnvelope::get("/works").query(query)?).await
    }

    pub async fn fetch_work(&self, id: i64) -> Result<Work, ApiError> {
        self.get(&format!("/works/{}", id)).await
    }

    pub async fn update_work(&self, id: i64, payload: &WorkUpdate) -> Result<Work, ApiError> {
        self.put(&format!("/works/{}", id), payload).await
    }

    pub async fn delete_work(&self, id: i64) -> Result<Value, ApiError> {
        self.delete(&format!("/works/{}", id)).await
    }

    /// Upload a new work as multipart form data.
    pub async fn upload_work(&self, upload: WorkUpload) -> Result<Work, ApiError> {
        let mut form = Form::new();
        if let Some(file) = upload.file_part() {
            debug!(file_name = %file.file_name, bytes = file.bytes.len(), "Uploading work file");
            form = form.part("file", file_part(file)?);
        }
        if let Some(title) = upload.title {
            form = form.text("title", title);
        }
        if let Some(content) = upload.content {
            form = form.text("content", content);
        }
        self.request(RequestEnvelope::post("/works").multipart(form)).await
    }

    pub async fn reanalyze_work(&self, id: i64) -> Result<AnalysisReport, ApiError> {
        self.request(RequestEnvelope::post(format!("/analyze/works/{}", id))).await
    }

    // ===== Analysis =====

    pub async fn analyze_text(&self, source: TextSource) -> Result<AnalysisReport, ApiError> {
        let form = Form::new().part("file", file_part(source.into_upload())?);
        self.request(RequestEnvelope::post("/analyze/text").multipart(form)).await
    }

    // ===== Characters & worlds =====

    pub async fn list_characters(&self) -> Result<Vec<Character>, ApiError> {
        self.list_resources::<Character>().await
    }

    pub async fn save_character(&self, character: &Character) -> Result<Character, ApiError> {
        self.save_resource(character).await
    }

    pub async fn remove_character(&self, id: i64) -> Result<Value, ApiError> {
        self.remove_resource::<Character>(id).await
    }

    pub async fn list_worlds(&self) -> Result<Vec<World>, ApiError> {
        self.list_resources::<World>().await
    }

    pub async fn save_world(&self, world: &World) -> Result<World, ApiError> {
        self.save_resource(world).await
    }

    pub async fn remove_world(&self, id: i64) -> Result<Value, ApiError> {
        self.remove_resource::<World>(id).await
    }

    async fn list_resources<R: Resource + DeserializeOwned>(&self) -> Result<Vec<R>, ApiError> {
        self.get(&format!("/{}", R::COLLECTION)).await
    }

    /// Create when the record has no id, update in place otherwise.
    async fn save_resource<R>(&self, record: &R) -> Result<R, ApiError>
    where
        R: Resource + Serialize + DeserializeOwned,
    {
        match record.id() {
            Some(id) => self.put(&format!("/{}/{}", R::COLLECTION, id), record).await,
            None => self.post(&format!("/{}", R::COLLECTION), record).await,
        }
    }

    async fn remove_resource<R: Resource>(&self, id: i64) -> Result<Value, ApiError> {
        self.delete(&format!("/{}/{}", R::COLLECTION, id)).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use mockito::{Matcher, Server};
    use serde_json::json;

    use super::*;
    use crate::auth::{CredentialStore, MemoryBackend};

    fn client_for(url: &str) -> ApiClient {
        let store = Arc::new(CredentialStore::new(MemoryBackend::with_token("tok")));
        ApiClient::with_options(url, Duration::from_secs(5), store).unwrap()
    }

    #[tokio::test]
    async fn test_register_derives_email() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", REGISTER_PATH)
            .match_body(Matcher::Json(json!({
                "username": "u",
                "password": "p",
                "email": "u@example.com"
            })))
            .with_status(200)
            .with_body(r#"{"data":{"id":5}}"#)
            .create_async()
            .await;

        let client = client_for(&server.url());
        let res = client.register(&RegisterRequest::new("u", "p")).await.unwrap();
        assert_eq!(res, json!({"id": 5}));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_current_user_sends_only_set_fields() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PUT", PROFILE_PATH)
            .match_header("authorization", "Bearer tok")
            .match_body(Matcher::Json(json!({"nickname": "江来"})))
            .with_status(200)
            .with_body(r#"{"data":{"id":1,"username":"u","nickname":"江来"}}"#)
            .create_async()
            .await;

        let client = client_for(&server.url());
        let update = ProfileUpdate {
            nickname: Some("江来".to_string()),
            ..ProfileUpdate::default()
        };
        let profile = client.update_current_user(&update).await.unwrap();
        assert_eq!(profile.display_name(), "江来");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_list_works_with_query() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/works")
            .match_header("authorization", "Bearer tok")
            .match_query(Matcher::UrlEncoded("category".into(), "连载章节".into()))
            .with_status(200)
            .with_body(r#"{"code":0,"data":[{"id":1,"title":"A"},{"id":2,"title":"B"}]}"#)
            .create_async()
            .await;

        let client = client_for(&server.url());
        let query = WorkQuery {
            category: Some("连载章节".to_string()),
            ..WorkQuery::default()
        };
        let works = client.list_works(&query).await.unwrap();
        assert_eq!(works.iter().map(|w| w.id).collect::<Vec<_>>(), vec![1, 2]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_work_sends_multipart() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/works")
            .match_header("content-type", Matcher::Regex("^multipart/form-data".to_string()))
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"name="file"; filename="content.txt""#.to_string()),
                Matcher::Regex(r#"name="title""#.to_string()),
                Matcher::Regex("第一章正文".to_string()),
            ]))
            .with_status(201)
            .with_body(r#"{"data":{"id":3,"title":"Draft","status":"已入库"}}"#)
            .create_async()
            .await;

        let client = client_for(&server.url());
        let work = client
            .upload_work(WorkUpload::from_content("Draft", "第一章正文"))
            .await
            .unwrap();
        assert_eq!(work.id, 3);
        assert_eq!(work.status.as_deref(), Some("已入库"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_analyze_text_uses_text_file() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/analyze/text")
            .match_body(Matcher::Regex(r#"filename="text.txt""#.to_string()))
            .with_status(200)
            .with_body(r#"{"data":{"summary":"ok","keywords":[{"word":"羁绊","weight":0.8}]}}"#)
            .create_async()
            .await;

        let client = client_for(&server.url());
        let report = client
            .analyze_text(TextSource::Text("一段文字".to_string()))
            .await
            .unwrap();
        assert_eq!(report.summary.as_deref(), Some("ok"));
        assert_eq!(report.keywords.len(), 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_save_character_creates_or_updates() {
        let mut server = Server::new_async().await;
        let create = server
            .mock("POST", "/characters")
            .with_status(200)
            .with_body(r#"{"data":{"id":11,"name":"江来"}}"#)
            .create_async()
            .await;
        let update = server
            .mock("PUT", "/characters/11")
            .match_body(Matcher::PartialJson(json!({"id": 11, "archetype": "成长型主角"})))
            .with_status(200)
            .with_body(r#"{"id":11,"name":"江来","archetype":"成长型主角"}"#)
            .create_async()
            .await;

        let client = client_for(&server.url());
        let mut character = client
            .save_character(&Character {
                name: "江来".to_string(),
                ..Character::default()
            })
            .await
            .unwrap();
        assert_eq!(character.id, Some(11));

        character.archetype = Some("成长型主角".to_string());
        let saved = client.save_character(&character).await.unwrap();
        assert_eq!(saved.archetype.as_deref(), Some("成长型主角"));

        create.assert_async().await;
        update.assert_async().await;
    }

    #[tokio::test]
    async fn test_world_crud_paths() {
        let mut server = Server::new_async().await;
        let list = server
            .mock("GET", "/worlds")
            .with_status(200)
            .with_body(r#"[{"id":1,"name":"环轨都市"}]"#)
            .create_async()
            .await;
        let remove = server
            .mock("DELETE", "/worlds/1")
            .with_status(204)
            .create_async()
            .await;

        let client = client_for(&server.url());
        let worlds = client.list_worlds().await.unwrap();
        assert_eq!(worlds[0].name, "环轨都市");
        assert_eq!(client.remove_world(1).await.unwrap(), Value::Null);

        list.assert_async().await;
        remove.assert_async().await;
    }

    #[tokio::test]
    async fn test_work_paths() {
        let mut server = Server::new_async().await;
        let fetch = server
            .mock("GET", "/works/7")
            .with_status(200)
            .with_body(r#"{"id":7,"title":"T"}"#)
            .create_async()
            .await;
        let update = server
            .mock("PUT", "/works/7")
            .match_body(Matcher::Json(json!({"title": "T2"})))
            .with_status(200)
            .with_body(r#"{"data":{"id":7,"title":"T2"}}"#)
            .create_async()
            .await;
        let reanalyze = server
            .mock("POST", "/analyze/works/7")
            .with_status(200)
            .with_body(r#"{"data":{"sample":"T2","metrics":{"节奏控制":84}}}"#)
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", "/works/7")
            .with_status(200)
            .with_body(r#"{"code":0,"message":"deleted"}"#)
            .create_async()
            .await;

        let client = client_for(&server.url());
        assert_eq!(client.fetch_work(7).await.unwrap().title, "T");

        let update_payload = WorkUpdate {
            title: Some("T2".to_string()),
            ..WorkUpdate::default()
        };
        assert_eq!(client.update_work(7, &update_payload).await.unwrap().title, "T2");

        let report = client.reanalyze_work(7).await.unwrap();
        assert_eq!(report.metrics.get("节奏控制"), Some(&84.0));

        let res = client.delete_work(7).await.unwrap();
        assert_eq!(res["message"], json!("deleted"));

        for mock in [fetch, update, reanalyze, delete] {
            mock.assert_async().await;
        }
    }
}
