//! Google Drive v3 REST client.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;

use super::{
    ByteStream, CreateFileRequest, CreateFolderRequest, DriveApi, DriveConnector, DriveError,
    ListChildrenRequest, RemoteNode, FOLDER_MIME_TYPE, NODE_FIELDS,
};
use crate::auth::AccessToken;
use crate::config::DriveConfig;

#[derive(Debug, Deserialize)]
struct FileListResponse {
    #[serde(default)]
    files: Vec<RemoteNode>,
}

/// Hands out [`DriveClient`]s sharing one connection pool.
#[derive(Clone)]
pub struct HttpDriveConnector {
    http: Client,
    api_base: String,
    upload_base: String,
}

impl HttpDriveConnector {
    pub fn new(http: Client, config: &DriveConfig) -> Self {
        Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            upload_base: config.upload_base.trim_end_matches('/').to_string(),
        }
    }
}

impl DriveConnector for HttpDriveConnector {
    fn connect(&self, token: &AccessToken) -> Arc<dyn DriveApi> {
        Arc::new(DriveClient {
            http: self.http.clone(),
            token: token.clone(),
            api_base: self.api_base.clone(),
            upload_base: self.upload_base.clone(),
        })
    }
}

/// Drive client bound to one access token.
pub struct DriveClient {
    http: Client,
    token: AccessToken,
    api_base: String,
    upload_base: String,
}

impl DriveClient {
    fn bearer(&self) -> String {
        format!("Bearer {}", self.token.secret())
    }

    /// Map a non-success response onto [`DriveError`], otherwise decode it.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, DriveError> {
        let status = response.status();

        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| DriveError::Network(format!("failed to parse response: {e}")));
        }

        let body = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::NOT_FOUND => DriveError::NotFound(body),
            StatusCode::UNAUTHORIZED => DriveError::Unauthorized(body),
            StatusCode::FORBIDDEN => DriveError::PermissionDenied(body),
            _ => DriveError::Api {
                status: status.as_u16(),
                message: body,
            },
        })
    }
}

/// Body of a `multipart/related` upload: metadata part, then the content stream.
fn multipart_related_body(
    boundary: &str,
    metadata: &serde_json::Value,
    mime_type: &str,
    content: ByteStream,
) -> ByteStream {
    let head = format!(
        "--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n\
         --{boundary}\r\nContent-Type: {mime_type}\r\n\r\n"
    );
    let tail = format!("\r\n--{boundary}--\r\n");

    let body = stream::once(async move { Ok::<_, std::io::Error>(Bytes::from(head)) })
        .chain(content)
        .chain(stream::once(async move { Ok(Bytes::from(tail)) }));

    Box::pin(body)
}

#[async_trait]
impl DriveApi for DriveClient {
    async fn get_node(&self, id: &str) -> Result<Option<RemoteNode>, DriveError> {
        let url = format!("{}/files/{}", self.api_base, urlencoding::encode(id));

        let response = self
            .http
            .get(&url)
            .header(header::AUTHORIZATION, self.bearer())
            .query(&[("fields", NODE_FIELDS), ("supportsAllDrives", "true")])
            .send()
            .await
            .map_err(|e| DriveError::Network(format!("failed to get file: {e}")))?;

        match Self::handle_response(response).await {
            Ok(node) => Ok(Some(node)),
            Err(DriveError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn list_children(
        &self,
        request: &ListChildrenRequest,
    ) -> Result<Vec<RemoteNode>, DriveError> {
        let url = format!("{}/files", self.api_base);
        let query = request.query();
        let fields = format!("files({})", request.fields);
        let page_size = request.page_size.to_string();

        let response = self
            .http
            .get(&url)
            .header(header::AUTHORIZATION, self.bearer())
            .query(&[
                ("q", query.as_str()),
                ("fields", fields.as_str()),
                ("orderBy", request.order_by.as_str()),
                ("pageSize", page_size.as_str()),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ])
            .send()
            .await
            .map_err(|e| DriveError::Network(format!("failed to list folder: {e}")))?;

        let list: FileListResponse = Self::handle_response(response).await?;
        Ok(list.files)
    }

    async fn create_file(
        &self,
        request: CreateFileRequest,
        content: ByteStream,
    ) -> Result<RemoteNode, DriveError> {
        let url = format!("{}/files", self.upload_base);
        let boundary = format!("classdrive-{}", uuid::Uuid::new_v4().simple());
        let metadata = serde_json::json!({
            "name": request.name,
            "parents": [request.parent_id],
            "mimeType": request.mime_type,
        });
        let body = multipart_related_body(&boundary, &metadata, &request.mime_type, content);

        let response = self
            .http
            .post(&url)
            .header(header::AUTHORIZATION, self.bearer())
            .header(
                header::CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            )
            .query(&[
                ("uploadType", "multipart"),
                ("fields", NODE_FIELDS),
                ("supportsAllDrives", "true"),
            ])
            .body(reqwest::Body::wrap_stream(body))
            .send()
            .await
            .map_err(|e| DriveError::Network(format!("failed to upload file: {e}")))?;

        Self::handle_response(response).await
    }

    async fn create_folder(&self, request: &CreateFolderRequest) -> Result<RemoteNode, DriveError> {
        let url = format!("{}/files", self.api_base);
        let metadata = serde_json::json!({
            "name": request.name,
            "mimeType": FOLDER_MIME_TYPE,
            "parents": [request.parent_id],
        });

        let response = self
            .http
            .post(&url)
            .header(header::AUTHORIZATION, self.bearer())
            .query(&[("fields", NODE_FIELDS), ("supportsAllDrives", "true")])
            .json(&metadata)
            .send()
            .await
            .map_err(|e| DriveError::Network(format!("failed to create folder: {e}")))?;

        Self::handle_response(response).await
    }

    async fn trash(&self, id: &str) -> Result<(), DriveError> {
        let url = format!("{}/files/{}", self.api_base, urlencoding::encode(id));

        let response = self
            .http
            .patch(&url)
            .header(header::AUTHORIZATION, self.bearer())
            .query(&[("fields", "id"), ("supportsAllDrives", "true")])
            .json(&serde_json::json!({ "trashed": true }))
            .send()
            .await
            .map_err(|e| DriveError::Network(format!("failed to trash file: {e}")))?;

        let _: serde_json::Value = Self::handle_response(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    #[tokio::test]
    async fn test_multipart_related_body_layout() {
        let content: ByteStream = Box::pin(stream::iter(vec![
            Ok(Bytes::from_static(b"hello ")),
            Ok(Bytes::from_static(b"world")),
        ]));
        let metadata = serde_json::json!({"name": "a.txt", "parents": ["p"]});

        let head = format!(
            "--b\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n\
             --b\r\nContent-Type: text/plain\r\n\r\n"
        );
        let expected = format!("{head}hello world\r\n--b--\r\n");

        let body = multipart_related_body("b", &metadata, "text/plain", content);
        let collected: Vec<Bytes> = body.try_collect().await.unwrap();
        let bytes: Vec<u8> = collected.concat();

        assert_eq!(String::from_utf8(bytes).unwrap(), expected);
    }

    #[test]
    fn test_connector_trims_base_urls() {
        let config = DriveConfig {
            api_base: "https://drive.example/v3/".to_string(),
            upload_base: "https://drive.example/upload/v3/".to_string(),
            ..DriveConfig::default()
        };
        let connector = HttpDriveConnector::new(Client::new(), &config);
        assert_eq!(connector.api_base, "https://drive.example/v3");
        assert_eq!(connector.upload_base, "https://drive.example/upload/v3");
    }
}
