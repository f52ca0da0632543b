//! Process-local drive.
//!
//! Backs the `memory` drive backend for local development and every test
//! that needs a drive. Keeps call counters and can be told to fail.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use futures::TryStreamExt;

use super::{
    ByteStream, CreateFileRequest, CreateFolderRequest, DriveApi, DriveConnector, DriveError,
    ListChildrenRequest, RemoteNode, FOLDER_MIME_TYPE,
};
use crate::auth::AccessToken;

#[derive(Debug, Clone)]
struct StoredNode {
    node: RemoteNode,
    content: Vec<u8>,
    trashed: bool,
}

#[derive(Debug, Default)]
struct State {
    nodes: HashMap<String, StoredNode>,
    /// Ticks forward on every write so recency ordering is deterministic.
    clock: i64,
    failing_gets: HashSet<String>,
    /// Most recent connection tokens, oldest first.
    tokens_seen: VecDeque<String>,
}

/// Connection tokens remembered for inspection.
pub const TOKENS_KEPT: usize = 32;

/// In-memory drive.
#[derive(Debug, Default)]
pub struct MemoryDrive {
    state: Mutex<State>,
    create_calls: AtomicUsize,
    fail_creates: AtomicBool,
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

impl MemoryDrive {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn insert(&self, id: &str, name: &str, mime_type: &str, parent: Option<&str>, content: Vec<u8>) {
        let mut state = self.state();
        state.clock += 1;
        let node = RemoteNode {
            id: id.to_string(),
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            modified_time: Some(base_time() + Duration::seconds(state.clock)),
            web_view_link: Some(format!("https://drive.local/view/{id}")),
            icon_link: None,
            parents: parent.map(|p| vec![p.to_string()]).unwrap_or_default(),
        };
        state.nodes.insert(
            id.to_string(),
            StoredNode {
                node,
                content,
                trashed: false,
            },
        );
    }

    /// Add a folder with an optional parent.
    pub fn insert_folder(&self, id: &str, name: &str, parent: Option<&str>) {
        self.insert(id, name, FOLDER_MIME_TYPE, parent, Vec::new());
    }

    /// Add a file under `parent`.
    pub fn insert_file(&self, id: &str, name: &str, mime_type: &str, parent: &str) {
        self.insert(id, name, mime_type, Some(parent), Vec::new());
    }

    /// Append an extra parent to an existing node.
    pub fn add_parent(&self, id: &str, parent: &str) {
        if let Some(stored) = self.state().nodes.get_mut(id) {
            stored.node.parents.push(parent.to_string());
        }
    }

    /// Make `get_node` fail for `id`.
    pub fn fail_get(&self, id: &str) {
        self.state().failing_gets.insert(id.to_string());
    }

    /// Make every subsequent `create_file` fail.
    pub fn set_fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    /// Number of `create_file` calls, successful or not.
    pub fn create_call_count(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Node by id, including trashed ones.
    pub fn node(&self, id: &str) -> Option<RemoteNode> {
        self.state().nodes.get(id).map(|s| s.node.clone())
    }

    /// First untrashed node with `name`.
    pub fn find_by_name(&self, name: &str) -> Option<RemoteNode> {
        self.state()
            .nodes
            .values()
            .find(|s| !s.trashed && s.node.name == name)
            .map(|s| s.node.clone())
    }

    /// Stored content of a file.
    pub fn content(&self, id: &str) -> Option<Vec<u8>> {
        self.state().nodes.get(id).map(|s| s.content.clone())
    }

    pub fn is_trashed(&self, id: &str) -> bool {
        self.state().nodes.get(id).map(|s| s.trashed).unwrap_or(false)
    }

    /// Access tokens of the latest connections made through [`MemoryConnector`].
    ///
    /// Only the last [`TOKENS_KEPT`] are remembered.
    pub fn tokens_seen(&self) -> Vec<String> {
        self.state().tokens_seen.iter().cloned().collect()
    }

    fn record_token(&self, token: &AccessToken) {
        let mut state = self.state();
        if state.tokens_seen.len() == TOKENS_KEPT {
            state.tokens_seen.pop_front();
        }
        state.tokens_seen.push_back(token.secret().to_string());
    }

    fn require_folder(state: &State, id: &str) -> Result<(), DriveError> {
        match state.nodes.get(id) {
            Some(s) if !s.trashed && s.node.mime_type == FOLDER_MIME_TYPE => Ok(()),
            _ => Err(DriveError::NotFound(id.to_string())),
        }
    }
}

#[async_trait]
impl DriveApi for MemoryDrive {
    async fn get_node(&self, id: &str) -> Result<Option<RemoteNode>, DriveError> {
        let state = self.state();
        if state.failing_gets.contains(id) {
            return Err(DriveError::Network(format!("simulated failure for {id}")));
        }
        Ok(state.nodes.get(id).map(|s| s.node.clone()))
    }

    async fn list_children(
        &self,
        request: &ListChildrenRequest,
    ) -> Result<Vec<RemoteNode>, DriveError> {
        let state = self.state();
        let mut children: Vec<RemoteNode> = state
            .nodes
            .values()
            .filter(|s| !s.trashed && s.node.parents.contains(&request.folder_id))
            .map(|s| s.node.clone())
            .collect();

        if request.order_by.starts_with("name") {
            children.sort_by(|a, b| a.name.cmp(&b.name));
        } else {
            children.sort_by(|a, b| b.modified_time.cmp(&a.modified_time));
        }
        children.truncate(request.page_size as usize);
        Ok(children)
    }

    async fn create_file(
        &self,
        request: CreateFileRequest,
        content: ByteStream,
    ) -> Result<RemoteNode, DriveError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);

        let chunks: Vec<bytes::Bytes> = content.try_collect().await?;
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(DriveError::Api {
                status: 500,
                message: "simulated upload failure".to_string(),
            });
        }

        Self::require_folder(&self.state(), &request.parent_id)?;
        let id = format!("mem-{}", uuid::Uuid::new_v4().simple());
        self.insert(
            &id,
            &request.name,
            &request.mime_type,
            Some(&request.parent_id),
            chunks.concat(),
        );
        self.node(&id).ok_or(DriveError::NotFound(id))
    }

    async fn create_folder(&self, request: &CreateFolderRequest) -> Result<RemoteNode, DriveError> {
        Self::require_folder(&self.state(), &request.parent_id)?;
        let id = format!("mem-{}", uuid::Uuid::new_v4().simple());
        self.insert_folder(&id, &request.name, Some(&request.parent_id));
        self.node(&id).ok_or(DriveError::NotFound(id))
    }

    async fn trash(&self, id: &str) -> Result<(), DriveError> {
        let mut state = self.state();
        let stored = state
            .nodes
            .get_mut(id)
            .ok_or_else(|| DriveError::NotFound(id.to_string()))?;
        stored.trashed = true;
        Ok(())
    }
}

/// Connector returning the same shared [`MemoryDrive`] for every token.
#[derive(Clone)]
pub struct MemoryConnector {
    drive: Arc<MemoryDrive>,
}

impl MemoryConnector {
    pub fn new(drive: Arc<MemoryDrive>) -> Self {
        Self { drive }
    }

    pub fn drive(&self) -> &Arc<MemoryDrive> {
        &self.drive
    }
}

impl DriveConnector for MemoryConnector {
    fn connect(&self, token: &AccessToken) -> Arc<dyn DriveApi> {
        self.drive.record_token(token);
        self.drive.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::stream;

    fn content(data: &'static [u8]) -> ByteStream {
        Box::pin(stream::iter(vec![Ok(Bytes::from_static(data))]))
    }

    #[tokio::test]
    async fn test_list_children_newest_first_and_truncated() {
        let drive = MemoryDrive::new();
        drive.insert_folder("root", "Root", None);
        drive.insert_file("a", "a.txt", "text/plain", "root");
        drive.insert_file("b", "b.txt", "text/plain", "root");
        drive.insert_folder("c", "Sub", Some("root"));

        let all = drive
            .list_children(&ListChildrenRequest::new("root"))
            .await
            .unwrap();
        let ids: Vec<&str> = all.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);

        let page = drive
            .list_children(&ListChildrenRequest::new("root").with_page_size(2))
            .await
            .unwrap();
        assert_eq!(page.len(), 2);
    }

    #[tokio::test]
    async fn test_create_file_and_trash() {
        let drive = MemoryDrive::new();
        drive.insert_folder("root", "Root", None);

        let node = drive
            .create_file(
                CreateFileRequest {
                    name: "essay.txt".to_string(),
                    parent_id: "root".to_string(),
                    mime_type: "text/plain".to_string(),
                },
                content(b"draft"),
            )
            .await
            .unwrap();

        assert_eq!(drive.create_call_count(), 1);
        assert_eq!(drive.content(&node.id).unwrap(), b"draft");
        assert_eq!(node.parents, vec!["root"]);

        drive.trash(&node.id).await.unwrap();
        assert!(drive.is_trashed(&node.id));
        let children = drive
            .list_children(&ListChildrenRequest::new("root"))
            .await
            .unwrap();
        assert!(children.is_empty());
    }

    #[tokio::test]
    async fn test_create_file_into_missing_folder() {
        let drive = MemoryDrive::new();
        let result = drive
            .create_file(
                CreateFileRequest {
                    name: "x".to_string(),
                    parent_id: "nope".to_string(),
                    mime_type: "text/plain".to_string(),
                },
                content(b"x"),
            )
            .await;
        assert!(matches!(result, Err(DriveError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_simulated_failures() {
        let drive = MemoryDrive::new();
        drive.insert_folder("root", "Root", None);
        drive.fail_get("root");
        drive.set_fail_creates(true);

        assert!(drive.get_node("root").await.is_err());
        let result = drive
            .create_file(
                CreateFileRequest {
                    name: "x".to_string(),
                    parent_id: "root".to_string(),
                    mime_type: "text/plain".to_string(),
                },
                content(b"x"),
            )
            .await;
        assert!(matches!(result, Err(DriveError::Api { status: 500, .. })));
        assert_eq!(drive.create_call_count(), 1);
    }

    #[test]
    fn test_connector_records_tokens() {
        let drive = Arc::new(MemoryDrive::new());
        let connector = MemoryConnector::new(drive.clone());

        connector.connect(&AccessToken::new("t1"));
        connector.connect(&AccessToken::new("t2"));

        assert_eq!(drive.tokens_seen(), vec!["t1", "t2"]);
    }

    #[test]
    fn test_tokens_seen_is_bounded() {
        let drive = Arc::new(MemoryDrive::new());
        let connector = MemoryConnector::new(drive.clone());

        for i in 0..TOKENS_KEPT + 5 {
            connector.connect(&AccessToken::new(format!("t{i}")));
        }

        let seen = drive.tokens_seen();
        assert_eq!(seen.len(), TOKENS_KEPT);
        assert_eq!(seen[0], "t5");
        assert_eq!(seen[TOKENS_KEPT - 1], format!("t{}", TOKENS_KEPT + 4));
    }
}
