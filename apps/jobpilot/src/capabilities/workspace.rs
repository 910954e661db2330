//! Workspace logging: appends application notes to a Notion page.
//!
//! Every non-blank line becomes one paragraph block. Blank-only input is rejected
//! before any remote call is made. Blocks are sent in batches the Notion API accepts.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, warn};

const NOTION_BLOCKS_URL: &str = "https://api.notion.com/v1/blocks";
const NOTION_VERSION: &str = "2022-06-28";

/// Notion limits: children per append request, and characters per rich text object.
pub const MAX_BLOCKS_PER_REQUEST: usize = 100;
pub const MAX_TEXT_CONTENT_CHARS: usize = 2000;

#[derive(Debug, Error)]
pub enum LogError {
    #[error("no text to append: content is empty or whitespace")]
    EmptyContent,

    #[error("no target page id given")]
    MissingTarget,

    #[error("workspace API error (status {status}, page {target_id}): {message}")]
    Api {
        status: u16,
        target_id: String,
        message: String,
    },

    #[error("workspace request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Remote side of workspace logging. One call appends a batch of blocks to one target.
#[async_trait]
pub trait WorkspaceClient: Send + Sync {
    async fn append_blocks(&self, target_id: &str, blocks: Vec<Value>) -> Result<(), LogError>;
}

#[derive(Debug, Deserialize)]
struct NotionErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct NotionClient {
    client: Client,
    api_key: String,
}

impl NotionClient {
    pub fn new(api_key: String) -> Result<Self, LogError> {
        Ok(Self {
            client: Client::builder().build()?,
            api_key,
        })
    }
}

#[async_trait]
impl WorkspaceClient for NotionClient {
    async fn append_blocks(&self, target_id: &str, blocks: Vec<Value>) -> Result<(), LogError> {
        let response = self
            .client
            .patch(format!("{NOTION_BLOCKS_URL}/{target_id}/children"))
            .bearer_auth(&self.api_key)
            .header("Notion-Version", NOTION_VERSION)
            .json(&json!({ "children": blocks }))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<NotionErrorBody>(&body)
            .map(|e| e.message)
            .unwrap_or(body);
        warn!("Workspace API returned {status} for page {target_id}: {message}");
        Err(LogError::Api {
            status: status.as_u16(),
            target_id: target_id.to_string(),
            message,
        })
    }
}

/// Builds one paragraph block per non-blank line, trimmed. A line longer than
/// `MAX_TEXT_CONTENT_CHARS` is split across several rich text objects of the same block.
pub fn paragraph_blocks(text: &str) -> Vec<Value> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let rich_text: Vec<Value> = split_chars(line, MAX_TEXT_CONTENT_CHARS)
                .into_iter()
                .map(|segment| json!({ "type": "text", "text": { "content": segment } }))
                .collect();
            json!({
                "object": "block",
                "type": "paragraph",
                "paragraph": { "rich_text": rich_text }
            })
        })
        .collect()
}

/// Splits on character boundaries into pieces of at most `max` characters.
fn split_chars(text: &str, max: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(max).map(|piece| piece.iter().collect()).collect()
}

/// Appends `text` to the target page. Returns the number of logged units (non-blank lines).
pub async fn append_text(
    client: &dyn WorkspaceClient,
    target_id: &str,
    text: &str,
) -> Result<usize, LogError> {
    let blocks = paragraph_blocks(text);
    if blocks.is_empty() {
        return Err(LogError::EmptyContent);
    }
    let target_id = target_id.trim();
    if target_id.is_empty() {
        return Err(LogError::MissingTarget);
    }

    let count = blocks.len();
    for batch in blocks.chunks(MAX_BLOCKS_PER_REQUEST) {
        client.append_blocks(target_id, batch.to_vec()).await?;
    }
    info!("Appended {count} block(s) to workspace page {target_id}");
    Ok(count)
}
