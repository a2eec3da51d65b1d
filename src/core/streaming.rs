//! Accumulation of streamed block output.
//!
//! Chunks are appended per block in arrival order. Blocks may interleave.
//! The first chunk forwarded for a block gets a separator prefix when some
//! other block was forwarded before it, so a chat surface reads as distinct
//! paragraphs.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use tokio::sync::mpsc;

/// Text forwarded to a live consumer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamDelta {
    pub block_id: String,
    pub text: String,
}

pub type DeltaSender = mpsc::UnboundedSender<StreamDelta>;
pub type DeltaReceiver = mpsc::UnboundedReceiver<StreamDelta>;

pub fn delta_channel() -> (DeltaSender, DeltaReceiver) {
    mpsc::unbounded_channel()
}

/// Output key streamed text is merged into.
pub const STREAMED_CONTENT_KEY: &str = "content";

#[derive(Debug, Default)]
pub struct StreamedContentBuffer {
    separator: String,
    /// Entries are `block_id` or `block_id.path`; empty forwards everything.
    selected_outputs: Vec<String>,
    content: HashMap<String, String>,
    forwarded: HashSet<String>,
    finished: HashSet<String>,
}

impl StreamedContentBuffer {
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
            ..Default::default()
        }
    }

    pub fn with_selected_outputs(mut self, selected: Vec<String>) -> Self {
        self.selected_outputs = selected;
        self
    }

    pub fn is_selected(&self, block_id: &str) -> bool {
        self.selected_outputs.is_empty()
            || self.selected_outputs.iter().any(|sel| {
                sel == block_id
                    || sel
                        .strip_prefix(block_id)
                        .is_some_and(|rest| rest.starts_with('.') || rest.starts_with('_'))
            })
    }

    /// Record a chunk and return what should be forwarded, if anything.
    pub fn push(&mut self, block_id: &str, chunk: &str) -> Option<StreamDelta> {
        self.content
            .entry(block_id.to_string())
            .or_default()
            .push_str(chunk);

        if !self.is_selected(block_id) {
            return None;
        }

        let mut text = String::new();
        if !self.forwarded.contains(block_id) {
            if !self.forwarded.is_empty() {
                text.push_str(&self.separator);
            }
            self.forwarded.insert(block_id.to_string());
        }
        text.push_str(chunk);

        Some(StreamDelta {
            block_id: block_id.to_string(),
            text,
        })
    }

    /// Mark a block's stream as complete. Its text can be merged into the
    /// block's output as soon as the block finishes.
    pub fn finish(&mut self, block_id: &str) {
        self.finished.insert(block_id.to_string());
    }

    pub fn is_finished(&self, block_id: &str) -> bool {
        self.finished.contains(block_id)
    }

    pub fn content(&self, block_id: &str) -> Option<&str> {
        self.content.get(block_id).map(String::as_str)
    }

    /// Write the accumulated text for `block_id` into its structured output.
    ///
    /// Object outputs gain or replace the `content` key; anything else is
    /// wrapped into `{ "content": text }`.
    pub fn merge_into(&self, block_id: &str, output: &mut Value) -> bool {
        let Some(text) = self.content.get(block_id) else {
            return false;
        };
        match output {
            Value::Object(map) => {
                map.insert(STREAMED_CONTENT_KEY.to_string(), Value::String(text.clone()));
            }
            _ => {
                let mut map = Map::new();
                map.insert(STREAMED_CONTENT_KEY.to_string(), Value::String(text.clone()));
                *output = Value::Object(map);
            }
        }
        true
    }
}
