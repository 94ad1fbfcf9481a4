//! In-memory [`StoryApi`] for stage tests.

use crate::client::{into_record, StoryApi};
use crate::error::{PipelineError, Result};
use crate::models::{IdentifierList, ItemId, ItemRecord};
use serde_json::{json, Value};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct FakeApi {
    ids: IdentifierList,
    items: HashMap<ItemId, Value>,
    fail_ids: bool,
}

impl FakeApi {
    pub fn with_ids(ids: IdentifierList) -> Self {
        Self {
            ids,
            ..Self::default()
        }
    }

    pub fn failing_ids() -> Self {
        Self {
            fail_ids: true,
            ..Self::default()
        }
    }

    /// Stories with the given titles; the id list is their order.
    pub fn with_items(items: &[(ItemId, &str)]) -> Self {
        Self {
            ids: items.iter().map(|(id, _)| *id).collect(),
            items: items
                .iter()
                .map(|(id, title)| {
                    (
                        *id,
                        json!({"id": id, "title": title, "type": "story", "score": 1}),
                    )
                })
                .collect(),
            fail_ids: false,
        }
    }

    /// Add a record that has no title field.
    pub fn with_untitled(mut self, id: ItemId) -> Self {
        self.ids.push(id);
        self.items.insert(id, json!({"id": id, "type": "job"}));
        self
    }
}

impl StoryApi for FakeApi {
    async fn top_story_ids(&self) -> Result<IdentifierList> {
        if self.fail_ids {
            return Err(PipelineError::network(
                "fake://topstories.json",
                "connection refused",
            ));
        }
        Ok(self.ids.clone())
    }

    // Unknown ids behave like the live API, which answers `null`.
    async fn item(&self, id: ItemId) -> Result<ItemRecord> {
        let value = self.items.get(&id).cloned().unwrap_or(Value::Null);
        into_record(id, value)
    }
}
