//! Top-story identifier fetch.

use crate::client::StoryApi;
use crate::error::Result;
use crate::models::IdentifierList;
use crate::store::ArtifactStore;
use tracing::info;

/// Fetch the ranked identifiers, keep the first `max_ids`, and persist them.
///
/// The service's own ordering is kept as-is. Any network or decode
/// failure is returned to the caller untouched.
pub async fn fetch_top_identifiers<A: StoryApi>(
    api: &A,
    store: &ArtifactStore,
    max_ids: usize,
) -> Result<IdentifierList> {
    let mut ids = api.top_story_ids().await?;
    let available = ids.len();
    ids.truncate(max_ids);

    let path = store.write_ids(&ids)?;
    info!(
        "Saved {} of {} top story ids to {}",
        ids.len(),
        available,
        path.display()
    );

    Ok(ids)
}
