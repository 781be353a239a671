pub mod hasher;
pub mod versioner;

use anyhow::Context;
use uuid::Uuid;

use crate::state::AppState;
use versioner::{object_key, Rendition};

pub use hasher::image_hash;
pub use versioner::{store_versions, StoredImage};

/// Fresh download URL for a rendition; used when a stored URL has expired.
pub async fn presign_rendition(
    st: &AppState,
    user_id: Uuid,
    image_id: &str,
    rendition: Rendition,
) -> anyhow::Result<String> {
    let key = object_key(user_id, image_id, rendition);
    st.storage
        .presign_get(&key, st.config.storage.url_ttl_secs)
        .await
        .with_context(|| format!("presign url for {key}"))
}

#[cfg(test)]
mod image_tests {
    use super::*;

    #[tokio::test]
    async fn presigned_url_is_derived_from_the_image_id() {
        let state = AppState::fake();
        let user = Uuid::new_v4();
        let url = presign_rendition(&state, user, "1700000000000", Rendition::Thumb)
            .await
            .unwrap();
        assert!(url.contains(&format!("plates/{user}/1700000000000_thumb.jpg")));
    }
}
