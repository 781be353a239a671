use md5::{Digest, Md5};

/// Content hash of an original upload, taken before any resizing so that the same
/// photo always hashes the same regardless of how it is later re-encoded.
pub fn image_hash(bytes: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
