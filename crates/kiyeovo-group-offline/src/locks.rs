//! Per-bucket mutation lock table (spec §4.5, §5): a put must serialize
//! against any other put racing the same `(group, epoch, sender)` bucket,
//! but puts against different buckets must not block each other. Owned by
//! the caller (typically `kiyeovo-node`'s group-offline manager), not a
//! process global.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

#[derive(Default)]
pub struct BucketLockTable {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl BucketLockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The mutex guarding `bucket_key`, created on first use.
    pub async fn lock_for(&self, bucket_key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(bucket_key.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }
}
