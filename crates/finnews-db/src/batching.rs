//! Fixed-size batched writes with a single retry on transient backend errors.

use std::future::Future;
use std::time::Duration;

use finnews_core::StoreError;

/// Rows per insert statement. Bounds transaction size and keeps one bad batch
/// from taking the rest of the run with it.
pub const UPSERT_BATCH_SIZE: usize = 50;

/// Pause before the one retry a batch gets after a transient error.
pub const TRANSIENT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Feed `rows` to `insert_batch` in chunks of `batch_size`, summing the
/// per-batch inserted counts.
///
/// A batch that fails with [`StoreError::Transient`] is retried exactly once
/// after `retry_delay`. Any other error, or a second failure, is returned
/// immediately; batches already written stay written.
///
/// # Errors
///
/// Returns the first non-recoverable [`StoreError`].
pub async fn upsert_in_batches<'a, T, F, Fut>(
    rows: &'a [T],
    batch_size: usize,
    retry_delay: Duration,
    mut insert_batch: F,
) -> Result<usize, StoreError>
where
    F: FnMut(&'a [T]) -> Fut,
    Fut: Future<Output = Result<usize, StoreError>>,
{
    let mut inserted = 0usize;

    for (index, batch) in rows.chunks(batch_size.max(1)).enumerate() {
        let count = match insert_batch(batch).await {
            Ok(n) => n,
            Err(err) if err.is_transient() => {
                tracing::warn!(
                    batch = index,
                    size = batch.len(),
                    error = %err,
                    "transient store error; retrying batch once"
                );
                tokio::time::sleep(retry_delay).await;
                insert_batch(batch).await?
            }
            Err(err) => return Err(err),
        };
        inserted += count;
    }

    Ok(inserted)
}
