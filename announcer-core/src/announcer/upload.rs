// announcer-core/src/announcer/upload.rs

//! Chunked dataset upload.
//!
//! An upload reads one dataset into a fixed-size buffer and queues one
//! `TrainChunk` per filled buffer. Sending is left to the round's writer.

use std::io::ErrorKind;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;

use crate::dataset::Dataset;
use crate::error::{AnnouncerError, Result};
use crate::identity::NodeIdentity;
use crate::trainer::TrainChunk;

/// Size of the transfer buffer, and so the maximum payload of one chunk.
pub const UPLOAD_BUFFER_SIZE: usize = 1024 * 1024;

/// What one upload put on the stream.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UploadStats {
    pub chunks: usize,
    pub bytes: u64,
}

/// Reads until `buf` is full or the reader is exhausted.
///
/// Returns the number of bytes placed in `buf`; less than `buf.len()` means
/// end-of-stream was reached.
async fn fill_chunk<R>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]).await {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Uploads the whole of `reader` as chunks of `dataset`.
///
/// Every queued chunk is non-empty: `k` full chunks followed by one partial
/// chunk when the size is not a multiple of the buffer. The reader is
/// consumed and dropped on every exit path.
pub(crate) async fn upload_dataset<R>(
    identity: &NodeIdentity,
    dataset: Dataset,
    mut reader: R,
    queue: &mpsc::Sender<TrainChunk>,
) -> Result<UploadStats>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = vec![0u8; UPLOAD_BUFFER_SIZE];
    let mut stats = UploadStats::default();

    loop {
        let filled = fill_chunk(&mut reader, &mut buffer).await.map_err(|e| {
            AnnouncerError::storage_with_source(dataset.name(), "failed to read dataset", e)
        })?;
        if filled == 0 {
            break;
        }

        let chunk = TrainChunk::new(identity, dataset, buffer[..filled].to_vec());
        queue
            .send(chunk)
            .await
            .map_err(|_| AnnouncerError::trainer("train stream writer stopped"))?;

        stats.chunks += 1;
        stats.bytes += filled as u64;

        if filled < buffer.len() {
            break;
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_identity, TrackedReader};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio_test::io::Builder;

    const CHUNK: usize = UPLOAD_BUFFER_SIZE;

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    async fn run<R: AsyncRead + Unpin>(reader: R) -> (Result<UploadStats>, Vec<TrainChunk>) {
        let (tx, mut rx) = mpsc::channel(16);
        let result = upload_dataset(&test_identity(), Dataset::Download, reader, &tx).await;
        drop(tx);

        let mut chunks = Vec::new();
        while let Some(chunk) = rx.recv().await {
            chunks.push(chunk);
        }
        (result, chunks)
    }

    fn sizes(chunks: &[TrainChunk]) -> Vec<usize> {
        chunks.iter().map(|c| c.payload.len()).collect()
    }

    #[tokio::test]
    async fn test_partial_final_chunk() {
        let data = pattern(2 * CHUNK + CHUNK / 2);
        let (result, chunks) = run(Cursor::new(data.clone())).await;

        let stats = result.unwrap();
        assert_eq!(stats.chunks, 3);
        assert_eq!(stats.bytes, data.len() as u64);
        assert_eq!(sizes(&chunks), vec![CHUNK, CHUNK, CHUNK / 2]);
        assert_eq!(chunks.concat_payload(), data);
    }

    #[tokio::test]
    async fn test_exact_multiple_sends_no_empty_chunk() {
        let data = pattern(2 * CHUNK);
        let (result, chunks) = run(Cursor::new(data.clone())).await;

        assert_eq!(result.unwrap().chunks, 2);
        assert_eq!(sizes(&chunks), vec![CHUNK, CHUNK]);
        assert_eq!(chunks.concat_payload(), data);
    }

    #[tokio::test]
    async fn test_smaller_than_one_chunk() {
        let (result, chunks) = run(Cursor::new(b"id,cost\n1,20\n".to_vec())).await;

        assert_eq!(result.unwrap().chunks, 1);
        assert_eq!(chunks[0].payload, b"id,cost\n1,20\n");
    }

    #[tokio::test]
    async fn test_empty_dataset_sends_nothing() {
        let (result, chunks) = run(Cursor::new(Vec::new())).await;

        assert_eq!(result.unwrap(), UploadStats::default());
        assert!(chunks.is_empty());
    }

    #[tokio::test]
    async fn test_short_reads_are_coalesced() {
        let piece = pattern(300 * 1024);
        let reader = Builder::new()
            .read(&piece)
            .read(&piece)
            .read(&piece)
            .read(&piece)
            .build();

        let (result, chunks) = run(reader).await;
        assert_eq!(result.unwrap().bytes, 4 * piece.len() as u64);
        assert_eq!(sizes(&chunks), vec![CHUNK, 4 * piece.len() - CHUNK]);
    }

    #[tokio::test]
    async fn test_leftover_data_then_end_of_stream() {
        // The last read hands over the remaining bytes, the next one reports
        // end-of-stream. Exactly one final chunk must come out of it.
        let data = pattern(CHUNK + 10);
        let reader = Builder::new().read(&data).build();

        let (result, chunks) = run(reader).await;
        assert_eq!(result.unwrap().chunks, 2);
        assert_eq!(sizes(&chunks), vec![CHUNK, 10]);
        assert_eq!(chunks.concat_payload(), data);
    }

    #[tokio::test]
    async fn test_exact_chunk_then_end_of_stream() {
        let data = pattern(CHUNK);
        let reader = Builder::new().read(&data).build();

        let (result, chunks) = run(reader).await;
        assert_eq!(result.unwrap().chunks, 1);
        assert_eq!(sizes(&chunks), vec![CHUNK]);
    }

    #[tokio::test]
    async fn test_read_error_after_full_chunk() {
        let reader = Builder::new()
            .read(&pattern(CHUNK))
            .read_error(std::io::Error::new(ErrorKind::Other, "disk failure"))
            .build();

        let (result, chunks) = run(reader).await;
        let err = result.unwrap_err();
        assert!(err.to_string().contains("failed to read dataset"));
        assert_eq!(sizes(&chunks), vec![CHUNK]);
    }

    #[tokio::test]
    async fn test_read_error_mid_chunk_drops_partial_data() {
        let reader = Builder::new()
            .read(b"partial")
            .read_error(std::io::Error::new(ErrorKind::Other, "disk failure"))
            .build();

        let (result, chunks) = run(reader).await;
        assert!(result.is_err());
        assert!(chunks.is_empty());
    }

    #[tokio::test]
    async fn test_interrupted_read_is_retried() {
        let reader = Builder::new()
            .read(b"abc")
            .read_error(std::io::Error::new(ErrorKind::Interrupted, "signal"))
            .read(b"def")
            .build();

        let (result, chunks) = run(reader).await;
        assert_eq!(result.unwrap().chunks, 1);
        assert_eq!(chunks[0].payload, b"abcdef");
    }

    #[tokio::test]
    async fn test_closed_queue_fails_upload() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let reader = Cursor::new(vec![1u8; 8]);
        let result = upload_dataset(&test_identity(), Dataset::Download, reader, &tx).await;
        assert!(result.unwrap_err().to_string().contains("writer stopped"));
    }

    #[tokio::test]
    async fn test_chunks_are_tagged() {
        let (tx, mut rx) = mpsc::channel(4);
        upload_dataset(
            &test_identity(),
            Dataset::NetworkTopology,
            Cursor::new(b"src,dst\n".to_vec()),
            &tx,
        )
        .await
        .unwrap();

        let chunk = rx.recv().await.unwrap();
        assert_eq!(chunk.dataset, Dataset::NetworkTopology);
        assert_eq!(chunk.hostname, test_identity().hostname);
        assert_eq!(chunk.ip, test_identity().ip.to_string());
        assert_eq!(chunk.cluster_id, test_identity().cluster_id);
    }

    #[tokio::test]
    async fn test_reader_released_on_success_and_failure() {
        let released = Arc::new(AtomicUsize::new(0));

        let reader = TrackedReader::new(Cursor::new(pattern(CHUNK + 1)), released.clone());
        let (result, _) = run(reader).await;
        assert!(result.is_ok());
        assert_eq!(released.load(Ordering::SeqCst), 1);

        let failing = Builder::new()
            .read_error(std::io::Error::new(ErrorKind::Other, "disk failure"))
            .build();
        let reader = TrackedReader::new(failing, released.clone());
        let (result, _) = run(reader).await;
        assert!(result.is_err());
        assert_eq!(released.load(Ordering::SeqCst), 2);
    }

    trait ConcatPayload {
        fn concat_payload(&self) -> Vec<u8>;
    }

    impl ConcatPayload for Vec<TrainChunk> {
        fn concat_payload(&self) -> Vec<u8> {
            self.iter().flat_map(|c| c.payload.iter().copied()).collect()
        }
    }
}
