//! Chunk-by-chunk submission of a signed transaction.

use crate::error::StorageResult;
use crate::gateway::GatewayClient;
use permastore_signer::Transaction;
use tracing::debug;

/// Transactions with at most this many chunks carry their data inline.
const MAX_CHUNKS_IN_BODY: usize = 1;

/// Drives the upload of one signed transaction.
///
/// The first call to [`upload_chunk`](Self::upload_chunk) posts the header;
/// every later call posts the next chunk. There is no way to abort a started
/// sequence other than dropping the uploader.
pub struct ChunkUploader<'a> {
    gateway: &'a GatewayClient,
    tx: &'a Transaction,
    tx_posted: bool,
    data_inline: bool,
    next_chunk: usize,
}

impl<'a> ChunkUploader<'a> {
    pub fn new(gateway: &'a GatewayClient, tx: &'a Transaction) -> Self {
        Self {
            gateway,
            tx,
            tx_posted: false,
            data_inline: tx.chunk_count() <= MAX_CHUNKS_IN_BODY,
            next_chunk: 0,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.tx_posted && (self.data_inline || self.next_chunk >= self.tx.chunk_count())
    }

    pub fn total_chunks(&self) -> usize {
        self.tx.chunk_count()
    }

    pub fn uploaded_chunks(&self) -> usize {
        if self.tx_posted && self.data_inline {
            self.total_chunks()
        } else {
            self.next_chunk
        }
    }

    /// Post the header or the next chunk.
    pub async fn upload_chunk(&mut self) -> StorageResult<()> {
        if self.is_complete() {
            return Ok(());
        }

        if !self.tx_posted {
            let header = self.tx.header(self.data_inline)?;
            self.gateway.post_transaction(&header).await?;
            self.tx_posted = true;
            debug!(
                tx_id = %header.id,
                inline = self.data_inline,
                chunks = self.total_chunks(),
                "posted transaction header"
            );
            return Ok(());
        }

        let chunk = self.tx.chunk(self.next_chunk)?;
        self.gateway.post_chunk(&chunk).await?;
        self.next_chunk += 1;
        debug!(
            uploaded = self.next_chunk,
            total = self.total_chunks(),
            "posted chunk"
        );
        Ok(())
    }
}
