// Ring snapshots.

use bytes::Bytes;

use crate::client::MultitekClient;
use crate::error::Error;

impl MultitekClient {
    /// Download the image behind a call record's `path`.
    ///
    /// The path is resolved against the image root (the service origin by
    /// default) and fetched with the service credential.
    pub async fn fetch_snapshot(&self, path: &str) -> Result<Bytes, Error> {
        let url = self.media_url(path)?;
        self.get_bytes(url).await
    }
}
