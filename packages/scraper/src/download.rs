//! HTTP download helpers.
//!
//! Small files are read into memory with [`download_bytes`]. Bulk archives
//! that can reach several gigabytes are streamed chunk by chunk into an
//! anonymous temp file with [`download_to_tempfile`], which the OS removes as
//! soon as the returned handle is dropped.

use std::fs::File;
use std::io::{Seek as _, SeekFrom, Write as _};

use crate::ScrapeError;

/// Sends a GET request and rejects non-success statuses.
async fn get(client: &reqwest::Client, url: &str) -> Result<reqwest::Response, ScrapeError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ScrapeError::Status {
            url: url.to_owned(),
            status: status.as_u16(),
        });
    }
    Ok(response)
}

/// Downloads `url` into memory.
///
/// # Errors
///
/// Returns [`ScrapeError`] on connection failure, timeout, or non-2xx status.
pub async fn download_bytes(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, ScrapeError> {
    let response = get(client, url).await?;
    let bytes = response.bytes().await?;
    log::debug!("Downloaded {} bytes from {url}", bytes.len());
    Ok(bytes.to_vec())
}

/// Downloads `url` into an anonymous temp file, rewound to the start.
///
/// Returns the file handle and the number of bytes written.
///
/// # Errors
///
/// Returns [`ScrapeError`] on connection failure, timeout, non-2xx status,
/// or if the temp file cannot be written.
pub async fn download_to_tempfile(
    client: &reqwest::Client,
    url: &str,
) -> Result<(File, u64), ScrapeError> {
    let mut response = get(client, url).await?;
    let announced = response.content_length();

    let mut file = tempfile::tempfile()?;
    let mut written: u64 = 0;

    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk)?;
        written += chunk.len() as u64;
    }

    file.flush()?;
    file.seek(SeekFrom::Start(0))?;

    log::info!(
        "Downloaded {written} bytes from {url} (announced: {})",
        announced.map_or_else(|| "unknown".to_owned(), |n| n.to_string())
    );

    Ok((file, written))
}
