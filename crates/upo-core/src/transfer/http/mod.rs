//! Multipart HTTP upload over libcurl.
//!
//! One POST per file with the payload in a single form field. Upload progress
//! comes from curl's progress callback; the response body is JSON naming the
//! stored file. Runs on a blocking thread (curl easy is synchronous).

mod response;

use async_trait::async_trait;
use std::time::{Duration, Instant};

use crate::candidate::Source;
use crate::config::HttpConfig;

use super::{ProgressCallback, TransferClient, TransferError, TransferProgress, TransferRequest};

#[derive(Debug, Clone)]
pub struct HttpTransfer {
    endpoint: url::Url,
    field_name: String,
    result_field: String,
    connect_timeout: Duration,
    timeout: Duration,
}

impl HttpTransfer {
    pub fn from_config(cfg: &HttpConfig) -> anyhow::Result<Self> {
        Ok(Self {
            endpoint: cfg.endpoint_url()?,
            field_name: cfg.field_name.clone(),
            result_field: cfg.result_field.clone(),
            connect_timeout: cfg.connect_timeout(),
            timeout: cfg.timeout(),
        })
    }

    pub fn endpoint(&self) -> &url::Url {
        &self.endpoint
    }

    /// Performs the POST on the current thread.
    fn post_blocking(
        &self,
        request: &TransferRequest,
        progress: &ProgressCallback,
    ) -> Result<String, TransferError> {
        let mut easy = curl::easy::Easy::new();
        easy.url(self.endpoint.as_str())?;
        easy.follow_location(true)?;
        easy.connect_timeout(self.connect_timeout)?;
        easy.timeout(self.timeout)?;
        easy.progress(true)?;

        let mut headers = curl::easy::List::new();
        // No 100-continue round trip; send the body straight away.
        headers.append("Expect:")?;
        headers.append("Accept: application/json")?;
        easy.http_headers(headers)?;

        let mut form = curl::easy::Form::new();
        match &request.source {
            Source::Path(path) => form
                .part(&self.field_name)
                .file(path)
                .filename(&request.name)
                .content_type(&request.mime_type)
                .add()?,
            Source::Memory(data) => form
                .part(&self.field_name)
                .buffer(&request.name, data.to_vec())
                .content_type(&request.mime_type)
                .add()?,
        }
        easy.httppost(form)?;

        let started = Instant::now();
        let mut body = Vec::new();
        let mut last_percent: Option<u8> = None;
        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.progress_function(|_dltotal, _dlnow, ultotal, ulnow| {
                if ultotal > 0.0 {
                    let percent = (ulnow / ultotal * 100.0).floor().clamp(0.0, 100.0) as u8;
                    if last_percent != Some(percent) {
                        last_percent = Some(percent);
                        let secs = started.elapsed().as_secs_f64();
                        let bytes_per_sec = (secs > 0.0).then(|| ulnow / secs);
                        progress(TransferProgress {
                            percent,
                            bytes_per_sec,
                        });
                    }
                }
                true
            })?;
            transfer.perform()?;
        }

        let code = easy.response_code()?;
        if !(200..300).contains(&code) {
            return Err(TransferError::Http(code));
        }
        response::extract_result(&body, &self.result_field)
    }
}

#[async_trait]
impl TransferClient for HttpTransfer {
    async fn transfer(
        &self,
        request: TransferRequest,
        progress: ProgressCallback,
    ) -> Result<String, TransferError> {
        let client = self.clone();
        tokio::task::spawn_blocking(move || {
            tracing::debug!(name = %request.name, endpoint = %client.endpoint, "multipart upload");
            client.post_blocking(&request, &progress)
        })
        .await
        .map_err(|e| TransferError::other(format!("upload task join: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_requires_endpoint() {
        assert!(HttpTransfer::from_config(&HttpConfig::default()).is_err());
        let cfg = HttpConfig {
            endpoint: Some("https://example.com/api/upload/image".into()),
            ..HttpConfig::default()
        };
        let client = HttpTransfer::from_config(&cfg).unwrap();
        assert_eq!(client.endpoint().path(), "/api/upload/image");
        assert_eq!(client.field_name, "image");
    }
}
