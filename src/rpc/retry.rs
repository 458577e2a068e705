use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use super::FetchError;

/// Fixed-delay retry: at most `1 + max_retries` attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Run `op` until it succeeds or retries are exhausted. The final error is
    /// wrapped with the endpoint and attempt count.
    pub async fn run<T, F, Fut>(&self, endpoint: &str, mut op: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        "Request {endpoint} failed: {e}. Retrying ({attempt}/{})",
                        self.max_retries
                    );
                    sleep(self.delay).await;
                }
                Err(e) => {
                    return Err(FetchError::RetriesExhausted {
                        endpoint: endpoint.to_string(),
                        attempts: attempt + 1,
                        source: Box::new(e),
                    });
                }
            }
        }
    }
}
