use std::{future::Future, thread};

use tokio::runtime::{Builder, Handle, Runtime};

use crate::model::fs::AssetError;

/// Drives async HTTP calls to completion from synchronous filesystem calls.
///
/// When the caller already runs inside a tokio runtime the future is driven
/// on a scoped helper thread, since blocking on a runtime from within one
/// panics.
pub struct Poller {
    runtime: Option<Runtime>,
}

impl Poller {
    pub fn new() -> std::io::Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self {
            runtime: Some(runtime),
        })
    }

    pub fn poll_until_ready_error<Fut, T>(&self, future: Fut) -> Result<T, AssetError>
    where
        Fut: Future<Output = Result<T, AssetError>> + Send,
        T: Send,
    {
        let runtime = self
            .runtime
            .as_ref()
            .ok_or_else(|| AssetError::Transport("runtime already shut down".to_string()))?;

        if Handle::try_current().is_err() {
            return runtime.block_on(future);
        }

        thread::scope(|scope| {
            scope
                .spawn(|| runtime.block_on(future))
                .join()
                .unwrap_or_else(|_| {
                    Err(AssetError::Transport("request thread panicked".to_string()))
                })
        })
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        // Dropping a runtime blocks, which panics inside an async context.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_until_ready_error() {
        let poller = Poller::new().unwrap();

        let ok = poller.poll_until_ready_error(async { Ok(1) });
        assert_eq!(ok.unwrap(), 1);

        let err: Result<u8, AssetError> = poller
            .poll_until_ready_error(async { Err(AssetError::Transport("failed".to_string())) });
        assert!(matches!(err, Err(AssetError::Transport(_))));
    }

    #[test]
    fn test_poll_timer() {
        let poller = Poller::new().unwrap();
        let result = poller.poll_until_ready_error(async {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            Ok("done")
        });
        assert_eq!(result.unwrap(), "done");
    }

    #[tokio::test]
    async fn test_poll_inside_runtime() {
        let poller = Poller::new().unwrap();
        let result = poller.poll_until_ready_error(async {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            Ok(42)
        });
        assert_eq!(result.unwrap(), 42);

        drop(poller);
    }
}
