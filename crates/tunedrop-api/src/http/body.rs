//! Response body that owns the request workspace until the transfer ends.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use tunedrop_fsops::Workspace;

/// Forwards `inner` and releases the workspace once the stream is exhausted,
/// fails, or is dropped by a disconnecting client.
pub(crate) struct WorkspaceStream<S> {
    inner: S,
    workspace: Option<Workspace>,
}

impl<S> WorkspaceStream<S> {
    pub(crate) const fn new(inner: S, workspace: Workspace) -> Self {
        Self {
            inner,
            workspace: Some(workspace),
        }
    }

    fn finish(&mut self) {
        if let Some(workspace) = self.workspace.take() {
            workspace.release();
        }
    }
}

impl<S, T, E> Stream for WorkspaceStream<S>
where
    S: Stream<Item = Result<T, E>> + Unpin,
{
    type Item = Result<T, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let polled = Pin::new(&mut self.inner).poll_next(cx);
        match &polled {
            Poll::Ready(None | Some(Err(_))) => self.finish(),
            Poll::Ready(Some(Ok(_))) | Poll::Pending => {}
        }
        polled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::future::poll_fn;
    use tunedrop_fsops::WorkspaceManager;

    struct Chunks(VecDeque<Result<&'static str, ()>>);

    impl Stream for Chunks {
        type Item = Result<&'static str, ()>;

        fn poll_next(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
            Poll::Ready(self.0.pop_front())
        }
    }

    async fn next<S: Stream + Unpin>(stream: &mut S) -> Option<S::Item> {
        poll_fn(|cx| Pin::new(&mut *stream).poll_next(cx)).await
    }

    #[tokio::test]
    async fn workspace_released_at_end_of_stream() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let manager = WorkspaceManager::new(temp.path());
        let workspace = manager.allocate()?;
        let path = workspace.path().to_path_buf();

        let mut stream = WorkspaceStream::new(Chunks(VecDeque::from([Ok("a"), Ok("b")])), workspace);
        assert_eq!(next(&mut stream).await, Some(Ok("a")));
        assert!(path.exists());
        assert_eq!(next(&mut stream).await, Some(Ok("b")));
        assert_eq!(next(&mut stream).await, None);
        assert!(!path.exists());
        assert_eq!(manager.active(), 0);
        drop(stream);
        assert_eq!(manager.active(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn workspace_released_when_dropped_mid_transfer() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let manager = WorkspaceManager::new(temp.path());
        let workspace = manager.allocate()?;
        let path = workspace.path().to_path_buf();

        let mut stream = WorkspaceStream::new(Chunks(VecDeque::from([Ok("a"), Ok("b")])), workspace);
        assert_eq!(next(&mut stream).await, Some(Ok("a")));
        drop(stream);
        assert!(!path.exists());
        assert_eq!(manager.active(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn workspace_released_on_stream_error() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let manager = WorkspaceManager::new(temp.path());
        let workspace = manager.allocate()?;
        let path = workspace.path().to_path_buf();

        let mut stream = WorkspaceStream::new(Chunks(VecDeque::from([Err(())])), workspace);
        assert_eq!(next(&mut stream).await, Some(Err(())));
        assert!(!path.exists());
        Ok(())
    }
}
