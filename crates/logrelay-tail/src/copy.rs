//! Background task that pumps one byte stream into another
//!
//! Used on the consumer side of a relay session to move bytes from the pipe
//! reader to the console writer. The task never panics on I/O failure: the
//! first error is recorded in [`CopyTaskResult`] and the caller decides what
//! to show.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;

use logrelay_core::prelude::*;

const COPY_BUFFER_SIZE: usize = 8192;

/// Outcome of one stream copy
#[derive(Debug, Default)]
pub struct CopyTaskResult {
    /// Bytes written to the output before the copy stopped
    pub bytes_copied: u64,
    /// First read, write or flush failure, if any
    pub failure: Option<Error>,
}

impl CopyTaskResult {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

/// Copy `input` into `output` until end of stream or the first failure
pub async fn copy_stream<R, W>(input: &mut R, output: &mut W) -> CopyTaskResult
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut result = CopyTaskResult::default();
    let mut buf = vec![0u8; COPY_BUFFER_SIZE];

    loop {
        let n = match input.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                result.failure = Some(Error::Io(e));
                break;
            }
        };
        if let Err(e) = write_counted(output, &buf[..n], &mut result.bytes_copied).await {
            result.failure = Some(Error::Io(e));
            break;
        }
    }

    if result.failure.is_none() {
        if let Err(e) = output.flush().await {
            result.failure = Some(Error::Io(e));
        }
    }
    result
}

/// Write all of `chunk`, adding each accepted write to `counter` as it lands
pub(crate) async fn write_counted<W>(
    output: &mut W,
    mut chunk: &[u8],
    counter: &mut u64,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    while !chunk.is_empty() {
        let written = output.write(chunk).await?;
        if written == 0 {
            return Err(io::ErrorKind::WriteZero.into());
        }
        *counter += written as u64;
        chunk = &chunk[written..];
    }
    Ok(())
}

/// Handle to a spawned [`copy_stream`] task
#[derive(Debug)]
pub struct CopyRelayTask<W> {
    name: String,
    handle: JoinHandle<(CopyTaskResult, Option<W>)>,
}

impl<W> CopyRelayTask<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// Spawn a copy from `input` to `output`.
    ///
    /// The input is always dropped when the copy ends. With `close_output`
    /// the output is shut down and dropped; otherwise it is flushed and
    /// handed back by [`join`](Self::join) so the caller keeps using it.
    pub fn spawn<R>(name: impl Into<String>, input: R, output: W, close_output: bool) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let name = name.into();
        let task_name = name.clone();
        let handle = tokio::spawn(async move {
            let mut input = input;
            let mut output = output;
            let result = copy_stream(&mut input, &mut output).await;
            drop(input);

            match &result.failure {
                None => debug!("{}: copied {} bytes", task_name, result.bytes_copied),
                Some(e) => warn!(
                    "{}: copy stopped after {} bytes: {}",
                    task_name, result.bytes_copied, e
                ),
            }

            if close_output {
                if let Err(e) = output.shutdown().await {
                    debug!("{}: output shutdown error (ignored): {}", task_name, e);
                }
                (result, None)
            } else {
                (result, Some(output))
            }
        });
        Self { name, handle }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the copy to end
    pub async fn join(self) -> Result<(CopyTaskResult, Option<W>)> {
        self.handle
            .await
            .map_err(|e| Error::task_aborted(format!("{}: {}", self.name, e)))
    }

    pub fn abort(&self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FailingWriter;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_copy_stream_until_eof() {
        let mut input = Builder::new().read(b"hello ").read(b"world").build();
        let mut output = Builder::new().write(b"hello ").write(b"world").build();

        let result = copy_stream(&mut input, &mut output).await;
        assert!(result.is_success());
        assert_eq!(result.bytes_copied, 11);
    }

    #[tokio::test]
    async fn test_copy_stream_records_read_failure() {
        let mut input = Builder::new()
            .read(b"partial")
            .read_error(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            .build();
        let mut output = Vec::new();

        let result = copy_stream(&mut input, &mut output).await;
        assert_eq!(output, b"partial");
        assert_eq!(result.bytes_copied, 7);
        assert!(matches!(result.failure, Some(Error::Io(ref e)) if e.kind() == io::ErrorKind::ConnectionReset));
    }

    #[tokio::test]
    async fn test_copy_stream_records_write_failure() {
        let mut input = Builder::new().read(b"first").read(b"second").build();
        let mut output = Builder::new()
            .write(b"first")
            .write_error(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
            .build();

        let result = copy_stream(&mut input, &mut output).await;
        assert_eq!(result.bytes_copied, 5);
        assert!(matches!(result.failure, Some(Error::Io(ref e)) if e.kind() == io::ErrorKind::BrokenPipe));
    }

    #[tokio::test]
    async fn test_partial_write_is_counted() {
        let mut input = Builder::new().read(b"abcdefgh").build();
        let mut output = FailingWriter::new(3);

        let result = copy_stream(&mut input, &mut output).await;
        assert_eq!(output.written, b"abc");
        assert_eq!(result.bytes_copied, 3);
        assert!(!result.is_success());
    }

    #[tokio::test]
    async fn test_spawned_copy_hands_back_open_output() {
        let (mut writer, reader) = tokio::io::duplex(64);
        let task = CopyRelayTask::spawn("console", reader, Vec::new(), false);
        assert_eq!(task.name(), "console");

        writer.write_all(b"line one\nline two\n").await.unwrap();
        drop(writer);

        let (result, output) = task.join().await.unwrap();
        assert!(result.is_success());
        assert_eq!(output.unwrap(), b"line one\nline two\n");
    }

    #[tokio::test]
    async fn test_spawned_copy_closes_output_when_asked() {
        let (mut writer, reader) = tokio::io::duplex(64);
        let (sink, mut sink_reader) = tokio::io::duplex(64);
        let task = CopyRelayTask::spawn("pipe", reader, sink, true);

        writer.write_all(b"payload").await.unwrap();
        drop(writer);

        let (result, output) = task.join().await.unwrap();
        assert_eq!(result.bytes_copied, 7);
        assert!(output.is_none());

        let mut received = Vec::new();
        sink_reader.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"payload");
    }

    #[tokio::test]
    async fn test_aborted_copy_reports_task_aborted() {
        let (_writer, reader) = tokio::io::duplex(64);
        let task = CopyRelayTask::spawn("stuck", reader, Vec::new(), false);
        task.abort();

        let err = task.join().await.unwrap_err();
        assert!(matches!(err, Error::TaskAborted { .. }));
        assert!(err.to_string().contains("stuck"));
    }
}
