//! Stream relays between the local process and the remote channel
//!
//! Three tasks run side by side for the lifetime of a command: one reads
//! local stdin and queues it for the channel, one writes remote stdout, one
//! writes remote stderr. A cancellation token stops the input pump once the
//! remote side is done; the output writers stop when their queue closes.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Read buffer size for local input
const INPUT_CHUNK_SIZE: usize = 8192;

/// Queue depth between the input pump and the channel loop
pub const INPUT_QUEUE_CAPACITY: usize = 64;

/// Something read from local input
#[derive(Debug, PartialEq, Eq)]
pub enum LocalInput {
    Data(Vec<u8>),
    Eof,
}

/// The local end of a session: where input comes from and output goes to
pub struct SessionIo<I, O, E> {
    pub stdin: I,
    pub stdout: O,
    pub stderr: E,
}

impl SessionIo<tokio::io::Stdin, tokio::io::Stdout, tokio::io::Stderr> {
    /// Bind the session to this process's standard streams
    pub fn stdio() -> Self {
        Self {
            stdin: tokio::io::stdin(),
            stdout: tokio::io::stdout(),
            stderr: tokio::io::stderr(),
        }
    }
}

/// Copy local input into `tx` until EOF, a closed queue or cancellation
pub fn spawn_input_pump<R>(
    mut reader: R,
    tx: mpsc::Sender<LocalInput>,
    cancel: CancellationToken,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![0u8; INPUT_CHUNK_SIZE];
        loop {
            let input = tokio::select! {
                _ = cancel.cancelled() => break,
                read = reader.read(&mut buf) => match read {
                    Ok(0) => LocalInput::Eof,
                    Ok(n) => LocalInput::Data(buf[..n].to_vec()),
                    Err(e) => {
                        tracing::warn!("Error reading local input: {}", e);
                        break;
                    }
                },
            };

            // The channel loop may stop draining a full queue, so a pending send must
            // also give way to cancellation.
            let done = input == LocalInput::Eof;
            tokio::select! {
                _ = cancel.cancelled() => break,
                sent = tx.send(input) => if sent.is_err() {
                    tracing::debug!("Remote input closed");
                    break;
                },
            }
            if done {
                tracing::debug!("Local input closed");
                break;
            }
        }
    })
}

/// Write every queued chunk to `writer`, flushing after each one
pub fn spawn_output_writer<W>(
    mut rx: mpsc::UnboundedReceiver<Vec<u8>>,
    mut writer: W,
) -> JoinHandle<()>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(chunk) = rx.recv().await {
            if let Err(e) = write_chunk(&mut writer, &chunk).await {
                tracing::warn!("Error writing remote output: {}", e);
                break;
            }
        }
    })
}

async fn write_chunk<W: AsyncWrite + Unpin>(writer: &mut W, chunk: &[u8]) -> std::io::Result<()> {
    writer.write_all(chunk).await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(mut rx: mpsc::Receiver<LocalInput>) -> Vec<LocalInput> {
        let mut received = Vec::new();
        while let Some(input) = rx.recv().await {
            received.push(input);
        }
        received
    }

    #[tokio::test]
    async fn test_input_pump_forwards_until_eof() {
        let (tx, rx) = mpsc::channel(INPUT_QUEUE_CAPACITY);
        let input: &[u8] = b"ls -la\r";
        let handle = spawn_input_pump(input, tx, CancellationToken::new());
        handle.await.unwrap();

        assert_eq!(
            collect(rx).await,
            vec![LocalInput::Data(b"ls -la\r".to_vec()), LocalInput::Eof]
        );
    }

    #[tokio::test]
    async fn test_input_pump_stops_on_cancel() {
        let (tx, rx) = mpsc::channel(INPUT_QUEUE_CAPACITY);
        let (_keep_open, reader) = tokio::io::duplex(64);
        let cancel = CancellationToken::new();
        let handle = spawn_input_pump(reader, tx, cancel.clone());

        cancel.cancel();
        handle.await.unwrap();
        assert!(collect(rx).await.is_empty());
    }

    #[tokio::test]
    async fn test_input_pump_stops_when_loop_gone() {
        let (tx, rx) = mpsc::channel(INPUT_QUEUE_CAPACITY);
        drop(rx);
        let (mut writer, reader) = tokio::io::duplex(64);
        let handle = spawn_input_pump(reader, tx, CancellationToken::new());

        writer.write_all(b"q").await.unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_input_pump_stops_on_cancel_with_full_queue() {
        let (tx, rx) = mpsc::channel(1);
        let watch = tx.clone();
        let cancel = CancellationToken::new();
        let handle = spawn_input_pump(tokio::io::repeat(b'y'), tx, cancel.clone());

        // Let the pump fill the queue and block on the next send
        while watch.capacity() > 0 {
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        cancel.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .expect("input pump did not stop after cancellation")
            .unwrap();
        drop(rx);
    }

    #[tokio::test]
    async fn test_output_writer_preserves_order() {
        let (tx, rx) = mpsc::unbounded_channel();
        let (writer, mut reader) = tokio::io::duplex(1024);
        let handle = spawn_output_writer(rx, writer);

        tx.send(b"first ".to_vec()).unwrap();
        tx.send(b"second\r\n".to_vec()).unwrap();
        drop(tx);
        handle.await.unwrap();

        let mut out = String::new();
        reader.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "first second\r\n");
    }
}
