use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A non-blank input line and its 1-based position in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub number: usize,
    pub text: String,
}

/// Spawns a task that reads lines from `reader` and sends the non-blank ones
/// over a bounded channel, so batching can start before the input ends.
///
/// The task resolves to the number of lines read. An I/O error stops the
/// reader and is returned through the `JoinHandle`; dropping the receiver
/// stops it early without error.
///
/// # Example
/// ```ignore
/// let file = tokio::fs::File::open("messages.jsonl").await?;
/// let (handle, mut rx) = spawn_line_reader(file, 100);
///
/// while let Some(line) = rx.recv().await {
///     println!("{}: {}", line.number, line.text);
/// }
/// handle.await??;
/// ```
pub fn spawn_line_reader<R: AsyncRead + Unpin + Send + 'static>(
    reader: R,
    channel_capacity: usize,
) -> (JoinHandle<std::io::Result<usize>>, mpsc::Receiver<Line>) {
    let (tx, rx) = mpsc::channel::<Line>(channel_capacity);
    let buffer = BufReader::new(reader);

    let task = tokio::spawn(async move {
        let mut lines = buffer.lines();
        let mut number = 0;
        loop {
            match lines.next_line().await {
                Ok(Some(text)) => {
                    number += 1;
                    if text.trim().is_empty() {
                        continue;
                    }
                    if tx.send(Line { number, text }).await.is_err() {
                        log::debug!("receiver dropped after line {number}, stopping reader");
                        break;
                    }
                }
                Ok(None) => {
                    log::trace!("reached EOF after {number} lines");
                    break;
                }
                Err(e) => {
                    log::error!("I/O error after line {number}: {e}");
                    return Err(e);
                }
            }
        }
        Ok(number)
    });

    (task, rx)
}
