//! Newline-delimited JSON framing shared by the process and HTTP adapters

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::event::EngineEvent;

/// Decode one event line. Blank lines are skipped; undecodable lines become
/// an internal failure so the session still sees a terminal event.
pub fn decode_line(line: &str) -> Option<EngineEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str::<EngineEvent>(line) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!("Undecodable engine event: {}", e);
            Some(EngineEvent::internal(format!("malformed engine event: {}", e)))
        }
    }
}

/// What the pump should do after forwarding an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// A terminal event was delivered, or nobody is listening any more.
    Stop,
}

pub async fn forward(tx: &mpsc::Sender<EngineEvent>, event: EngineEvent) -> Flow {
    let terminal = event.is_terminal();
    if tx.send(event).await.is_err() || terminal {
        Flow::Stop
    } else {
        Flow::Continue
    }
}

/// Why [`pump_lines`] stopped reading.
#[derive(Debug)]
pub enum LinesEnd {
    /// A terminal event went out, or the receiver is gone.
    Delivered,
    Cancelled,
    /// The stream ended before any terminal event.
    Eof,
    /// Reading failed. Invalid UTF-8 lands here.
    Failed(io::Error),
}

/// Forward one event per line of `reader` until a terminal event, the end of
/// the stream, a read error or cancellation. A final line without a trailing
/// newline is still decoded.
pub async fn pump_lines<R>(
    reader: R,
    tx: &mpsc::Sender<EngineEvent>,
    cancel: &CancellationToken,
) -> LinesEnd
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => return LinesEnd::Cancelled,
            line = lines.next_line() => line,
        };
        match line {
            Ok(Some(line)) => {
                let Some(event) = decode_line(&line) else { continue };
                if forward(tx, event).await == Flow::Stop {
                    return LinesEnd::Delivered;
                }
            }
            Ok(None) => return LinesEnd::Eof,
            Err(e) => return LinesEnd::Failed(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_line() {
        assert_eq!(decode_line("   "), None);
        assert_eq!(
            decode_line(r#"{"event":"done","trees":[]}"#),
            Some(EngineEvent::Done { trees: vec![] })
        );
        let failed = decode_line("{oops").unwrap();
        assert!(matches!(failed, EngineEvent::Failed { .. }));
        assert!(failed.is_terminal());
    }

    #[tokio::test]
    async fn test_forward_stops_on_terminal_or_closed() {
        let (tx, mut rx) = mpsc::channel(4);
        let tree = crucible_core::RecipeTreeNode::leaf("Air", "");
        assert_eq!(forward(&tx, EngineEvent::progress(tree)).await, Flow::Continue);
        assert_eq!(forward(&tx, EngineEvent::Done { trees: vec![] }).await, Flow::Stop);
        assert!(rx.recv().await.is_some());

        drop(rx);
        let tree = crucible_core::RecipeTreeNode::leaf("Air", "");
        assert_eq!(forward(&tx, EngineEvent::progress(tree)).await, Flow::Stop);
    }

    #[tokio::test]
    async fn test_pump_lines_reads_unterminated_last_line() {
        let input: &[u8] = concat!(
            "{\"event\":\"progress\",\"tree\":{\"name\":\"Steam\",\"image_path\":\"\"}}\r\n",
            "\n",
            "{\"event\":\"done\",\"trees\":[]}"
        )
        .as_bytes();
        let (tx, mut rx) = mpsc::channel(4);

        let end = pump_lines(input, &tx, &CancellationToken::new()).await;
        assert!(matches!(end, LinesEnd::Delivered));
        assert!(matches!(rx.recv().await, Some(EngineEvent::Progress { .. })));
        assert_eq!(rx.recv().await, Some(EngineEvent::Done { trees: vec![] }));
    }

    #[tokio::test]
    async fn test_pump_lines_eof_and_invalid_utf8() {
        let (tx, _rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();

        let empty: &[u8] = b"\n\n";
        assert!(matches!(pump_lines(empty, &tx, &cancel).await, LinesEnd::Eof));

        let garbled: &[u8] = b"{\"event\":\"done\",\"trees\":[\xff]}\n";
        match pump_lines(garbled, &tx, &cancel).await {
            LinesEnd::Failed(e) => assert_eq!(e.kind(), io::ErrorKind::InvalidData),
            other => panic!("unexpected end: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_pump_lines_stops_when_cancelled() {
        let (tx, _rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        cancel.cancel();

        // An open duplex pipe never reaches end of stream on its own.
        let (_writer, reader) = tokio::io::duplex(64);
        let reader = tokio::io::BufReader::new(reader);
        assert!(matches!(pump_lines(reader, &tx, &cancel).await, LinesEnd::Cancelled));
    }
}
