//! JSON-lines transport.
//!
//! Writes one JSON object per frame to any writer, for piping frames to a
//! remote display surface:
//!
//! ```text
//! {"session":"s-1","text":"[0%] | elapsed 00:00\n...","duration_ms":null}
//! ```

use super::{DisplayOptions, Transport};
use crate::model::{SessionId, TransportError};
use serde::Serialize;
use std::io::{self, Write};

#[derive(Debug, Serialize)]
struct FrameRecord<'a> {
    session: &'a str,
    text: &'a str,
    duration_ms: Option<u64>,
}

/// Writes each frame as one JSON object per line.
#[derive(Debug)]
pub struct JsonLinesTransport<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesTransport<W> {
    /// Transport writing to `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// The underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Unwrap the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Transport for JsonLinesTransport<W> {
    fn display(
        &mut self,
        session: &SessionId,
        text: &str,
        options: DisplayOptions,
    ) -> Result<(), TransportError> {
        let record = FrameRecord {
            session: session.as_str(),
            text,
            duration_ms: options.duration_ms,
        };
        let line = serde_json::to_string(&record)?;
        writeln!(self.writer, "{line}")
            .and_then(|()| self.writer.flush())
            .map_err(|err| match err.kind() {
                // Reader went away: same meaning as a closed display channel.
                io::ErrorKind::BrokenPipe => TransportError::ConnectionClosed(session.clone()),
                _ => TransportError::Io(err),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "reader closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn writes_one_json_object_per_frame() {
        let mut transport = JsonLinesTransport::new(Vec::new());
        let session = SessionId::new("s-1").unwrap();
        transport
            .display(&session, "[0%] | elapsed 00:00\nhello", DisplayOptions::default())
            .unwrap();
        transport
            .display(&session, "*** END OF TEXT ***", DisplayOptions::for_duration(10_000))
            .unwrap();

        let output = String::from_utf8(transport.into_inner()).unwrap();
        let records: Vec<serde_json::Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["session"], "s-1");
        assert_eq!(records[0]["text"], "[0%] | elapsed 00:00\nhello");
        assert!(records[0]["duration_ms"].is_null());
        assert_eq!(records[1]["duration_ms"], 10_000);
    }

    #[test]
    fn broken_pipe_maps_to_connection_closed() {
        let mut transport = JsonLinesTransport::new(BrokenPipe);
        let session = SessionId::new("s-2").unwrap();
        let result = transport.display(&session, "frame", DisplayOptions::default());
        assert!(matches!(result, Err(TransportError::ConnectionClosed(_))));
    }
}
