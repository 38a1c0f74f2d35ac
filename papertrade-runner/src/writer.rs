//! Background record writer.
//!
//! `BackgroundSink` moves a `RecordSink` onto its own thread and feeds it
//! through a channel, so the driver thread never waits on file I/O. Writes
//! that fail on the writer thread come back over a second channel and are
//! reported by `drain_failures` on a later step.

use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use tracing::{debug, error};

use papertrade_core::error::SinkError;
use papertrade_core::sink::{CandleRecord, PositionRecord, RecordKind, RecordSink, SinkFailure};

enum WriterMessage {
    Candle(CandleRecord),
    Position(PositionRecord),
    Flush(Sender<Result<(), SinkError>>),
}

pub struct BackgroundSink {
    messages: Option<Sender<WriterMessage>>,
    failures: Receiver<SinkFailure>,
    join: Option<JoinHandle<()>>,
}

impl BackgroundSink {
    /// Start the writer thread that owns `inner`.
    pub fn spawn<S: RecordSink + 'static>(inner: S) -> io::Result<Self> {
        let (message_tx, message_rx) = mpsc::channel();
        let (failure_tx, failure_rx) = mpsc::channel();
        let join = thread::Builder::new()
            .name("papertrade-writer".into())
            .spawn(move || writer_loop(inner, message_rx, failure_tx))?;
        Ok(Self {
            messages: Some(message_tx),
            failures: failure_rx,
            join: Some(join),
        })
    }

    fn send(&self, message: WriterMessage) -> Result<(), SinkError> {
        self.messages
            .as_ref()
            .ok_or_else(|| SinkError::new("writer closed"))?
            .send(message)
            .map_err(|_| SinkError::new("writer thread stopped"))
    }
}

fn writer_loop<S: RecordSink>(
    mut inner: S,
    messages: Receiver<WriterMessage>,
    failures: Sender<SinkFailure>,
) {
    for message in messages {
        let (record, result) = match message {
            WriterMessage::Candle(r) => (RecordKind::Candle, inner.record_candle(&r)),
            WriterMessage::Position(r) => (RecordKind::Position, inner.record_position(&r)),
            WriterMessage::Flush(ack) => {
                // The requester may have given up waiting.
                let _ = ack.send(inner.flush());
                continue;
            }
        };
        if let Err(error) = result {
            error!(%error, ?record, "record write failed");
            // Receiver gone means the driver is shutting down.
            let _ = failures.send(SinkFailure { record, error });
        }
    }
    if let Err(error) = inner.flush() {
        error!(%error, "final record flush failed");
    }
    debug!("record writer stopped");
}

impl RecordSink for BackgroundSink {
    fn record_candle(&mut self, record: &CandleRecord) -> Result<(), SinkError> {
        self.send(WriterMessage::Candle(record.clone()))
    }

    fn record_position(&mut self, record: &PositionRecord) -> Result<(), SinkError> {
        self.send(WriterMessage::Position(record.clone()))
    }

    fn drain_failures(&mut self) -> Vec<SinkFailure> {
        self.failures.try_iter().collect()
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        let (ack_tx, ack_rx) = mpsc::channel();
        self.send(WriterMessage::Flush(ack_tx))?;
        ack_rx
            .recv()
            .map_err(|_| SinkError::new("writer thread stopped"))?
    }
}

impl Drop for BackgroundSink {
    fn drop(&mut self) {
        // Closing the channel ends the writer loop once the queue is empty.
        self.messages.take();
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                error!("record writer panicked");
            }
        }
    }
}
