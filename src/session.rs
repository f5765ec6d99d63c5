//! Read session - orchestrates one complete card read.
//!
//! A session owns its transport. It selects the applet, reads the four data
//! blocks (and optionally the photo), decodes them into an
//! [`IdentityRecord`] and reports progress as [`ProgressEvent`]s:
//! one `START`, a `READING` per step, then exactly one `COMPLETE` or
//! `ERROR`. The card is disconnected after the terminal event on every
//! path; a failed disconnect is logged and otherwise ignored.

use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::apdu::{Apdu, CommandCatalog};
use crate::decode::{decode_address, decode_issue_expire, decode_personal_info};
use crate::error::{ReadError, TransportError};
use crate::photo::{assemble_photo, JpegBase64, PhotoEncoder};
use crate::sequencer::{send_command, ExchangeSettings};
use crate::transport::CardTransport;
use crate::types::{IdentityRecord, ProgressEvent, ReadStep, ReadingProgress};

/// Steps reported before the photo.
pub const DATA_STEPS: usize = 4;

/// Receives session events in order.
pub trait ProgressSink {
    fn emit(&mut self, event: ProgressEvent);
}

impl ProgressSink for Vec<ProgressEvent> {
    fn emit(&mut self, event: ProgressEvent) {
        self.push(event);
    }
}

impl ProgressSink for std::sync::mpsc::Sender<ProgressEvent> {
    fn emit(&mut self, event: ProgressEvent) {
        if self.send(event).is_err() {
            debug!("Progress receiver dropped");
        }
    }
}

impl ProgressSink for UnboundedSender<ProgressEvent> {
    fn emit(&mut self, event: ProgressEvent) {
        if self.send(event).is_err() {
            debug!("Progress receiver dropped");
        }
    }
}

/// Adapts a closure into a sink.
pub struct FnSink<F>(pub F);

impl<F: FnMut(ProgressEvent)> ProgressSink for FnSink<F> {
    fn emit(&mut self, event: ProgressEvent) {
        (self.0)(event)
    }
}

/// Sink that discards all events.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&mut self, _event: ProgressEvent) {}
}

/// Sink that logs events using tracing.
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn emit(&mut self, event: ProgressEvent) {
        match event {
            ProgressEvent::Start => info!("Reading card"),
            ProgressEvent::Reading(progress) => {
                info!(step = progress.step, of = progress.of, item = %progress.message, "Reading");
            }
            ProgressEvent::Complete(_) => info!("Card read complete"),
            ProgressEvent::Error(e) => error!("Card read failed: {}", e),
        }
    }
}

/// Per-session options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    pub with_photo: bool,
    pub exchange: ExchangeSettings,
}

/// Exclusive ownership of a connected card, disconnected exactly once.
///
/// Dropping an unreleased connection disconnects it too.
struct Connection<T: CardTransport> {
    transport: Option<T>,
}

impl<T: CardTransport> Connection<T> {
    fn new(transport: T) -> Self {
        Self {
            transport: Some(transport),
        }
    }

    fn transport(&mut self) -> Result<&mut T, TransportError> {
        self.transport.as_mut().ok_or(TransportError::Released)
    }

    fn release(mut self) {
        self.disconnect();
    }

    fn disconnect(&mut self) {
        if let Some(transport) = self.transport.take() {
            match transport.disconnect() {
                Ok(()) => debug!("Card disconnected"),
                Err(e) => warn!("Ignoring disconnect failure: {}", e),
            }
        }
    }
}

impl<T: CardTransport> Drop for Connection<T> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// One card read over an owned transport.
pub struct ReadSession<T: CardTransport> {
    connection: Connection<T>,
    catalog: Arc<CommandCatalog>,
    options: ReadOptions,
    encoder: Arc<dyn PhotoEncoder>,
}

impl<T: CardTransport> ReadSession<T> {
    pub fn new(transport: T, catalog: Arc<CommandCatalog>, options: ReadOptions) -> Self {
        Self {
            connection: Connection::new(transport),
            catalog,
            options,
            encoder: Arc::new(JpegBase64),
        }
    }

    /// Replace the photo encoder.
    pub fn with_encoder(mut self, encoder: Arc<dyn PhotoEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    /// Number of `READING` steps this session reports.
    pub fn total_steps(&self) -> usize {
        total_steps(&self.catalog, self.options.with_photo)
    }

    /// Run the session, emitting every event into `sink`.
    #[instrument(skip_all, fields(with_photo = self.options.with_photo))]
    pub fn run<S: ProgressSink + ?Sized>(self, sink: &mut S) {
        let (outcome, connection) = self.execute(sink);
        match outcome {
            Ok(record) => {
                info!("Card read complete");
                sink.emit(ProgressEvent::Complete(Box::new(record)));
            }
            Err(e) => {
                error!("Card read failed: {}", e);
                sink.emit(ProgressEvent::Error(e));
            }
        }
        connection.release();
    }

    /// Run the session without progress reporting and return its outcome.
    pub fn read(self) -> Result<IdentityRecord, ReadError> {
        let (outcome, connection) = self.execute(&mut NullSink);
        connection.release();
        outcome
    }

    fn execute<S: ProgressSink + ?Sized>(
        self,
        sink: &mut S,
    ) -> (Result<IdentityRecord, ReadError>, Connection<T>) {
        let total = self.total_steps();
        let ReadSession {
            mut connection,
            catalog,
            options,
            encoder,
        } = self;

        info!(total_steps = total, "Starting card read");
        sink.emit(ProgressEvent::Start);

        let outcome = connection.transport().map_err(ReadError::from).and_then(|transport| {
            let mut reader = RecordReader {
                transport,
                catalog: &catalog,
                options,
                total,
                sink,
            };
            reader.read_record(&*encoder)
        });

        (outcome, connection)
    }
}

/// Number of `READING` steps for a catalog.
pub fn total_steps(catalog: &CommandCatalog, with_photo: bool) -> usize {
    if with_photo {
        DATA_STEPS + catalog.photo.len()
    } else {
        DATA_STEPS
    }
}

struct RecordReader<'a, T, S: ?Sized> {
    transport: &'a mut T,
    catalog: &'a CommandCatalog,
    options: ReadOptions,
    total: usize,
    sink: &'a mut S,
}

impl<T: CardTransport, S: ProgressSink + ?Sized> RecordReader<'_, T, S> {
    fn progress(&mut self, step: usize, message: ReadStep) {
        self.sink.emit(ProgressEvent::Reading(ReadingProgress {
            step,
            of: self.total,
            message,
        }));
    }

    fn read_step(
        &mut self,
        step: usize,
        name: &'static str,
        message: ReadStep,
        command: &[Apdu],
    ) -> Result<String, ReadError> {
        let raw = send_command(self.transport, name, command, self.options.exchange)?;
        self.progress(step, message);
        Ok(raw)
    }

    fn read_record(&mut self, encoder: &dyn PhotoEncoder) -> Result<IdentityRecord, ReadError> {
        let exchange = self.options.exchange;
        let catalog = self.catalog;
        send_command(self.transport, "select", &catalog.select, exchange)?;

        let citizen_id = self.read_step(1, "citizen_id", ReadStep::CitizenId, &catalog.citizen_id)?;
        let raw_personal = self.read_step(2, "person_info", ReadStep::PersonalInfo, &catalog.person_info)?;
        let raw_address = self.read_step(3, "address", ReadStep::Address, &catalog.address)?;
        let raw_issue_expire =
            self.read_step(4, "issue_expire", ReadStep::IssueExpire, &catalog.issue_expire)?;

        let personal = decode_personal_info(&raw_personal)?;
        let address = decode_address(&raw_address);
        let (issue, expire) = decode_issue_expire(&raw_issue_expire)?;

        let photo = if self.options.with_photo {
            let total = self.total;
            let sink = &mut *self.sink;
            let bytes = assemble_photo(&mut *self.transport, &catalog.photo, exchange, |chunk| {
                sink.emit(ProgressEvent::Reading(ReadingProgress {
                    step: DATA_STEPS + chunk,
                    of: total,
                    message: ReadStep::Photo,
                }));
            })?;
            Some(encoder.encode(&bytes))
        } else {
            None
        };

        Ok(IdentityRecord {
            citizen_id: citizen_id.trim().to_string(),
            title_th: personal.name_th.title,
            first_name_th: personal.name_th.first,
            middle_name_th: personal.name_th.middle,
            last_name_th: personal.name_th.last,
            title_en: personal.name_en.title,
            first_name_en: personal.name_en.first,
            middle_name_en: personal.name_en.middle,
            last_name_en: personal.name_en.last,
            birthday: personal.birthday,
            gender: personal.gender,
            raw_address: address.parts,
            address: address.joined,
            issue,
            expire,
            photo,
        })
    }
}

/// Run a session on a dedicated thread, feeding its events to `sink`.
///
/// Does not need a tokio runtime.
pub fn run_in_background<T, S>(
    session: ReadSession<T>,
    mut sink: S,
) -> std::io::Result<std::thread::JoinHandle<()>>
where
    T: CardTransport + Send + 'static,
    S: ProgressSink + Send + 'static,
{
    std::thread::Builder::new()
        .name("thai-id-read".into())
        .spawn(move || session.run(&mut sink))
}

/// Run a session on tokio's blocking pool, streaming its events.
///
/// Must be called from within a tokio runtime.
pub fn spawn_read<T>(session: ReadSession<T>) -> (JoinHandle<()>, UnboundedReceiver<ProgressEvent>)
where
    T: CardTransport + Send + 'static,
{
    let (mut tx, rx) = unbounded_channel();
    let handle = tokio::task::spawn_blocking(move || session.run(&mut tx));
    (handle, rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;

    #[test]
    fn test_total_steps() {
        let catalog = CommandCatalog::thai_id();
        assert_eq!(total_steps(&catalog, false), 4);
        assert_eq!(total_steps(&catalog, true), 24);
    }

    #[test]
    fn test_select_failure_has_no_reading_events() {
        let mock = MockTransport::new();
        let handle = mock.clone();
        mock.queue_error("no card");

        let session = ReadSession::new(mock, Arc::new(CommandCatalog::thai_id()), ReadOptions::default());
        let mut events = Vec::new();
        session.run(&mut events);

        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], ProgressEvent::Start));
        assert!(matches!(events[1], ProgressEvent::Error(ReadError::Transport(_))));
        assert_eq!(handle.commands().len(), 1);
        assert_eq!(handle.disconnect_count(), 1);
    }

    #[test]
    fn test_dropped_session_disconnects() {
        let mock = MockTransport::new();
        let handle = mock.clone();
        let session = ReadSession::new(mock, Arc::new(CommandCatalog::thai_id()), ReadOptions::default());
        drop(session);
        assert_eq!(handle.disconnect_count(), 1);
    }

    #[derive(Clone, Default)]
    struct CapturedLog(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_tracing_sink_logs_each_event() {
        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let mut sink = TracingSink;
            sink.emit(ProgressEvent::Start);
            sink.emit(ProgressEvent::Reading(ReadingProgress {
                step: 2,
                of: 4,
                message: ReadStep::PersonalInfo,
            }));
            sink.emit(ProgressEvent::Error(ReadError::Transport(TransportError::Transmit(
                "card removed".into(),
            ))));
        });

        let output = String::from_utf8(log.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("Reading card"));
        assert!(output.contains("step=2"));
        assert!(output.contains("item=personal_info"));
        assert!(output.contains("Card read failed: Failed to transmit APDU: card removed"));
    }

    #[test]
    fn test_tracing_sink_drives_session() {
        let mock = MockTransport::new();
        let handle = mock.clone();
        mock.queue_error("no card");

        let session = ReadSession::new(mock, Arc::new(CommandCatalog::thai_id()), ReadOptions::default());
        session.run(&mut TracingSink);
        assert_eq!(handle.disconnect_count(), 1);
    }

    #[test]
    fn test_run_in_background() {
        let mock = MockTransport::new();
        let handle = mock.clone();
        mock.queue_error("no card");

        let session = ReadSession::new(mock, Arc::new(CommandCatalog::thai_id()), ReadOptions::default());
        let (tx, rx) = std::sync::mpsc::channel();
        let caller = std::thread::current().id();
        let worker = run_in_background(session, FnSink(move |event: ProgressEvent| {
            let _ = tx.send((std::thread::current().id(), event));
        }))
        .unwrap();
        worker.join().unwrap();

        let events: Vec<_> = rx.iter().collect();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|(thread, _)| *thread != caller));
        assert!(matches!(events[0].1, ProgressEvent::Start));
        assert!(matches!(events[1].1, ProgressEvent::Error(_)));
        assert_eq!(handle.disconnect_count(), 1);
    }

    #[test]
    fn test_fn_sink() {
        let mut labels = Vec::new();
        {
            let mut sink = FnSink(|event: ProgressEvent| labels.push(event.is_terminal()));
            sink.emit(ProgressEvent::Start);
            NullSink.emit(ProgressEvent::Start);
        }
        assert_eq!(labels, vec![false]);
    }
}
