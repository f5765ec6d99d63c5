//! Node bindings.

use napi::threadsafe_function::{
    ErrorStrategy, ThreadSafeCallContext, ThreadsafeFunction, ThreadsafeFunctionCallMode,
};
use napi::JsFunction;
use napi_derive::napi;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::config::ReaderConfig;
use crate::reader::CardReader;
use crate::session::{run_in_background, FnSink, ReadOptions, ReadSession};
use crate::types::{CardStatus, ProgressEvent};

fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::new(napi::Status::GenericFailure, e.to_string())
}

/// Card status information
#[napi(object)]
pub struct JsCardStatus {
    pub present: bool,
    pub empty: bool,
    pub mute: bool,
}

impl From<CardStatus> for JsCardStatus {
    fn from(status: CardStatus) -> Self {
        Self {
            present: status.present,
            empty: status.empty,
            mute: status.mute,
        }
    }
}

#[napi]
pub struct ThaiIdReader {
    reader: CardReader,
    config: ReaderConfig,
}

#[napi]
impl ThaiIdReader {
    /// Establish a PC/SC context, optionally with a JSON config file.
    #[napi(constructor)]
    pub fn new(config_path: Option<String>) -> napi::Result<Self> {
        let config = match config_path {
            Some(path) => ReaderConfig::load(path).map_err(to_napi_error)?,
            None => ReaderConfig::default(),
        };
        let reader = CardReader::new().map_err(to_napi_error)?;
        Ok(Self { reader, config })
    }

    /// List available card readers
    #[napi]
    pub fn list_readers(&self) -> napi::Result<Vec<String>> {
        self.reader.list_readers().map_err(to_napi_error)
    }

    /// Get card status for a specific reader
    #[napi]
    pub fn get_status(&self, reader_name: String) -> napi::Result<JsCardStatus> {
        self.reader
            .card_status(&reader_name)
            .map(JsCardStatus::from)
            .map_err(to_napi_error)
    }

    /// Wait for a card to be inserted
    #[napi]
    pub async fn wait_for_card(&self, reader_name: String, timeout_ms: u32) -> napi::Result<JsCardStatus> {
        let reader = self.reader.clone();
        let timeout = Duration::from_millis(u64::from(timeout_ms));
        tokio::task::spawn_blocking(move || reader.wait_for_card(&reader_name, timeout))
            .await
            .map_err(to_napi_error)?
            .map(JsCardStatus::from)
            .map_err(to_napi_error)
    }

    /// Read the card in `readerName` on a worker thread.
    ///
    /// Returns once the card is connected. `callback` then receives each
    /// `{ status, obj }` progress event in order, ending with `COMPLETE`
    /// or `ERROR`.
    #[napi]
    pub fn read_card(&self, reader_name: String, with_photo: bool, callback: JsFunction) -> napi::Result<()> {
        let deliver: ThreadsafeFunction<serde_json::Value, ErrorStrategy::Fatal> = callback
            .create_threadsafe_function(0, |ctx: ThreadSafeCallContext<serde_json::Value>| {
                ctx.env.to_js_value(&ctx.value).map(|value| vec![value])
            })?;

        let transport = self
            .reader
            .connect(&reader_name, self.config.share_mode, self.config.protocol)
            .map_err(to_napi_error)?;

        let options = ReadOptions {
            with_photo,
            exchange: self.config.exchange(),
        };
        let session = ReadSession::new(transport, Arc::new(self.config.catalog.clone()), options);

        let sink = FnSink(move |event: ProgressEvent| match serde_json::to_value(&event) {
            Ok(value) => {
                let status = deliver.call(value, ThreadsafeFunctionCallMode::NonBlocking);
                if status != napi::Status::Ok {
                    warn!("Progress callback not queued: {:?}", status);
                }
            }
            Err(e) => warn!("Failed to serialize progress event: {}", e),
        });
        run_in_background(session, sink).map_err(to_napi_error)?;
        Ok(())
    }
}

/// Get library version
#[napi]
pub fn get_version() -> String {
    crate::version().to_string()
}
