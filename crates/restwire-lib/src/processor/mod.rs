//! The serialization contract a host invokes to move typed values across the
//! wire, independent of the codec behind it.

use bytes::Buf;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::ProcessorError;

/// A codec the host plugs into its request/response pipeline.
///
/// Implementations hold only immutable configuration and are shared across
/// threads.
pub trait SerializationProcessor: Send + Sync {
    /// Serialize a value into text. A top-level null (`None`, `()`) yields
    /// an empty string.
    fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, ProcessorError>;

    /// Deserialize text into `T`. Absent or blank text yields `None`.
    fn deserialize_str<T: DeserializeOwned>(
        &self,
        text: Option<&str>,
    ) -> Result<Option<T>, ProcessorError>;

    /// Deserialize a byte buffer into `T`. An empty or blank buffer yields
    /// `None`.
    fn deserialize_bytes<T: DeserializeOwned, B: Buf>(
        &self,
        buf: B,
    ) -> Result<Option<T>, ProcessorError>;

    /// Media type of everything [`serialize`](Self::serialize) produces.
    fn resulting_content_type(&self) -> &'static str;
}
