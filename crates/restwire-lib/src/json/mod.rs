//! JSON serialization processor.
//!
//! [`JsonProcessor`] plugs a configured [`Mapper`] into the
//! [`SerializationProcessor`] contract. The mapper is assembled once, by a
//! [`JsonProcessorBuilder`] running ordered configuration steps, and is
//! shared read-only afterwards.

mod de;
mod mapper;
mod module;
mod options;
mod ser;

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use bytes::Buf;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub use mapper::Mapper;
pub use module::{EpochMillisAdapter, Module, TimepointAdapter, TypeAdapter};
pub use options::{Inclusion, MapperOptions};

use crate::content_type;
use crate::errors::ProcessorError;
use crate::processor::SerializationProcessor;

/// Register the default type adapters: ISO-8601 time points.
pub fn install_type_adapters(module: &mut Module) {
    module.register(TimepointAdapter);
}

/// Reset the leniency, inclusion and date settings to their defaults.
/// Output indentation is left as configured.
pub fn apply_mapper_options(options: &mut MapperOptions) {
    let defaults = MapperOptions::default();
    options.accept_empty_string_as_null = defaults.accept_empty_string_as_null;
    options.fail_on_empty_beans = defaults.fail_on_empty_beans;
    options.fail_on_unknown_properties = defaults.fail_on_unknown_properties;
    options.inclusion = defaults.inclusion;
    options.date_format = defaults.date_format;
}

type ModuleStep = Box<dyn FnOnce(&mut Module) + Send>;
type OptionsStep = Box<dyn FnOnce(&mut MapperOptions) + Send>;

enum Step {
    Module(ModuleStep),
    Options(OptionsStep),
}

/// Assembles a [`JsonProcessor`].
///
/// The base steps run first: [`install_type_adapters`] on a fresh module
/// (skipped when a module is supplied) and [`apply_mapper_options`]
/// (skipped when options are supplied). Caller steps then run in the order
/// they were added, so a later step sees and may override everything before it.
#[derive(Default)]
pub struct JsonProcessorBuilder {
    module: Option<Module>,
    options: Option<MapperOptions>,
    steps: Vec<Step>,
}

impl JsonProcessorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from this module instead of one holding the default adapters.
    pub fn module(mut self, module: Module) -> Self {
        self.module = Some(module);
        self
    }

    /// Start from these options instead of the defaults.
    pub fn options(mut self, options: MapperOptions) -> Self {
        self.options = Some(options);
        self
    }

    pub fn configure_module<F>(mut self, step: F) -> Self
    where
        F: FnOnce(&mut Module) + Send + 'static,
    {
        self.steps.push(Step::Module(Box::new(step)));
        self
    }

    pub fn configure_options<F>(mut self, step: F) -> Self
    where
        F: FnOnce(&mut MapperOptions) + Send + 'static,
    {
        self.steps.push(Step::Options(Box::new(step)));
        self
    }

    pub fn build(self) -> JsonProcessor {
        let mut module = self.module.unwrap_or_else(|| {
            let mut module = Module::new();
            install_type_adapters(&mut module);
            module
        });
        let mut options = self.options.unwrap_or_else(|| {
            let mut options = MapperOptions::default();
            apply_mapper_options(&mut options);
            options
        });

        for step in self.steps {
            match step {
                Step::Module(step) => step(&mut module),
                Step::Options(step) => step(&mut options),
            }
        }

        tracing::debug!(
            adapters = module.len(),
            inclusion = ?options.inclusion,
            date_format = %options.date_format,
            "json processor configured"
        );
        JsonProcessor::with_mapper(Mapper::new(module, options))
    }
}

impl fmt::Debug for JsonProcessorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonProcessorBuilder")
            .field("module", &self.module)
            .field("options", &self.options)
            .field("steps", &self.steps.len())
            .finish()
    }
}

/// JSON implementation of [`SerializationProcessor`].
///
/// Cloning is cheap; clones share the same mapper.
#[derive(Debug, Clone)]
pub struct JsonProcessor {
    mapper: Arc<Mapper>,
}

impl JsonProcessor {
    /// Default adapters and default options.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Use `module` as given with the default options. No adapters are added.
    pub fn with_module(module: Module) -> Self {
        Self::builder().module(module).build()
    }

    /// Use a fully configured mapper as is.
    pub fn with_mapper(mapper: Mapper) -> Self {
        Self {
            mapper: Arc::new(mapper),
        }
    }

    pub fn builder() -> JsonProcessorBuilder {
        JsonProcessorBuilder::new()
    }

    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }
}

impl JsonProcessor {
    // Blank text (after trimming Unicode whitespace) reads as `None`.
    fn read_text<T: DeserializeOwned>(&self, text: &str) -> Result<Option<T>, ProcessorError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        tracing::debug!(target_type = type_name::<T>(), len = text.len(), "deserializing text");
        let tree = self
            .mapper
            .read_str(text)
            .map_err(ProcessorError::Deserialization)?;
        self.mapper.bind(&tree).map_err(ProcessorError::Deserialization)
    }

    fn read_slice<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<Option<T>, ProcessorError> {
        match std::str::from_utf8(bytes) {
            Ok(text) => self.read_text(text),
            // Let the parser report where the encoding breaks.
            Err(_) => {
                let tree = self
                    .mapper
                    .read_slice(bytes)
                    .map_err(ProcessorError::Deserialization)?;
                self.mapper.bind(&tree).map_err(ProcessorError::Deserialization)
            }
        }
    }
}

impl Default for JsonProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl SerializationProcessor for JsonProcessor {
    #[tracing::instrument(skip_all)]
    fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, ProcessorError> {
        let tree = self
            .mapper
            .to_value(value)
            .map_err(ProcessorError::Serialization)?;
        if tree.is_null() {
            tracing::debug!(source = type_name::<T>(), "serialized null as empty text");
            return Ok(String::new());
        }

        let text = self
            .mapper
            .render(&tree)
            .map_err(ProcessorError::Serialization)?;
        tracing::debug!(source = type_name::<T>(), len = text.len(), "serialized");
        Ok(text)
    }

    #[tracing::instrument(skip_all)]
    fn deserialize_str<T: DeserializeOwned>(
        &self,
        text: Option<&str>,
    ) -> Result<Option<T>, ProcessorError> {
        match text {
            Some(text) => self.read_text(text),
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip_all)]
    fn deserialize_bytes<T: DeserializeOwned, B: Buf>(
        &self,
        mut buf: B,
    ) -> Result<Option<T>, ProcessorError> {
        tracing::debug!(target_type = type_name::<T>(), len = buf.remaining(), "deserializing bytes");

        // Contiguous buffers are read in place; segmented ones are gathered first.
        if buf.chunk().len() == buf.remaining() {
            return self.read_slice(buf.chunk());
        }
        let gathered = buf.copy_to_bytes(buf.remaining());
        self.read_slice(&gathered)
    }

    fn resulting_content_type(&self) -> &'static str {
        content_type::JSON
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timepoint::{self, Timepoint};
    use bytes::Bytes;
    use chrono::{DateTime, TimeZone, Utc};
    use proptest::prelude::*;
    use serde::Deserialize;
    use std::collections::BTreeMap;
    use std::thread;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Address {
        street: String,
        city: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Customer {
        name: String,
        email: Option<String>,
        age: Option<u32>,
        tags: Vec<String>,
        address: Option<Address>,
        joined: Timepoint,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Empty;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Secretive {
        #[serde(skip)]
        hidden: u8,
    }

    fn joined() -> Timepoint {
        Timepoint(Utc.with_ymd_and_hms(2021, 3, 14, 15, 9, 26).unwrap())
    }

    fn customer() -> Customer {
        Customer {
            name: "Grace".into(),
            email: None,
            age: Some(85),
            tags: vec!["admiral".into()],
            address: Some(Address {
                street: "1 Navy Way".into(),
                city: "Arlington".into(),
            }),
            joined: joined(),
        }
    }

    #[test]
    fn serialize_omits_null_fields() {
        let text = JsonProcessor::new().serialize(&customer()).unwrap();
        assert_eq!(
            text,
            r#"{"name":"Grace","age":85,"tags":["admiral"],"address":{"street":"1 Navy Way","city":"Arlington"},"joined":"2021-03-14T15:09:26.000Z"}"#
        );
    }

    #[test]
    fn serialize_top_level_null_is_empty_text() {
        let processor = JsonProcessor::new();
        assert_eq!(processor.serialize(&None::<Customer>).unwrap(), "");
        assert_eq!(processor.serialize(&()).unwrap(), "");
    }

    #[test]
    fn serialize_types_without_properties_as_empty_object() {
        let processor = JsonProcessor::new();
        assert_eq!(processor.serialize(&Empty).unwrap(), "{}");
        assert_eq!(processor.serialize(&Secretive { hidden: 3 }).unwrap(), "{}");
        assert_eq!(processor.deserialize_str::<Empty>(Some("{}")).unwrap(), Some(Empty));
    }

    #[test]
    fn serialize_failure_is_serialization_error() {
        let mut bad = BTreeMap::new();
        bad.insert(vec![1u8], 1);
        let err = JsonProcessor::new().serialize(&bad).unwrap_err();
        assert!(err.is_serialization());
    }

    #[test]
    fn deserialize_absent_or_blank_text_is_none() {
        let processor = JsonProcessor::new();
        assert_eq!(processor.deserialize_str::<Customer>(None).unwrap(), None);
        assert_eq!(processor.deserialize_str::<Customer>(Some("")).unwrap(), None);
        assert_eq!(processor.deserialize_str::<Customer>(Some(" \n\t ")).unwrap(), None);
    }

    #[test]
    fn deserialize_empty_buffer_is_none() {
        let processor = JsonProcessor::new();
        assert_eq!(processor.deserialize_bytes::<Customer, _>(Bytes::new()).unwrap(), None);
        assert_eq!(processor.deserialize_bytes::<Customer, _>(&b"  \r\n"[..]).unwrap(), None);
    }

    #[test]
    fn blank_input_reads_the_same_as_text_and_bytes() {
        let processor = JsonProcessor::new();
        for blank in ["\u{3000}", "\u{a0}\n", "\u{2003} \t"] {
            assert_eq!(processor.deserialize_str::<Customer>(Some(blank)).unwrap(), None);
            assert_eq!(
                processor
                    .deserialize_bytes::<Customer, _>(Bytes::from(blank.as_bytes().to_vec()))
                    .unwrap(),
                None
            );
        }
    }

    #[test]
    fn deserialize_segmented_buffer() {
        let processor = JsonProcessor::new();
        let text = processor.serialize(&customer()).unwrap();
        let (head, tail) = text.as_bytes().split_at(text.len() / 2);
        let parsed: Customer = processor
            .deserialize_bytes(head.chain(tail))
            .unwrap()
            .unwrap();
        assert_eq!(parsed, customer());

        let blank = "\u{3000}".as_bytes();
        let (a, b) = blank.split_at(1);
        assert_eq!(processor.deserialize_bytes::<Customer, _>(a.chain(b)).unwrap(), None);
    }

    #[test]
    fn invalid_utf8_is_deserialization_error() {
        let err = JsonProcessor::new()
            .deserialize_bytes::<Address, _>(&b"{\"street\":\"\xff\",\"city\":\"x\"}"[..])
            .unwrap_err();
        assert!(err.is_deserialization());
    }

    #[test]
    fn deserialize_ignores_unknown_properties() {
        let address: Address = JsonProcessor::new()
            .deserialize_str(Some(r#"{"street":"Main","city":"Oslo","country":"NO"}"#))
            .unwrap()
            .unwrap();
        assert_eq!(address.city, "Oslo");
    }

    #[test]
    fn deserialize_empty_string_into_object_field_is_none() {
        let text = r#"{"name":"Grace","address":"","tags":[],"joined":"2021-03-14"}"#;
        let parsed: Customer = JsonProcessor::new().deserialize_str(Some(text)).unwrap().unwrap();
        assert_eq!(parsed.address, None);
        assert_eq!(parsed.joined.0.date_naive(), joined().0.date_naive());
    }

    #[test]
    fn deserialize_malformed_json_is_deserialization_error() {
        let processor = JsonProcessor::new();
        let err = processor.deserialize_str::<Customer>(Some("{\"name\":")).unwrap_err();
        assert!(err.is_deserialization());
        assert!(err.codec_error().is_eof());

        let err = processor
            .deserialize_bytes::<Customer, _>(Bytes::from_static(b"[1, 2"))
            .unwrap_err();
        assert!(err.is_deserialization());
    }

    #[test]
    fn deserialize_type_mismatch_is_deserialization_error() {
        let err = JsonProcessor::new()
            .deserialize_str::<Address>(Some(r#"{"street":1,"city":"Oslo"}"#))
            .unwrap_err();
        assert!(err.is_deserialization());
    }

    #[test]
    fn deserialize_bytes_matches_text() {
        let processor = JsonProcessor::new();
        let text = processor.serialize(&customer()).unwrap();
        let from_bytes: Customer = processor
            .deserialize_bytes(Bytes::from(text.clone()))
            .unwrap()
            .unwrap();
        let from_text: Customer = processor.deserialize_str(Some(&text)).unwrap().unwrap();
        assert_eq!(from_bytes, from_text);
        assert_eq!(from_bytes, customer());
    }

    #[test]
    fn content_type_is_constant() {
        let strict = JsonProcessor::builder()
            .configure_options(|o| o.indent_output = true)
            .build();
        assert_eq!(JsonProcessor::new().resulting_content_type(), content_type::JSON);
        assert_eq!(strict.resulting_content_type(), "application/json; charset=UTF-8");
    }

    #[test]
    fn strict_options_fail() {
        let processor = JsonProcessor::builder()
            .configure_options(|o| {
                o.fail_on_unknown_properties = true;
                o.fail_on_empty_beans = true;
                o.accept_empty_string_as_null = false;
            })
            .build();

        let unknown = processor.deserialize_str::<Address>(Some(r#"{"street":"a","city":"b","zip":1}"#));
        assert!(unknown.unwrap_err().is_deserialization());

        let empty_string = processor.deserialize_str::<Customer>(Some(
            r#"{"name":"a","tags":[],"address":"","joined":"2021-03-14"}"#,
        ));
        assert!(empty_string.unwrap_err().is_deserialization());

        assert!(processor.serialize(&Empty).unwrap_err().is_serialization());
    }

    #[test]
    fn inclusion_always_writes_nulls() {
        let processor = JsonProcessor::builder()
            .configure_options(|o| o.inclusion = Inclusion::Always)
            .build();
        let text = processor.serialize(&customer()).unwrap();
        assert!(text.contains(r#""email":null"#));
    }

    #[test]
    fn builder_steps_run_in_order() {
        let processor = JsonProcessor::builder()
            .configure_options(|o| o.date_format = "%Y".into())
            .configure_module(|m| {
                m.register(EpochMillisAdapter);
            })
            .configure_options(|o| o.date_format = "%Y-%m-%d".into())
            .build();

        assert_eq!(processor.mapper().options().date_format, "%Y-%m-%d");
        assert_eq!(processor.mapper().module().len(), 1);
        assert_eq!(processor.serialize(&Timepoint(DateTime::<Utc>::UNIX_EPOCH)).unwrap(), "0");
    }

    #[test]
    fn custom_date_format_applies_to_output() {
        let processor = JsonProcessor::builder()
            .configure_options(|o| o.date_format = "%d/%m/%Y".into())
            .build();
        assert_eq!(processor.serialize(&joined()).unwrap(), r#""14/03/2021""#);
    }

    #[test]
    fn custom_date_format_reads_back_its_output() {
        let processor = JsonProcessor::builder()
            .configure_options(|o| o.date_format = "%d/%m/%Y %H:%M:%S".into())
            .build();
        let text = processor.serialize(&customer()).unwrap();
        assert!(text.contains(r#""joined":"14/03/2021 15:09:26""#));

        let parsed: Customer = processor.deserialize_str(Some(&text)).unwrap().unwrap();
        assert_eq!(parsed, customer());
    }

    #[test]
    fn wide_integers_round_trip() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Ledger {
            id: u128,
            delta: i128,
            totals: BTreeMap<u128, i128>,
        }

        let ledger = Ledger {
            id: 7,
            delta: -3,
            totals: BTreeMap::from([(42, -9)]),
        };
        let processor = JsonProcessor::new();
        let text = processor.serialize(&ledger).unwrap();
        assert_eq!(text, r#"{"id":7,"delta":-3,"totals":{"42":-9}}"#);
        assert_eq!(processor.deserialize_str::<Ledger>(Some(&text)).unwrap(), Some(ledger));
    }

    #[test]
    fn supplied_options_skip_the_defaults_step() {
        let options = MapperOptions {
            inclusion: Inclusion::Always,
            ..Default::default()
        };
        let processor = JsonProcessor::builder().options(options.clone()).build();
        assert_eq!(processor.mapper().options(), &options);
    }

    #[test]
    fn with_module_uses_module_as_given() {
        let processor = JsonProcessor::with_module(Module::new());
        assert!(processor.mapper().module().is_empty());
        assert_eq!(processor.mapper().options(), &MapperOptions::default());

        // Without the adapter time points fall back to their own serde impl.
        assert_eq!(
            processor.serialize(&joined()).unwrap(),
            format!("\"{}\"", timepoint::format(&joined().0))
        );
    }

    #[test]
    fn with_mapper_is_used_unchanged() {
        let options = MapperOptions {
            indent_output: true,
            fail_on_empty_beans: true,
            ..Default::default()
        };
        let processor = JsonProcessor::with_mapper(Mapper::new(Module::new(), options));
        assert!(processor.serialize(&Empty).is_err());
        assert_eq!(
            processor.serialize(&Address { street: "a".into(), city: "b".into() }).unwrap(),
            "{\n  \"street\": \"a\",\n  \"city\": \"b\"\n}"
        );
    }

    #[test]
    fn apply_mapper_options_keeps_indentation() {
        let mut options = MapperOptions {
            indent_output: true,
            fail_on_unknown_properties: true,
            inclusion: Inclusion::Always,
            ..Default::default()
        };
        apply_mapper_options(&mut options);
        assert!(options.indent_output);
        assert!(!options.fail_on_unknown_properties);
        assert_eq!(options.inclusion, Inclusion::NonNull);
    }

    #[test]
    fn shared_across_threads() {
        let processor = JsonProcessor::new();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let processor = processor.clone();
                thread::spawn(move || {
                    let mut c = customer();
                    c.age = Some(i);
                    let text = processor.serialize(&c).unwrap();
                    processor.deserialize_str::<Customer>(Some(&text)).unwrap()
                })
            })
            .collect();
        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.join().unwrap().unwrap().age, Some(i as u32));
        }
    }

    fn arb_address() -> impl Strategy<Value = Address> {
        ("[A-Za-z0-9 ]{0,12}", "[A-Za-z]{1,10}").prop_map(|(street, city)| Address { street, city })
    }

    fn arb_customer() -> impl Strategy<Value = Customer> {
        (
            "\\PC{0,16}",
            proptest::option::of("[a-z@.]{0,12}"),
            proptest::option::of(any::<u32>()),
            proptest::collection::vec("[a-z]{0,6}", 0..4),
            proptest::option::of(arb_address()),
            0i64..4_102_444_800_000,
        )
            .prop_map(|(name, email, age, tags, address, millis)| Customer {
                name,
                email,
                age,
                tags,
                address,
                joined: Timepoint(DateTime::<Utc>::from_timestamp_millis(millis).unwrap()),
            })
    }

    proptest! {
        #[test]
        fn round_trip(original in arb_customer()) {
            let processor = JsonProcessor::new();
            let text = processor.serialize(&original).unwrap();
            let back: Option<Customer> = processor.deserialize_str(Some(&text)).unwrap();
            prop_assert_eq!(back, Some(original.clone()));

            let back: Option<Customer> = processor.deserialize_bytes(Bytes::from(text)).unwrap();
            prop_assert_eq!(back, Some(original));
        }
    }
}
