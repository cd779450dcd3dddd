use std::io::Read;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::de;
use super::module::Module;
use super::options::MapperOptions;
use super::ser::ValueSerializer;

/// A configured JSON object mapper: a type-adapter [`Module`] plus the
/// [`MapperOptions`] applied on every call.
///
/// A mapper is immutable once built. Share it behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct Mapper {
    module: Module,
    options: MapperOptions,
}

impl Mapper {
    pub fn new(module: Module, options: MapperOptions) -> Self {
        Self { module, options }
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn options(&self) -> &MapperOptions {
        &self.options
    }

    /// Serialize a value into a JSON tree under the output rules.
    pub fn to_value<T: Serialize + ?Sized>(&self, value: &T) -> serde_json::Result<Value> {
        value.serialize(ValueSerializer::new(&self.module, &self.options))
    }

    /// Serialize a value into JSON text, compact or indented per the options.
    pub fn write_string<T: Serialize + ?Sized>(&self, value: &T) -> serde_json::Result<String> {
        self.render(&self.to_value(value)?)
    }

    /// Render a tree as text, compact or indented per the options.
    pub fn render(&self, tree: &Value) -> serde_json::Result<String> {
        if self.options.indent_output {
            serde_json::to_string_pretty(tree)
        } else {
            serde_json::to_string(tree)
        }
    }

    /// Parse JSON text into a tree.
    pub fn read_str(&self, text: &str) -> serde_json::Result<Value> {
        serde_json::from_str(text)
    }

    /// Parse JSON bytes into a tree.
    pub fn read_slice(&self, bytes: &[u8]) -> serde_json::Result<Value> {
        serde_json::from_slice(bytes)
    }

    /// Parse JSON from a reader into a tree.
    pub fn read_reader<R: Read>(&self, reader: R) -> serde_json::Result<Value> {
        serde_json::from_reader(reader)
    }

    /// Bind a parsed tree onto `T` under the input rules. `None` means the
    /// document was null, or an empty string bound to a non-textual type.
    pub fn bind<T: DeserializeOwned>(&self, value: &Value) -> serde_json::Result<Option<T>> {
        de::bind(value, &self.module, &self.options)
    }
}
