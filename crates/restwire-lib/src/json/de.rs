//! Binding a parsed JSON tree onto a target type under the mapper's input rules.
//!
//! Empty-string-as-null cannot be decided up front: whether `""` is valid
//! depends on the target, which only the target's `Deserialize` impl knows.
//! When an optional value holds `""` we hand it to the target as `Some`;
//! if the target then asks for anything non-textual, the target type is
//! recorded and binding restarts with every `""` of that type read as `None`.
//! The decision is made once per optional target type, so a document costs
//! at most one extra pass per distinct type, however many empty strings it holds.
//!
//! Shapes serde buffers through `deserialize_any` (internally tagged and
//! untagged enums, `#[serde(flatten)]`) are bound by serde's own buffer and
//! see the plain JSON rules.

use std::any::type_name;
use std::cell::Cell;
use std::collections::HashSet;
use std::iter::Enumerate;
use std::slice;

use serde::de::{
    self, DeserializeOwned, DeserializeSeed, Deserializer as _, EnumAccess, Error as _,
    IntoDeserializer, MapAccess, SeqAccess, Unexpected, VariantAccess, Visitor,
};
use serde::forward_to_deserialize_any;
use serde_json::{Error, Map, Value};

use super::module::Module;
use super::options::MapperOptions;

const EMPTY_STRING_TARGET: &str = "empty string where a non-textual value was expected";

/// Where an empty string is being tried as a present value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Probe {
    Off,
    Root,
    // Keyed by the `Option` visitor's type name.
    Optional(&'static str),
}

struct BindContext<'m> {
    module: &'m Module,
    options: &'m MapperOptions,
    null_targets: &'m HashSet<&'static str>,
    hit: Cell<Probe>,
}

/// Bind `value` onto `T`. A JSON `null` root, or an empty-string root whose
/// target is not textual, yields `None`.
pub(crate) fn bind<T: DeserializeOwned>(
    value: &Value,
    module: &Module,
    options: &MapperOptions,
) -> Result<Option<T>, Error> {
    if value.is_null() {
        return Ok(None);
    }

    let mut null_targets = HashSet::new();
    loop {
        let cx = BindContext {
            module,
            options,
            null_targets: &null_targets,
            hit: Cell::new(Probe::Off),
        };
        let result = T::deserialize(Lenient::root(value, &cx));

        match (result, cx.hit.get()) {
            (Ok(bound), _) => return Ok(Some(bound)),
            (Err(_), Probe::Root) => return Ok(None),
            (Err(err), Probe::Optional(target)) => {
                tracing::trace!(target_type = target, "reading empty strings as null");
                if !null_targets.insert(target) {
                    return Err(err);
                }
            }
            (Err(err), Probe::Off) => return Err(err),
        }
    }
}

fn child_path(parent: &str, segment: &str) -> String {
    let mut path = String::with_capacity(parent.len() + segment.len() + 1);
    path.push_str(parent);
    path.push('/');
    for c in segment.chars() {
        match c {
            '~' => path.push_str("~0"),
            '/' => path.push_str("~1"),
            c => path.push(c),
        }
    }
    path
}

fn unexpected(value: &Value) -> Unexpected<'_> {
    match value {
        Value::Null => Unexpected::Unit,
        Value::Bool(b) => Unexpected::Bool(*b),
        Value::Number(_) => Unexpected::Other("number"),
        Value::String(s) => Unexpected::Str(s),
        Value::Array(_) => Unexpected::Seq,
        Value::Object(_) => Unexpected::Map,
    }
}

struct Lenient<'de> {
    value: &'de Value,
    path: String,
    probe: Probe,
    cx: &'de BindContext<'de>,
}

impl<'de> Lenient<'de> {
    fn root(value: &'de Value, cx: &'de BindContext<'de>) -> Self {
        let probe = if cx.options.accept_empty_string_as_null && is_empty_text(value) {
            Probe::Root
        } else {
            Probe::Off
        };
        Lenient {
            value,
            path: String::new(),
            probe,
            cx,
        }
    }

    fn new(value: &'de Value, path: String, cx: &'de BindContext<'de>) -> Self {
        Lenient {
            value,
            path,
            probe: Probe::Off,
            cx,
        }
    }

    fn probing(&self) -> bool {
        self.probe != Probe::Off
    }

    fn probe_hit(&self) -> Error {
        self.cx.hit.set(self.probe);
        Error::custom(EMPTY_STRING_TARGET)
    }

    fn visit_object<V: Visitor<'de>>(
        self,
        map: &'de Map<String, Value>,
        visitor: V,
    ) -> Result<V::Value, Error> {
        let len = map.len();
        let mut access = LenientMap {
            iter: map.iter(),
            pending: None,
            parent: self.path,
            cx: self.cx,
        };
        let value = visitor.visit_map(&mut access)?;
        if access.iter.len() == 0 {
            Ok(value)
        } else {
            Err(Error::invalid_length(len, &"fewer elements in map"))
        }
    }

    fn visit_array<V: Visitor<'de>>(self, items: &'de [Value], visitor: V) -> Result<V::Value, Error> {
        let len = items.len();
        let mut access = LenientSeq {
            iter: items.iter().enumerate(),
            parent: self.path,
            cx: self.cx,
        };
        let value = visitor.visit_seq(&mut access)?;
        if access.iter.len() == 0 {
            Ok(value)
        } else {
            Err(Error::invalid_length(len, &"fewer elements in array"))
        }
    }
}

fn is_empty_text(value: &Value) -> bool {
    matches!(value, Value::String(s) if s.is_empty())
}

// Non-textual scalars: an empty string probing for one of these is read as null.
macro_rules! scalar {
    ($($method:ident)*) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
            if self.probing() {
                return Err(self.probe_hit());
            }
            self.value.$method(visitor)
        }
    )*};
}

macro_rules! textual {
    ($($method:ident)*) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
            self.value.$method(visitor)
        }
    )*};
}

impl<'de> de::Deserializer<'de> for Lenient<'de> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.value {
            Value::Array(items) => self.visit_array(items, visitor),
            Value::Object(map) => self.visit_object(map, visitor),
            other => other.deserialize_any(visitor),
        }
    }

    scalar! {
        deserialize_bool
        deserialize_i8 deserialize_i16 deserialize_i32 deserialize_i64 deserialize_i128
        deserialize_u8 deserialize_u16 deserialize_u32 deserialize_u64 deserialize_u128
        deserialize_f32 deserialize_f64
    }

    textual! {
        deserialize_char deserialize_str deserialize_string
        deserialize_bytes deserialize_byte_buf deserialize_identifier
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.value {
            Value::Null => visitor.visit_none(),
            v if is_empty_text(v) && self.cx.options.accept_empty_string_as_null => {
                let target = type_name::<V>();
                if self.cx.null_targets.contains(target) {
                    visitor.visit_none()
                } else {
                    visitor.visit_some(Lenient {
                        probe: Probe::Optional(target),
                        ..self
                    })
                }
            }
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.value {
            Value::Null => visitor.visit_unit(),
            _ if self.probing() => Err(self.probe_hit()),
            other => other.deserialize_unit(visitor),
        }
    }

    // The serializer writes property-less values as `{}`; read that back.
    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Error> {
        match self.value {
            Value::Null => visitor.visit_unit(),
            Value::Object(map) if map.is_empty() || !self.cx.options.fail_on_unknown_properties => {
                visitor.visit_unit()
            }
            _ if self.probing() => Err(self.probe_hit()),
            other => other.deserialize_unit_struct(name, visitor),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Error> {
        match self.cx.module.adapter(name) {
            Some(_) if self.probing() => Err(self.probe_hit()),
            Some(adapter) => {
                let adapted = adapter.read(self.value, self.cx.options).map_err(Error::custom)?;
                visitor.visit_newtype_struct(adapted)
            }
            None => visitor.visit_newtype_struct(self),
        }
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.value {
            Value::Array(items) => self.visit_array(items, visitor),
            _ if self.probing() => Err(self.probe_hit()),
            other => other.deserialize_seq(visitor),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.value {
            Value::Object(map) => self.visit_object(map, visitor),
            _ if self.probing() => Err(self.probe_hit()),
            other => other.deserialize_map(visitor),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        match self.value {
            Value::Object(map) => {
                if self.cx.options.fail_on_unknown_properties {
                    if let Some(key) = map.keys().find(|k| !fields.contains(&k.as_str())) {
                        return Err(Error::unknown_field(key, fields));
                    }
                }
                self.visit_object(map, visitor)
            }
            Value::Array(items) => self.visit_array(items, visitor),
            _ if self.probing() => Err(self.probe_hit()),
            other => other.deserialize_struct(name, fields, visitor),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        match self.value {
            Value::String(_) if self.probing() => Err(self.probe_hit()),
            Value::String(variant) => {
                visitor.visit_enum(IntoDeserializer::<'de, Error>::into_deserializer(variant.as_str()))
            }
            Value::Object(map) if map.len() == 1 => match map.iter().next() {
                Some((variant, value)) => visitor.visit_enum(LenientEnum {
                    variant,
                    value,
                    path: child_path(&self.path, variant),
                    cx: self.cx,
                }),
                None => Err(Error::invalid_length(0, &"map with a single key")),
            },
            Value::Object(map) => Err(Error::invalid_length(map.len(), &"map with a single key")),
            other => other.deserialize_enum(name, variants, visitor),
        }
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_unit()
    }
}

struct LenientMap<'de> {
    iter: serde_json::map::Iter<'de>,
    pending: Option<(&'de str, &'de Value)>,
    parent: String,
    cx: &'de BindContext<'de>,
}

impl<'de> MapAccess<'de> for LenientMap<'de> {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>, Error> {
        match self.iter.next() {
            Some((key, value)) => {
                self.pending = Some((key.as_str(), value));
                seed.deserialize(KeyDeserializer(key.as_str())).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, Error> {
        let (key, value) = self
            .pending
            .take()
            .ok_or_else(|| Error::custom("value is missing"))?;
        seed.deserialize(Lenient::new(value, child_path(&self.parent, key), self.cx))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct LenientSeq<'de> {
    iter: Enumerate<slice::Iter<'de, Value>>,
    parent: String,
    cx: &'de BindContext<'de>,
}

impl<'de> SeqAccess<'de> for LenientSeq<'de> {
    type Error = Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>, Error> {
        match self.iter.next() {
            Some((index, value)) => {
                let path = child_path(&self.parent, &index.to_string());
                seed.deserialize(Lenient::new(value, path, self.cx)).map(Some)
            }
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct LenientEnum<'de> {
    variant: &'de str,
    value: &'de Value,
    path: String,
    cx: &'de BindContext<'de>,
}

impl<'de> EnumAccess<'de> for LenientEnum<'de> {
    type Error = Error;
    type Variant = Lenient<'de>;

    fn variant_seed<V: DeserializeSeed<'de>>(self, seed: V) -> Result<(V::Value, Lenient<'de>), Error> {
        let variant = seed.deserialize(KeyDeserializer(self.variant))?;
        Ok((variant, Lenient::new(self.value, self.path, self.cx)))
    }
}

impl<'de> VariantAccess<'de> for Lenient<'de> {
    type Error = Error;

    fn unit_variant(self) -> Result<(), Error> {
        match self.value {
            Value::Null => Ok(()),
            other => Err(Error::invalid_type(unexpected(other), &"unit variant")),
        }
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> Result<T::Value, Error> {
        seed.deserialize(self)
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, Error> {
        de::Deserializer::deserialize_seq(self, visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        de::Deserializer::deserialize_struct(self, "", fields, visitor)
    }
}

/// Object keys are always text; numeric and boolean targets parse it.
struct KeyDeserializer<'de>(&'de str);

macro_rules! parse_key {
    ($($method:ident => $visit:ident)*) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
            match self.0.parse() {
                Ok(parsed) => visitor.$visit(parsed),
                Err(_) => visitor.visit_borrowed_str(self.0),
            }
        }
    )*};
}

impl<'de> de::Deserializer<'de> for KeyDeserializer<'de> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_borrowed_str(self.0)
    }

    parse_key! {
        deserialize_bool => visit_bool
        deserialize_i8 => visit_i8
        deserialize_i16 => visit_i16
        deserialize_i32 => visit_i32
        deserialize_i64 => visit_i64
        deserialize_i128 => visit_i128
        deserialize_u8 => visit_u8
        deserialize_u16 => visit_u16
        deserialize_u32 => visit_u32
        deserialize_u64 => visit_u64
        deserialize_u128 => visit_u128
        deserialize_f32 => visit_f32
        deserialize_f64 => visit_f64
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        visitor.visit_enum(IntoDeserializer::<'de, Error>::into_deserializer(self.0))
    }

    forward_to_deserialize_any! {
        char str string bytes byte_buf unit unit_struct seq tuple
        tuple_struct map struct identifier ignored_any
    }
}
