//! Serializer that builds a JSON tree while applying the mapper's output rules:
//! null struct fields follow the inclusion policy, values without properties
//! become `{}` (or fail), and newtypes claimed by a type adapter are rewritten.

use serde::ser::{self, Error as _, Impossible, Serialize};
use serde_json::{Error, Map, Value};

use super::module::Module;
use super::options::MapperOptions;

#[derive(Clone, Copy)]
pub(crate) struct ValueSerializer<'m> {
    module: &'m Module,
    options: &'m MapperOptions,
}

impl<'m> ValueSerializer<'m> {
    pub(crate) fn new(module: &'m Module, options: &'m MapperOptions) -> Self {
        Self { module, options }
    }

    fn empty_bean(self, name: &str) -> Result<Value, Error> {
        if self.options.fail_on_empty_beans {
            Err(Error::custom(format!("no properties to serialize for `{name}`")))
        } else {
            Ok(Value::Object(Map::new()))
        }
    }
}

macro_rules! delegate {
    ($($method:ident($ty:ty))*) => {$(
        fn $method(self, v: $ty) -> Result<Value, Error> {
            ser::Serializer::$method(serde_json::value::Serializer, v)
        }
    )*};
}

impl<'m> ser::Serializer for ValueSerializer<'m> {
    type Ok = Value;
    type Error = Error;

    type SerializeSeq = SeqBuilder<'m>;
    type SerializeTuple = SeqBuilder<'m>;
    type SerializeTupleStruct = SeqBuilder<'m>;
    type SerializeTupleVariant = VariantSeqBuilder<'m>;
    type SerializeMap = MapBuilder<'m>;
    type SerializeStruct = StructBuilder<'m>;
    type SerializeStructVariant = VariantStructBuilder<'m>;

    delegate! {
        serialize_bool(bool)
        serialize_i8(i8)
        serialize_i16(i16)
        serialize_i32(i32)
        serialize_i64(i64)
        serialize_i128(i128)
        serialize_u8(u8)
        serialize_u16(u16)
        serialize_u32(u32)
        serialize_u64(u64)
        serialize_u128(u128)
        serialize_f32(f32)
        serialize_f64(f64)
        serialize_char(char)
        serialize_str(&str)
        serialize_bytes(&[u8])
    }

    fn serialize_none(self) -> Result<Value, Error> {
        Ok(Value::Null)
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<Value, Error> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value, Error> {
        Ok(Value::Null)
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<Value, Error> {
        self.empty_bean(name)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<Value, Error> {
        Ok(Value::String(variant.to_owned()))
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        name: &'static str,
        value: &T,
    ) -> Result<Value, Error> {
        let inner = value.serialize(self)?;
        match self.module.adapter(name) {
            Some(adapter) => adapter.write(inner, self.options).map_err(Error::custom),
            None => Ok(inner),
        }
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value, Error> {
        let mut object = Map::new();
        object.insert(variant.to_owned(), value.serialize(self)?);
        Ok(Value::Object(object))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SeqBuilder<'m>, Error> {
        Ok(SeqBuilder {
            ser: self,
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<SeqBuilder<'m>, Error> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<SeqBuilder<'m>, Error> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<VariantSeqBuilder<'m>, Error> {
        Ok(VariantSeqBuilder {
            variant,
            seq: self.serialize_seq(Some(len))?,
        })
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<MapBuilder<'m>, Error> {
        Ok(MapBuilder {
            ser: self,
            map: Map::new(),
            next_key: None,
        })
    }

    fn serialize_struct(self, name: &'static str, _len: usize) -> Result<StructBuilder<'m>, Error> {
        Ok(StructBuilder {
            ser: self,
            name,
            map: Map::new(),
            declared: 0,
        })
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<VariantStructBuilder<'m>, Error> {
        Ok(VariantStructBuilder {
            variant,
            fields: self.serialize_struct(name, len)?,
        })
    }
}

pub(crate) struct SeqBuilder<'m> {
    ser: ValueSerializer<'m>,
    items: Vec<Value>,
}

impl ser::SerializeSeq for SeqBuilder<'_> {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Error> {
        self.items.push(value.serialize(self.ser)?);
        Ok(())
    }

    fn end(self) -> Result<Value, Error> {
        Ok(Value::Array(self.items))
    }
}

impl ser::SerializeTuple for SeqBuilder<'_> {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Error> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value, Error> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleStruct for SeqBuilder<'_> {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Error> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value, Error> {
        ser::SerializeSeq::end(self)
    }
}

pub(crate) struct VariantSeqBuilder<'m> {
    variant: &'static str,
    seq: SeqBuilder<'m>,
}

impl ser::SerializeTupleVariant for VariantSeqBuilder<'_> {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Error> {
        ser::SerializeSeq::serialize_element(&mut self.seq, value)
    }

    fn end(self) -> Result<Value, Error> {
        let mut object = Map::new();
        object.insert(self.variant.to_owned(), ser::SerializeSeq::end(self.seq)?);
        Ok(Value::Object(object))
    }
}

/// Map entries are written as-is; the inclusion policy only covers struct fields.
pub(crate) struct MapBuilder<'m> {
    ser: ValueSerializer<'m>,
    map: Map<String, Value>,
    next_key: Option<String>,
}

impl ser::SerializeMap for MapBuilder<'_> {
    type Ok = Value;
    type Error = Error;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<(), Error> {
        self.next_key = Some(key.serialize(KeySerializer)?);
        Ok(())
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Error> {
        let key = self
            .next_key
            .take()
            .ok_or_else(|| Error::custom("serialize_value called before serialize_key"))?;
        self.map.insert(key, value.serialize(self.ser)?);
        Ok(())
    }

    fn end(self) -> Result<Value, Error> {
        Ok(Value::Object(self.map))
    }
}

pub(crate) struct StructBuilder<'m> {
    ser: ValueSerializer<'m>,
    name: &'static str,
    map: Map<String, Value>,
    // Fields the type declared, written or not.
    declared: usize,
}

impl ser::SerializeStruct for StructBuilder<'_> {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), Error> {
        self.declared += 1;
        let value = value.serialize(self.ser)?;
        if !(value.is_null() && self.ser.options.omit_nulls()) {
            self.map.insert(key.to_owned(), value);
        }
        Ok(())
    }

    fn skip_field(&mut self, _key: &'static str) -> Result<(), Error> {
        self.declared += 1;
        Ok(())
    }

    fn end(self) -> Result<Value, Error> {
        if self.declared == 0 {
            return self.ser.empty_bean(self.name);
        }
        Ok(Value::Object(self.map))
    }
}

pub(crate) struct VariantStructBuilder<'m> {
    variant: &'static str,
    fields: StructBuilder<'m>,
}

impl ser::SerializeStructVariant for VariantStructBuilder<'_> {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), Error> {
        ser::SerializeStruct::serialize_field(&mut self.fields, key, value)
    }

    fn skip_field(&mut self, key: &'static str) -> Result<(), Error> {
        ser::SerializeStruct::skip_field(&mut self.fields, key)
    }

    fn end(self) -> Result<Value, Error> {
        let mut object = Map::new();
        object.insert(self.variant.to_owned(), ser::SerializeStruct::end(self.fields)?);
        Ok(Value::Object(object))
    }
}

/// Object keys must be text; numbers, booleans, chars and unit variants are
/// rendered as their text, anything else is rejected.
struct KeySerializer;

fn key_must_be_a_string() -> Error {
    Error::custom("key must be a string")
}

macro_rules! display_key {
    ($($method:ident($ty:ty))*) => {$(
        fn $method(self, v: $ty) -> Result<String, Error> {
            Ok(v.to_string())
        }
    )*};
}

impl ser::Serializer for KeySerializer {
    type Ok = String;
    type Error = Error;

    type SerializeSeq = Impossible<String, Error>;
    type SerializeTuple = Impossible<String, Error>;
    type SerializeTupleStruct = Impossible<String, Error>;
    type SerializeTupleVariant = Impossible<String, Error>;
    type SerializeMap = Impossible<String, Error>;
    type SerializeStruct = Impossible<String, Error>;
    type SerializeStructVariant = Impossible<String, Error>;

    display_key! {
        serialize_bool(bool)
        serialize_i8(i8)
        serialize_i16(i16)
        serialize_i32(i32)
        serialize_i64(i64)
        serialize_i128(i128)
        serialize_u8(u8)
        serialize_u16(u16)
        serialize_u32(u32)
        serialize_u64(u64)
        serialize_u128(u128)
        serialize_char(char)
        serialize_str(&str)
    }

    fn serialize_f32(self, _v: f32) -> Result<String, Error> {
        Err(key_must_be_a_string())
    }

    fn serialize_f64(self, _v: f64) -> Result<String, Error> {
        Err(key_must_be_a_string())
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<String, Error> {
        Err(key_must_be_a_string())
    }

    fn serialize_none(self) -> Result<String, Error> {
        Err(key_must_be_a_string())
    }

    fn serialize_some<T: ?Sized + Serialize>(self, _value: &T) -> Result<String, Error> {
        Err(key_must_be_a_string())
    }

    fn serialize_unit(self) -> Result<String, Error> {
        Err(key_must_be_a_string())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<String, Error> {
        Err(key_must_be_a_string())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<String, Error> {
        Ok(variant.to_owned())
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<String, Error> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<String, Error> {
        Err(key_must_be_a_string())
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, Error> {
        Err(key_must_be_a_string())
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, Error> {
        Err(key_must_be_a_string())
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, Error> {
        Err(key_must_be_a_string())
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, Error> {
        Err(key_must_be_a_string())
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, Error> {
        Err(key_must_be_a_string())
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, Error> {
        Err(key_must_be_a_string())
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, Error> {
        Err(key_must_be_a_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::options::Inclusion;
    use serde::Serialize;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn to_value<T: Serialize>(value: &T, options: &MapperOptions) -> Result<Value, Error> {
        let module = Module::new();
        value.serialize(ValueSerializer::new(&module, options))
    }

    #[derive(Serialize)]
    struct Contact {
        name: String,
        email: Option<String>,
        tags: Vec<Option<String>>,
    }

    #[derive(Serialize)]
    struct Marker;

    #[derive(Serialize)]
    struct Hidden {
        #[serde(skip)]
        _secret: u8,
    }

    #[test]
    fn null_fields_are_omitted_by_default() {
        let contact = Contact {
            name: "Ada".into(),
            email: None,
            tags: vec![None, Some("x".into())],
        };
        let value = to_value(&contact, &MapperOptions::default()).unwrap();
        assert_eq!(value, json!({"name": "Ada", "tags": [null, "x"]}));
    }

    #[test]
    fn inclusion_always_keeps_nulls() {
        let options = MapperOptions {
            inclusion: Inclusion::Always,
            ..Default::default()
        };
        let contact = Contact {
            name: "Ada".into(),
            email: None,
            tags: vec![],
        };
        let value = to_value(&contact, &options).unwrap();
        assert_eq!(value, json!({"name": "Ada", "email": null, "tags": []}));
    }

    #[test]
    fn map_entries_keep_nulls() {
        let mut map = BTreeMap::new();
        map.insert("a", None);
        map.insert("b", Some(1));
        let value = to_value(&map, &MapperOptions::default()).unwrap();
        assert_eq!(value, json!({"a": null, "b": 1}));
    }

    #[test]
    fn empty_beans_become_empty_objects() {
        let options = MapperOptions::default();
        assert_eq!(to_value(&Marker, &options).unwrap(), json!({}));
        assert_eq!(to_value(&Hidden { _secret: 1 }, &options).unwrap(), json!({}));
    }

    #[test]
    fn empty_beans_fail_when_configured() {
        let options = MapperOptions {
            fail_on_empty_beans: true,
            ..Default::default()
        };
        let err = to_value(&Marker, &options).unwrap_err();
        assert!(err.to_string().contains("Marker"));
        assert!(to_value(&Hidden { _secret: 1 }, &options).is_err());
    }

    #[test]
    fn all_null_struct_is_not_an_empty_bean() {
        #[derive(Serialize)]
        struct Sparse {
            a: Option<u8>,
        }
        let options = MapperOptions {
            fail_on_empty_beans: true,
            ..Default::default()
        };
        assert_eq!(to_value(&Sparse { a: None }, &options).unwrap(), json!({}));
    }

    #[test]
    fn enums_use_external_tagging() {
        #[derive(Serialize)]
        enum Shape {
            Dot,
            Circle(f64),
            Pair(u8, u8),
            Rect { w: u8, h: Option<u8> },
        }
        let options = MapperOptions::default();
        assert_eq!(to_value(&Shape::Dot, &options).unwrap(), json!("Dot"));
        assert_eq!(to_value(&Shape::Circle(1.5), &options).unwrap(), json!({"Circle": 1.5}));
        assert_eq!(to_value(&Shape::Pair(1, 2), &options).unwrap(), json!({"Pair": [1, 2]}));
        assert_eq!(
            to_value(&Shape::Rect { w: 3, h: None }, &options).unwrap(),
            json!({"Rect": {"w": 3}})
        );
    }

    #[test]
    fn non_text_keys_are_stringified_or_rejected() {
        let mut numbered = BTreeMap::new();
        numbered.insert(7u32, "seven");
        assert_eq!(
            to_value(&numbered, &MapperOptions::default()).unwrap(),
            json!({"7": "seven"})
        );

        let mut nested = BTreeMap::new();
        nested.insert(vec![1u8], "list");
        let err = to_value(&nested, &MapperOptions::default()).unwrap_err();
        assert!(err.to_string().contains("key must be a string"));
    }
}
