//! JSON-RPC request bodies
//!
//! A request is sent either as JSON text or as multipart form fields named `jsonrpc`,
//! `id`, `method` and `params[<key>]`.

use error_stack::Report;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::debug;

use crate::constants::{EMPTY_PARAMS_FORM_KEY, EMPTY_PARAMS_FORM_VALUE, JSON_RPC_VERSION};
use crate::error::{Error, Result};
use crate::json_object::JsonField;

/// Binary payload sent as a file part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryParam {
    /// Raw content
    pub bytes:     Vec<u8>,
    /// File name reported to the server
    pub file_name: Option<String>,
    /// MIME type of the content
    pub mime:      Option<String>,
}

impl BinaryParam {
    /// Create a binary param without file name or MIME type
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes:     bytes.into(),
            file_name: None,
            mime:      None,
        }
    }

    /// Set the file name
    #[must_use]
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Set the MIME type
    #[must_use]
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }
}

/// A single request parameter
#[derive(Debug, Clone, PartialEq)]
pub enum RpcParam {
    /// Any JSON value
    Value(Value),
    /// Binary content, only transmitted in form bodies
    Binary(BinaryParam),
}

macro_rules! impl_param_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for RpcParam {
                fn from(value: $ty) -> Self { Self::Value(Value::from(value)) }
            }
        )*
    };
}

impl_param_from!(Value, &str, String, bool, i32, i64, u32, u64, f64);

impl From<BinaryParam> for RpcParam {
    fn from(binary: BinaryParam) -> Self { Self::Binary(binary) }
}

/// Value of one form field
#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
    /// Text field
    Text(String),
    /// File field, passed through untouched
    Binary(BinaryParam),
}

/// One named form field
#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    /// Field name
    pub name:  String,
    /// Field content
    pub value: FormValue,
}

impl FormField {
    fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name:  name.into(),
            value: FormValue::Text(value.into()),
        }
    }
}

/// An outgoing JSON-RPC call
#[derive(Debug, Clone, PartialEq)]
pub struct RpcRequest {
    /// Protocol version, always `2.0`
    pub jsonrpc: String,
    /// Correlation id
    pub id:      Option<String>,
    /// Method to invoke
    pub method:  String,
    /// Parameters in insertion order
    pub params:  Vec<(String, RpcParam)>,
}

impl RpcRequest {
    /// Create a request for `method` with no params and no id
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSON_RPC_VERSION.to_string(),
            id:      None,
            method:  method.into(),
            params:  Vec::new(),
        }
    }

    /// Set the request id; an empty id clears it
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into()).filter(|id| !id.is_empty());
        self
    }

    /// Assign a fresh random id
    #[must_use]
    pub fn with_random_id(mut self) -> Self {
        self.id = Some(uuid::Uuid::new_v4().to_string());
        self
    }

    /// Add a parameter, replacing an earlier one with the same key
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<RpcParam>) -> Self {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.params.iter_mut().find(|(existing, _)| *existing == key) {
            slot.1 = value;
        } else {
            self.params.push((key, value));
        }
        self
    }

    /// Add every entry of a JSON object as a parameter
    ///
    /// Anything other than an object is rejected.
    pub fn params_from_value(mut self, params: Value) -> Result<Self> {
        let Value::Object(map) = params else {
            return Err(Report::new(Error::invalid(
                "params",
                "expected a JSON object",
            )));
        };
        for (key, value) in map {
            self = self.param(key, value);
        }
        Ok(self)
    }

    /// JSON form of the request; binary params are left out
    pub fn to_json(&self) -> Value {
        let params: Map<String, Value> = self
            .params
            .iter()
            .filter_map(|(key, param)| match param {
                RpcParam::Value(value) => Some((key.clone(), value.clone())),
                RpcParam::Binary(_) => None,
            })
            .collect();

        let mut body = Map::new();
        body.insert(JsonField::Jsonrpc.into(), Value::String(self.jsonrpc.clone()));
        body.insert(
            JsonField::Id.into(),
            self.id.clone().map_or(Value::Null, Value::String),
        );
        body.insert(JsonField::Method.into(), Value::String(self.method.clone()));
        body.insert(JsonField::Params.into(), Value::Object(params));
        Value::Object(body)
    }

    /// Form field layout of the request
    ///
    /// `id` is only sent when set. Text params are sent as-is, other JSON values as their
    /// JSON text. With no params a single `params[value]=1` field is sent.
    pub fn to_form_fields(&self) -> Vec<FormField> {
        let mut fields = vec![FormField::text(JsonField::Jsonrpc, self.jsonrpc.clone())];

        if let Some(id) = &self.id {
            fields.push(FormField::text(JsonField::Id, id.clone()));
        }

        fields.push(FormField::text(JsonField::Method, self.method.clone()));

        if self.params.is_empty() {
            fields.push(FormField::text(
                param_field_name(EMPTY_PARAMS_FORM_KEY),
                EMPTY_PARAMS_FORM_VALUE,
            ));
        }

        for (key, param) in &self.params {
            let value = match param {
                RpcParam::Value(Value::String(text)) => FormValue::Text(text.clone()),
                RpcParam::Value(other) => FormValue::Text(other.to_string()),
                RpcParam::Binary(binary) => FormValue::Binary(binary.clone()),
            };
            fields.push(FormField {
                name: param_field_name(key),
                value,
            });
        }

        debug!(
            "Built {} form field(s) for method '{}'",
            fields.len(),
            self.method
        );
        fields
    }

    /// Multipart form for the request
    pub fn to_multipart(&self) -> Result<reqwest::multipart::Form> {
        let mut form = reqwest::multipart::Form::new();
        for field in self.to_form_fields() {
            form = match field.value {
                FormValue::Text(text) => form.text(field.name, text),
                FormValue::Binary(binary) => form.part(field.name, binary_part(binary)?),
            };
        }
        Ok(form)
    }
}

impl Serialize for RpcRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl std::fmt::Display for RpcRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

fn param_field_name(key: &str) -> String { format!("{}[{key}]", JsonField::Params) }

fn binary_part(binary: BinaryParam) -> Result<reqwest::multipart::Part> {
    let mut part = reqwest::multipart::Part::bytes(binary.bytes);
    if let Some(file_name) = binary.file_name {
        part = part.file_name(file_name);
    }
    if let Some(mime) = binary.mime {
        part = part.mime_str(&mime).map_err(|e| {
            Report::new(Error::invalid("mime type", &mime)).attach(format!("Error: {e}"))
        })?;
    }
    Ok(part)
}
