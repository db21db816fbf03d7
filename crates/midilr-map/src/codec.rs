//! Profile document codec
//!
//! A profile is an element/attribute tree: one root element with one child
//! element per binding. It is stored as YAML:
//!
//! ```yaml
//! root: settings
//! elements:
//!   - name: setting
//!     attributes:
//!       Channel: 1
//!       Data: 7
//!       MessageType: ControlChange
//!       CommandName: Exposure
//! ```
//!
//! Decoding is forgiving: a bad element is reported and skipped, the rest of
//! the document still loads. Encoding is total.

use crate::error::{ProfileError, RecordError};
use crate::identity::{MessageKind, MidiMessageId};
use serde::de::{self, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

/// Root element name
pub const ROOT_ELEMENT: &str = "settings";
/// Name of a binding element
pub const BINDING_ELEMENT: &str = "setting";

pub const ATTR_CHANNEL: &str = "Channel";
pub const ATTR_DATA: &str = "Data";
pub const ATTR_MESSAGE_TYPE: &str = "MessageType";
pub const ATTR_COMMAND_NAME: &str = "CommandName";

/// Accepted on load in place of `Data`
const DATA_ALIASES: [&str; 2] = ["CC", "Note"];

/// One element of the tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub name: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Builder-style attribute setter
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Persisted profile document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileDocument {
    pub root: String,
    #[serde(default)]
    pub elements: Vec<Element>,
    /// Elements dropped while parsing YAML (not an attribute mapping)
    #[serde(skip)]
    rejected: Vec<RecordError>,
    /// Source position of each entry in `elements`, when parsed from text
    #[serde(skip)]
    positions: Vec<usize>,
}

impl Default for ProfileDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileDocument {
    /// Empty document with the standard root
    pub fn new() -> Self {
        Self {
            root: ROOT_ELEMENT.to_string(),
            elements: Vec::new(),
            rejected: Vec::new(),
            positions: Vec::new(),
        }
    }

    /// Parse YAML text into a document
    ///
    /// Only a broken YAML text or a root that is not a mapping fails the whole
    /// document. Each element is read on its own: one that does not have the
    /// element shape, or repeats an attribute, is remembered and surfaces as a
    /// record error on decode.
    pub fn from_yaml(text: &str) -> Result<Self, ProfileError> {
        if text.trim().is_empty() {
            return Ok(Self::new());
        }

        let fields = match serde_yaml::from_str::<Node<DocumentFields>>(text)? {
            Node::Value(fields) => fields,
            Node::Null => return Ok(Self::new()),
            Node::Other(kind) => {
                return Err(ProfileError::NotADocument(format!(
                    "expected a mapping, found {}",
                    kind
                )))
            }
        };

        let raw_elements = match fields.elements {
            Node::Value(ElementList(items)) => items,
            Node::Null => Vec::new(),
            Node::Other(kind) => {
                return Err(ProfileError::NotADocument(format!(
                    "'elements' must be a list, found {}",
                    kind
                )))
            }
        };

        let mut elements = Vec::with_capacity(raw_elements.len());
        let mut positions = Vec::with_capacity(raw_elements.len());
        let mut rejected = Vec::new();
        for (index, raw) in raw_elements.into_iter().enumerate() {
            match raw.into_element() {
                Ok(element) => {
                    elements.push(element);
                    positions.push(index);
                }
                Err(reason) => rejected.push(RecordError::Malformed { index, reason }),
            }
        }

        Ok(Self {
            root: fields.root.unwrap_or_else(|| ROOT_ELEMENT.to_string()),
            elements,
            rejected,
            positions,
        })
    }

    /// Serialize to YAML text
    pub fn to_yaml(&self) -> Result<String, ProfileError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Binding elements only
    pub fn binding_elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter().filter(|e| e.name == BINDING_ELEMENT)
    }
}

/// Result of decoding a document
#[derive(Debug, Default)]
pub struct DecodedProfile {
    /// Well-formed bindings, in document order
    pub bindings: Vec<(MidiMessageId, String)>,
    /// Records that were skipped
    pub errors: Vec<RecordError>,
}

/// Encode bindings into a document, one element per binding, ordered by identity
pub fn encode<'a, I>(bindings: I) -> ProfileDocument
where
    I: IntoIterator<Item = (&'a MidiMessageId, &'a str)>,
{
    let mut sorted: Vec<_> = bindings.into_iter().collect();
    sorted.sort_by_key(|(id, _)| **id);

    let mut doc = ProfileDocument::new();
    doc.elements = sorted
        .into_iter()
        .map(|(id, command)| binding_element(id, command))
        .collect();
    doc
}

/// Element for a single binding
pub fn binding_element(id: &MidiMessageId, command: &str) -> Element {
    Element::new(BINDING_ELEMENT)
        .with_attribute(ATTR_CHANNEL, u64::from(id.channel()))
        .with_attribute(ATTR_DATA, u64::from(id.data()))
        .with_attribute(ATTR_MESSAGE_TYPE, id.kind().name())
        .with_attribute(ATTR_COMMAND_NAME, command)
}

/// Decode every binding element; bad records are logged and collected
pub fn decode(doc: &ProfileDocument) -> DecodedProfile {
    let mut decoded = DecodedProfile {
        bindings: Vec::with_capacity(doc.elements.len()),
        errors: doc.rejected.clone(),
    };

    for (i, element) in doc.elements.iter().enumerate() {
        let index = doc.positions.get(i).copied().unwrap_or(i);
        if element.name != BINDING_ELEMENT {
            log::debug!("decode: Skipping unrecognized element '{}'", element.name);
            continue;
        }
        match decode_element(index, element) {
            Ok(binding) => decoded.bindings.push(binding),
            Err(e) => decoded.errors.push(e),
        }
    }

    for error in &decoded.errors {
        log::warn!("decode: Skipped record: {}", error);
    }

    decoded
}

fn decode_element(index: usize, element: &Element) -> Result<(MidiMessageId, String), RecordError> {
    let attrs = &element.attributes;

    let channel = integer_attribute(index, attrs, ATTR_CHANNEL, &[])?;
    let data = integer_attribute(index, attrs, ATTR_DATA, &DATA_ALIASES)?;

    let kind_value = attrs
        .get(ATTR_MESSAGE_TYPE)
        .ok_or(RecordError::MissingAttribute {
            index,
            attribute: ATTR_MESSAGE_TYPE,
        })?;
    let kind: MessageKind = kind_value
        .as_str()
        .ok_or_else(|| RecordError::InvalidAttribute {
            index,
            attribute: ATTR_MESSAGE_TYPE,
            value: describe(kind_value),
        })?
        .parse()
        .map_err(|source| RecordError::Identity { index, source })?;

    let command_value = attrs
        .get(ATTR_COMMAND_NAME)
        .ok_or(RecordError::MissingAttribute {
            index,
            attribute: ATTR_COMMAND_NAME,
        })?;
    let command = command_value
        .as_str()
        .ok_or_else(|| RecordError::InvalidAttribute {
            index,
            attribute: ATTR_COMMAND_NAME,
            value: describe(command_value),
        })?
        .to_string();

    let id = MidiMessageId::from_wide(channel, data, kind)
        .map_err(|source| RecordError::Identity { index, source })?;

    Ok((id, command))
}

/// Read an integer attribute, written either as a YAML number or a numeric string
fn integer_attribute(
    index: usize,
    attrs: &BTreeMap<String, Value>,
    name: &'static str,
    aliases: &[&str],
) -> Result<i64, RecordError> {
    let value = std::iter::once(name)
        .chain(aliases.iter().copied())
        .find_map(|key| attrs.get(key))
        .ok_or(RecordError::MissingAttribute {
            index,
            attribute: name,
        })?;

    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    parsed.ok_or_else(|| RecordError::InvalidAttribute {
        index,
        attribute: name,
        value: describe(value),
    })
}

fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{}'", s),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => value_kind(other).to_string(),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

// Lenient document reading
//
// serde_yaml's `Value` refuses a mapping with a repeated key, which would fail
// the whole profile for one bad element. The readers below walk the document
// with their own visitors so a problem stays local to its element.

/// Shape of a YAML node, with the interesting shape read into `T`
enum Node<T> {
    Value(T),
    Null,
    /// Anything else, described for error messages
    Other(&'static str),
}

/// Reads a node of the shape it expects; other shapes are drained
trait NodeReader: Sized {
    fn read_map<'de, A: MapAccess<'de>>(mut map: A) -> Result<Option<Self>, A::Error> {
        while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
        Ok(None)
    }

    fn read_seq<'de, A: SeqAccess<'de>>(mut seq: A) -> Result<Option<Self>, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(None)
    }
}

impl<'de, T: NodeReader> Deserialize<'de> for Node<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(NodeVisitor(PhantomData))
    }
}

struct NodeVisitor<T>(PhantomData<T>);

impl<'de, T: NodeReader> Visitor<'de> for NodeVisitor<T> {
    type Value = Node<T>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a YAML node")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(Node::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(Node::Null)
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<Self::Value, E> {
        Ok(Node::Other("a boolean"))
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> Result<Self::Value, E> {
        Ok(Node::Other("a number"))
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> Result<Self::Value, E> {
        Ok(Node::Other("a number"))
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> Result<Self::Value, E> {
        Ok(Node::Other("a number"))
    }

    fn visit_str<E: de::Error>(self, _: &str) -> Result<Self::Value, E> {
        Ok(Node::Other("a string"))
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Self::Value, A::Error> {
        Ok(T::read_map(map)?.map_or(Node::Other("a mapping"), Node::Value))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, seq: A) -> Result<Self::Value, A::Error> {
        Ok(T::read_seq(seq)?.map_or(Node::Other("a list"), Node::Value))
    }
}

/// Top-level mapping
struct DocumentFields {
    root: Option<String>,
    elements: Node<ElementList>,
}

impl NodeReader for DocumentFields {
    fn read_map<'de, A: MapAccess<'de>>(mut map: A) -> Result<Option<Self>, A::Error> {
        let mut fields = DocumentFields {
            root: None,
            elements: Node::Null,
        };
        while let Some(key) = map.next_key::<Value>()? {
            match key.as_str() {
                Some("root") => fields.root = map.next_value::<Value>()?.as_str().map(str::to_string),
                Some("elements") => fields.elements = map.next_value()?,
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(Some(fields))
    }
}

struct ElementList(Vec<Node<ElementFields>>);

impl NodeReader for ElementList {
    fn read_seq<'de, A: SeqAccess<'de>>(mut seq: A) -> Result<Option<Self>, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Some(ElementList(items)))
    }
}

/// One element as written, before shape checks
struct ElementFields {
    name: Option<Value>,
    attributes: Node<AttributeBag>,
}

impl NodeReader for ElementFields {
    fn read_map<'de, A: MapAccess<'de>>(mut map: A) -> Result<Option<Self>, A::Error> {
        let mut fields = ElementFields {
            name: None,
            attributes: Node::Null,
        };
        while let Some(key) = map.next_key::<Value>()? {
            match key.as_str() {
                Some("name") => fields.name = Some(map.next_value()?),
                Some("attributes") => fields.attributes = map.next_value()?,
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(Some(fields))
    }
}

/// Attribute mapping that tolerates repeated keys long enough to report them
struct AttributeBag {
    attributes: BTreeMap<String, Value>,
    problem: Option<String>,
}

impl NodeReader for AttributeBag {
    fn read_map<'de, A: MapAccess<'de>>(mut map: A) -> Result<Option<Self>, A::Error> {
        let mut bag = AttributeBag {
            attributes: BTreeMap::new(),
            problem: None,
        };
        while let Some(key) = map.next_key::<Value>()? {
            let value: Value = map.next_value()?;
            let key = match key {
                Value::String(key) => key,
                other => {
                    bag.problem
                        .get_or_insert_with(|| format!("attribute name {} is not a string", describe(&other)));
                    continue;
                }
            };
            if bag.attributes.contains_key(&key) {
                bag.problem
                    .get_or_insert_with(|| format!("duplicate attribute '{}'", key));
                continue;
            }
            bag.attributes.insert(key, value);
        }
        Ok(Some(bag))
    }
}

impl Node<ElementFields> {
    fn into_element(self) -> Result<Element, String> {
        let fields = match self {
            Node::Value(fields) => fields,
            Node::Null => return Err("empty element".to_string()),
            Node::Other(kind) => return Err(format!("expected an element mapping, found {}", kind)),
        };

        let name = match fields.name {
            Some(Value::String(name)) => name,
            Some(other) => return Err(format!("element name must be a string, found {}", value_kind(&other))),
            None => return Err("missing field `name`".to_string()),
        };

        let attributes = match fields.attributes {
            Node::Value(AttributeBag {
                problem: Some(problem),
                ..
            }) => return Err(problem),
            Node::Value(bag) => bag.attributes,
            Node::Null => BTreeMap::new(),
            Node::Other(kind) => return Err(format!("attributes must be a mapping, found {}", kind)),
        };

        Ok(Element { name, attributes })
    }
}
