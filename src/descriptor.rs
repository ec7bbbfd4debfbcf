//! Broker descriptor codec
//!
//! Every broker archive may carry a descriptor (`META-INF/broker.xml`) that
//! declares its configurable properties:
//!
//! ```xml
//! <Broker>
//!   <CompiledMessageFlow name="orders">
//!     <ConfigurableProperty uri="orders#Input.queueName"/>
//!     <ConfigurableProperty uri="orders#timeout" override="30"/>
//!   </CompiledMessageFlow>
//! </Broker>
//! ```
//!
//! [`extract`] reads the declarations into a [`PropertySet`] and [`patch`]
//! writes override values back into the document.
//!
//! Descriptors must not carry a document type declaration. A `<!DOCTYPE>`
//! is not supported by the XML parser and the descriptor is reported as
//! malformed.

use std::collections::BTreeMap;

use log::info;
use serde::Serialize;
use xot::{NameId, Node, Xot};

use crate::error::{Error, Result};
use crate::overrides::Overrides;

/// Element that declares a configurable property
pub const CONFIGURABLE_PROPERTY: &str = "ConfigurableProperty";
const ATTR_URI: &str = "uri";
const ATTR_OVERRIDE: &str = "override";
const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

/// What an archive says about one property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum OverrideSlot {
    /// No `ConfigurableProperty` with this `uri`
    NotDeclared,
    /// Declared without an `override` attribute
    Declared,
    /// Declared with an `override` attribute (possibly empty)
    Overridden(String),
}

impl OverrideSlot {
    /// The baked-in override value, if any
    pub fn value(&self) -> Option<&str> {
        match self {
            OverrideSlot::Overridden(value) => Some(value),
            _ => None,
        }
    }
}

/// Declared properties keyed by `uri`, iterated in key order.
///
/// Only declared slots are stored; asking for any other key yields
/// [`OverrideSlot::NotDeclared`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PropertySet {
    slots: BTreeMap<String, OverrideSlot>,
}

impl PropertySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a slot. Inserting `NotDeclared` removes the key.
    pub fn insert(&mut self, uri: impl Into<String>, slot: OverrideSlot) {
        let uri = uri.into();
        match slot {
            OverrideSlot::NotDeclared => {
                self.slots.remove(&uri);
            }
            declared => {
                self.slots.insert(uri, declared);
            }
        }
    }

    /// The slot for `uri`
    pub fn slot(&self, uri: &str) -> OverrideSlot {
        self.slots
            .get(uri)
            .cloned()
            .unwrap_or(OverrideSlot::NotDeclared)
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.slots.contains_key(uri)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Declared properties in `uri` order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OverrideSlot)> {
        self.slots.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Merge `other` into this set; slots from `other` win
    pub fn merge(&mut self, other: PropertySet) {
        self.slots.extend(other.slots);
    }
}

impl<K: Into<String>> FromIterator<(K, OverrideSlot)> for PropertySet {
    fn from_iter<T: IntoIterator<Item = (K, OverrideSlot)>>(iter: T) -> Self {
        let mut set = PropertySet::new();
        for (uri, slot) in iter {
            set.insert(uri, slot);
        }
        set
    }
}

struct Names {
    property: NameId,
    uri: NameId,
    override_attr: NameId,
}

impl Names {
    fn register(xot: &mut Xot) -> Self {
        Self {
            property: xot.add_name(CONFIGURABLE_PROPERTY),
            uri: xot.add_name(ATTR_URI),
            override_attr: xot.add_name(ATTR_OVERRIDE),
        }
    }
}

fn malformed(path: &str, message: impl ToString) -> Error {
    Error::MalformedDescriptor {
        path: path.to_string(),
        message: message.to_string(),
    }
}

fn decode<'a>(bytes: &'a [u8], path: &str) -> Result<&'a str> {
    let text = std::str::from_utf8(bytes).map_err(|e| malformed(path, e))?;
    Ok(text.trim_start_matches('\u{feff}'))
}

/// Parse a descriptor document. DTDs are rejected.
fn parse(xot: &mut Xot, text: &str, path: &str) -> Result<Node> {
    xot.parse(text).map_err(|e| malformed(path, e))
}

fn property_nodes(xot: &Xot, root: Node, names: &Names) -> Vec<Node> {
    xot.descendants(root)
        .filter(|node| {
            xot.element(*node)
                .is_some_and(|element| element.name() == names.property)
        })
        .collect()
}

fn uri_of<'a>(xot: &'a Xot, node: Node, names: &Names, path: &str) -> Result<&'a str> {
    xot.get_attribute(node, names.uri).ok_or_else(|| {
        malformed(
            path,
            format!("{} element without a '{}' attribute", CONFIGURABLE_PROPERTY, ATTR_URI),
        )
    })
}

/// Read the configurable properties declared in a descriptor.
///
/// `path` names the descriptor in error messages. When the same `uri` is
/// declared twice the later declaration wins.
pub fn extract(descriptor: &[u8], path: &str) -> Result<PropertySet> {
    let text = decode(descriptor, path)?;
    let mut xot = Xot::new();
    let names = Names::register(&mut xot);
    let root = parse(&mut xot, text, path)?;

    let mut properties = PropertySet::new();
    for node in property_nodes(&xot, root, &names) {
        let uri = uri_of(&xot, node, &names, path)?;
        let slot = match xot.get_attribute(node, names.override_attr) {
            Some(value) => OverrideSlot::Overridden(value.to_string()),
            None => OverrideSlot::Declared,
        };
        properties.insert(uri, slot);
    }
    Ok(properties)
}

/// Apply override values to the properties a descriptor declares.
///
/// Declared properties whose `uri` is a key of `overrides` get their
/// `override` attribute set (or created). Other declarations are left alone
/// and override keys that match no declaration are ignored. If no attribute
/// value changes, the input bytes are returned as they are.
pub fn patch(descriptor: &[u8], overrides: &Overrides, path: &str) -> Result<Vec<u8>> {
    let text = decode(descriptor, path)?;
    let mut xot = Xot::new();
    let names = Names::register(&mut xot);
    let root = parse(&mut xot, text, path)?;

    let mut changed = false;
    for node in property_nodes(&xot, root, &names) {
        let uri = uri_of(&xot, node, &names, path)?.to_string();
        let Some(value) = overrides.get(&uri) else {
            continue;
        };
        info!("Overriding configurable property '{}' with '{}'.", uri, value);
        if xot.get_attribute(node, names.override_attr) != Some(value) {
            xot.set_attribute(node, names.override_attr, value);
            changed = true;
        }
    }

    if !changed {
        return Ok(descriptor.to_vec());
    }

    let body = xot.to_string(root).map_err(|e| malformed(path, e))?;
    let mut output = String::with_capacity(body.len() + XML_DECLARATION.len());
    if text.trim_start().starts_with("<?xml") {
        output.push_str(XML_DECLARATION);
    }
    output.push_str(&body);
    Ok(output.into_bytes())
}
