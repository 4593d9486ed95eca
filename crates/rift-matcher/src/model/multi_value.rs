//! Multi-value maps for headers, cookies, query and path parameters.

use super::{is_false, Nottable, Pattern};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a map of declared entries is compared with the actual map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeyMatchStyle {
    /// Every declared value must be found among the actual values of the key.
    #[default]
    SubSet,
    /// Every actual value of a matched key must satisfy a declared value.
    MatchingKey,
}

impl KeyMatchStyle {
    fn is_default(&self) -> bool {
        *self == KeyMatchStyle::SubSet
    }
}

/// OpenAPI parameter serialization style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Style {
    Simple,
    Label,
    Matrix,
    Form,
    SpaceDelimited,
    PipeDelimited,
    DeepObject,
}

impl Style {
    pub fn as_str(&self) -> &'static str {
        match self {
            Style::Simple => "simple",
            Style::Label => "label",
            Style::Matrix => "matrix",
            Style::Form => "form",
            Style::SpaceDelimited => "spaceDelimited",
            Style::PipeDelimited => "pipeDelimited",
            Style::DeepObject => "deepObject",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "simple" => Some(Style::Simple),
            "label" => Some(Style::Label),
            "matrix" => Some(Style::Matrix),
            "form" => Some(Style::Form),
            "spaceDelimited" => Some(Style::SpaceDelimited),
            "pipeDelimited" => Some(Style::PipeDelimited),
            "deepObject" => Some(Style::DeepObject),
            _ => None,
        }
    }
}

/// Style plus explode flag attached to a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ParameterStyle {
    pub style: Style,
    #[serde(default)]
    pub explode: bool,
}

impl ParameterStyle {
    pub fn new(style: Style, explode: bool) -> Self {
        Self { style, explode }
    }

    /// Split one serialized non-path value into its items.
    ///
    /// Exploded form values arrive as repeated keys and are never split.
    pub fn split(&self, value: &str) -> Vec<String> {
        let delimiters: &[&str] = match (self.style, self.explode) {
            (Style::Form, true) | (Style::DeepObject, _) => return vec![value.to_string()],
            (Style::Form, false) | (Style::Simple, _) => &[","],
            (Style::SpaceDelimited, _) => &[" ", "%20"],
            (Style::PipeDelimited, _) => &["|", "%7C", "%7c"],
            (Style::Label, _) | (Style::Matrix, _) => &[","],
        };
        let mut items = vec![value.to_string()];
        for delimiter in delimiters {
            items = items
                .iter()
                .flat_map(|item| item.split(delimiter).map(str::to_string))
                .collect();
        }
        items
    }
}

/// One key with one or more value patterns.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyMultiValue {
    pub name: Nottable<Pattern>,
    #[serde(default, with = "one_or_many")]
    pub values: Vec<Nottable<Pattern>>,
    /// The key may be absent; when present its values must still match.
    #[serde(default, skip_serializing_if = "is_false")]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<ParameterStyle>,
}

impl KeyMultiValue {
    pub fn new<N, V, I>(name: N, values: I) -> Self
    where
        N: Into<Nottable<Pattern>>,
        V: Into<Nottable<Pattern>>,
        I: IntoIterator<Item = V>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
            optional: false,
            style: None,
        }
    }

    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn with_style(mut self, style: ParameterStyle) -> Self {
        self.style = Some(style);
        self
    }
}

/// Ordered collection of [`KeyMultiValue`] entries.
///
/// Deserializes from a list of entries, from `{entries, keyMatchStyle}` or
/// from a plain object of `name: value | [values]`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MultiValueMap {
    pub entries: Vec<KeyMultiValue>,
    pub key_match_style: KeyMatchStyle,
}

impl MultiValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn with_key_match_style(mut self, style: KeyMatchStyle) -> Self {
        self.key_match_style = style;
        self
    }

    /// Append values, merging into an existing entry with the same name.
    pub fn add<N, V, I>(&mut self, name: N, values: I)
    where
        N: Into<Nottable<Pattern>>,
        V: Into<Nottable<Pattern>>,
        I: IntoIterator<Item = V>,
    {
        let name = name.into();
        let values: Vec<Nottable<Pattern>> = values.into_iter().map(Into::into).collect();
        match self.entries.iter_mut().find(|entry| entry.name == name) {
            Some(entry) => entry.values.extend(values),
            None => self.entries.push(KeyMultiValue {
                name,
                values,
                optional: false,
                style: None,
            }),
        }
    }

    pub fn push(&mut self, entry: KeyMultiValue) {
        self.entries.push(entry);
    }

    /// Values of the first entry whose name equals `name` ignoring case.
    pub fn get_ignore_case(&self, name: &str) -> Option<&[Nottable<Pattern>]> {
        self.entries
            .iter()
            .find(|entry| entry.name.value.as_text().eq_ignore_ascii_case(name))
            .map(|entry| entry.values.as_slice())
    }

    /// First value of the named entry, as text.
    pub fn first_value_ignore_case(&self, name: &str) -> Option<String> {
        self.get_ignore_case(name)
            .and_then(|values| values.first())
            .map(|value| value.value.as_text().into_owned())
    }

    /// Parse `application/x-www-form-urlencoded` text.
    ///
    /// `+` decodes to a space and a key without `=` gets an empty value.
    pub fn from_form_urlencoded(body: &str) -> Self {
        let mut map = MultiValueMap::new();
        for pair in body.trim().split('&').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            map.add(form_decode(key), [form_decode(value)]);
        }
        map
    }

    /// Serialize back to `application/x-www-form-urlencoded` text.
    pub fn to_form_urlencoded(&self) -> String {
        let mut pairs = Vec::new();
        for entry in &self.entries {
            let key = urlencoding::encode(&entry.name.value.as_text()).into_owned();
            if entry.values.is_empty() {
                pairs.push(key);
                continue;
            }
            for value in &entry.values {
                pairs.push(format!(
                    "{}={}",
                    key,
                    urlencoding::encode(&value.value.as_text())
                ));
            }
        }
        pairs.join("&")
    }
}

fn form_decode(value: &str) -> String {
    let spaced = value.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .unwrap_or(spaced)
}

#[derive(Deserialize, Serialize)]
#[serde(untagged)]
enum MultiValueMapRepr {
    Entries(Vec<KeyMultiValue>),
    Full {
        entries: Vec<KeyMultiValue>,
        #[serde(
            default,
            rename = "keyMatchStyle",
            skip_serializing_if = "KeyMatchStyle::is_default"
        )]
        key_match_style: KeyMatchStyle,
    },
    Object(BTreeMap<String, OneOrMany>),
}

#[derive(Deserialize, Serialize)]
#[serde(untagged)]
enum OneOrMany {
    One(Nottable<Pattern>),
    Many(Vec<Nottable<Pattern>>),
}

impl<'de> Deserialize<'de> for MultiValueMap {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match MultiValueMapRepr::deserialize(deserializer)? {
            MultiValueMapRepr::Entries(entries) => MultiValueMap {
                entries,
                key_match_style: KeyMatchStyle::SubSet,
            },
            MultiValueMapRepr::Full {
                entries,
                key_match_style,
            } => MultiValueMap {
                entries,
                key_match_style,
            },
            MultiValueMapRepr::Object(object) => {
                let mut map = MultiValueMap::new();
                for (name, values) in object {
                    match values {
                        OneOrMany::One(value) => map.add(name, [value]),
                        OneOrMany::Many(values) => map.add(name, values),
                    }
                }
                map
            }
        })
    }
}

impl Serialize for MultiValueMap {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.key_match_style.is_default() {
            self.entries.serialize(serializer)
        } else {
            MultiValueMapRepr::Full {
                entries: self.entries.clone(),
                key_match_style: self.key_match_style,
            }
            .serialize(serializer)
        }
    }
}

/// Accepts a single value or a list for `values`.
mod one_or_many {
    use super::{Nottable, OneOrMany, Pattern};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        values: &[Nottable<Pattern>],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        values.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Nottable<Pattern>>, D::Error> {
        Ok(match OneOrMany::deserialize(deserializer)? {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        })
    }
}
