//! Validation of XML documents against an XML Schema.
//!
//! Covers the subset of XSD used to describe request payloads: global and
//! local element declarations (including `ref`), `minOccurs`/`maxOccurs`,
//! named and anonymous complex and simple types, `sequence`/`choice`/`all`/
//! `any` particles, `complexContent` and `simpleContent` extension,
//! attributes with `use="required"`, simple type restrictions with the usual
//! facets, `list` and `union`, and the built-in primitive types.

use super::xml::{child_elements, parse, root_element, text_content};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use sxd_document::dom::Element;
use tracing::warn;

static DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d{4,}-\d{2}-\d{2}(Z|[+-]\d{2}:\d{2})?$").unwrap());
static DATE_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^-?\d{4,}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:\d{2})?$").unwrap()
});
static TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:\d{2})?$").unwrap());

/// Nesting limit when following type derivation chains.
const MAX_TYPE_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Occurs {
    min: u32,
    /// `None` is `unbounded`.
    max: Option<u32>,
}

impl Occurs {
    const ONCE: Occurs = Occurs {
        min: 1,
        max: Some(1),
    };

    fn parse(element: Element<'_>) -> Self {
        let min = element
            .attribute_value("minOccurs")
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(1);
        let max = match element.attribute_value("maxOccurs").map(str::trim) {
            Some("unbounded") => None,
            Some(value) => Some(value.parse().unwrap_or(1)),
            None => Some(1),
        };
        Occurs { min, max }
    }

    fn allows_more(&self, count: u32) -> bool {
        self.max.map_or(true, |max| count < max)
    }
}

#[derive(Debug, Clone)]
enum TypeRef {
    Named(String),
    Complex(Box<ComplexType>),
    Simple(Box<SimpleType>),
}

#[derive(Debug, Clone)]
struct ElementDecl {
    name: String,
    /// Declared through `ref`: the global declaration of `name` applies.
    reference: bool,
    /// `None` is `anyType`.
    content: Option<TypeRef>,
    occurs: Occurs,
}

#[derive(Debug, Clone)]
enum Particle {
    Element(ElementDecl),
    Sequence(Vec<Particle>, Occurs),
    Choice(Vec<Particle>, Occurs),
    All(Vec<ElementDecl>),
    Any(Occurs),
}

#[derive(Debug, Clone)]
struct AttributeDecl {
    name: String,
    kind: Option<TypeRef>,
    required: bool,
}

#[derive(Debug, Clone, Default)]
struct ComplexType {
    base: Option<String>,
    particle: Option<Particle>,
    attributes: Vec<AttributeDecl>,
    any_attribute: bool,
    mixed: bool,
    /// Base type of `simpleContent`.
    text: Option<TypeRef>,
}

#[derive(Debug, Clone, Default)]
struct Facets {
    enumeration: Vec<String>,
    patterns: Vec<Regex>,
    length: Option<usize>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    min_inclusive: Option<f64>,
    max_inclusive: Option<f64>,
    min_exclusive: Option<f64>,
    max_exclusive: Option<f64>,
}

#[derive(Debug, Clone)]
enum SimpleType {
    Restriction { base: TypeRef, facets: Facets },
    List(TypeRef),
    Union(Vec<TypeRef>),
}

/// A parsed XML Schema.
#[derive(Debug, Clone, Default)]
pub struct XmlSchema {
    elements: HashMap<String, ElementDecl>,
    complex_types: HashMap<String, ComplexType>,
    simple_types: HashMap<String, SimpleType>,
}

fn local(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

fn kind_of(element: Element<'_>) -> &str {
    element.name().local_part()
}

fn parse_element(element: Element<'_>) -> ElementDecl {
    let occurs = Occurs::parse(element);
    if let Some(reference) = element.attribute_value("ref") {
        return ElementDecl {
            name: local(reference).to_string(),
            reference: true,
            content: None,
            occurs,
        };
    }
    let content = match element.attribute_value("type") {
        Some(kind) => Some(TypeRef::Named(local(kind).to_string())),
        None => child_elements(element)
            .into_iter()
            .find_map(|child| match kind_of(child) {
                "complexType" => Some(TypeRef::Complex(Box::new(parse_complex(child)))),
                "simpleType" => Some(TypeRef::Simple(Box::new(parse_simple(child)))),
                _ => None,
            }),
    };
    ElementDecl {
        name: element.attribute_value("name").unwrap_or_default().to_string(),
        reference: false,
        content,
        occurs,
    }
}

fn parse_particle(element: Element<'_>) -> Option<Particle> {
    let occurs = Occurs::parse(element);
    let items = || -> Vec<Particle> {
        child_elements(element)
            .into_iter()
            .filter_map(|child| match kind_of(child) {
                "element" => Some(Particle::Element(parse_element(child))),
                "sequence" | "choice" | "all" | "any" => parse_particle(child),
                _ => None,
            })
            .collect()
    };
    match kind_of(element) {
        "sequence" => Some(Particle::Sequence(items(), occurs)),
        "choice" => Some(Particle::Choice(items(), occurs)),
        "all" => Some(Particle::All(
            child_elements(element)
                .into_iter()
                .filter(|child| kind_of(*child) == "element")
                .map(parse_element)
                .collect(),
        )),
        "any" => Some(Particle::Any(occurs)),
        _ => None,
    }
}

fn parse_attribute(element: Element<'_>) -> AttributeDecl {
    let kind = match element.attribute_value("type") {
        Some(kind) => Some(TypeRef::Named(local(kind).to_string())),
        None => child_elements(element)
            .into_iter()
            .find(|child| kind_of(*child) == "simpleType")
            .map(|child| TypeRef::Simple(Box::new(parse_simple(child)))),
    };
    AttributeDecl {
        name: element
            .attribute_value("name")
            .or_else(|| element.attribute_value("ref").map(local))
            .unwrap_or_default()
            .to_string(),
        kind,
        required: element.attribute_value("use") == Some("required"),
    }
}

/// Read particles and attributes declared directly under `element` into `target`.
fn parse_complex_body(element: Element<'_>, target: &mut ComplexType) {
    for child in child_elements(element) {
        match kind_of(child) {
            "sequence" | "choice" | "all" => target.particle = parse_particle(child),
            "attribute" => target.attributes.push(parse_attribute(child)),
            "anyAttribute" => target.any_attribute = true,
            _ => {}
        }
    }
}

fn parse_complex(element: Element<'_>) -> ComplexType {
    let mut complex = ComplexType {
        mixed: element.attribute_value("mixed") == Some("true"),
        ..ComplexType::default()
    };
    parse_complex_body(element, &mut complex);
    for child in child_elements(element) {
        match kind_of(child) {
            "complexContent" => {
                for derivation in child_elements(child) {
                    complex.base = derivation
                        .attribute_value("base")
                        .map(|base| local(base).to_string())
                        .filter(|base| base != "anyType");
                    parse_complex_body(derivation, &mut complex);
                }
            }
            "simpleContent" => {
                for derivation in child_elements(child) {
                    complex.text = derivation
                        .attribute_value("base")
                        .map(|base| TypeRef::Named(local(base).to_string()));
                    parse_complex_body(derivation, &mut complex);
                }
            }
            _ => {}
        }
    }
    complex
}

fn parse_facets(restriction: Element<'_>) -> Facets {
    let mut facets = Facets::default();
    for facet in child_elements(restriction) {
        let Some(value) = facet.attribute_value("value") else {
            continue;
        };
        let size = || value.trim().parse::<usize>().ok();
        let number = || value.trim().parse::<f64>().ok();
        match kind_of(facet) {
            "enumeration" => facets.enumeration.push(value.to_string()),
            "pattern" => match Regex::new(&format!("^(?:{value})$")) {
                Ok(pattern) => facets.patterns.push(pattern),
                Err(e) => warn!("Ignoring unsupported xml schema pattern {:?}: {}", value, e),
            },
            "length" => facets.length = size(),
            "minLength" => facets.min_length = size(),
            "maxLength" => facets.max_length = size(),
            "minInclusive" => facets.min_inclusive = number(),
            "maxInclusive" => facets.max_inclusive = number(),
            "minExclusive" => facets.min_exclusive = number(),
            "maxExclusive" => facets.max_exclusive = number(),
            _ => {}
        }
    }
    facets
}

fn parse_simple(element: Element<'_>) -> SimpleType {
    for child in child_elements(element) {
        match kind_of(child) {
            "restriction" => {
                let base = match child.attribute_value("base") {
                    Some(base) => TypeRef::Named(local(base).to_string()),
                    None => child_elements(child)
                        .into_iter()
                        .find(|inner| kind_of(*inner) == "simpleType")
                        .map(|inner| TypeRef::Simple(Box::new(parse_simple(inner))))
                        .unwrap_or_else(|| TypeRef::Named("string".to_string())),
                };
                return SimpleType::Restriction {
                    base,
                    facets: parse_facets(child),
                };
            }
            "list" => {
                let item = match child.attribute_value("itemType") {
                    Some(item) => TypeRef::Named(local(item).to_string()),
                    None => child_elements(child)
                        .into_iter()
                        .find(|inner| kind_of(*inner) == "simpleType")
                        .map(|inner| TypeRef::Simple(Box::new(parse_simple(inner))))
                        .unwrap_or_else(|| TypeRef::Named("string".to_string())),
                };
                return SimpleType::List(item);
            }
            "union" => {
                let mut members: Vec<TypeRef> = child
                    .attribute_value("memberTypes")
                    .unwrap_or_default()
                    .split_whitespace()
                    .map(|member| TypeRef::Named(local(member).to_string()))
                    .collect();
                members.extend(
                    child_elements(child)
                        .into_iter()
                        .filter(|inner| kind_of(*inner) == "simpleType")
                        .map(|inner| TypeRef::Simple(Box::new(parse_simple(inner)))),
                );
                return SimpleType::Union(members);
            }
            _ => {}
        }
    }
    SimpleType::Restriction {
        base: TypeRef::Named("string".to_string()),
        facets: Facets::default(),
    }
}

/// Check `value` against a built-in XSD type. Unknown names are accepted.
fn check_builtin(kind: &str, value: &str) -> Result<(), String> {
    let trimmed = value.trim();
    let integer_range = |min: i128, max: i128| -> Result<(), String> {
        match trimmed.trim_start_matches('+').parse::<i128>() {
            Ok(parsed) if parsed >= min && parsed <= max => Ok(()),
            Ok(_) => Err(format!("value \"{value}\" is out of range for type \"{kind}\"")),
            Err(_) => Err(format!("value \"{value}\" is not a valid \"{kind}\"")),
        }
    };
    let valid = |ok: bool| {
        if ok {
            Ok(())
        } else {
            Err(format!("value \"{value}\" is not a valid \"{kind}\""))
        }
    };
    match kind {
        "boolean" => valid(matches!(trimmed, "true" | "false" | "1" | "0")),
        "integer" => integer_range(i128::MIN, i128::MAX),
        "long" => integer_range(i64::MIN as i128, i64::MAX as i128),
        "int" => integer_range(i32::MIN as i128, i32::MAX as i128),
        "short" => integer_range(i16::MIN as i128, i16::MAX as i128),
        "byte" => integer_range(i8::MIN as i128, i8::MAX as i128),
        "nonNegativeInteger" => integer_range(0, i128::MAX),
        "positiveInteger" => integer_range(1, i128::MAX),
        "nonPositiveInteger" => integer_range(i128::MIN, 0),
        "negativeInteger" => integer_range(i128::MIN, -1),
        "unsignedLong" => integer_range(0, u64::MAX as i128),
        "unsignedInt" => integer_range(0, u32::MAX as i128),
        "unsignedShort" => integer_range(0, u16::MAX as i128),
        "unsignedByte" => integer_range(0, u8::MAX as i128),
        "decimal" => valid(
            !trimmed.is_empty()
                && trimmed
                    .trim_start_matches(['+', '-'])
                    .chars()
                    .all(|c| c.is_ascii_digit() || c == '.')
                && trimmed.matches('.').count() <= 1
                && trimmed.chars().any(|c| c.is_ascii_digit()),
        ),
        "float" | "double" => valid(
            matches!(trimmed, "INF" | "-INF" | "NaN") || trimmed.parse::<f64>().is_ok(),
        ),
        "date" => valid(DATE.is_match(trimmed)),
        "dateTime" => valid(DATE_TIME.is_match(trimmed)),
        "time" => valid(TIME.is_match(trimmed)),
        _ => Ok(()),
    }
}

fn check_facets(facets: &Facets, value: &str) -> Result<(), String> {
    if !facets.enumeration.is_empty() && !facets.enumeration.iter().any(|item| item == value) {
        return Err(format!(
            "value \"{}\" is not one of [{}]",
            value,
            facets.enumeration.join(", ")
        ));
    }
    if !facets.patterns.is_empty() && !facets.patterns.iter().any(|pattern| pattern.is_match(value)) {
        return Err(format!("value \"{value}\" does not match the declared pattern"));
    }
    let length = value.chars().count();
    if facets.length.is_some_and(|expected| length != expected)
        || facets.min_length.is_some_and(|min| length < min)
        || facets.max_length.is_some_and(|max| length > max)
    {
        return Err(format!("value \"{value}\" has invalid length {length}"));
    }
    let bounded = facets.min_inclusive.is_some()
        || facets.max_inclusive.is_some()
        || facets.min_exclusive.is_some()
        || facets.max_exclusive.is_some();
    if bounded {
        let number = value
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("value \"{value}\" is not numeric"))?;
        if facets.min_inclusive.is_some_and(|min| number < min)
            || facets.max_inclusive.is_some_and(|max| number > max)
            || facets.min_exclusive.is_some_and(|min| number <= min)
            || facets.max_exclusive.is_some_and(|max| number >= max)
        {
            return Err(format!("value \"{value}\" is out of range"));
        }
    }
    Ok(())
}

impl XmlSchema {
    pub fn parse(text: &str) -> Result<Self, String> {
        let package = parse(text)?;
        let document = package.as_document();
        let root = root_element(&document)
            .filter(|root| kind_of(*root) == "schema")
            .ok_or_else(|| "document element is not an xml schema".to_string())?;

        let mut schema = XmlSchema::default();
        for child in child_elements(root) {
            let name = child.attribute_value("name").unwrap_or_default().to_string();
            match kind_of(child) {
                "element" => {
                    let mut declaration = parse_element(child);
                    declaration.occurs = Occurs::ONCE;
                    schema.elements.insert(name, declaration);
                }
                "complexType" => {
                    schema.complex_types.insert(name, parse_complex(child));
                }
                "simpleType" => {
                    schema.simple_types.insert(name, parse_simple(child));
                }
                _ => {}
            }
        }
        Ok(schema)
    }

    /// Validate `document`, returning one message per violation.
    pub fn validate(&self, document: &str) -> Vec<String> {
        let package = match parse(document) {
            Ok(package) => package,
            Err(e) => return vec![e],
        };
        let document = package.as_document();
        let Some(root) = root_element(&document) else {
            return vec!["document element missing".to_string()];
        };
        let name = root.name().local_part();
        let mut errors = Vec::new();
        match self.elements.get(name) {
            Some(declaration) => self.validate_element(root, declaration, "", &mut errors),
            None => errors.push(format!("no global element declaration for \"{name}\"")),
        }
        errors
    }

    fn validate_element(
        &self,
        element: Element<'_>,
        declaration: &ElementDecl,
        parent: &str,
        errors: &mut Vec<String>,
    ) {
        let path = format!("{}/{}", parent, element.name().local_part());
        let declaration = if declaration.reference {
            match self.elements.get(&declaration.name) {
                Some(global) => global,
                None => {
                    errors.push(format!(
                        "element \"{}\": unknown element reference \"{}\"",
                        path, declaration.name
                    ));
                    return;
                }
            }
        } else {
            declaration
        };
        match &declaration.content {
            None => {}
            Some(TypeRef::Complex(complex)) => self.validate_complex(element, complex, &path, errors),
            Some(TypeRef::Simple(simple)) => {
                self.validate_simple_element(element, |value| self.check_simple(simple, value, 0), &path, errors)
            }
            Some(TypeRef::Named(name)) => match self.complex_types.get(name) {
                Some(complex) => self.validate_complex(element, complex, &path, errors),
                None => self.validate_simple_element(
                    element,
                    |value| self.check_named(name, value, 0),
                    &path,
                    errors,
                ),
            },
        }
    }

    fn validate_simple_element(
        &self,
        element: Element<'_>,
        check: impl Fn(&str) -> Result<(), String>,
        path: &str,
        errors: &mut Vec<String>,
    ) {
        if !child_elements(element).is_empty() {
            errors.push(format!(
                "element \"{path}\": child elements are not allowed in a simple type"
            ));
            return;
        }
        if let Err(e) = check(&text_content(element)) {
            errors.push(format!("element \"{path}\": {e}"));
        }
    }

    /// Flatten a complex type with its `complexContent` base chain.
    fn effective(&self, complex: &ComplexType) -> ComplexType {
        let mut chain = vec![complex.clone()];
        let mut base = complex.base.clone();
        while let Some(name) = base {
            if chain.len() > MAX_TYPE_DEPTH {
                break;
            }
            match self.complex_types.get(&name) {
                Some(parent) => {
                    base = parent.base.clone();
                    chain.push(parent.clone());
                }
                None => break,
            }
        }
        let mut effective = ComplexType::default();
        let mut particles = Vec::new();
        for complex in chain.into_iter().rev() {
            effective.attributes.extend(complex.attributes);
            effective.any_attribute |= complex.any_attribute;
            effective.mixed |= complex.mixed;
            if complex.text.is_some() {
                effective.text = complex.text;
            }
            particles.extend(complex.particle);
        }
        effective.particle = match particles.len() {
            0 => None,
            1 => particles.pop(),
            _ => Some(Particle::Sequence(particles, Occurs::ONCE)),
        };
        effective
    }

    fn validate_complex(
        &self,
        element: Element<'_>,
        complex: &ComplexType,
        path: &str,
        errors: &mut Vec<String>,
    ) {
        let complex = self.effective(complex);

        for declaration in &complex.attributes {
            match element.attribute_value(declaration.name.as_str()) {
                Some(value) => {
                    let result = match &declaration.kind {
                        Some(TypeRef::Named(name)) => self.check_named(name, value, 0),
                        Some(TypeRef::Simple(simple)) => self.check_simple(simple, value, 0),
                        _ => Ok(()),
                    };
                    if let Err(e) = result {
                        errors.push(format!(
                            "element \"{}\": attribute \"{}\": {}",
                            path, declaration.name, e
                        ));
                    }
                }
                None if declaration.required => errors.push(format!(
                    "element \"{}\": missing required attribute \"{}\"",
                    path, declaration.name
                )),
                None => {}
            }
        }
        if !complex.any_attribute {
            for attribute in element.attributes() {
                let name = attribute.name();
                if name.namespace_uri().is_none()
                    && !complex
                        .attributes
                        .iter()
                        .any(|declaration| declaration.name == name.local_part())
                {
                    errors.push(format!(
                        "element \"{}\": attribute \"{}\" is not allowed",
                        path,
                        name.local_part()
                    ));
                }
            }
        }

        if let Some(text) = &complex.text {
            let TypeRef::Named(name) = text else {
                return;
            };
            self.validate_simple_element(element, |value| self.check_named(name, value, 0), path, errors);
            return;
        }

        let children = child_elements(element);
        let consumed = match &complex.particle {
            Some(particle) => match self.consume(particle, &children, 0, path, errors) {
                Ok(consumed) => consumed,
                Err(e) => {
                    errors.push(format!("element \"{path}\": {e}"));
                    return;
                }
            },
            None => 0,
        };
        if let Some(unexpected) = children.get(consumed) {
            errors.push(format!(
                "element \"{}\": unexpected element \"{}\"",
                path,
                unexpected.name().local_part()
            ));
        }
        if !complex.mixed && !text_content(element).is_empty() {
            errors.push(format!("element \"{path}\": text content is not allowed"));
        }
    }

    /// Match `particle` against `children` starting at `position`, returning
    /// the position after the consumed elements.
    fn consume(
        &self,
        particle: &Particle,
        children: &[Element<'_>],
        position: usize,
        path: &str,
        errors: &mut Vec<String>,
    ) -> Result<usize, String> {
        match particle {
            Particle::Element(declaration) => {
                let mut position = position;
                let mut count = 0;
                while declaration.occurs.allows_more(count)
                    && children
                        .get(position)
                        .is_some_and(|child| child.name().local_part() == declaration.name)
                {
                    self.validate_element(children[position], declaration, path, errors);
                    position += 1;
                    count += 1;
                }
                if count < declaration.occurs.min {
                    return Err(match children.get(position) {
                        Some(found) => format!(
                            "expected element \"{}\" but found \"{}\"",
                            declaration.name,
                            found.name().local_part()
                        ),
                        None => format!("missing element \"{}\"", declaration.name),
                    });
                }
                Ok(position)
            }
            Particle::Sequence(items, occurs) => {
                self.repeat(occurs, position, |start, scratch| {
                    items.iter().try_fold(start, |at, item| {
                        self.consume(item, children, at, path, scratch)
                    })
                }, errors)
            }
            Particle::Choice(items, occurs) => {
                self.repeat(occurs, position, |start, scratch| {
                    let mut first_error = None;
                    let mut empty_match = None;
                    for item in items {
                        let mut trial = Vec::new();
                        match self.consume(item, children, start, path, &mut trial) {
                            Ok(end) if end > start => {
                                scratch.extend(trial);
                                return Ok(end);
                            }
                            Ok(end) => empty_match = empty_match.or(Some(end)),
                            Err(e) => first_error = first_error.or(Some(e)),
                        }
                    }
                    empty_match.ok_or_else(|| {
                        first_error.unwrap_or_else(|| "no choice alternative matched".to_string())
                    })
                }, errors)
            }
            Particle::All(declarations) => {
                let mut position = position;
                let mut seen = vec![false; declarations.len()];
                while let Some(child) = children.get(position) {
                    let found = declarations.iter().enumerate().find(|(index, declaration)| {
                        !seen[*index] && declaration.name == child.name().local_part()
                    });
                    let Some((index, declaration)) = found else {
                        break;
                    };
                    seen[index] = true;
                    self.validate_element(*child, declaration, path, errors);
                    position += 1;
                }
                for (declaration, seen) in declarations.iter().zip(seen) {
                    if !seen && declaration.occurs.min > 0 {
                        return Err(format!("missing element \"{}\"", declaration.name));
                    }
                }
                Ok(position)
            }
            Particle::Any(occurs) => {
                let mut position = position;
                let mut count = 0;
                while occurs.allows_more(count) && position < children.len() {
                    position += 1;
                    count += 1;
                }
                if count < occurs.min {
                    return Err("missing element matching any".to_string());
                }
                Ok(position)
            }
        }
    }

    /// Apply `step` up to `occurs.max` times, stopping when it fails or
    /// consumes nothing once the minimum is reached.
    fn repeat(
        &self,
        occurs: &Occurs,
        position: usize,
        step: impl Fn(usize, &mut Vec<String>) -> Result<usize, String>,
        errors: &mut Vec<String>,
    ) -> Result<usize, String> {
        let mut position = position;
        let mut count = 0;
        while occurs.allows_more(count) {
            let mut scratch = Vec::new();
            match step(position, &mut scratch) {
                Ok(end) => {
                    errors.extend(scratch);
                    count += 1;
                    if end == position {
                        break;
                    }
                    position = end;
                }
                Err(e) if count < occurs.min => return Err(e),
                Err(_) => break,
            }
        }
        Ok(position)
    }

    fn check_named(&self, name: &str, value: &str, depth: usize) -> Result<(), String> {
        if depth > MAX_TYPE_DEPTH {
            return Ok(());
        }
        match self.simple_types.get(name) {
            Some(simple) => self.check_simple(simple, value, depth + 1),
            None => check_builtin(name, value),
        }
    }

    fn check_type(&self, kind: &TypeRef, value: &str, depth: usize) -> Result<(), String> {
        match kind {
            TypeRef::Named(name) => self.check_named(name, value, depth),
            TypeRef::Simple(simple) => self.check_simple(simple, value, depth + 1),
            TypeRef::Complex(_) => Ok(()),
        }
    }

    fn check_simple(&self, simple: &SimpleType, value: &str, depth: usize) -> Result<(), String> {
        match simple {
            SimpleType::Restriction { base, facets } => {
                self.check_type(base, value, depth)?;
                check_facets(facets, value)
            }
            SimpleType::List(item) => value
                .split_whitespace()
                .try_for_each(|item_value| self.check_type(item, item_value, depth)),
            SimpleType::Union(members) => {
                if members.is_empty()
                    || members
                        .iter()
                        .any(|member| self.check_type(member, value, depth).is_ok())
                {
                    Ok(())
                } else {
                    Err(format!("value \"{value}\" matches none of the union member types"))
                }
            }
        }
    }
}
