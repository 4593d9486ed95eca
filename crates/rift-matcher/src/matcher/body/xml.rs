//! XML parsing helpers, structural comparison and XPath evaluation.

use sxd_document::dom::{ChildOfElement, ChildOfRoot, Document, Element};
use sxd_document::{parser, Package};
use sxd_xpath::{evaluate_xpath, Value};

pub fn parse(text: &str) -> Result<Package, String> {
    parser::parse(text).map_err(|e| format!("invalid xml: {e:?}"))
}

/// The document element, if the document has one.
pub fn root_element<'d>(document: &Document<'d>) -> Option<Element<'d>> {
    document.root().children().into_iter().find_map(|child| match child {
        ChildOfRoot::Element(element) => Some(element),
        _ => None,
    })
}

pub fn child_elements<'d>(element: Element<'d>) -> Vec<Element<'d>> {
    element
        .children()
        .into_iter()
        .filter_map(|child| match child {
            ChildOfElement::Element(element) => Some(element),
            _ => None,
        })
        .collect()
}

/// Concatenated direct text content, trimmed.
pub fn text_content(element: Element<'_>) -> String {
    element
        .children()
        .into_iter()
        .filter_map(|child| match child {
            ChildOfElement::Text(text) => Some(text.text().to_string()),
            _ => None,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Compare two XML documents ignoring formatting whitespace and attribute
/// order.
pub fn compare(expected: &str, actual: &str) -> Result<(), String> {
    let expected = parse(expected).map_err(|e| format!("expected {e}"))?;
    let actual = parse(actual)?;
    let expected_document = expected.as_document();
    let actual_document = actual.as_document();
    match (
        root_element(&expected_document),
        root_element(&actual_document),
    ) {
        (Some(expected), Some(actual)) => compare_elements(expected, actual, ""),
        (None, None) => Ok(()),
        _ => Err("document element missing".to_string()),
    }
}

fn compare_elements(expected: Element<'_>, actual: Element<'_>, parent: &str) -> Result<(), String> {
    let path = format!("{}/{}", parent, expected.name().local_part());
    if expected.name().local_part() != actual.name().local_part()
        || expected.name().namespace_uri() != actual.name().namespace_uri()
    {
        return Err(format!(
            "expected element \"{}\" but found \"{}\"",
            path,
            actual.name().local_part()
        ));
    }

    let attributes = |element: Element<'_>| {
        let mut attributes: Vec<(String, String)> = element
            .attributes()
            .into_iter()
            .map(|attribute| {
                (
                    attribute.name().local_part().to_string(),
                    attribute.value().to_string(),
                )
            })
            .collect();
        attributes.sort();
        attributes
    };
    let (expected_attributes, actual_attributes) = (attributes(expected), attributes(actual));
    if expected_attributes != actual_attributes {
        return Err(format!(
            "attributes of \"{path}\" differ, expected {expected_attributes:?} but found {actual_attributes:?}"
        ));
    }

    let (expected_text, actual_text) = (text_content(expected), text_content(actual));
    if expected_text != actual_text {
        return Err(format!(
            "text of \"{path}\" differs, expected \"{expected_text}\" but found \"{actual_text}\""
        ));
    }

    let (expected_children, actual_children) = (child_elements(expected), child_elements(actual));
    if expected_children.len() != actual_children.len() {
        return Err(format!(
            "\"{}\" expected {} child elements but found {}",
            path,
            expected_children.len(),
            actual_children.len()
        ));
    }
    for (expected, actual) in expected_children.into_iter().zip(actual_children) {
        compare_elements(expected, actual, &path)?;
    }
    Ok(())
}

/// Evaluate `expression` against `document`.
///
/// Node sets match when non-empty, booleans by value, numbers when non-zero
/// and strings when non-empty.
pub fn xpath_matches(expression: &str, document: &str) -> Result<bool, String> {
    let package = parse(document)?;
    let document = package.as_document();
    match evaluate_xpath(&document, expression) {
        Ok(Value::Nodeset(nodes)) => Ok(nodes.size() > 0),
        Ok(Value::Boolean(value)) => Ok(value),
        Ok(Value::Number(value)) => Ok(value != 0.0 && !value.is_nan()),
        Ok(Value::String(value)) => Ok(!value.is_empty()),
        Err(e) => Err(format!("invalid xpath \"{expression}\": {e:?}")),
    }
}
