// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Spy log parsing
//!
//! The Maven spy writes one `<ExecutionEvent>` element per goal invocation.
//! Plugin identity comes either from a nested `<plugin>` element or from flat
//! `plugin-group-id` / `plugin-artifact-id` / `goal` attributes on the event.
//!
//! # Example
//!
//! ```
//! use mvnspy_events::parse_spy_log;
//!
//! let xml = r#"<mavenExecution>
//!   <ExecutionEvent type="MojoSucceeded" _time="2017-02-02 23:03:17.06">
//!     <plugin groupId="org.apache.maven.plugins" artifactId="maven-surefire-plugin" goal="test"/>
//!   </ExecutionEvent>
//! </mavenExecution>"#;
//!
//! let log = parse_spy_log(xml).unwrap();
//! assert_eq!(log.events[0].plugin.goal, "test");
//! ```

use crate::error::SpyLogError;
use crate::event::{ArtifactRef, ExecutionEvent, PluginCoordinates, ProjectCoordinates, SpyLog};
use chrono::{DateTime, NaiveDateTime, Utc};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

const EXECUTION_EVENT: &str = "ExecutionEvent";

/// Attributes of `<ExecutionEvent>` that map to dedicated fields
const RESERVED_ATTRIBUTES: &[&str] = &[
    "type",
    "class",
    "_time",
    "nodeId",
    "plugin-group-id",
    "plugin-artifact-id",
    "plugin-version",
    "goal",
];

/// Minimal element tree built before interpreting the document
#[derive(Debug, Default)]
struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    }

    fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }
}

/// Parse a spy log document
///
/// # Errors
///
/// Returns `SpyLogError::Xml` if the document is not well-formed and
/// `SpyLogError::Malformed` if an event lacks its plugin identity or goal,
/// carries an unreadable timestamp, or is timestamped before its preceding
/// sibling.
pub fn parse_spy_log(document: &str) -> Result<SpyLog, SpyLogError> {
    let root = read_tree(document)?;
    let events = parse_siblings(&root.children, &root.name)?;
    let log = SpyLog { events };
    debug!(root = %root.name, events = log.len(), "Parsed spy log");
    Ok(log)
}

/// Read and parse a spy log file
///
/// # Errors
///
/// Returns `SpyLogError::Io` if the file cannot be read, otherwise the same
/// errors as [`parse_spy_log`].
pub fn parse_spy_log_file(path: impl AsRef<Path>) -> Result<SpyLog, SpyLogError> {
    let document = std::fs::read_to_string(path.as_ref())?;
    parse_spy_log(&document)
}

fn read_tree(document: &str) -> Result<Element, SpyLogError> {
    let mut reader = Reader::from_str(document);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader.read_event().map_err(|source| SpyLogError::Xml {
            position: reader.buffer_position() as u64,
            source,
        })?;
        let position = reader.buffer_position() as u64;

        match event {
            Event::Start(start) => stack.push(open_element(&start, position)?),
            Event::Empty(start) => {
                let element = open_element(&start, position)?;
                close_element(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| SpyLogError::malformed("unexpected closing tag"))?;
                close_element(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|source| SpyLogError::Xml { position, source })?;
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text);
                }
            }
            Event::CData(data) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(SpyLogError::malformed(format!(
            "element <{}> is never closed",
            open.name
        )));
    }
    root.ok_or_else(|| SpyLogError::malformed("document has no root element"))
}

fn open_element(start: &BytesStart<'_>, position: u64) -> Result<Element, SpyLogError> {
    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| SpyLogError::Xml {
            position,
            source: quick_xml::Error::from(e),
        })?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|source| SpyLogError::Xml { position, source })?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(Element {
        name,
        attributes,
        ..Default::default()
    })
}

fn close_element(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), SpyLogError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(SpyLogError::malformed("document has more than one root element")),
    }
    Ok(())
}

fn parse_siblings(elements: &[Element], parent: &str) -> Result<Vec<ExecutionEvent>, SpyLogError> {
    let mut events = Vec::new();
    let mut previous: Option<DateTime<Utc>> = None;

    for (index, element) in elements
        .iter()
        .filter(|e| e.name == EXECUTION_EVENT)
        .enumerate()
    {
        let event = parse_event(element, index, parent)?;
        if let Some(timestamp) = event.timestamp {
            if let Some(prev) = previous
                && timestamp < prev
            {
                return Err(SpyLogError::malformed(format!(
                    "event #{index} under <{parent}> ({}) is timestamped {timestamp} before its preceding sibling ({prev})",
                    event.triple()
                )));
            }
            previous = Some(timestamp);
        }
        events.push(event);
    }

    Ok(events)
}

fn parse_event(element: &Element, index: usize, parent: &str) -> Result<ExecutionEvent, SpyLogError> {
    let plugin_element = element.child("plugin");
    let required = |flat: &str, nested: &str| -> Result<String, SpyLogError> {
        element
            .attr(flat)
            .or_else(|| plugin_element.and_then(|p| p.attr(nested)))
            .map(str::to_string)
            .ok_or_else(|| {
                SpyLogError::malformed(format!(
                    "event #{index} under <{parent}> has no plugin {nested}"
                ))
            })
    };

    let plugin = PluginCoordinates {
        group_id: required("plugin-group-id", "groupId")?,
        artifact_id: required("plugin-artifact-id", "artifactId")?,
        goal: required("goal", "goal")?,
        version: element
            .attr("plugin-version")
            .or_else(|| plugin_element.and_then(|p| p.attr("version")))
            .map(str::to_string),
        execution_id: plugin_element
            .and_then(|p| p.attr("executionId"))
            .map(str::to_string),
    };

    let timestamp = match element.attr("_time") {
        Some(raw) => Some(parse_timestamp(raw).ok_or_else(|| {
            SpyLogError::malformed(format!(
                "event #{index} under <{parent}> has unreadable timestamp '{raw}'"
            ))
        })?),
        None => None,
    };

    let mut attributes = BTreeMap::new();
    for (key, value) in &element.attributes {
        if !RESERVED_ATTRIBUTES.contains(&key.as_str()) {
            attributes.insert(key.clone(), value.clone());
        }
    }
    for section in [plugin_element, element.child("configuration")]
        .into_iter()
        .flatten()
    {
        for entry in &section.children {
            flatten_configuration(&entry.name, entry, &mut attributes);
        }
    }

    let artifacts = element
        .children
        .iter()
        .filter(|c| c.name == "artifact")
        .map(parse_artifact)
        .collect();

    Ok(ExecutionEvent {
        event_type: element.attr("type").map(str::to_string),
        plugin,
        node_id: element.attr("nodeId").map(str::to_string),
        timestamp,
        project: element.child("project").map(parse_project),
        attributes,
        artifacts,
        children: parse_siblings(&element.children, EXECUTION_EVENT)?,
    })
}

fn flatten_configuration(key: &str, element: &Element, out: &mut BTreeMap<String, String>) {
    if element.children.is_empty() {
        out.insert(key.to_string(), element.text.trim().to_string());
        return;
    }
    for child in &element.children {
        flatten_configuration(&format!("{key}.{}", child.name), child, out);
    }
}

fn parse_project(element: &Element) -> ProjectCoordinates {
    let attr = |key: &str| element.attr(key).unwrap_or_default().to_string();
    ProjectCoordinates {
        group_id: attr("groupId"),
        artifact_id: attr("artifactId"),
        version: attr("version"),
        base_dir: element.attr("baseDir").map(str::to_string),
        build_directory: element
            .child("build")
            .and_then(|b| b.attr("directory"))
            .map(str::to_string),
    }
}

fn parse_artifact(element: &Element) -> ArtifactRef {
    let attr = |key: &str| element.attr(key).unwrap_or_default().to_string();
    ArtifactRef {
        group_id: attr("groupId"),
        artifact_id: attr("artifactId"),
        version: attr("version"),
        artifact_type: element.attr("type").unwrap_or("jar").to_string(),
        classifier: element.attr("classifier").map(str::to_string),
        file: element.attr("file").map(str::to_string),
    }
}

/// Parse a spy log timestamp
///
/// The spy writes `2017-02-02 23:03:17.06` (taken as UTC); RFC 3339 is
/// accepted as well.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
