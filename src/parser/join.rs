//! Join mode: every match of a line becomes one CSV row.

use std::collections::BTreeMap;

use fancy_regex::Captures;

/// Reference to a capture group inside a header template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupRef {
    Index(usize),
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Group(GroupRef),
}

/// Header template such as `Group 1: ${1}` or `${name}`.
///
/// Substitution happens once; group text that looks like a reference is
/// copied as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = text;

        while let Some(start) = rest.find("${") {
            let after = &rest[start + 2..];
            let Some(end) = after.find('}') else {
                break;
            };
            literal.push_str(&rest[..start]);
            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            let reference = &after[..end];
            segments.push(Segment::Group(match reference.parse() {
                Ok(index) => GroupRef::Index(index),
                Err(_) => GroupRef::Name(reference.to_string()),
            }));
            rest = &after[end + 1..];
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Self { segments }
    }

    /// Group references in order of appearance.
    pub fn references(&self) -> impl Iterator<Item = &GroupRef> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Group(reference) => Some(reference),
            Segment::Literal(_) => None,
        })
    }

    /// Substitute the groups of one match. Groups that did not take part in
    /// the match render as empty text.
    #[must_use]
    pub fn render(&self, captures: &Captures<'_>) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Group(GroupRef::Index(index)) => {
                    if let Some(group) = captures.get(*index) {
                        out.push_str(group.as_str());
                    }
                }
                Segment::Group(GroupRef::Name(name)) => {
                    if let Some(group) = captures.name(name) {
                        out.push_str(group.as_str());
                    }
                }
            }
        }
        out
    }
}

/// Header row plus one templated row per match.
#[derive(Debug, Clone)]
pub struct JoinFormat {
    headers: Vec<String>,
    templates: Vec<Template>,
    delimiter: char,
}

impl JoinFormat {
    /// Build from header name to template, kept in name order.
    #[must_use]
    pub fn new(headers: &BTreeMap<String, String>, delimiter: char) -> Self {
        Self {
            headers: headers.keys().cloned().collect(),
            templates: headers.values().map(|t| Template::parse(t)).collect(),
            delimiter,
        }
    }

    /// Header names with their templates.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &Template)> {
        self.headers
            .iter()
            .map(String::as_str)
            .zip(self.templates.iter())
    }

    /// Render one row per match as a single CSV block.
    #[must_use]
    pub fn render(&self, matches: &[Captures<'_>]) -> String {
        let mut rows = Vec::with_capacity(matches.len() + 1);
        rows.push(self.row(self.headers.iter().map(String::as_str)));
        for captures in matches {
            let values: Vec<String> = self
                .templates
                .iter()
                .map(|template| template.render(captures))
                .collect();
            rows.push(self.row(values.iter().map(String::as_str)));
        }
        rows.join("\n").trim().to_string()
    }

    fn row<'a>(&self, fields: impl Iterator<Item = &'a str>) -> String {
        let mut line = String::new();
        for (i, field) in fields.enumerate() {
            if i > 0 {
                line.push(self.delimiter);
            }
            line.push('"');
            line.push_str(&field.replace('"', "\"\""));
            line.push('"');
        }
        line
    }
}
