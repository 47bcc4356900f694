//! Placeholder substitution inside WordprocessingML and OpenDocument parts.
//!
//! Word processors split paragraph text into runs whenever formatting, spell
//! checking or revision marks change, so a placeholder such as `{{name}}` can be
//! spread over several `w:t` elements. The part is parsed into an event list,
//! the text of every paragraph is joined, and each placeholder found in the
//! joined text is written back into the segment where it starts while the
//! remainder of its characters is removed from the following segments.
//! Placeholders outside visible text, in attribute values or field instructions,
//! are rendered in place afterwards.
use crate::error::RustyMergeError;
use crate::helpers::xml::XmlAttributeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::template::fields::PLACEHOLDER;
use crate::template::TemplateFormat;
use quick_xml::events::BytesStart;
use quick_xml::events::BytesText;
use quick_xml::events::Event;
use quick_xml::Writer;
use std::collections::HashMap;
use std::collections::HashSet;
use std::ops::Range;
use tracing::warn;

/// Run of text events belonging to one paragraph
#[derive(Debug, Default)]
pub(crate) struct Segment {
    /// Index of the element wrapping the text (`w:t`), if any
    wrapper: Option<usize>,
    /// Indexes of the text events
    events: Vec<usize>,
    /// Decoded text
    text: String,
}

/// Text segments of one paragraph in document order
#[derive(Debug, Default)]
pub(crate) struct Paragraph {
    segments: Vec<Segment>,
}

impl Paragraph {
    /// Returns the visible text of the paragraph
    pub(crate) fn text(&self) -> String {
        self.segments.iter().map(|segment| segment.text.as_str()).collect()
    }
}

/// Parsed part: the event list and the paragraphs found in it
pub(crate) struct ParsedPart {
    events: Vec<Option<Event<'static>>>,
    pub(crate) paragraphs: Vec<Paragraph>,
}

/// Parses a part into events, grouping the visible text by paragraph.
/// Nested paragraphs (text boxes, notes) are kept apart from their parent.
pub(crate) fn parse_part(xml: &str, format: TemplateFormat) -> Result<ParsedPart, RustyMergeError> {
    let mut reader = XmlReader::preserving(xml.as_bytes());
    let mut events = Vec::new();
    let mut paragraphs = Vec::new();
    let mut stack = Vec::<Paragraph>::new();
    let text_element = format.text_element();
    let mut in_text_element = false;
    let mut previous_was_text = false;

    while let Some(event) = reader.next_owned()? {
        let index = events.len();
        let mut is_text = false;
        match &event {
            Event::Start(start) if format.is_paragraph(start.name()) => {
                stack.push(Paragraph::default());
                in_text_element = false;
            }
            Event::End(end) if format.is_paragraph(end.name()) => {
                if let Some(paragraph) = stack.pop() {
                    paragraphs.push(paragraph);
                }
                in_text_element = false;
            }
            Event::Start(start) if text_element == Some(start.name()) => {
                if let Some(paragraph) = stack.last_mut() {
                    paragraph.segments.push(Segment {
                        wrapper: Some(index),
                        ..Segment::default()
                    });
                    in_text_element = true;
                }
            }
            Event::End(end) if text_element == Some(end.name()) => in_text_element = false,
            Event::Text(_) | Event::GeneralRef(_) | Event::CData(_) => {
                let visible = if text_element.is_some() { in_text_element } else { !stack.is_empty() };
                if let Some(paragraph) = stack.last_mut().filter(|_| visible) {
                    if text_element.is_none() && !previous_was_text {
                        paragraph.segments.push(Segment::default());
                    }
                    if let Some(segment) = paragraph.segments.last_mut() {
                        match &event {
                            Event::Text(text) => segment.text.push_bytes_text(text)?,
                            Event::GeneralRef(reference) => segment.text.push_bytes_ref(reference)?,
                            Event::CData(data) => segment.text.push_str(&data.xml_content()?),
                            _ => (),
                        }
                        segment.events.push(index);
                        is_text = true;
                    }
                }
            }
            _ => (),
        }
        previous_was_text = is_text;
        events.push(Some(event));
    }

    Ok(ParsedPart { events, paragraphs })
}

/// Renders a part, replacing every placeholder with its value from `context`.
/// Placeholders without a value render as empty text.
pub(crate) fn render_part(
    xml: &str,
    format: TemplateFormat,
    context: &HashMap<String, String>,
) -> Result<String, RustyMergeError> {
    let ParsedPart { mut events, paragraphs } = parse_part(xml, format)?;
    let mut changed = false;

    for paragraph in &paragraphs {
        let text = paragraph.text();
        let replacements: Vec<(Range<usize>, String)> = PLACEHOLDER
            .captures_iter(&text)
            .filter_map(|captures| {
                let whole = captures.get(0)?;
                let name = captures.get(1)?.as_str();
                let value = context.get(name).cloned().unwrap_or_else(|| {
                    warn!(field = name, "placeholder has no value, rendering it empty");
                    String::new()
                });
                Some((whole.range(), value))
            })
            .collect();
        if replacements.is_empty() {
            continue;
        }

        let outputs = distribute(paragraph, &replacements);
        for (segment, output) in paragraph.segments.iter().zip(outputs) {
            if output == segment.text {
                continue;
            }
            changed = true;
            let mut indexes = segment.events.iter();
            if let Some(&first) = indexes.next() {
                events[first] = Some(Event::Text(BytesText::new(&output).into_owned()));
            }
            for &index in indexes {
                events[index] = None;
            }
            if let Some(wrapper) = segment.wrapper {
                if let Some(Event::Start(start)) = &events[wrapper] {
                    events[wrapper] = Some(Event::Start(preserve_space(start)));
                }
            }
        }
    }

    let skip: HashSet<usize> = paragraphs
        .iter()
        .flat_map(|paragraph| paragraph.segments.iter())
        .flat_map(|segment| segment.events.iter().copied())
        .collect();
    if render_markup(&mut events, &skip, context)? {
        changed = true;
    }

    if !changed {
        return Ok(xml.to_owned());
    }

    let mut writer = Writer::new(Vec::with_capacity(xml.len()));
    for event in events.into_iter().flatten() {
        writer.write_event(event)?;
    }
    Ok(String::from_utf8(writer.into_inner())?)
}

/// Renders the placeholders left outside paragraph text: attribute values and
/// text nodes that are not visible runs, such as field instructions.
/// Events listed in `skip` were already rendered. Returns true if anything changed.
fn render_markup(
    events: &mut [Option<Event<'static>>],
    skip: &HashSet<usize>,
    context: &HashMap<String, String>,
) -> Result<bool, RustyMergeError> {
    let mut changed = false;
    for (index, slot) in events.iter_mut().enumerate() {
        if skip.contains(&index) {
            continue;
        }
        let replacement = match &*slot {
            Some(Event::Start(start)) => render_attributes(start, context)?.map(Event::Start),
            Some(Event::Empty(start)) => render_attributes(start, context)?.map(Event::Empty),
            Some(Event::Text(text)) => {
                let mut raw = String::new();
                raw.push_bytes_text(text)?;
                if PLACEHOLDER.is_match(&raw) {
                    Some(Event::Text(BytesText::new(&render_text(&raw, context)).into_owned()))
                } else {
                    None
                }
            }
            _ => None,
        };
        if let Some(event) = replacement {
            *slot = Some(event);
            changed = true;
        }
    }
    Ok(changed)
}

/// Rebuilds an element whose attribute values hold placeholders, `None` if none do.
fn render_attributes(
    start: &BytesStart<'static>,
    context: &HashMap<String, String>,
) -> Result<Option<BytesStart<'static>>, RustyMergeError> {
    let mut rendered = start.clone();
    rendered.clear_attributes();
    let mut changed = false;
    for attribute in start.attributes() {
        let attribute = attribute?;
        let value = attribute.get_value()?;
        if PLACEHOLDER.is_match(&value) {
            let value = render_text(&value, context);
            let key = std::str::from_utf8(attribute.key.as_ref())?;
            rendered.push_attribute((key, value.as_str()));
            changed = true;
        } else {
            rendered.push_attribute((attribute.key.as_ref(), attribute.value.as_ref()));
        }
    }
    Ok(changed.then_some(rendered))
}

/// Renders a plain text template.
pub(crate) fn render_text(text: &str, context: &HashMap<String, String>) -> String {
    PLACEHOLDER
        .replace_all(text, |captures: &regex::Captures| {
            let name = &captures[1];
            context.get(name).cloned().unwrap_or_else(|| {
                warn!(field = name, "placeholder has no value, rendering it empty");
                String::new()
            })
        })
        .into_owned()
}

/// Computes the new text of every segment: kept characters stay where they were,
/// each replacement goes to the segment holding the first character of its placeholder.
fn distribute(paragraph: &Paragraph, replacements: &[(Range<usize>, String)]) -> Vec<String> {
    let bounds: Vec<Range<usize>> = paragraph
        .segments
        .iter()
        .scan(0usize, |offset, segment| {
            let start = *offset;
            *offset += segment.text.len();
            Some(start..*offset)
        })
        .collect();
    let mut outputs = vec![String::new(); paragraph.segments.len()];

    let copy = |outputs: &mut Vec<String>, range: Range<usize>| {
        for (index, bound) in bounds.iter().enumerate() {
            let start = range.start.max(bound.start);
            let end = range.end.min(bound.end);
            if start < end {
                let text = &paragraph.segments[index].text;
                outputs[index].push_str(&text[start - bound.start..end - bound.start]);
            }
        }
    };

    let mut cursor = 0usize;
    for (range, value) in replacements {
        copy(&mut outputs, cursor..range.start);
        if let Some(index) = bounds.iter().position(|bound| bound.contains(&range.start)) {
            outputs[index].push_str(value);
        }
        cursor = range.end;
    }
    let total = bounds.last().map(|bound| bound.end).unwrap_or_default();
    copy(&mut outputs, cursor..total);
    outputs
}

/// Marks a `w:t` element so leading and trailing spaces of its new text are kept.
fn preserve_space(start: &BytesStart<'static>) -> BytesStart<'static> {
    let has_space = start
        .attributes()
        .flatten()
        .any(|attribute| attribute.key.as_ref() == b"xml:space");
    let mut start = start.clone();
    if !has_space {
        start.push_attribute(("xml:space", "preserve"));
    }
    start
}
