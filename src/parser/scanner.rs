//! Tree-building scanner over template text

use tracing::debug;

use crate::prepare::{Pipeline, PrepareContext};
use crate::tags::{tag_body, CompiledPattern, Delimiters, RegistryError, TagRegistry};
use crate::ParseError;

use super::element::{Content, Document, Element, NodeId};

/// Scans template text against the unified tag pattern
#[derive(Debug, Clone)]
pub struct Parser<'r> {
    tags: &'r TagRegistry,
    pattern: CompiledPattern,
}

impl<'r> Parser<'r> {
    pub fn new(tags: &'r TagRegistry, delimiters: &Delimiters) -> Result<Self, RegistryError> {
        Ok(Self {
            tags,
            pattern: tags.unified_pattern(delimiters)?,
        })
    }

    pub fn pattern(&self) -> &CompiledPattern {
        &self.pattern
    }

    /// Parse `source` into a new fragment root
    ///
    /// All parse errors are collected; unclosed openers are kept as literal
    /// text so scanning can continue past them.
    pub fn parse_fragment(&self, doc: &mut Document, source: &str) -> Result<NodeId, Vec<ParseError>> {
        let mut errors = Vec::new();
        let children = self.parse_sequence(doc, source, 0, &mut errors);
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(doc.push(Element::root(children, 0..source.len())))
    }

    /// Parse a fragment and run the preparer pipeline over it
    pub fn build(
        &self,
        doc: &mut Document,
        source: &str,
        pipeline: &Pipeline,
        ctx: &PrepareContext,
    ) -> Result<NodeId, Vec<ParseError>> {
        let root = self.parse_fragment(doc, source)?;
        pipeline.run(doc, root, ctx);
        Ok(root)
    }

    fn parse_sequence(
        &self,
        doc: &mut Document,
        text: &str,
        base: usize,
        errors: &mut Vec<ParseError>,
    ) -> Vec<NodeId> {
        let mut children = Vec::new();
        let mut cursor = 0;
        let mut literal_start = 0;

        while let Some(found) = self.pattern.find_at(text, cursor) {
            let range = found.range.clone();
            let Some(def) = self.tags.get(found.tag) else {
                cursor = range.end;
                continue;
            };
            let matched = &text[range.clone()];
            let body = tag_body(def, matched, self.pattern.delimiters());

            if !def.is_block() {
                push_literal(doc, &mut children, text, literal_start..range.start, base);
                let element = Element::tag(
                    def,
                    body,
                    Content::Text(matched.to_string()),
                    base + range.start..base + range.end,
                );
                children.push(doc.push(element));
                cursor = range.end;
                literal_start = cursor;
                continue;
            }

            match self.find_closer(text, found.tag, range.end) {
                Some((inner_end, close_end)) => {
                    push_literal(doc, &mut children, text, literal_start..range.start, base);
                    let inner = &text[range.end..inner_end];
                    let content = if def.raw_body() {
                        Content::Text(inner.to_string())
                    } else {
                        Content::Children(self.parse_sequence(doc, inner, base + range.end, errors))
                    };
                    let mut element =
                        Element::tag(def, body, content, base + range.start..base + close_end);
                    element.source = Some(inner.to_string());
                    debug!(tag = def.name(), start = base + range.start, "parsed block");
                    children.push(doc.push(element));
                    cursor = close_end;
                    literal_start = cursor;
                }
                None => {
                    errors.push(ParseError::UnclosedBlock {
                        tag: def.name().to_string(),
                        span: base + range.start..base + range.end,
                    });
                    cursor = range.end;
                }
            }
        }

        push_literal(doc, &mut children, text, literal_start..text.len(), base);
        children
    }

    /// Find the closer matching an opener that ends at `from`, by depth
    /// counting over the tag's own opener and closer patterns.
    /// Raw bodies of other tags are skipped whole.
    /// Returns (inner end, closer end).
    fn find_closer(&self, text: &str, tag: &str, from: usize) -> Option<(usize, usize)> {
        let matcher = self.pattern.matcher(tag)?;
        let closer = matcher.closer.as_ref()?;
        let skips_raw = self.tags.get(tag).is_some_and(|def| !def.raw_body());
        let mut depth = 1usize;
        let mut pos = from;

        loop {
            let close = closer.find_at(text, pos)?;
            let open = matcher.opener.find_at(text, pos);
            let limit = open.map_or(close.start(), |open| open.start().min(close.start()));
            if skips_raw {
                if let Some(end) = self.skip_raw_block(text, tag, pos, limit) {
                    pos = end;
                    continue;
                }
            }
            match open {
                Some(open) if open.start() < close.start() => {
                    depth += 1;
                    pos = open.end();
                }
                _ => {
                    depth -= 1;
                    if depth == 0 {
                        return Some((close.start(), close.end()));
                    }
                    pos = close.end();
                }
            }
        }
    }

    /// End of the first closed raw-body block of another tag that opens
    /// at or after `from` and before `limit`
    fn skip_raw_block(&self, text: &str, tag: &str, from: usize, limit: usize) -> Option<usize> {
        let (raw_tag, open_end) = self
            .tags
            .definitions()
            .filter(|def| def.raw_body() && def.name() != tag)
            .filter_map(|def| {
                let open = self.pattern.matcher(def.name())?.opener.find_at(text, from)?;
                (open.start() < limit).then(|| (open.start(), def.name(), open.end()))
            })
            .min_by_key(|(start, _, _)| *start)
            .map(|(_, name, end)| (name, end))?;
        self.find_closer(text, raw_tag, open_end)
            .map(|(_, close_end)| close_end)
    }
}

fn push_literal(
    doc: &mut Document,
    children: &mut Vec<NodeId>,
    text: &str,
    range: std::ops::Range<usize>,
    base: usize,
) {
    if range.is_empty() {
        return;
    }
    let literal = &text[range.clone()];
    children.push(doc.push(Element::text(literal, base + range.start..base + range.end)));
}
