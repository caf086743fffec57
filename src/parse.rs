//! HTML template parser.
//!
//! Drives the html5ever tokenizer with a custom sink and builds the arena
//! tree from `dom`. Unlike a browser tree builder the template parser is
//! strict: every end tag must close the element on top of the stack and
//! nothing may remain open at end of input.

use tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
    TokenizerResult,
};

use crate::dom::{Attribute, Document, Element, NodeId, NodeKind, Position};
use crate::error::{CompilerError, PARSE_ENDING_TAG, PARSE_TOKENIZER};

// ═══════════════════════════════════════════════════════════════════════════════
// SOURCE POSITIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Byte offset to (line, column) lookup, both 1-based.
pub struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { starts }
    }

    pub fn locate(&self, source: &str, offset: usize) -> Position {
        let offset = offset.min(source.len());
        let line = self.starts.partition_point(|start| *start <= offset);
        let start = self.starts[line.saturating_sub(1)];
        let column = source
            .get(start..offset)
            .map(|s| s.chars().count())
            .unwrap_or(offset - start);
        Position {
            line: line as u32,
            column: column as u32 + 1,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TREE BUILDER SINK
// ═══════════════════════════════════════════════════════════════════════════════

struct TreeBuilder<'s> {
    source: &'s str,
    lowered: String,
    lines: LineIndex,
    doc: Document,
    stack: Vec<NodeId>,
    cursor: usize,
    error: Option<CompilerError>,
}

impl<'s> TreeBuilder<'s> {
    fn new(source: &'s str, file: &str) -> Self {
        Self {
            source,
            lowered: source.to_ascii_lowercase(),
            lines: LineIndex::new(source),
            doc: Document::new(file),
            stack: Vec::new(),
            cursor: 0,
            error: None,
        }
    }

    fn current(&self) -> NodeId {
        self.stack.last().copied().unwrap_or(self.doc.root())
    }

    fn here(&self) -> Position {
        self.lines.locate(self.source, self.cursor)
    }

    /// Moves the cursor to the next occurrence of `needle` and returns its position.
    fn seek(&mut self, needle: &str) -> Position {
        match self.lowered.get(self.cursor..).and_then(|rest| rest.find(needle)) {
            Some(found) => {
                let start = self.cursor + found;
                let position = self.lines.locate(self.source, start);
                self.cursor = start + needle.len();
                if let Some(end) = self.lowered[self.cursor..].find('>') {
                    self.cursor += end + 1;
                }
                position
            }
            None => self.here(),
        }
    }

    fn fail(&mut self, error: CompilerError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn start_tag(&mut self, tag: Tag) -> TokenSinkResult<()> {
        let name = tag.name.to_string();
        let position = self.seek(&format!("<{}", name));

        let mut element = Element::new(&name);
        for attr in &tag.attrs {
            element
                .attributes
                .push(Attribute::new(&attr.name.local, &attr.value));
        }
        let is_void = element.is_void();
        let node = self.doc.create(NodeKind::Element(element), position);
        let parent = self.current();
        self.doc.append(parent, node);

        if is_void || tag.self_closing {
            return TokenSinkResult::Continue;
        }
        self.stack.push(node);

        match name.as_str() {
            "script" => TokenSinkResult::RawData(RawKind::ScriptData),
            "style" => TokenSinkResult::RawData(RawKind::Rawtext),
            "textarea" | "title" => TokenSinkResult::RawData(RawKind::Rcdata),
            _ => TokenSinkResult::Continue,
        }
    }

    fn end_tag(&mut self, tag: Tag) {
        let name = tag.name.to_string();
        let position = self.seek(&format!("</{}", name));

        let open = self.stack.last().and_then(|id| self.doc.tag(*id));
        if open == Some(name.as_str()) {
            self.stack.pop();
            return;
        }

        let expected = open.unwrap_or("none").to_string();
        let file = self.doc.file.clone();
        self.fail(
            CompilerError::new(PARSE_ENDING_TAG, format!("Unexpected end tag </{}>", name))
                .detail("expected", expected)
                .detail("found", name)
                .at(&file, position.line, position.column),
        );
    }
}

impl<'s> TokenSink for TreeBuilder<'s> {
    type Handle = ();

    fn process_token(&mut self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        if self.error.is_some() {
            return TokenSinkResult::Continue;
        }

        match token {
            Token::TagToken(tag) => match tag.kind {
                TagKind::StartTag => return self.start_tag(tag),
                TagKind::EndTag => self.end_tag(tag),
            },
            Token::CharacterTokens(text) => {
                let position = self.here();
                let parent = self.current();
                self.doc.append_text(parent, &text, position);
            }
            Token::CommentToken(text) => {
                let position = self.seek("<!--");
                let node = self.doc.create(NodeKind::Comment(text.to_string()), position);
                let parent = self.current();
                self.doc.append(parent, node);
            }
            Token::DoctypeToken(doctype) => {
                let position = self.seek("<!");
                let name = doctype
                    .name
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "html".to_string());
                let node = self.doc.create(NodeKind::Doctype(name), position);
                let parent = self.current();
                self.doc.append(parent, node);
            }
            // Only input ending inside a tag, comment or doctype is fatal. The
            // recoverable errors (a bare `<` in `${a < b}`, duplicate attributes,
            // bad character references) keep the tokenizer's recovery.
            Token::ParseError(message) => {
                if message.contains("EOF") {
                    let position = self.here();
                    let file = self.doc.file.clone();
                    self.fail(
                        CompilerError::new(PARSE_TOKENIZER, "Unexpected end of template")
                            .detail("reason", &message)
                            .at(&file, position.line, position.column),
                    );
                } else {
                    tracing::debug!(reason = %message, "tolerated tokenizer error");
                }
            }
            Token::NullCharacterToken | Token::EOFToken => {}
        }
        TokenSinkResult::Continue
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENTRY POINT
// ═══════════════════════════════════════════════════════════════════════════════

/// Parse template markup into a tree with source positions.
pub fn parse_template(source: &str, file: &str) -> Result<Document, CompilerError> {
    let mut tokenizer = Tokenizer::new(TreeBuilder::new(source, file), TokenizerOpts::default());
    let mut queue = BufferQueue::default();
    queue.push_back(StrTendril::from_slice(source));
    // The sink never suspends for scripts; drain until the queue is done.
    while let TokenizerResult::Script(()) = tokenizer.feed(&mut queue) {}
    tokenizer.end();

    let mut builder = tokenizer.sink;
    if let Some(error) = builder.error.take() {
        return Err(error);
    }

    if let Some(open) = builder.stack.last().copied() {
        let tag = builder.doc.tag(open).unwrap_or_default().to_string();
        let position = builder.doc.position(open);
        return Err(
            CompilerError::new(PARSE_ENDING_TAG, format!("Unclosed tag <{}>", tag))
                .detail("expected", format!("</{}>", tag))
                .detail("found", "end of input")
                .at(file, position.line, position.column),
        );
    }

    tracing::debug!(file, nodes = builder.doc.descendants(builder.doc.root()).len(), "parsed template");
    Ok(builder.doc)
}
