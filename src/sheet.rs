use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// Minimal mutable style-sheet tree. The transform only ever reads rules and
// inserts declarations; it never removes or rewrites what the author wrote,
// so the model keeps declarations as raw property/value strings.

#[derive(Debug, Clone, Default)]
pub struct Stylesheet {
    pub items: Vec<SheetItem>,
}

#[derive(Debug, Clone)]
pub enum SheetItem {
    Rule(Rule),
    AtRule(AtRule),
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub selector: String,
    pub declarations: Vec<Declaration>,
}

#[derive(Debug, Clone)]
pub struct AtRule {
    pub name: String,
    pub params: String,
    pub body: AtRuleBody,
}

#[derive(Debug, Clone)]
pub enum AtRuleBody {
    // Statement form, e.g. `@import url(a.css);`
    None,
    // Conditional group rules whose block nests further rules.
    Items(Vec<SheetItem>),
    // Any other block (`@font-face`, `@keyframes`, ...) is carried verbatim.
    Raw(String),
}

#[derive(Debug, Clone)]
pub struct Declaration {
    pub property: String,
    pub value: String,
    // Absolute path of the file this declaration was parsed from. Synthetic
    // declarations inserted by the transform carry no source.
    pub source: Option<Arc<PathBuf>>,
}

impl Declaration {
    pub fn new(
        property: impl Into<String>,
        value: impl Into<String>,
        source: Option<Arc<PathBuf>>,
    ) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
            source,
        }
    }

    pub fn synthetic(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(property, value, None)
    }
}

impl Stylesheet {
    // Tolerant parse: malformed chunks are skipped, never fatal. `source`
    // should be the absolute path of the file the text came from; it is
    // attached to every parsed declaration so relative url() references can
    // be resolved against its directory later.
    pub fn parse(css: &str, source: Option<&Path>) -> Stylesheet {
        let mut parser = Parser {
            input: css,
            pos: 0,
            source: source.map(|p| Arc::new(p.to_path_buf())),
        };
        Stylesheet {
            items: parser.parse_items(false),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> io::Result<Stylesheet> {
        let absolute = std::path::absolute(path.as_ref())?;
        let css = std::fs::read_to_string(&absolute)?;
        Ok(Self::parse(&css, Some(&absolute)))
    }

    pub fn to_css(&self) -> String {
        let mut out = String::new();
        print_items(&self.items, 0, &mut out);
        out
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    source: Option<Arc<PathBuf>>,
}

impl<'a> Parser<'a> {
    fn parse_items(&mut self, nested: bool) -> Vec<SheetItem> {
        let mut items = Vec::new();
        loop {
            self.skip_trivia();
            let Some(byte) = self.peek() else { break };
            match byte {
                b'}' => {
                    self.pos += 1;
                    if nested {
                        break;
                    }
                    // Stray close brace at the top level; drop it and go on.
                }
                b'@' => {
                    if let Some(item) = self.parse_at_rule() {
                        items.push(item);
                    }
                }
                _ => {
                    let start = self.pos;
                    self.consume_until(&[b'{', b';', b'}']);
                    let prelude = self.input[start..self.pos].trim();
                    match self.peek() {
                        Some(b'{') => {
                            self.pos += 1;
                            let declarations = self.parse_declarations();
                            items.push(SheetItem::Rule(Rule {
                                selector: prelude.to_string(),
                                declarations,
                            }));
                        }
                        Some(b';') => {
                            // Declaration-looking text outside a rule; skip.
                            self.pos += 1;
                        }
                        _ => {}
                    }
                }
            }
        }
        items
    }

    fn parse_at_rule(&mut self) -> Option<SheetItem> {
        self.pos += 1;
        let name_start = self.pos;
        while let Some(byte) = self.peek() {
            if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let name = self.input[name_start..self.pos].to_string();
        if name.is_empty() {
            return None;
        }
        let params_start = self.pos;
        self.consume_until(&[b'{', b';', b'}']);
        let params = self.input[params_start..self.pos].trim().to_string();
        let body = match self.peek() {
            Some(b';') => {
                self.pos += 1;
                AtRuleBody::None
            }
            Some(b'{') => {
                self.pos += 1;
                if matches!(name.as_str(), "media" | "supports" | "document") {
                    AtRuleBody::Items(self.parse_items(true))
                } else {
                    AtRuleBody::Raw(self.capture_block())
                }
            }
            _ => AtRuleBody::None,
        };
        Some(SheetItem::AtRule(AtRule { name, params, body }))
    }

    fn parse_declarations(&mut self) -> Vec<Declaration> {
        let mut declarations = Vec::new();
        loop {
            self.skip_trivia();
            let Some(byte) = self.peek() else { break };
            if byte == b'}' {
                self.pos += 1;
                break;
            }
            let start = self.pos;
            self.consume_until(&[b';', b'}', b'{']);
            let chunk = self.input[start..self.pos].trim();
            match self.peek() {
                Some(b'{') => {
                    // Nested block inside a rule body is not modeled; drop it.
                    self.pos += 1;
                    self.capture_block();
                    continue;
                }
                Some(b';') => self.pos += 1,
                _ => {}
            }
            if let Some(colon) = top_level_colon(chunk) {
                let property = chunk[..colon].trim();
                let value = chunk[colon + 1..].trim();
                if !property.is_empty() {
                    declarations.push(Declaration::new(property, value, self.source.clone()));
                }
            }
        }
        declarations
    }

    // Consumes a block body whose opening brace is already consumed and
    // returns its verbatim text, without the closing brace.
    fn capture_block(&mut self) -> String {
        let bytes = self.input.as_bytes();
        let start = self.pos;
        let mut depth = 1usize;
        while self.pos < bytes.len() {
            match bytes[self.pos] {
                b'/' if bytes.get(self.pos + 1) == Some(&b'*') => self.skip_comment(),
                b'"' | b'\'' => self.skip_string(bytes[self.pos]),
                b'{' => {
                    depth += 1;
                    self.pos += 1;
                }
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        let raw = self.input[start..self.pos].to_string();
                        self.pos += 1;
                        return raw;
                    }
                    self.pos += 1;
                }
                _ => self.pos += 1,
            }
        }
        self.input[start..].to_string()
    }

    // Advances to the next stop byte that sits outside strings, comments and
    // parentheses. A `url(data:image/png;base64,...)` value must scan as one
    // chunk, so `;` inside parentheses never stops the scan.
    fn consume_until(&mut self, stops: &[u8]) {
        let bytes = self.input.as_bytes();
        let mut paren_depth = 0usize;
        while self.pos < bytes.len() {
            let byte = bytes[self.pos];
            if byte == b'/' && bytes.get(self.pos + 1) == Some(&b'*') {
                self.skip_comment();
                continue;
            }
            if byte == b'"' || byte == b'\'' {
                self.skip_string(byte);
                continue;
            }
            match byte {
                b'(' => {
                    paren_depth += 1;
                    self.pos += 1;
                }
                b')' => {
                    paren_depth = paren_depth.saturating_sub(1);
                    self.pos += 1;
                }
                _ if paren_depth == 0 && stops.contains(&byte) => return,
                _ => self.pos += 1,
            }
        }
    }

    fn skip_trivia(&mut self) {
        let bytes = self.input.as_bytes();
        loop {
            while self.pos < bytes.len() && bytes[self.pos].is_ascii_whitespace() {
                self.pos += 1;
            }
            if self.pos < bytes.len()
                && bytes[self.pos] == b'/'
                && bytes.get(self.pos + 1) == Some(&b'*')
            {
                self.skip_comment();
            } else {
                return;
            }
        }
    }

    fn skip_comment(&mut self) {
        match self.input[self.pos + 2..].find("*/") {
            Some(end) => self.pos += 2 + end + 2,
            None => self.pos = self.input.len(),
        }
    }

    fn skip_string(&mut self, quote: u8) {
        let bytes = self.input.as_bytes();
        self.pos += 1;
        while self.pos < bytes.len() {
            match bytes[self.pos] {
                b'\\' => self.pos = (self.pos + 2).min(bytes.len()),
                byte if byte == quote => {
                    self.pos += 1;
                    return;
                }
                _ => self.pos += 1,
            }
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }
}

// First `:` outside strings and parentheses, the property/value split point.
fn top_level_colon(chunk: &str) -> Option<usize> {
    let bytes = chunk.as_bytes();
    let mut paren_depth = 0usize;
    let mut idx = 0;
    while idx < bytes.len() {
        match bytes[idx] {
            b'"' | b'\'' => {
                let quote = bytes[idx];
                idx += 1;
                while idx < bytes.len() {
                    match bytes[idx] {
                        b'\\' => idx += 2,
                        byte if byte == quote => {
                            idx += 1;
                            break;
                        }
                        _ => idx += 1,
                    }
                }
            }
            b'(' => {
                paren_depth += 1;
                idx += 1;
            }
            b')' => {
                paren_depth = paren_depth.saturating_sub(1);
                idx += 1;
            }
            b':' if paren_depth == 0 => return Some(idx),
            _ => idx += 1,
        }
    }
    None
}

fn print_items(items: &[SheetItem], depth: usize, out: &mut String) {
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        match item {
            SheetItem::Rule(rule) => print_rule(rule, depth, out),
            SheetItem::AtRule(at_rule) => print_at_rule(at_rule, depth, out),
        }
    }
}

fn print_rule(rule: &Rule, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    out.push_str(&indent);
    out.push_str(&rule.selector);
    out.push_str(" {\n");
    for declaration in &rule.declarations {
        out.push_str(&indent);
        out.push_str("  ");
        out.push_str(&declaration.property);
        out.push_str(": ");
        out.push_str(&declaration.value);
        out.push_str(";\n");
    }
    out.push_str(&indent);
    out.push_str("}\n");
}

fn print_at_rule(at_rule: &AtRule, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    out.push_str(&indent);
    out.push('@');
    out.push_str(&at_rule.name);
    if !at_rule.params.is_empty() {
        out.push(' ');
        out.push_str(&at_rule.params);
    }
    match &at_rule.body {
        AtRuleBody::None => out.push_str(";\n"),
        AtRuleBody::Items(items) => {
            out.push_str(" {\n");
            print_items(items, depth + 1, out);
            out.push_str(&indent);
            out.push_str("}\n");
        }
        AtRuleBody::Raw(raw) => {
            out.push_str(" {");
            out.push_str(raw);
            out.push_str("}\n");
        }
    }
}
