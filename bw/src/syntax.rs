//! Import extraction from Python source text
//!
//! A small tokenizer splits the source into logical statements (joining
//! bracketed and backslash-continued lines, dropping comments and string
//! contents) and then reads `import` / `from ... import` statements out of
//! them, including ones written after a compound header such as
//! `try: import x`. Lexical problems and malformed import statements are reported as a
//! [`ParseError`], which callers treat as "file does not parse".

use thiserror::Error;
use tracing::debug;

/// Errors that make a file unparseable
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("line {line}: unterminated string literal")]
    UnterminatedString { line: u32 },

    #[error("line {line}: unmatched '{bracket}'")]
    UnmatchedBracket { line: u32, bracket: char },

    #[error("line {line}: '{bracket}' was never closed")]
    UnclosedBracket { line: u32, bracket: char },

    #[error("line {line}: invalid import statement: {statement}")]
    InvalidImport { line: u32, statement: String },
}

/// One absolute import reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRef {
    /// Dotted module path, e.g. `os.path`
    pub module: String,

    /// Line of the statement that imports it
    pub line: u32,
}

impl ImportRef {
    /// First component of the dotted path (the package to install)
    pub fn top_level(&self) -> &str {
        self.module.split('.').next().unwrap_or(&self.module)
    }
}

/// What the import scan needs from a parsed file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedModule {
    /// Absolute imports in source order; relative imports are omitted
    pub imports: Vec<ImportRef>,
}

/// A logical statement with the line it starts on
struct Statement {
    line: u32,
    text: String,
}

/// Parse Python source text
pub fn parse_module(source: &str) -> Result<ParsedModule, ParseError> {
    debug!(len = source.len(), "parse_module: called");
    let statements = split_statements(source)?;

    let mut imports = Vec::new();
    for statement in statements {
        let mut text = statement.text.as_str();
        while let Some(body) = compound_body(text) {
            text = body;
        }
        parse_import_statement(text, statement.line, &mut imports)?;
    }

    debug!(imports = imports.len(), "parse_module: done");
    Ok(ParsedModule { imports })
}

fn flush(current: &mut String, start_line: u32, statements: &mut Vec<Statement>) {
    let text = current.trim();
    if !text.is_empty() {
        statements.push(Statement {
            line: start_line,
            text: text.to_string(),
        });
    }
    current.clear();
}

fn split_statements(source: &str) -> Result<Vec<Statement>, ParseError> {
    let chars: Vec<char> = source.chars().collect();
    let mut statements = Vec::new();
    let mut brackets: Vec<(char, u32)> = Vec::new();
    let mut current = String::new();
    let mut start_line = 1u32;
    let mut line = 1u32;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
                continue;
            }
            '\'' | '"' => {
                let string_line = line;
                let triple = i + 2 < chars.len() && chars[i + 1] == c && chars[i + 2] == c;
                i += if triple { 3 } else { 1 };
                let mut closed = false;
                while i < chars.len() {
                    match chars[i] {
                        '\\' => {
                            if chars.get(i + 1) == Some(&'\n') {
                                line += 1;
                            }
                            i += 2;
                            continue;
                        }
                        '\n' if !triple => break,
                        '\n' => line += 1,
                        q if q == c => {
                            if !triple {
                                i += 1;
                                closed = true;
                                break;
                            }
                            if i + 2 < chars.len() && chars[i + 1] == c && chars[i + 2] == c {
                                i += 3;
                                closed = true;
                                break;
                            }
                        }
                        _ => {}
                    }
                    i += 1;
                }
                if !closed {
                    return Err(ParseError::UnterminatedString { line: string_line });
                }
                current.push_str("\"\"");
                continue;
            }
            '(' | '[' | '{' => brackets.push((c, line)),
            ')' | ']' | '}' => {
                let expected = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                match brackets.pop() {
                    Some((open, _)) if open == expected => {}
                    _ => return Err(ParseError::UnmatchedBracket { line, bracket: c }),
                }
            }
            '\\' if chars.get(i + 1) == Some(&'\n') => {
                current.push(' ');
                line += 1;
                i += 2;
                continue;
            }
            ';' if brackets.is_empty() => {
                flush(&mut current, start_line, &mut statements);
                start_line = line;
                i += 1;
                continue;
            }
            '\n' => {
                line += 1;
                if brackets.is_empty() {
                    flush(&mut current, start_line, &mut statements);
                    start_line = line;
                } else {
                    current.push(' ');
                }
                i += 1;
                continue;
            }
            _ => {}
        }

        if current.trim().is_empty() {
            start_line = line;
        }
        current.push(c);
        i += 1;
    }

    if let Some((bracket, open_line)) = brackets.pop() {
        return Err(ParseError::UnclosedBracket {
            line: open_line,
            bracket,
        });
    }
    flush(&mut current, start_line, &mut statements);

    Ok(statements)
}

/// Keywords that open a compound statement header
const COMPOUND_KEYWORDS: &[&str] = &[
    "if", "elif", "else", "while", "for", "try", "except", "finally", "with", "def", "class", "async",
];

/// Whether `text` starts with `keyword` as a whole word
fn starts_with_keyword(text: &str, keyword: &str) -> bool {
    text.strip_prefix(keyword)
        .is_some_and(|rest| !rest.starts_with(|c: char| c == '_' || c.is_alphanumeric()))
}

/// Simple statement written after a compound header's colon, as in `try: import x`
fn compound_body(text: &str) -> Option<&str> {
    if !COMPOUND_KEYWORDS.iter().any(|kw| starts_with_keyword(text, kw)) {
        return None;
    }

    let mut depth = 0usize;
    for (idx, c) in text.char_indices() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            // `:=` in a `while` or `if` header is not the header colon
            ':' if depth == 0 && !text[idx + 1..].starts_with('=') => {
                let body = text[idx + 1..].trim_start();
                return (!body.is_empty()).then_some(body);
            }
            _ => {}
        }
    }
    None
}

/// Strip a leading keyword followed by whitespace
fn strip_keyword<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(keyword)?;
    if rest.is_empty() {
        return Some(rest);
    }
    if rest.starts_with(char::is_whitespace) {
        Some(rest.trim_start())
    } else {
        None
    }
}

/// The `import` of a from-statement; the name list may start with `(`
fn strip_import(text: &str) -> Option<&str> {
    match text.strip_prefix("import")? {
        rest if rest.starts_with('(') => Some(rest),
        _ => strip_keyword(text, "import"),
    }
}

/// Body of a from-statement; `from.pkg import x` needs no space after `from`
fn strip_from(text: &str) -> Option<&str> {
    match text.strip_prefix("from")? {
        rest if rest.starts_with('.') => Some(rest),
        _ => strip_keyword(text, "from"),
    }
}

fn is_identifier(part: &str) -> bool {
    let mut chars = part.chars();
    match chars.next() {
        Some(first) if first == '_' || first.is_alphabetic() => chars.all(|c| c == '_' || c.is_alphanumeric()),
        _ => false,
    }
}

fn is_dotted_name(name: &str) -> bool {
    !name.is_empty() && name.split('.').all(is_identifier)
}

fn invalid(text: &str, line: u32) -> ParseError {
    ParseError::InvalidImport {
        line,
        statement: text.to_string(),
    }
}

fn parse_import_statement(text: &str, line: u32, imports: &mut Vec<ImportRef>) -> Result<(), ParseError> {
    if let Some(rest) = strip_keyword(text, "import") {
        if rest.is_empty() {
            return Err(invalid(text, line));
        }
        for item in rest.split(',') {
            let mut words = item.split_whitespace();
            let module = words.next().ok_or_else(|| invalid(text, line))?;
            match (words.next(), words.next(), words.next()) {
                (None, None, None) => {}
                (Some("as"), Some(alias), None) if is_identifier(alias) => {}
                _ => return Err(invalid(text, line)),
            }
            if !is_dotted_name(module) {
                return Err(invalid(text, line));
            }
            imports.push(ImportRef {
                module: module.to_string(),
                line,
            });
        }
        return Ok(());
    }

    if let Some(rest) = strip_from(text) {
        // Leading dots make the import relative; they may touch `import`
        let dots_end = rest
            .find(|c: char| c != '.' && !c.is_whitespace())
            .unwrap_or(rest.len());
        let relative = rest[..dots_end].contains('.');
        let tail = &rest[dots_end..];

        let (module, names) = match strip_import(tail) {
            Some(names) if relative => ("", names),
            _ => {
                let end = tail.find(char::is_whitespace).unwrap_or(tail.len());
                let (module, after) = tail.split_at(end);
                let names = strip_import(after.trim_start()).ok_or_else(|| invalid(text, line))?;
                (module, names)
            }
        };
        if names.trim().is_empty() || (!module.is_empty() && !is_dotted_name(module)) {
            return Err(invalid(text, line));
        }

        if relative {
            debug!(%text, "parse_import_statement: skipping relative import");
            return Ok(());
        }
        if module.is_empty() {
            return Err(invalid(text, line));
        }
        imports.push(ImportRef {
            module: module.to_string(),
            line,
        });
    }

    Ok(())
}
