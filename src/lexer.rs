use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

const NATIVE_COMMENT: (&str, &str) = ("{#", "#}");
const NATIVE_BLOCK: (&str, &str) = ("{%", "%}");
const NATIVE_VARIABLE: (&str, &str) = ("{{", "}}");

/// A `{` printed through an expression so it cannot open a Tera tag.
const LITERAL_BRACE: &str = r#"{{ "{" }}"#;

/// One tag's delimiters as written in configuration.
///
/// Accepts either `"<%"` or `["<%", "%>"]`. A missing end mirrors the start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TagRepr", into = "TagRepr")]
pub struct Tag {
    pub start: String,
    pub end: Option<String>,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum TagRepr {
    Start(String),
    Pair(String, String),
}

impl From<TagRepr> for Tag {
    fn from(repr: TagRepr) -> Self {
        match repr {
            TagRepr::Start(start) => Tag { start, end: None },
            TagRepr::Pair(start, end) => Tag {
                start,
                end: Some(end),
            },
        }
    }
}

impl From<Tag> for TagRepr {
    fn from(tag: Tag) -> Self {
        match tag.end {
            Some(end) => TagRepr::Pair(tag.start, end),
            None => TagRepr::Start(tag.start),
        }
    }
}

impl Tag {
    pub fn new(start: &str, end: &str) -> Self {
        Tag {
            start: start.to_string(),
            end: Some(end.to_string()),
        }
    }

    /// The end delimiter, mirrored from the start when not configured.
    pub fn resolved_end(&self) -> String {
        match &self.end {
            Some(end) => end.clone(),
            None => mirror(&self.start),
        }
    }
}

/// Reverse a start delimiter and swap its brackets: `<%` becomes `%>`.
fn mirror(start: &str) -> String {
    start
        .chars()
        .rev()
        .map(|c| match c {
            '{' => '}',
            '}' => '{',
            '[' => ']',
            ']' => '[',
            '(' => ')',
            ')' => '(',
            '<' => '>',
            '>' => '<',
            other => other,
        })
        .collect()
}

/// The comment, block and variable delimiters of a renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelimiterSet {
    #[serde(rename = "tag_comment", default = "default_comment")]
    pub comment: Tag,
    #[serde(rename = "tag_block", default = "default_block")]
    pub block: Tag,
    #[serde(rename = "tag_variable", default = "default_variable")]
    pub variable: Tag,
}

fn default_comment() -> Tag {
    Tag::new(NATIVE_COMMENT.0, NATIVE_COMMENT.1)
}

fn default_block() -> Tag {
    Tag::new(NATIVE_BLOCK.0, NATIVE_BLOCK.1)
}

fn default_variable() -> Tag {
    Tag::new(NATIVE_VARIABLE.0, NATIVE_VARIABLE.1)
}

impl Default for DelimiterSet {
    fn default() -> Self {
        Self {
            comment: default_comment(),
            block: default_block(),
            variable: default_variable(),
        }
    }
}

impl DelimiterSet {
    pub fn lexer(&self) -> Result<Lexer> {
        Lexer::new(
            (self.comment.start.clone(), self.comment.resolved_end()),
            (self.block.start.clone(), self.block.resolved_end()),
            (self.variable.start.clone(), self.variable.resolved_end()),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Comment,
    Block,
    Variable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Delimiters {
    start: String,
    end: String,
}

/// A validated set of delimiters bound to a renderer with
/// [`Renderer::set_lexer`][crate::environment::Renderer::set_lexer].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexer {
    comment: Delimiters,
    block: Delimiters,
    variable: Delimiters,
}

impl Default for Lexer {
    fn default() -> Self {
        let pair = |(start, end): (&str, &str)| Delimiters {
            start: start.to_string(),
            end: end.to_string(),
        };
        Self {
            comment: pair(NATIVE_COMMENT),
            block: pair(NATIVE_BLOCK),
            variable: pair(NATIVE_VARIABLE),
        }
    }
}

impl Lexer {
    /// Build a lexer from `(start, end)` pairs for comments, blocks and variables.
    pub fn new(
        comment: (String, String),
        block: (String, String),
        variable: (String, String),
    ) -> Result<Self> {
        let lexer = Self {
            comment: Delimiters {
                start: comment.0,
                end: comment.1,
            },
            block: Delimiters {
                start: block.0,
                end: block.1,
            },
            variable: Delimiters {
                start: variable.0,
                end: variable.1,
            },
        };
        lexer.validate()?;
        Ok(lexer)
    }

    fn validate(&self) -> Result<()> {
        for (kind, d) in self.tags() {
            if d.start.is_empty() || d.end.is_empty() {
                return Err(BridgeError::InvalidDelimiters {
                    reason: format!("{kind:?} delimiters must not be empty"),
                });
            }
        }

        let starts = [&self.comment.start, &self.block.start, &self.variable.start];
        for (i, a) in starts.iter().enumerate() {
            if starts[i + 1..].contains(a) {
                return Err(BridgeError::InvalidDelimiters {
                    reason: format!("start delimiter '{a}' is used by more than one tag"),
                });
            }
        }

        Ok(())
    }

    fn tags(&self) -> [(Kind, &Delimiters); 3] {
        [
            (Kind::Comment, &self.comment),
            (Kind::Block, &self.block),
            (Kind::Variable, &self.variable),
        ]
    }

    pub fn comment(&self) -> (&str, &str) {
        (&self.comment.start, &self.comment.end)
    }

    pub fn block(&self) -> (&str, &str) {
        (&self.block.start, &self.block.end)
    }

    pub fn variable(&self) -> (&str, &str) {
        (&self.variable.start, &self.variable.end)
    }

    /// Whether these are Tera's own delimiters.
    pub fn is_native(&self) -> bool {
        *self == Self::default()
    }

    /// Rewrite `source` into Tera's native syntax.
    ///
    /// `name` only appears in errors.
    pub fn translate<'s>(&self, name: &str, source: &'s str) -> Result<Cow<'s, str>> {
        if self.is_native() {
            return Ok(Cow::Borrowed(source));
        }

        let mut out = String::with_capacity(source.len());
        let mut cursor = 0;

        while let Some((kind, begin)) = self.find_start(source, cursor) {
            push_text(&mut out, &source[cursor..begin]);

            let delimiters = self.delimiters(kind);
            let inner_start = begin + delimiters.start.len();
            let inner_end = source[inner_start..]
                .find(delimiters.end.as_str())
                .map(|i| inner_start + i)
                .ok_or_else(|| BridgeError::UnclosedTag {
                    template: name.to_string(),
                    delimiter: delimiters.end.clone(),
                    offset: begin,
                })?;
            let inner = &source[inner_start..inner_end];
            cursor = inner_end + delimiters.end.len();

            match kind {
                Kind::Comment => {
                    out.push_str(NATIVE_COMMENT.0);
                    out.push_str(&inner.replace(NATIVE_COMMENT.1, "# }"));
                    out.push_str(NATIVE_COMMENT.1);
                }
                Kind::Variable => {
                    out.push_str(NATIVE_VARIABLE.0);
                    out.push_str(inner);
                    out.push_str(NATIVE_VARIABLE.1);
                }
                Kind::Block if tag_word(inner) == "raw" => {
                    let (body, close, next) = self.raw_body(name, source, cursor, begin)?;
                    push_block(&mut out, inner);
                    out.push_str(body);
                    push_block(&mut out, close);
                    cursor = next;
                }
                Kind::Block => push_block(&mut out, inner),
            }
        }

        push_text(&mut out, &source[cursor..]);
        Ok(Cow::Owned(out))
    }

    fn delimiters(&self, kind: Kind) -> &Delimiters {
        match kind {
            Kind::Comment => &self.comment,
            Kind::Block => &self.block,
            Kind::Variable => &self.variable,
        }
    }

    /// The earliest start delimiter at or after `from`; the longest wins a tie.
    fn find_start(&self, source: &str, from: usize) -> Option<(Kind, usize)> {
        self.tags()
            .into_iter()
            .filter_map(|(kind, d)| {
                source[from..]
                    .find(d.start.as_str())
                    .map(|i| (kind, from + i, d.start.len()))
            })
            .min_by(|a, b| a.1.cmp(&b.1).then(b.2.cmp(&a.2)))
            .map(|(kind, at, _)| (kind, at))
    }

    /// Find the `endraw` block closing a raw section that starts at `from`.
    ///
    /// Returns the verbatim body, the closing tag's inner text and the offset
    /// just past the closing tag.
    fn raw_body<'s>(
        &self,
        name: &str,
        source: &'s str,
        from: usize,
        open: usize,
    ) -> Result<(&'s str, &'s str, usize)> {
        let (start, end) = (&self.block.start, &self.block.end);
        let mut search = from;

        while let Some(i) = source[search..].find(start.as_str()) {
            let tag_at = search + i;
            let inner_start = tag_at + start.len();
            let Some(j) = source[inner_start..].find(end.as_str()) else {
                break;
            };
            let inner = &source[inner_start..inner_start + j];
            if tag_word(inner) == "endraw" {
                return Ok((&source[from..tag_at], inner, inner_start + j + end.len()));
            }
            search = inner_start;
        }

        Err(BridgeError::UnclosedTag {
            template: name.to_string(),
            delimiter: format!("{start} endraw {end}"),
            offset: open,
        })
    }
}

/// The tag's keyword, ignoring whitespace-control dashes.
fn tag_word(inner: &str) -> &str {
    inner.trim().trim_matches('-').trim()
}

fn push_block(out: &mut String, inner: &str) {
    out.push_str(NATIVE_BLOCK.0);
    out.push_str(inner);
    out.push_str(NATIVE_BLOCK.1);
}

/// Copy literal text so that none of it opens a Tera tag.
///
/// Every `{` followed by `{`, `%` or `#` is escaped, and so is a trailing `{`,
/// since the next emitted tag starts with one.
fn push_text(out: &mut String, text: &str) {
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '{' && matches!(chars.peek(), None | Some('{' | '%' | '#')) {
            out.push_str(LITERAL_BRACE);
        } else {
            out.push(c);
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn erb() -> Lexer {
        Lexer::new(
            ("<%#".into(), "%>".into()),
            ("<%".into(), "%>".into()),
            ("<%=".into(), "%>".into()),
        )
        .unwrap()
    }

    fn brackets() -> Lexer {
        DelimiterSet {
            comment: Tag {
                start: "[#".into(),
                end: None,
            },
            block: Tag {
                start: "[%".into(),
                end: None,
            },
            variable: Tag {
                start: "[[".into(),
                end: None,
            },
        }
        .lexer()
        .unwrap()
    }

    #[test]
    fn test_native_source_is_borrowed() {
        let lexer = Lexer::default();
        assert!(lexer.is_native());
        let out = lexer.translate("t", "Hello {{ name }}").unwrap();
        assert!(matches!(out, Cow::Borrowed(_)));
    }

    #[test]
    fn test_mirrored_ends() {
        let lexer = brackets();
        assert_eq!(lexer.comment(), ("[#", "#]"));
        assert_eq!(lexer.block(), ("[%", "%]"));
        assert_eq!(lexer.variable(), ("[[", "]]"));
        assert_eq!(mirror("<%"), "%>");
    }

    #[rstest]
    #[case("[# note #][% if ok %]Hi [[ name ]][% endif %]", "{# note #}{% if ok %}Hi {{ name }}{% endif %}")]
    #[case("a [[- x -]] b", "a {{- x -}} b")]
    #[case("[# a #} b #]", "{# a # } b #}")]
    #[case("{{ literal }} [[ x ]]", r#"{{ "{" }}{ literal }} {{ x }}"#)]
    #[case("a{[[ x ]]}", r#"a{{ "{" }}{{ x }}}"#)]
    #[case("{[% if a %]b[% endif %]}", r#"{{ "{" }}{% if a %}b{% endif %}}"#)]
    #[case("doc: {% endraw %} [[ x ]]", r#"doc: {{ "{" }}% endraw %} {{ x }}"#)]
    #[case("css { color: red }", "css { color: red }")]
    fn test_translate(#[case] source: &str, #[case] expected: &str) {
        assert_eq!(brackets().translate("t", source).unwrap(), expected);
    }

    #[test]
    fn test_longest_start_wins() {
        let out = erb()
            .translate("t", "<%# c %><% if a %><%= a %><% endif %>")
            .unwrap();
        assert_eq!(out, "{# c #}{% if a %}{{ a }}{% endif %}");
    }

    #[test]
    fn test_raw_block_body_is_verbatim() {
        let out = brackets()
            .translate("t", "[% raw %][[ not a tag ]][%- endraw %]!")
            .unwrap();
        assert_eq!(out, "{% raw %}[[ not a tag ]]{%- endraw %}!");
    }

    #[test]
    fn test_unclosed_tag() {
        let err = brackets().translate("page", "ok [[ name").unwrap_err();
        assert!(matches!(
            err,
            BridgeError::UnclosedTag { template, delimiter, offset }
                if template == "page" && delimiter == "]]" && offset == 3
        ));
    }

    #[test]
    fn test_unclosed_raw_block() {
        let err = brackets().translate("page", "[% raw %] forever").unwrap_err();
        assert!(matches!(err, BridgeError::UnclosedTag { .. }));
    }

    #[rstest]
    #[case(("<%", "%>"), ("<%", "%>"), ("<%=", "%>"))] // shared start
    #[case(("", "#}"), ("{%", "%}"), ("{{", "}}"))] // empty start
    #[case(("{#", "#}"), ("{%", ""), ("{{", "}}"))] // empty end
    fn test_invalid_delimiters_rejected(
        #[case] comment: (&str, &str),
        #[case] block: (&str, &str),
        #[case] variable: (&str, &str),
    ) {
        let owned = |(s, e): (&str, &str)| (s.to_string(), e.to_string());
        let err = Lexer::new(owned(comment), owned(block), owned(variable)).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidDelimiters { .. }));
    }

    #[test]
    fn test_delimiter_set_from_toml() {
        let set: DelimiterSet = toml::from_str(
            r#"
tag_comment = "<#"
tag_variable = ["<<", ">>"]
"#,
        )
        .unwrap();
        assert_eq!(set.comment.resolved_end(), "#>");
        assert_eq!(set.block, default_block());
        assert_eq!(set.variable, Tag::new("<<", ">>"));
    }
}
