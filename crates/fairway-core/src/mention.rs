//! Mention scanning for comment text.
//!
//! Two forms are recognised in a single left-to-right pass:
//!
//! - `@username` where the username is `[A-Za-z0-9_]+`
//! - `@[Course Name](course:<id>)` where the id is `[A-Za-z0-9_-]+`
//!
//! Anything that does not fully match one of these forms is kept as text.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Mention {
    User { username: String },
    Course { name: String, id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Segment {
    Text(String),
    Mention(Mention),
}

const COURSE_LINK_PREFIX: &str = "(course:";

pub fn parse_mentions(input: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut prev: Option<char> = None;
    let mut rest = input;

    while let Some(ch) = rest.chars().next() {
        if ch == '@' && !prev.is_some_and(|p| p.is_alphanumeric()) {
            if let Some((mention, consumed)) = scan_mention(&rest[1..]) {
                if !text.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut text)));
                }
                segments.push(Segment::Mention(mention));
                let advance = 1 + consumed;
                prev = rest[..advance].chars().next_back();
                rest = &rest[advance..];
                continue;
            }
        }
        text.push(ch);
        prev = Some(ch);
        rest = &rest[ch.len_utf8()..];
    }

    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    segments
}

/// Scans what follows an `@`. Returns the mention and the bytes consumed.
fn scan_mention(after_at: &str) -> Option<(Mention, usize)> {
    if after_at.starts_with('[') {
        return scan_course(after_at);
    }
    let len = after_at
        .char_indices()
        .find(|(_, c)| !is_username_char(*c))
        .map(|(i, _)| i)
        .unwrap_or(after_at.len());
    if len == 0 {
        return None;
    }
    Some((
        Mention::User {
            username: after_at[..len].to_string(),
        },
        len,
    ))
}

fn scan_course(after_at: &str) -> Option<(Mention, usize)> {
    let body = &after_at[1..];
    let name_end = body.find(|c: char| c == ']' || c == '\n')?;
    if body[name_end..].starts_with('\n') {
        return None;
    }
    let name = body[..name_end].trim();
    if name.is_empty() {
        return None;
    }

    let link = &body[name_end + 1..];
    let id_part = link.strip_prefix(COURSE_LINK_PREFIX)?;
    let id_len = id_part
        .char_indices()
        .find(|(_, c)| !is_course_id_char(*c))
        .map(|(i, _)| i)
        .unwrap_or(id_part.len());
    if id_len == 0 || !id_part[id_len..].starts_with(')') {
        return None;
    }

    let consumed = 1 + name_end + 1 + COURSE_LINK_PREFIX.len() + id_len + 1;
    Some((
        Mention::Course {
            name: name.to_string(),
            id: id_part[..id_len].to_string(),
        },
        consumed,
    ))
}

fn is_username_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_course_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Usernames in first-mention order, without duplicates.
pub fn mentioned_usernames(segments: &[Segment]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for segment in segments {
        if let Segment::Mention(Mention::User { username }) = segment {
            if !out.iter().any(|u| u.eq_ignore_ascii_case(username)) {
                out.push(username.clone());
            }
        }
    }
    out
}

pub fn mentioned_course_ids(segments: &[Segment]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for segment in segments {
        if let Segment::Mention(Mention::Course { id, .. }) = segment {
            if !out.contains(id) {
                out.push(id.clone());
            }
        }
    }
    out
}

pub fn render_html(segments: &[Segment]) -> String {
    let mut html = String::new();
    for segment in segments {
        match segment {
            Segment::Text(text) => html.push_str(&escape_html(text)),
            Segment::Mention(Mention::User { username }) => {
                html.push_str(&format!(
                    r#"<a class="mention mention-user" href="/users/{0}">@{0}</a>"#,
                    escape_html(username)
                ));
            }
            Segment::Mention(Mention::Course { name, id }) => {
                html.push_str(&format!(
                    r#"<a class="mention mention-course" href="/courses/{}">{}</a>"#,
                    escape_html(id),
                    escape_html(name)
                ));
            }
        }
    }
    html
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
