use regex::{Captures, Regex};

lazy_static::lazy_static! {
    static ref BOLD: Regex = Regex::new(r"\*\*(.*?)\*\*").unwrap();
    static ref CODE: Regex = Regex::new(r"`(.*?)`").unwrap();
    static ref LINK: Regex = Regex::new(r"\[(.*?)\]\((.*?)\)").unwrap();
    static ref NUMBERED: Regex = Regex::new(r"^[0-9]+\.\s").unwrap();
}

/// A piece of inline text produced by [`format_inline`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Bold(String),
    Code(String),
    Link { label: String, href: String },
}

/// A rendered line of an agent reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, inlines: Vec<Inline> },
    Bullet(Vec<Inline>),
    Numbered(Vec<Inline>),
    Paragraph(Vec<Inline>),
    Spacer,
}

#[derive(Clone, Copy)]
enum Pattern {
    Bold,
    Code,
    Link,
}

impl Pattern {
    // Order matters: on equal offsets the earlier pattern wins.
    const ALL: [Pattern; 3] = [Pattern::Bold, Pattern::Code, Pattern::Link];

    fn regex(self) -> &'static Regex {
        match self {
            Pattern::Bold => &BOLD,
            Pattern::Code => &CODE,
            Pattern::Link => &LINK,
        }
    }

    fn substitute(self, caps: &Captures<'_>) -> Inline {
        let group = |i: usize| caps.get(i).map_or("", |m| m.as_str()).to_string();
        match self {
            Pattern::Bold => Inline::Bold(group(1)),
            Pattern::Code => Inline::Code(group(1)),
            Pattern::Link => Inline::Link {
                label: group(1),
                href: group(2),
            },
        }
    }
}

/// Substitute `**bold**`, `` `code` `` and `[label](href)` spans.
///
/// Each pass looks for the first match of every pattern in the remaining
/// text and takes the leftmost one. No nesting and no escaping.
pub fn format_inline(text: &str) -> Vec<Inline> {
    let mut parts = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        let first = Pattern::ALL
            .iter()
            .filter_map(|p| p.regex().captures(remaining).map(|caps| (*p, caps)))
            .min_by_key(|(_, caps)| caps.get(0).map_or(usize::MAX, |m| m.start()));

        let Some((pattern, caps)) = first else {
            parts.push(Inline::Text(remaining.to_string()));
            break;
        };
        let Some(whole) = caps.get(0) else {
            break;
        };

        if whole.start() > 0 {
            parts.push(Inline::Text(remaining[..whole.start()].to_string()));
        }
        parts.push(pattern.substitute(&caps));
        remaining = &remaining[whole.end()..];
    }

    parts
}

/// Split a reply into lines and classify each one.
pub fn render_markdown(text: &str) -> Vec<Block> {
    if text.is_empty() {
        return Vec::new();
    }

    text.split('\n').map(classify_line).collect()
}

fn classify_line(line: &str) -> Block {
    if let Some(rest) = line.strip_prefix("### ") {
        return Block::Heading {
            level: 3,
            inlines: format_inline(rest),
        };
    }
    if let Some(rest) = line.strip_prefix("## ") {
        return Block::Heading {
            level: 2,
            inlines: format_inline(rest),
        };
    }
    if let Some(rest) = line.strip_prefix("# ") {
        return Block::Heading {
            level: 1,
            inlines: format_inline(rest),
        };
    }
    if let Some(rest) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
        return Block::Bullet(format_inline(rest));
    }
    if let Some(marker) = NUMBERED.find(line) {
        return Block::Numbered(format_inline(&line[marker.end()..]));
    }
    if line.trim().is_empty() {
        return Block::Spacer;
    }
    Block::Paragraph(format_inline(line))
}
