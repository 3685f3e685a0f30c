//! Tolerant list-item extraction.
//!
//! Job descriptions arrive as loosely-formed HTML fragments. We only need the text
//! of `<li>` elements, so instead of building a DOM we scan for list-item blocks
//! case-insensitively and strip whatever markup they contain.
//!
//! Malformed input never fails: an unclosed `<li>` runs to the next list boundary
//! or the end of the input, and input without list items yields an empty list.

/// Text of every `<li>` element, in document order, with tags stripped,
/// entities decoded and whitespace collapsed. Empty items are dropped.
pub fn list_items(html: &str) -> Vec<String> {
    // ASCII lowercasing keeps byte offsets identical to `html`.
    let lower = html.to_ascii_lowercase();
    let mut items = Vec::new();
    let mut pos = 0;

    while let Some(start) = find_tag(&lower, pos, "li") {
        // Skip past the opening tag's `>`; an unterminated tag ends the scan.
        let Some(gt) = lower[start..].find('>') else {
            break;
        };
        let content_start = start + gt + 1;
        let content_end = item_end(&lower, content_start);

        let text = normalize_text(&strip_tags(&html[content_start..content_end]));
        if !text.is_empty() {
            items.push(text);
        }
        pos = content_end;
    }

    items
}

/// All list-item text joined with single spaces.
pub fn list_item_text(html: &str) -> String {
    list_items(html).join(" ")
}

/// Find the next opening tag `<name` (followed by `>`, `/` or whitespace) at or after `from`.
fn find_tag(lower: &str, from: usize, name: &str) -> Option<usize> {
    let needle = format!("<{name}");
    let mut pos = from;
    while let Some(rel) = lower.get(pos..)?.find(&needle) {
        let at = pos + rel;
        let next = lower[at + needle.len()..].chars().next();
        match next {
            Some('>') | Some('/') => return Some(at),
            Some(c) if c.is_whitespace() => return Some(at),
            None => return None,
            _ => pos = at + needle.len(),
        }
    }
    None
}

/// End of a list item's content: its closing tag, the next item, or the end of the list.
fn item_end(lower: &str, from: usize) -> usize {
    let rest = &lower[from..];
    let candidates = [
        rest.find("</li"),
        find_tag(lower, from, "li").map(|p| p - from),
        rest.find("</ul"),
        rest.find("</ol"),
    ];
    candidates
        .into_iter()
        .flatten()
        .min()
        .map(|rel| from + rel)
        .unwrap_or(lower.len())
}

/// Remove markup, replacing each tag with a space so adjacent words stay apart.
fn strip_tags(fragment: &str) -> String {
    let mut out = String::with_capacity(fragment.len());
    let mut in_tag = false;
    for c in fragment.chars() {
        match c {
            '<' => {
                in_tag = true;
                out.push(' ');
            }
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

fn normalize_text(text: &str) -> String {
    decode_entities(text)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_entity(&tail[1..semi]).map(|c| (c, semi + 1)));
        match decoded {
            Some((c, len)) => {
                out.push(c);
                rest = &tail[len..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        "ndash" => Some('–'),
        "mdash" => Some('—'),
        "dollar" => Some('$'),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        }
    }
}
