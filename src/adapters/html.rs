//! Tolerant HTML extraction helpers.
//!
//! The calendar pages only need a handful of well-known blocks, so extraction
//! scans locally for tags and class attributes instead of parsing the whole
//! document. Resilient to whitespace, attribute order and harmless markup
//! noise; not a general HTML parser.

/// Inner HTML of every `<tag ...>...</tag>` block, handling nesting of the
/// same tag.
pub fn tag_blocks(html: &str, tag: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut pos = 0;
    while let Some((open_end, _)) = find_open_tag(html, pos, tag, None) {
        match find_close(html, open_end, tag) {
            Some(close_start) => {
                blocks.push(html[open_end..close_start].to_string());
                // Resume just past the opening tag so nested blocks of the
                // same tag are emitted too.
                pos = open_end;
            }
            None => break,
        }
    }
    blocks
}

/// Inner HTML of every element whose `class` attribute contains `class` as a
/// whole token.
pub fn class_blocks(html: &str, class: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut pos = 0;
    loop {
        let Some((open_end, tag)) = find_open_tag_with_class(html, pos, class) else {
            break;
        };
        match find_close(html, open_end, &tag) {
            Some(close_start) => {
                blocks.push(html[open_end..close_start].to_string());
                pos = close_start + tag.len() + 3;
            }
            None => {
                pos = open_end;
            }
        }
    }
    blocks
}

/// All `(text, href)` pairs from anchor elements.
pub fn links(html: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut pos = 0;
    while let Some((open_end, _)) = find_open_tag(html, pos, "a", None) {
        let open_start = html[..open_end].rfind('<').unwrap_or(0);
        let open_tag = &html[open_start..open_end];
        let href = attr_value(open_tag, "href").unwrap_or_default();
        match find_close(html, open_end, "a") {
            Some(close_start) => {
                out.push((strip_tags(&html[open_end..close_start]), href));
                pos = close_start + 4;
            }
            None => break,
        }
    }
    out
}

/// Remove markup and decode the common entities, collapsing whitespace runs.
pub fn strip_tags(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                text.push(' ');
            }
            c if !in_tag => text.push(c),
            _ => {}
        }
    }
    let decoded = decode_entities(&text);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&ndash;", "–")
}

/// Value of `name="..."` inside an open tag, tolerating single quotes.
fn attr_value(open_tag: &str, name: &str) -> Option<String> {
    let lowered = open_tag.to_lowercase();
    let at = lowered.find(&format!("{name}="))? + name.len() + 1;
    let rest = &open_tag[at..];
    let quote = rest.chars().next()?;
    if quote == '"' || quote == '\'' {
        let end = rest[1..].find(quote)?;
        Some(rest[1..1 + end].to_string())
    } else {
        let end = rest.find([' ', '>']).unwrap_or(rest.len());
        Some(rest[..end].to_string())
    }
}

/// Find the next opening `<tag ...>` at or after `from`. Returns the position
/// just past `>` and the tag name. When `class` is given, the tag's class
/// attribute must contain it as a whole token.
fn find_open_tag(html: &str, from: usize, tag: &str, class: Option<&str>) -> Option<(usize, String)> {
    let lowered = html.to_lowercase();
    let needle = format!("<{tag}");
    let mut pos = from;
    while let Some(found) = lowered[pos..].find(&needle) {
        let start = pos + found;
        let after = start + needle.len();
        let boundary = lowered[after..].chars().next();
        let is_tag = matches!(boundary, Some(' ') | Some('>') | Some('\n') | Some('\t') | Some('/'));
        if is_tag {
            if let Some(end) = html[start..].find('>') {
                let open_end = start + end + 1;
                let open_tag = &html[start..open_end];
                let class_ok = match class {
                    None => true,
                    Some(c) => attr_value(open_tag, "class")
                        .map(|v| v.split_whitespace().any(|t| t == c))
                        .unwrap_or(false),
                };
                if class_ok && !open_tag.ends_with("/>") {
                    return Some((open_end, tag.to_string()));
                }
                pos = open_end;
                continue;
            }
            return None;
        }
        pos = after;
    }
    None
}

/// Find the next open tag of any name whose class contains `class`.
fn find_open_tag_with_class(html: &str, from: usize, class: &str) -> Option<(usize, String)> {
    let lowered = html.to_lowercase();
    let mut pos = from;
    while let Some(found) = lowered[pos..].find('<') {
        let start = pos + found;
        let rest = &lowered[start + 1..];
        let tag: String = rest
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect();
        if tag.is_empty() {
            pos = start + 1;
            continue;
        }
        let Some(end) = html[start..].find('>') else {
            return None;
        };
        let open_end = start + end + 1;
        let open_tag = &html[start..open_end];
        let class_ok = attr_value(open_tag, "class")
            .map(|v| v.split_whitespace().any(|t| t == class))
            .unwrap_or(false);
        if class_ok && !open_tag.ends_with("/>") {
            return Some((open_end, tag));
        }
        pos = open_end;
    }
    None
}

/// Position of the matching `</tag>`, accounting for nested same-name tags.
fn find_close(html: &str, open_end: usize, tag: &str) -> Option<usize> {
    let lowered = html.to_lowercase();
    let open_needle = format!("<{tag}");
    let close_needle = format!("</{tag}>");
    let mut depth = 1usize;
    let mut pos = open_end;
    loop {
        let next_close = lowered[pos..].find(&close_needle)?;
        let next_open = lowered[pos..pos + next_close].find(&open_needle);
        match next_open {
            Some(open_at) => {
                // Only count real nested opens, not e.g. <ab when tag is <a.
                let after = pos + open_at + open_needle.len();
                let boundary = lowered[after..].chars().next();
                if matches!(boundary, Some(' ') | Some('>') | Some('\n') | Some('\t') | Some('/')) {
                    depth += 1;
                }
                pos = after;
            }
            None => {
                depth -= 1;
                if depth == 0 {
                    return Some(pos + next_close);
                }
                pos = pos + next_close + close_needle.len();
            }
        }
    }
}
