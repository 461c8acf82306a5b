//! Reply-text extraction: strips quoted previous messages and markup from
//! an inbound body, leaving only the human-authored portion.
//!
//! The HTML path removes quote containers by a prioritized rule list (one
//! rule per mail-client family), strips the remaining markup to text, and
//! re-strips until no tag-like content remains, so [`clean`] is idempotent.
//! The plain-text path drops `>`-quoted and attribution lines.

/// Upper bound on strip passes. Each pass consumes one level of markup
/// or entity escaping; real mail never needs more than two.
const MAX_STRIP_PASSES: usize = 8;

/// Cleans a raw message body into quote-free, tag-free, readable text.
///
/// Never fails: unparseable input degrades to a best-effort trimmed
/// string, and a body that is entirely quoted content yields an empty
/// string. `clean(clean(x)) == clean(x)` holds for any input.
#[must_use]
pub fn clean(raw: &str) -> String {
    let mut text = raw.to_string();
    let mut passes = 0;

    while looks_like_html(&text) && passes < MAX_STRIP_PASSES {
        text = html_to_text(&text);
        passes += 1;
    }

    if passes > 0 {
        // Attribution intros in HTML mail introduce the quoted tail; drop
        // everything from the first one on.
        text = truncate_at_attribution(&text);
    }

    filter_quoted_lines(&text)
}

/// Returns true if the input contains a tag-like pattern: `<` followed by
/// a letter or `/`, with a closing `>` somewhere after it.
fn looks_like_html(text: &str) -> bool {
    let bytes = text.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'<'
            && let Some(&next) = bytes.get(i + 1)
            && (next.is_ascii_alphabetic() || next == b'/')
        {
            return bytes[i + 1..].contains(&b'>');
        }
    }
    false
}

// ---------------------------------------------------------------------------
// Quote-container rules
// ---------------------------------------------------------------------------

/// An opening tag with the attributes the rules inspect.
#[derive(Debug, Default)]
struct Tag {
    name: String,
    class: String,
    id: String,
    style: String,
    closing: bool,
    self_closing: bool,
}

/// A quote-container detection rule for one mail-client family.
struct QuoteRule {
    #[allow(dead_code)]
    client: &'static str,
    matches: fn(&Tag) -> bool,
}

/// Prioritized rule list. The first matching rule wins; order follows how
/// specific the marker is.
const QUOTE_RULES: &[QuoteRule] = &[
    QuoteRule {
        client: "gmail",
        matches: gmail_quote,
    },
    QuoteRule {
        client: "outlook-header",
        matches: outlook_header,
    },
    QuoteRule {
        client: "outlook-divider",
        matches: outlook_divider,
    },
    QuoteRule {
        client: "apple-mail",
        matches: apple_mail_quote,
    },
    QuoteRule {
        client: "thunderbird",
        matches: thunderbird_cite,
    },
    QuoteRule {
        client: "blockquote",
        matches: any_blockquote,
    },
];

/// Gmail wraps quoted history in `gmail_quote` / `gmail_quote_container`
/// divs and the "On ... wrote:" line in a `gmail_attr` div.
fn gmail_quote(tag: &Tag) -> bool {
    tag.class.contains("gmail_quote") || tag.class.contains("gmail_attr")
}

/// Outlook's quoted-header block.
fn outlook_header(tag: &Tag) -> bool {
    tag.class.contains("outlookmessageheader")
}

/// Outlook also marks the reply divider with an inline border-left style.
fn outlook_divider(tag: &Tag) -> bool {
    tag.name == "div" && tag.style.contains("border-left")
}

/// Apple Mail quote wrapper.
fn apple_mail_quote(tag: &Tag) -> bool {
    tag.class.contains("applemailquote")
}

/// Thunderbird's "On ... wrote:" prefix div.
fn thunderbird_cite(tag: &Tag) -> bool {
    tag.class.contains("moz-cite-prefix")
}

/// Any `blockquote`, including `type="cite"` variants.
fn any_blockquote(tag: &Tag) -> bool {
    tag.name == "blockquote"
}

/// Finds the first rule matching an opening tag.
fn matching_rule(tag: &Tag) -> Option<&'static QuoteRule> {
    QUOTE_RULES.iter().find(|rule| (rule.matches)(tag))
}

// ---------------------------------------------------------------------------
// HTML stripping
// ---------------------------------------------------------------------------

/// Elements with no closing tag.
fn is_void(name: &str) -> bool {
    matches!(
        name,
        "br" | "hr" | "img" | "meta" | "link" | "input" | "area" | "base" | "col" | "embed"
            | "source" | "track" | "wbr"
    )
}

/// Elements whose boundaries separate lines of text.
fn is_block(name: &str) -> bool {
    matches!(
        name,
        "p" | "div"
            | "li"
            | "ul"
            | "ol"
            | "tr"
            | "table"
            | "pre"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
    )
}

/// Elements whose content is never text.
fn is_opaque(name: &str) -> bool {
    matches!(name, "style" | "script" | "head" | "title")
}

/// One strip pass: removes quote containers per [`QUOTE_RULES`], truncates
/// at a horizontal rule (Outlook separates quoted history with `<hr>`),
/// drops remaining markup, and decodes entities.
fn html_to_text(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    // Name of the container being skipped and its nesting depth.
    let mut skip: Option<(String, usize)> = None;
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '<' => {
                if starts_with_at(&chars, i, "<!--") {
                    i = skip_comment(&chars, i);
                    continue;
                }
                let Some((tag, next)) = parse_tag(&chars, i) else {
                    // No closing '>': treat the rest as literal text.
                    if skip.is_none() {
                        out.extend(&chars[i..]);
                    }
                    break;
                };
                i = next;

                if let Some((name, depth)) = skip.as_mut() {
                    if tag.name == *name {
                        if tag.closing {
                            *depth -= 1;
                            if *depth == 0 {
                                skip = None;
                            }
                        } else if !tag.self_closing && !is_void(&tag.name) {
                            *depth += 1;
                        }
                    }
                    continue;
                }

                if tag.closing {
                    if is_block(&tag.name) {
                        out.push('\n');
                    }
                    continue;
                }

                if tag.name == "hr" {
                    // Everything after a rule is quoted history.
                    break;
                }
                if tag.name == "br" {
                    out.push('\n');
                    continue;
                }
                if !tag.self_closing && (is_opaque(&tag.name) || matching_rule(&tag).is_some()) {
                    skip = Some((tag.name.clone(), 1));
                    continue;
                }
                if is_block(&tag.name) {
                    out.push('\n');
                }
            }
            '&' if skip.is_none() => {
                let (decoded, next) = decode_entity(&chars, i);
                out.push_str(&decoded);
                i = next;
            }
            c => {
                if skip.is_none() {
                    out.push(c);
                }
                i += 1;
            }
        }
    }

    out
}

fn starts_with_at(chars: &[char], at: usize, needle: &str) -> bool {
    chars[at..]
        .iter()
        .zip(needle.chars())
        .filter(|(a, b)| **a == *b)
        .count()
        == needle.chars().count()
}

/// Skips past an HTML comment, returning the index after `-->`.
fn skip_comment(chars: &[char], at: usize) -> usize {
    let mut i = at + 4;
    while i < chars.len() {
        if chars[i] == '>' && i >= 2 && chars[i - 1] == '-' && chars[i - 2] == '-' {
            return i + 1;
        }
        i += 1;
    }
    chars.len()
}

/// Parses a tag starting at `<`, returning the tag and the index after the
/// closing `>`. Quoted attribute values may contain `>`.
fn parse_tag(chars: &[char], at: usize) -> Option<(Tag, usize)> {
    let mut i = at + 1;
    let mut tag = Tag::default();

    if chars.get(i) == Some(&'/') {
        tag.closing = true;
        i += 1;
    }

    // Tag name.
    let name_start = i;
    while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '-') {
        i += 1;
    }
    if i == name_start {
        return None;
    }
    tag.name = chars[name_start..i]
        .iter()
        .collect::<String>()
        .to_lowercase();

    // Attributes.
    loop {
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        match chars.get(i) {
            None => return None,
            Some('>') => return Some((tag, i + 1)),
            Some('/') if chars.get(i + 1) == Some(&'>') => {
                tag.self_closing = true;
                return Some((tag, i + 2));
            }
            _ => {}
        }

        let attr_start = i;
        while i < chars.len() && !chars[i].is_whitespace() && !matches!(chars[i], '=' | '>' | '/') {
            i += 1;
        }
        let attr_name = chars[attr_start..i]
            .iter()
            .collect::<String>()
            .to_lowercase();
        if attr_name.is_empty() {
            // Stray character; step over it to avoid stalling.
            i += 1;
            continue;
        }

        let mut value = String::new();
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        if chars.get(i) == Some(&'=') {
            i += 1;
            while i < chars.len() && chars[i].is_whitespace() {
                i += 1;
            }
            match chars.get(i) {
                Some(&quote @ ('"' | '\'')) => {
                    i += 1;
                    let value_start = i;
                    while i < chars.len() && chars[i] != quote {
                        i += 1;
                    }
                    value = chars[value_start..i.min(chars.len())].iter().collect();
                    i = (i + 1).min(chars.len());
                }
                _ => {
                    let value_start = i;
                    while i < chars.len() && !chars[i].is_whitespace() && chars[i] != '>' {
                        i += 1;
                    }
                    value = chars[value_start..i].iter().collect();
                }
            }
        }

        let value = value.to_lowercase();
        match attr_name.as_str() {
            "class" => tag.class = value,
            "id" => tag.id = value,
            "style" => tag.style = value,
            _ => {}
        }
    }
}

/// Decodes one entity starting at `&`, returning the replacement and the
/// index to resume at. Unknown entities pass through literally.
fn decode_entity(chars: &[char], at: usize) -> (String, usize) {
    let rest: String = chars[at + 1..].iter().take(12).collect();
    let Some(semi) = rest.find(';') else {
        return ("&".to_string(), at + 1);
    };
    let entity = &rest[..semi];
    let end = at + 2 + semi;

    let decoded = match entity {
        "nbsp" => Some(" ".to_string()),
        "amp" => Some("&".to_string()),
        "quot" => Some("\"".to_string()),
        "apos" | "#39" => Some("'".to_string()),
        "lt" => Some("<".to_string()),
        "gt" => Some(">".to_string()),
        _ => entity.strip_prefix('#').and_then(|num| {
            let code = num.strip_prefix(['x', 'X']).map_or_else(
                || num.parse::<u32>().ok(),
                |hex| u32::from_str_radix(hex, 16).ok(),
            )?;
            char::from_u32(code).map(String::from)
        }),
    };

    decoded.map_or_else(|| ("&".to_string(), at + 1), |d| (d, end))
}

// ---------------------------------------------------------------------------
// Line filtering
// ---------------------------------------------------------------------------

/// True for "On <date> ... wrote:" / "... sent:" attribution intros.
fn is_attribution_intro(line: &str) -> bool {
    let trimmed = line.trim().to_lowercase();
    trimmed.starts_with("on ") && (trimmed.ends_with("wrote:") || trimmed.ends_with("sent:"))
}

/// True for lines that echo a previous message and must be dropped.
fn is_quoted_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    if trimmed.starts_with('>') {
        return true;
    }
    let lower = trimmed.to_lowercase();
    lower.starts_with("from:") || lower.starts_with("sent:") || is_attribution_intro(line)
}

/// Keeps only the lines before the first attribution intro.
fn truncate_at_attribution(text: &str) -> String {
    text.lines()
        .take_while(|line| !is_attribution_intro(line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Drops quoted/attribution lines and collapses whitespace, repeating
/// until stable so the result survives a second cleaning unchanged.
fn filter_quoted_lines(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let kept: Vec<&str> = current.lines().filter(|l| !is_quoted_line(l)).collect();
        let joined = kept.join(" ");
        let collapsed = joined.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed == current {
            return collapsed;
        }
        current = collapsed;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn tag(name: &str) -> Tag {
        Tag {
            name: name.to_string(),
            ..Tag::default()
        }
    }

    mod rules {
        use super::*;

        #[test]
        fn blockquote_matches_any_blockquote() {
            assert!(any_blockquote(&tag("blockquote")));
            assert!(!any_blockquote(&tag("div")));
        }

        #[test]
        fn gmail_classes_match() {
            let mut t = tag("div");
            t.class = "gmail_quote gmail_quote_container".to_string();
            assert!(gmail_quote(&t));

            let mut attr = tag("div");
            attr.class = "gmail_attr".to_string();
            assert!(gmail_quote(&attr));

            assert!(!gmail_quote(&tag("div")));
        }

        #[test]
        fn outlook_header_class_matches() {
            let mut t = tag("div");
            t.class = "outlookmessageheader".to_string();
            assert!(outlook_header(&t));
        }

        #[test]
        fn outlook_border_divider_matches_divs_only() {
            let mut t = tag("div");
            t.style = "border-left: 2px solid #ccc; padding-left: 1ex".to_string();
            assert!(outlook_divider(&t));

            let mut span = tag("span");
            span.style = "border-left: 2px".to_string();
            assert!(!outlook_divider(&span));
        }

        #[test]
        fn apple_and_thunderbird_match() {
            let mut apple = tag("div");
            apple.class = "applemailquote".to_string();
            assert!(apple_mail_quote(&apple));

            let mut moz = tag("div");
            moz.class = "moz-cite-prefix".to_string();
            assert!(thunderbird_cite(&moz));
        }

        #[test]
        fn rule_priority_is_stable() {
            let mut t = tag("blockquote");
            t.class = "gmail_quote".to_string();
            assert_eq!(matching_rule(&t).unwrap().client, "gmail");
        }
    }

    #[test]
    fn plain_text_untouched() {
        assert_eq!(clean("Just a simple reply."), "Just a simple reply.");
    }

    #[test]
    fn plain_text_drops_quote_markers() {
        let body = "Sounds good!\n> What about Tuesday?\n> Or Wednesday?";
        assert_eq!(clean(body), "Sounds good!");
    }

    #[test]
    fn plain_text_drops_attribution_lines() {
        let body = "Yes.\nOn Mon, Nov 3, 2025 at 9:12 AM Dana wrote:\n> ping";
        assert_eq!(clean(body), "Yes.");
    }

    #[test]
    fn plain_text_drops_forward_headers() {
        let body = "See below.\nFrom: Dana <dana@example.com>\nSent: Monday\nhello";
        assert_eq!(clean(body), "See below. hello");
    }

    #[test]
    fn html_strips_tags_and_collapses() {
        assert_eq!(
            clean("<div><p>Hello <b>there</b></p></div>"),
            "Hello there"
        );
    }

    #[test]
    fn html_removes_trailing_blockquote() {
        let body = "<div>Works for me!</div><blockquote>When shall we meet?</blockquote>";
        assert_eq!(clean(body), "Works for me!");
    }

    #[test]
    fn html_removes_nested_blockquotes() {
        let body = "<p>Top</p><blockquote>a<blockquote>b</blockquote>c</blockquote>";
        assert_eq!(clean(body), "Top");
    }

    #[test]
    fn html_removes_gmail_quote_container() {
        let body = concat!(
            "<div dir=\"ltr\">Confirmed.</div>",
            "<div class=\"gmail_quote gmail_quote_container\">",
            "<div class=\"gmail_attr\">On Fri, Nov 7, 2025 Vraj wrote:</div>",
            "<blockquote>earlier text</blockquote></div>",
        );
        assert_eq!(clean(body), "Confirmed.");
    }

    #[test]
    fn html_truncates_at_hr() {
        let body = "<p>New content</p><hr id=\"stopSpelling\"><p>Old quoted mail</p>";
        assert_eq!(clean(body), "New content");
    }

    #[test]
    fn html_removes_outlook_border_divider() {
        let body = concat!(
            "<div>Approved.</div>",
            "<div style=\"border-left:2px solid #ccc\">From: X\nquoted</div>",
        );
        assert_eq!(clean(body), "Approved.");
    }

    #[test]
    fn html_removes_attribution_then_tail() {
        let body = "<div>Got it.</div><div>On Mon, Jan 5, Ada wrote:</div><div>old</div>";
        assert_eq!(clean(body), "Got it.");
    }

    #[test]
    fn html_decodes_entities() {
        assert_eq!(clean("<p>Fish &amp; chips&nbsp;twice</p>"), "Fish & chips twice");
    }

    #[test]
    fn html_skips_style_and_comments() {
        let body = "<style>p { color: red }</style><!-- hidden --><p>Visible</p>";
        assert_eq!(clean(body), "Visible");
    }

    #[test]
    fn entirely_quoted_body_yields_empty() {
        assert_eq!(clean("<blockquote>all of it</blockquote>"), "");
        assert_eq!(clean("> every\n> line\n> quoted"), "");
        assert_eq!(clean(""), "");
    }

    #[test]
    fn escaped_markup_is_fully_stripped() {
        // One decode pass exposes tags; the fixpoint loop removes them.
        assert_eq!(clean("<i>&lt;b&gt;</i>"), "");
        // A lone '<' is not tag-like and survives as text.
        assert_eq!(clean("<p>5 &lt; 7</p>"), "5 < 7");
    }

    #[test]
    fn clean_is_idempotent_on_samples() {
        let samples = [
            "plain",
            "Re: hi\n> quoted",
            "<div>Works for me!</div><blockquote>old</blockquote>",
            "<p>Fish &amp; chips</p>",
            "On Mon wrote:\n> all quoted",
            "<i>&lt;b&gt;nested&lt;/b&gt;</i>",
        ];
        for sample in samples {
            let once = clean(sample);
            assert_eq!(clean(&once), once, "not idempotent for {sample:?}");
        }
    }

    proptest::proptest! {
        #[test]
        fn clean_is_idempotent(input in "[ -~\\n]{0,300}") {
            let once = clean(&input);
            proptest::prop_assert_eq!(clean(&once), once);
        }

        #[test]
        fn clean_never_leaves_quote_markers(input in "[ -~\\n]{0,300}") {
            let once = clean(&input);
            proptest::prop_assert!(!once.trim_start().starts_with('>'));
        }
    }
}
