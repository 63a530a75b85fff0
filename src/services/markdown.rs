use std::collections::HashMap;

use pulldown_cmark::{html, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

/// The GitHub-flavoured extensions brick documents rely on.
fn options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_FOOTNOTES
}

/// Renders Markdown to HTML. Raw HTML is passed through untouched.
pub fn to_html(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, options());
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Renders Markdown to HTML with linkable headings.
///
/// Every heading gets a slug `id` and a trailing anchor link. A level one
/// heading whose text is `drop_title` is left out.
pub fn to_html_with_anchors(markdown: &str, drop_title: Option<&str>) -> String {
    let events: Vec<Event> = Parser::new_ext(markdown, options()).collect();
    let mut slugs = Slugger::default();
    let mut rendered: Vec<Event> = Vec::with_capacity(events.len());

    let mut i = 0;
    while i < events.len() {
        let Event::Start(Tag::Heading { level, .. }) = &events[i] else {
            rendered.push(events[i].clone());
            i += 1;
            continue;
        };
        let level = *level;

        let end = events[i..]
            .iter()
            .position(|e| matches!(e, Event::End(TagEnd::Heading(_))))
            .map(|offset| i + offset)
            .unwrap_or(events.len() - 1);
        let inner = &events[i + 1..end];
        let text = plain_text(inner);
        i = end + 1;

        if level == HeadingLevel::H1 && drop_title.is_some_and(|title| title == text.trim()) {
            continue;
        }

        let id = slugs.slug(&text);
        rendered.push(Event::Html(CowStr::from(format!(
            "<div class=\"heading-wrapper level-{}\" tabindex=\"-1\"><{} id=\"{}\">",
            level, level, id
        ))));
        rendered.extend(inner.iter().cloned());
        rendered.push(Event::Html(CowStr::from(format!(
            "</{}><a class=\"anchor-link\" href=\"#{}\"><span aria-hidden=\"true\" class=\"anchor-icon\">#</span></a></div>\n",
            level, id
        ))));
    }

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, rendered.into_iter());
    out
}

fn plain_text(events: &[Event]) -> String {
    events
        .iter()
        .filter_map(|event| match event {
            Event::Text(text) | Event::Code(text) => Some(text.as_ref()),
            _ => None,
        })
        .collect()
}

/// GitHub-style heading slugs, de-duplicated per document.
#[derive(Default)]
struct Slugger {
    seen: HashMap<String, usize>,
}

impl Slugger {
    fn slug(&mut self, text: &str) -> String {
        let base: String = text
            .trim()
            .to_lowercase()
            .chars()
            .filter_map(|c| match c {
                ' ' => Some('-'),
                c if c.is_alphanumeric() || c == '-' || c == '_' => Some(c),
                _ => None,
            })
            .collect();

        // `seen` holds every emitted id, mapped to the last suffix tried for it.
        let mut slug = base.clone();
        while self.seen.contains_key(&slug) {
            let count = self.seen.entry(base.clone()).or_insert(0);
            *count += 1;
            slug = format!("{}-{}", base, count);
        }
        self.seen.insert(slug.clone(), 0);
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_gfm_tables_and_strikethrough() {
        let html = to_html("| a | b |\n| - | - |\n| 1 | 2 |\n\n~~gone~~");
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>1</td>"));
        assert!(html.contains("<del>gone</del>"));
    }

    #[test]
    fn code_blocks_keep_their_language() {
        let html = to_html("```dart\nvoid main() {}\n```");
        assert!(html.contains("<code class=\"language-dart\">"));
    }

    #[test]
    fn raw_html_passes_through() {
        let html = to_html("<p align=\"center\"><img src=\"logo.png\" /></p>");
        assert!(html.contains("<p align=\"center\"><img src=\"logo.png\" /></p>"));
    }

    #[test]
    fn headings_get_unique_anchors() {
        let html = to_html_with_anchors("## Getting Started\n\ntext\n\n## Getting Started\n", None);
        assert!(html.contains("<h2 id=\"getting-started\">Getting Started</h2>"));
        assert!(html.contains("<h2 id=\"getting-started-1\">Getting Started</h2>"));
        assert!(html.contains("href=\"#getting-started\""));
    }

    #[test]
    fn generated_suffixes_never_collide_with_real_headings() {
        let html = to_html_with_anchors("## Foo\n\n## Foo\n\n## Foo-1\n", None);
        let ids: Vec<&str> = html
            .split("id=\"")
            .skip(1)
            .filter_map(|rest| rest.split('"').next())
            .collect();
        assert_eq!(ids, vec!["foo", "foo-1", "foo-1-1"]);
    }

    #[test]
    fn matching_title_is_dropped() {
        let html = to_html_with_anchors(
            "# brickhub.dev policy\n\n## Uploads `bricks`\n\nBody",
            Some("brickhub.dev policy"),
        );
        assert!(!html.contains("brickhub.dev policy"));
        assert!(html.contains("<h2 id=\"uploads-bricks\">Uploads <code>bricks</code></h2>"));
        assert!(html.contains("<p>Body</p>"));
    }
}
