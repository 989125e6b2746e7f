use lintbridge_types::DiagnosticMessage;

use crate::rule_docs::rule_docs;

/// Escape text for inclusion in HTML markup.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Build the displayed message body.
///
/// With `show_rule_id`, the message is prefixed by a badge: a link to the
/// rule's docs, or a plain `Fatal` badge for messages without a rule (parse
/// errors).
#[must_use]
pub fn render_message(message: &str, rule_id: Option<&str>, show_rule_id: bool) -> DiagnosticMessage {
    if !show_rule_id {
        return DiagnosticMessage::Text(message.to_string());
    }
    let escaped = escape_html(message);
    let html = match rule_id {
        Some(rule) => {
            let docs = rule_docs(rule);
            format!(
                r#"<a href="{}" class="badge badge-flexible eslint">{}</a> {escaped}"#,
                escape_html(&docs.url),
                escape_html(rule)
            )
        }
        None => format!(r#"<span class="badge badge-flexible eslint">Fatal</span> {escaped}"#),
    };
    DiagnosticMessage::Html(html)
}
