//! HTML rendering for the setup dialog

use crate::integration::IntegrationRecord;
use crate::pipeline::{FieldInput, FormField, FormView};

const STYLE: &str = r#"<style>
body { font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", sans-serif; margin: 0; padding: 32px; color: #2b2d42; background: #f7f7f9; }
main { max-width: 480px; margin: 0 auto; background: #fff; border: 1px solid #e2e2e8; border-radius: 6px; padding: 24px 28px; }
h1 { font-size: 20px; margin: 0 0 16px; }
label { display: block; font-weight: 600; margin: 16px 0 6px; }
input[type=text], select { width: 100%; box-sizing: border-box; padding: 8px; font-size: 14px; }
.help { color: #6c6f85; font-size: 13px; margin-top: 6px; }
.error { color: #b3261e; }
button, .button { display: inline-block; margin-top: 20px; padding: 8px 18px; background: #0078d4; color: #fff; border: 0; border-radius: 4px; font-size: 14px; text-decoration: none; cursor: pointer; }
</style>"#;

/// Escape text for use in element content and quoted attributes
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n{STYLE}\n</head>\n<body>\n<main>\n<h1>{title}</h1>\n{body}\n</main>\n</body>\n</html>\n",
        title = escape_html(title),
    )
}

fn render_field(field: &FormField) -> String {
    let name = escape_html(&field.name);
    let mut html = format!(
        "<label for=\"{name}\">{label}</label>\n",
        label = escape_html(&field.label)
    );

    match &field.input {
        FieldInput::Text { placeholder } => {
            let placeholder = placeholder
                .as_deref()
                .map(|p| format!(" placeholder=\"{}\"", escape_html(p)))
                .unwrap_or_default();
            html.push_str(&format!(
                "<input type=\"text\" id=\"{name}\" name=\"{name}\"{placeholder} required>\n"
            ));
        }
        FieldInput::Choice { choices } => {
            html.push_str(&format!("<select id=\"{name}\" name=\"{name}\" required>\n"));
            for choice in choices {
                let value = escape_html(&choice.name);
                html.push_str(&format!("<option value=\"{value}\">{value}</option>\n"));
            }
            html.push_str("</select>\n");
        }
    }

    if let Some(help) = &field.help_text {
        html.push_str(&format!("<div class=\"help\">{}</div>\n", escape_html(help)));
    }
    html
}

/// Render a step form that posts back to `action` for run `run_id`
pub fn render_form(action: &str, run_id: &str, form: &FormView) -> String {
    let mut body = format!(
        "<form method=\"post\" action=\"{}\">\n<input type=\"hidden\" name=\"state\" value=\"{}\">\n",
        escape_html(action),
        escape_html(run_id)
    );
    for field in &form.fields {
        body.push_str(&render_field(field));
    }
    body.push_str(&format!(
        "<button type=\"submit\">{}</button>\n</form>",
        escape_html(&form.submit_label)
    ));

    page(&form.title, &body)
}

pub fn render_success(record: &IntegrationRecord) -> String {
    let body = format!(
        "<p>{provider} is now connected to <strong>{domain}</strong>.</p>\n<p>Default project: <strong>{project}</strong></p>\n<p>You can close this window.</p>",
        provider = escape_html(&record.provider),
        domain = escape_html(&record.metadata.domain_name),
        project = escape_html(&record.name),
    );
    page("Setup complete", &body)
}

/// Error page; `retry_url` links back into the run, otherwise to a fresh one
pub fn render_error(title: &str, message: &str, retry_url: Option<&str>, restart_url: &str) -> String {
    let link = match retry_url {
        Some(url) => format!("<a class=\"button\" href=\"{}\">Try again</a>", escape_html(url)),
        None => format!("<a class=\"button\" href=\"{}\">Start over</a>", escape_html(restart_url)),
    };
    let body = format!("<p class=\"error\">{}</p>\n{}", escape_html(message), link);
    page(title, &body)
}
