//! services/web/src/web/pages.rs
//!
//! Server-rendered HTML for the three pages. All user text is escaped here.

use show_tell_core::domain::{Label, Session, Stage, Summary};
use show_tell_core::flow::{StoryInput, SubmitReport};

const APP_TITLE: &str = "Show or Tell Prediction App";

/// Escapes the five HTML-significant characters.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

fn layout(body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
body {{ font-family: sans-serif; max-width: 48rem; margin: 2rem auto; }}
.show {{ color: green; }}
.tell {{ color: red; }}
.error {{ color: #b00020; border: 1px solid #b00020; padding: .5rem; }}
.success {{ color: #1b5e20; border: 1px solid #1b5e20; padding: .5rem; }}
textarea, input[type=text], input[type=email] {{ width: 100%; }}
</style>
</head>
<body>
<h1>{title}</h1>
{body}
</body>
</html>
"#,
        title = APP_TITLE,
        body = body
    )
}

fn error_banner(out: &mut String, error: Option<&str>) {
    if let Some(message) = error {
        out.push_str(&format!("<p class=\"error\">{}</p>\n", escape(message)));
    }
}

fn label_class(label: Label) -> &'static str {
    match label {
        Label::Show => "show",
        Label::Tell => "tell",
    }
}

/// Renders whichever page matches the session's stage.
pub fn page_for(session: &Session, error: Option<&str>) -> String {
    match session.stage {
        Stage::Input => input_page(&StoryInput::default(), error),
        Stage::Review => review_page(session, error),
        Stage::Reflection => reflection_page(session, None, error),
    }
}

pub fn input_page(draft: &StoryInput, error: Option<&str>) -> String {
    let mut out = String::new();
    out.push_str("<h3>Data Story Prompt</h3>\n");
    out.push_str(
        "<figure><img src=\"/prompt.png\" alt=\"Chart prompt\" style=\"max-width:100%\">\
         <figcaption>Use this chart to write your data story.</figcaption></figure>\n<hr>\n",
    );
    error_banner(&mut out, error);
    out.push_str(&format!(
        r#"<form method="post" action="/analyze">
<p><label>Enter your name:<br><input type="text" name="name" value="{name}"></label></p>
<p><label>Enter your email:<br><input type="email" name="email" value="{email}"></label></p>
<p><label>Enter a title for your data story:<br><input type="text" name="title" value="{title}"></label></p>
<p><label>Write your data story here:<br><textarea name="story" rows="10">{story}</textarea></label></p>
<p><button type="submit">Analyze</button></p>
</form>
"#,
        name = escape(&draft.name),
        email = escape(&draft.email),
        title = escape(&draft.title),
        story = escape(&draft.story),
    ));
    layout(&out)
}

pub fn review_page(session: &Session, error: Option<&str>) -> String {
    let mut out = String::new();
    out.push_str(&format!("<h2>Sentence Analysis: {}</h2>\n", escape(&session.story_title)));
    error_banner(&mut out, error);

    out.push_str("<form method=\"post\" action=\"/review\">\n");
    if session.verdicts.is_empty() {
        out.push_str("<p>No sentences were found in your story.</p>\n");
    }
    for (i, verdict) in session.verdicts.iter().enumerate() {
        out.push_str(&format!(
            r#"<div class="verdict">
<p class="{class}"><b>{label}:</b> {sentence}</p>
<label><input type="checkbox" name="agree_{i}" value="on"{checked}> I agree with the model's label</label>
</div>
"#,
            class = label_class(verdict.label),
            label = verdict.label,
            sentence = escape(&verdict.sentence),
            checked = if verdict.agreed { " checked" } else { "" },
        ));
    }

    out.push_str(&format!(
        r#"<h2>Comment</h2>
<p><label>Add your thoughts or reasons for disagreement<br><textarea name="comments" rows="4">{comments}</textarea></label></p>
"#,
        comments = escape(session.comments.as_deref().unwrap_or_default()),
    ));

    summary_block(&mut out, &session.summary());
    out.push_str(
        "<p><button type=\"submit\" name=\"action\" value=\"save\">Save</button> \
         <button type=\"submit\" name=\"action\" value=\"next\">Next: Reflection &amp; Email</button></p>\n</form>\n",
    );
    restart_form(&mut out);
    layout(&out)
}

pub fn reflection_page(session: &Session, report: Option<&SubmitReport>, error: Option<&str>) -> String {
    let mut out = String::new();
    out.push_str(&format!("<h2>Reflection: {}</h2>\n", escape(&session.story_title)));
    error_banner(&mut out, error);

    if let Some(report) = report {
        out.push_str("<p class=\"success\">Feedback submitted!</p>\n");
        if let Some(e) = &report.store_error {
            out.push_str(&format!(
                "<p class=\"error\">Your answers could not be saved: {}</p>\n",
                escape(&e.to_string())
            ));
        }
        match &report.notify_error {
            Some(e) => out.push_str(&format!(
                "<p class=\"error\">The feedback email could not be sent: {}</p>\n",
                escape(&e.to_string())
            )),
            None => out.push_str(&format!(
                "<p>A summary was emailed to {}.</p>\n",
                escape(&session.student_email)
            )),
        }
    }

    summary_block(&mut out, &session.summary());
    out.push_str("<ul>\n");
    for verdict in &session.verdicts {
        out.push_str(&format!(
            "<li class=\"{class}\"><b>{label}:</b> {sentence} ({status})</li>\n",
            class = label_class(verdict.label),
            label = verdict.label,
            sentence = escape(&verdict.sentence),
            status = if verdict.agreed { "agreed" } else { "did not agree" },
        ));
    }
    out.push_str("</ul>\n");

    out.push_str(&format!(
        r#"<form method="post" action="/submit">
<p><label>What did you learn from this feedback?<br><textarea name="reflection" rows="6">{reflection}</textarea></label></p>
<p><label>Comments<br><textarea name="comments" rows="3">{comments}</textarea></label></p>
<p><button type="submit">Submit Feedback &amp; Send Email</button></p>
</form>
"#,
        reflection = escape(session.reflection.as_deref().unwrap_or_default()),
        comments = escape(session.comments.as_deref().unwrap_or_default()),
    ));
    restart_form(&mut out);
    layout(&out)
}

/// The page shown when the classifier cannot be used.
pub fn fatal_page(message: &str) -> String {
    let mut out = String::new();
    error_banner(&mut out, Some(message));
    out.push_str("<p>The analysis cannot continue. Restart once the problem is fixed.</p>\n");
    restart_form(&mut out);
    layout(&out)
}

fn restart_form(out: &mut String) {
    out.push_str(
        "<form method=\"post\" action=\"/restart\"><button type=\"submit\">Restart</button></form>\n",
    );
}

fn summary_block(out: &mut String, summary: &Summary) {
    out.push_str(&format!(
        "<h2>Summary</h2>\n<p>Total Sentences: {}</p>\n<p>Show Sentences: {}</p>\n<p>Tell Sentences: {}</p>\n",
        summary.total, summary.show, summary.tell
    ));
    out.push_str(&bar_chart(summary));
}

/// A two-bar SVG chart of Show vs Tell counts.
pub fn bar_chart(summary: &Summary) -> String {
    const HEIGHT: usize = 150;
    const BAR_WIDTH: usize = 80;
    let max = summary.show.max(summary.tell).max(1);

    let mut svg = format!(
        "<svg width=\"260\" height=\"{}\" role=\"img\" aria-label=\"Show vs Tell Breakdown\">\n",
        HEIGHT + 40
    );
    for (i, (name, count, colour)) in [("Show", summary.show, "green"), ("Tell", summary.tell, "red")]
        .into_iter()
        .enumerate()
    {
        let bar = count * HEIGHT / max;
        let x = 40 + i * (BAR_WIDTH + 40);
        svg.push_str(&format!(
            "<rect x=\"{x}\" y=\"{y}\" width=\"{BAR_WIDTH}\" height=\"{bar}\" fill=\"{colour}\"><title>{name}: {count}</title></rect>\
             <text x=\"{tx}\" y=\"{ty}\" text-anchor=\"middle\">{name}</text>\n",
            y = 10 + HEIGHT - bar,
            tx = x + BAR_WIDTH / 2,
            ty = HEIGHT + 30,
        ));
    }
    svg.push_str("</svg>\n");
    svg
}
