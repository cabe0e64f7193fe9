//! Server-side HTML for the single file-manager page.
//!
//! Every dynamic value is escaped with `html-escape`; query values are
//! percent-encoded with `urlencoding` before going into attributes.

use crate::{
    browse::Entry,
    dispatch::types::{Flash, FlashKind},
};
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use std::{borrow::Cow, fmt::Write};
use urlencoding::encode;

pub struct Row {
    pub entry: Entry,
    pub preview: Option<String>,
}

pub struct SearchView {
    pub term: String,
    pub hits: Vec<String>,
}

pub struct EditorView {
    pub file: String,
    pub content: Result<String, String>,
}

pub struct Page<'a> {
    /// Mount prefix, empty or `/name`.
    pub base_path: &'a str,
    /// Current folder relative to the base, `.` for the base.
    pub dir: &'a str,
    pub flash: Option<Flash>,
    pub search: Option<SearchView>,
    pub editor: Option<EditorView>,
    pub rows: Vec<Row>,
}

pub fn size_formatted(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut power = 1;
    while power < UNITS.len() && bytes >= 1024u64.pow(power as u32 + 1) {
        power += 1;
    }
    let value = bytes as f64 / 1024f64.powi(power as i32);
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded} {}", UNITS[power - 1])
}

/// `Home` followed by one crumb per path component, each with the
/// accumulated path it links to.
pub fn breadcrumbs(dir: &str) -> Vec<(String, String)> {
    let mut crumbs = vec![("Home".to_string(), ".".to_string())];
    let mut acc = String::new();
    for part in dir.split('/').filter(|p| !p.is_empty() && *p != ".") {
        if !acc.is_empty() {
            acc.push('/');
        }
        acc.push_str(part);
        crumbs.push((part.to_string(), acc.clone()));
    }
    crumbs
}

pub fn parent_dir(dir: &str) -> String {
    match dir.rsplit_once('/') {
        Some((parent, _)) if !parent.is_empty() => parent.to_string(),
        _ => ".".to_string(),
    }
}

/// Relative paths carry `%` escaped as `%25` so they survive `resolve`;
/// this undoes that for text shown to the user.
fn readable(path: &str) -> Cow<'_, str> {
    urlencoding::decode(path).unwrap_or(Cow::Borrowed(path))
}

fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

pub fn link(base: &str, params: &[(&str, &str)]) -> String {
    let query: Vec<String> = params.iter().map(|(k, v)| format!("{k}={}", encode(v))).collect();
    format!("{base}/?{}", query.join("&"))
}

pub fn render(page: &Page) -> String {
    let base = page.base_path;
    let mut out = String::with_capacity(8 * 1024);
    let _ = write!(
        out,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>FileMaster</title>
<style>{STYLE}</style>
</head>
<body>
<header>
<h1><a href="{home}">FileMaster</a></h1>
<form method="get" action="{base}/">
<input type="hidden" name="dir" value="{dir}">
<input type="text" name="search" placeholder="Search files..." value="{term}" required>
<button type="submit">Search</button>
</form>
</header>
<main>
"#,
        home = attr(&link(base, &[("dir", ".")])),
        base = attr(base),
        dir = attr(page.dir),
        term = attr(page.search.as_ref().map(|s| s.term.as_str()).unwrap_or("")),
    );

    if let Some(flash) = &page.flash {
        let class = match flash.kind {
            FlashKind::Success => "flash success",
            FlashKind::Error => "flash error",
            FlashKind::Info => "flash info",
        };
        let _ = writeln!(out, r#"<div class="{class}">{}</div>"#, text(&flash.message));
    }

    out.push_str("<nav class=\"crumbs\">");
    for (i, (name, path)) in breadcrumbs(page.dir).iter().enumerate() {
        if i > 0 {
            out.push_str("<span>/</span>");
        }
        let _ = write!(out, r#"<a href="{}">{}</a>"#, attr(&link(base, &[("dir", path)])), text(&readable(name)));
    }
    out.push_str("</nav>\n");

    if let Some(search) = &page.search {
        render_search(&mut out, base, search);
    }

    match &page.editor {
        Some(editor) => render_editor(&mut out, base, page.dir, editor),
        None => render_listing(&mut out, base, page.dir, &page.rows),
    }

    out.push_str("</main>\n</body>\n</html>\n");
    out
}

fn render_search(out: &mut String, base: &str, search: &SearchView) {
    out.push_str("<section class=\"search\"><h2>Search Results</h2>\n");
    if search.hits.is_empty() {
        out.push_str("<p class=\"muted-error\">No files found.</p>\n");
    } else {
        out.push_str("<ul>\n");
        for hit in &search.hits {
            let folder = parent_dir(hit);
            let _ = writeln!(
                out,
                r#"<li><a href="{}">{}</a> / <a href="{}">{}</a></li>"#,
                attr(&link(base, &[("dir", &folder)])),
                text(&readable(&folder)),
                attr(&link(base, &[("dir", &folder), ("view", hit)])),
                text(&readable(base_name(hit))),
            );
        }
        out.push_str("</ul>\n");
    }
    out.push_str("</section>\n");
}

fn render_editor(out: &mut String, base: &str, dir: &str, editor: &EditorView) {
    let _ = writeln!(out, "<h2>Edit File: {}</h2>", text(&readable(base_name(&editor.file))));
    match &editor.content {
        Err(message) => {
            let _ = writeln!(
                out,
                r#"<p class="muted-error">File cannot be opened: {}</p><a class="button grey" href="{}">Back</a>"#,
                text(message),
                attr(&link(base, &[("dir", dir)])),
            );
        }
        Ok(content) => {
            let _ = writeln!(
                out,
                r#"<form method="post" action="{base}/">
<input type="hidden" name="action" value="save_file">
<input type="hidden" name="dir" value="{dir}">
<input type="hidden" name="file" value="{file}">
<textarea name="content" rows="20">{content}</textarea>
<div class="row"><button type="submit">Save</button> <a class="button grey" href="{back}">Back</a></div>
</form>"#,
                base = attr(base),
                dir = attr(dir),
                file = attr(&editor.file),
                content = text(content),
                back = attr(&link(base, &[("dir", dir)])),
            );
        }
    }
}

fn render_listing(out: &mut String, base: &str, dir: &str, rows: &[Row]) {
    let _ = writeln!(out, "<h2>Directory: {}</h2>", text(&readable(dir)));
    out.push_str(
        "<table>\n<thead><tr><th>Name</th><th>Type</th><th>Size</th><th>Actions</th></tr></thead>\n<tbody>\n",
    );
    if dir != "." {
        let _ = writeln!(
            out,
            r#"<tr><td colspan="4"><a href="{}">&larr; Parent Directory</a></td></tr>"#,
            attr(&link(base, &[("dir", &parent_dir(dir))])),
        );
    }
    for row in rows {
        render_row(out, base, dir, row);
    }
    out.push_str("</tbody>\n</table>\n");
    render_forms(out, base, dir);
}

fn render_row(out: &mut String, base: &str, dir: &str, row: &Row) {
    let e = &row.entry;
    out.push_str("<tr>\n<td>");
    let icon = if e.is_dir { "&#128193;" } else { "&#128196;" };
    if !e.reachable {
        let _ = write!(out, r#"<span class="icon">{icon}</span> <span class="muted-error">{}</span>"#, text(&e.name));
    } else if e.is_dir {
        let _ = write!(
            out,
            r#"<span class="icon">{icon}</span> <a href="{}">{}</a>"#,
            attr(&link(base, &[("dir", &e.display)])),
            text(&e.name),
        );
    } else {
        let _ = write!(
            out,
            r#"<span class="icon">{icon}</span> <a href="{}">{}</a>"#,
            attr(&link(base, &[("dir", dir), ("view", &e.display)])),
            text(&e.name),
        );
        if let Some(preview) = &row.preview {
            let _ = write!(out, r#"<details class="preview"><summary>Preview</summary><pre>{}</pre></details>"#, text(preview));
        }
    }
    let (kind, size, delete_action, confirm) = if e.is_dir {
        ("Folder", "-".to_string(), "delete_dir", "Delete folder (if empty)?")
    } else {
        ("File", size_formatted(e.size), "delete_file", "Delete file?")
    };
    let _ = writeln!(
        out,
        r#"</td>
<td>{kind}</td>
<td>{size}</td>
<td>
<form method="post" action="{base}/" class="inline" onsubmit="return confirm('{confirm}')">
<input type="hidden" name="action" value="{delete_action}">
<input type="hidden" name="dir" value="{dir}">
<input type="hidden" name="target" value="{path}">
<button type="submit" class="red">Delete</button>
</form>
<details class="inline"><summary class="button yellow">Rename</summary>
<form method="post" action="{base}/">
<input type="hidden" name="action" value="rename">
<input type="hidden" name="dir" value="{dir}">
<input type="hidden" name="old" value="{path}">
<input type="text" name="new" value="{name}" required>
<button type="submit">Save</button>
</form>
</details>
</td>
</tr>"#,
        base = attr(base),
        dir = attr(dir),
        path = attr(&e.display),
        name = attr(&e.name),
    );
}

fn render_forms(out: &mut String, base: &str, dir: &str) {
    let _ = writeln!(
        out,
        r#"<div class="grid">
<div class="card"><h3>Create New File</h3>
<form method="post" action="{base}/">
<input type="hidden" name="action" value="create_file">
<input type="hidden" name="dir" value="{dir}">
<label>File Name:</label><input type="text" name="filename" required>
<label>Content:</label><textarea name="content" rows="5"></textarea>
<button type="submit">Create</button>
</form></div>
<div class="card"><h3>Create New Folder</h3>
<form method="post" action="{base}/">
<input type="hidden" name="action" value="create_dir">
<input type="hidden" name="dir" value="{dir}">
<label>Folder Name:</label><input type="text" name="dirname" required>
<button type="submit">Create</button>
</form></div>
<div class="card"><h3>Fetch Remote File</h3>
<form method="post" action="{base}/">
<input type="hidden" name="action" value="fetch_remote">
<input type="hidden" name="dir" value="{dir}">
<label>URL:</label><input type="url" name="url" placeholder="https://example.com/file.txt" required>
<button type="submit">Fetch</button>
</form></div>
<div class="card"><h3>Upload File</h3>
<form method="post" action="{upload}" enctype="multipart/form-data">
<input type="file" name="upload" required>
<button type="submit">Upload</button>
</form></div>
</div>"#,
        base = attr(base),
        dir = attr(dir),
        upload = attr(&format!("{base}/upload?dir={}", encode(dir))),
    );
}

const STYLE: &str = "
body { font-family: system-ui, sans-serif; margin: 0; background: #f3f4f6; color: #111827; }
header { background: #1f2937; padding: 1rem; display: flex; justify-content: space-between; align-items: center; }
header h1 a { color: #fff; text-decoration: none; font-size: 1.25rem; }
main { max-width: 1100px; margin: 0 auto; padding: 1.5rem; }
a { color: #2563eb; }
table { width: 100%; border-collapse: collapse; background: #fff; }
th, td { padding: .6rem; text-align: left; border-bottom: 1px solid #e5e7eb; vertical-align: top; }
.flash { padding: 1rem; margin-bottom: 1rem; color: #fff; border-radius: 6px; }
.success { background: #16a34a; } .error { background: #dc2626; } .info { background: #2563eb; }
.crumbs { margin-bottom: 1rem; } .crumbs span { margin: 0 .4rem; color: #6b7280; }
.muted-error { color: #dc2626; }
.grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(320px, 1fr)); gap: 1.5rem; margin-top: 1.5rem; }
.card { background: #fff; padding: 1.25rem; border-radius: 6px; }
label { display: block; margin: .5rem 0 .25rem; }
input[type=text], input[type=url], textarea { width: 100%; box-sizing: border-box; padding: .4rem; font-family: inherit; }
textarea { font-family: ui-monospace, monospace; }
button, .button { padding: .4rem .8rem; border: 0; border-radius: 6px; background: #2563eb; color: #fff; cursor: pointer; text-decoration: none; }
.red { background: #dc2626; } .yellow { background: #ca8a04; } .grey { background: #4b5563; }
.inline { display: inline-block; }
.preview pre { max-height: 200px; overflow-y: auto; background: #e5e7eb; padding: .5rem; white-space: pre-wrap; }
";
