//! Serializers for the three output formats, plus export file handling.
//!
//! Every serializer walks the records in the order the aggregator produced
//! them; none of them re-sorts threads or messages.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{ExportFormat, ThreadRecord};

pub const TABULAR_HEADERS: [&str; 7] = [
    "Thread",
    "Thread Created",
    "Author",
    "Message Time",
    "Content",
    "Attachments",
    "Link",
];

const THREAD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";
const MESSAGE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const BANNER_WIDTH: usize = 60;

fn thread_time(t: &DateTime<Utc>) -> String {
    t.format(THREAD_TIME_FORMAT).to_string()
}

fn message_time(t: &DateTime<Utc>) -> String {
    t.format(MESSAGE_TIME_FORMAT).to_string()
}

/// File stem for a job's output, e.g. `chanlog_20240101_120000_1a2b3c4d`.
pub fn export_file_stem(task_id: Uuid, now: DateTime<Utc>) -> String {
    let short = &task_id.simple().to_string()[..8];
    format!("chanlog_{}_{short}", now.format("%Y%m%d_%H%M%S"))
}

/// Render records in the requested format.
pub fn render(
    format: ExportFormat,
    records: &[ThreadRecord],
    total_messages: usize,
) -> Result<Vec<u8>, AppError> {
    match format {
        ExportFormat::Tabular => render_tabular(records),
        ExportFormat::Text => Ok(render_text(records, total_messages).into_bytes()),
        ExportFormat::Markup => Ok(render_markup(records, total_messages).into_bytes()),
    }
}

/// Render and write the export into `dir`, returning the written path.
pub fn write_export(
    dir: &Path,
    file_stem: &str,
    format: ExportFormat,
    records: &[ThreadRecord],
    total_messages: usize,
) -> Result<PathBuf, AppError> {
    let bytes = render(format, records, total_messages)?;
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{file_stem}.{}", format.extension()));
    std::fs::write(&path, bytes)?;
    Ok(path)
}

/// Header row, then one row per message.
pub fn render_tabular(records: &[ThreadRecord]) -> Result<Vec<u8>, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(TABULAR_HEADERS)
        .map_err(|e| AppError::ExportError(e.to_string()))?;

    for thread in records {
        let created = thread_time(&thread.created_at);
        for message in &thread.messages {
            let at = message_time(&message.occurred_at);
            writer
                .write_record([
                    thread.title.as_str(),
                    created.as_str(),
                    message.author.as_str(),
                    at.as_str(),
                    message.content.as_str(),
                    message.attachments.as_str(),
                    message.permalink.as_str(),
                ])
                .map_err(|e| AppError::ExportError(e.to_string()))?;
        }
    }

    writer
        .into_inner()
        .map_err(|e| AppError::ExportError(e.to_string()))
}

/// One banner per thread, then one block per message.
pub fn render_text(records: &[ThreadRecord], total_messages: usize) -> String {
    let rule = "=".repeat(BANNER_WIDTH);
    let mut out = String::new();

    for thread in records {
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "Thread: {}", thread.title);
        let _ = writeln!(out, "Created: {}", thread_time(&thread.created_at));
        let _ = writeln!(out, "{rule}\n");

        for message in &thread.messages {
            let _ = writeln!(
                out,
                "[{}] {}:",
                message_time(&message.occurred_at),
                message.author
            );
            let _ = writeln!(out, "{}", message.content);
            if !message.attachments.is_empty() {
                let _ = writeln!(out, "Attachments: {}", message.attachments);
            }
            let _ = writeln!(out, "Link: {}\n", message.permalink);
        }
        out.push('\n');
    }

    let _ = writeln!(
        out,
        "{} threads, {total_messages} messages",
        records.len()
    );
    out
}

/// HTML document: a `<section>` per thread, an `<article>` per message.
pub fn render_markup(records: &[ThreadRecord], total_messages: usize) -> String {
    let mut out = String::from(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Channel export</title>\n\
         <style>\n\
         body { font-family: sans-serif; background: #36393f; color: #dcddde; padding: 20px; }\n\
         section { background: #2f3136; margin: 20px 0; border-radius: 8px; }\n\
         section > h2 { background: #5865f2; color: #fff; margin: 0; padding: 12px; font-size: 18px; }\n\
         article { padding: 10px 15px; border-bottom: 1px solid #40444b; }\n\
         .author { color: #7289da; font-weight: bold; }\n\
         .time { color: #72767d; font-size: 12px; margin-left: 10px; }\n\
         .content { white-space: pre-wrap; margin-top: 5px; }\n\
         .attachments, .link { font-size: 12px; margin-top: 5px; white-space: pre-wrap; }\n\
         a { color: #00aff4; }\n\
         </style>\n</head>\n<body>\n",
    );

    let _ = writeln!(
        out,
        "<header>{} threads, {total_messages} messages</header>",
        records.len()
    );

    for thread in records {
        out.push_str("<section class=\"thread\">\n");
        let _ = writeln!(
            out,
            "<h2>{} <small>({})</small></h2>",
            escape_html(&thread.title),
            thread_time(&thread.created_at)
        );

        for message in &thread.messages {
            out.push_str("<article class=\"message\">\n");
            let _ = writeln!(
                out,
                "<span class=\"author\">{}</span><span class=\"time\">{}</span>",
                escape_html(&message.author),
                message_time(&message.occurred_at)
            );
            let _ = writeln!(
                out,
                "<div class=\"content\">{}</div>",
                escape_html(&message.content)
            );
            if !message.attachments.is_empty() {
                let _ = writeln!(
                    out,
                    "<div class=\"attachments\">Attachments: {}</div>",
                    escape_html(&message.attachments)
                );
            }
            let _ = writeln!(
                out,
                "<div class=\"link\"><a href=\"{}\" target=\"_blank\">View original message</a></div>",
                escape_html(&message.permalink)
            );
            out.push_str("</article>\n");
        }

        out.push_str("</section>\n");
    }

    out.push_str("</body>\n</html>\n");
    out
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Resolve a download request to a file inside `dir`.
///
/// Only plain file names are accepted; anything that could walk out of the
/// export directory is reported as not found.
pub fn resolve_download(dir: &Path, name: &str) -> Result<PathBuf, AppError> {
    let plain = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.contains("..");
    if !plain {
        return Err(AppError::NotFound(name.to_string()));
    }

    let path = dir.join(name);
    if path.is_file() {
        Ok(path)
    } else {
        Err(AppError::NotFound(name.to_string()))
    }
}
