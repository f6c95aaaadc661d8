//! Plain-text rendering of folders, favorites, and tasks

use favorites::{Favorite, FolderRow, SearchHit, Task};

const INDENT: &str = "  ";
const PROGRESS_WIDTH: usize = 20;

/// One line per visible folder, indented by depth
pub fn folder_rows(rows: &[FolderRow]) -> Vec<String> {
    rows.iter()
        .map(|row| {
            format!(
                "{}{} {} [{}]",
                INDENT.repeat(row.depth),
                row.icon.glyph(),
                row.name,
                row.id
            )
        })
        .collect()
}

/// Title, URL, tags, and (possibly truncated) summary of a favorite
pub fn favorite(favorite: &Favorite, summary: Option<&str>) -> String {
    let mut out = format!("{} [{}]\n{}{}", favorite.display_title(), favorite.id, INDENT, favorite.url);
    if !favorite.tags.is_empty() {
        let tags: Vec<String> = favorite.tags.iter().map(|t| format!("#{}", t.name)).collect();
        out.push_str(&format!("\n{}{}", INDENT, tags.join(" ")));
    }
    if let Some(summary) = summary {
        out.push_str(&format!("\n{}{}", INDENT, summary));
    }
    if let Some(created) = favorite.created_at {
        out.push_str(&format!("\n{}saved {}", INDENT, created.format("%Y-%m-%d")));
    }
    out
}

pub fn progress_bar(progress: u8) -> String {
    let filled = usize::from(progress.min(100)) * PROGRESS_WIDTH / 100;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        "-".repeat(PROGRESS_WIDTH - filled),
        progress
    )
}

pub fn task(task: &Task) -> String {
    format!(
        "{:<8} {} {} ({})",
        task.status.as_str(),
        progress_bar(task.progress),
        task.name,
        task.id
    )
}

pub fn search_hit(hit: &SearchHit) -> String {
    let title = hit.title.as_deref().unwrap_or(&hit.url);
    match hit.distance {
        Some(distance) => format!("{:.3}  {}\n{}{}", distance, title, INDENT, hit.url),
        None => format!("{}\n{}{}", title, INDENT, hit.url),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use favorites::{FolderIcon, FolderId, Tag, TaskStatus};

    #[test]
    fn test_folder_rows_indent() {
        let rows = vec![
            FolderRow {
                id: FolderId(1),
                name: "Favorites".to_string(),
                depth: 0,
                icon: FolderIcon::Expanded,
            },
            FolderRow {
                id: FolderId(2),
                name: "Work".to_string(),
                depth: 1,
                icon: FolderIcon::Leaf,
            },
        ];
        let lines = folder_rows(&rows);
        assert_eq!(lines[0], "📂 Favorites [1]");
        assert_eq!(lines[1], "  📄 Work [2]");
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0), format!("[{}]   0%", "-".repeat(20)));
        assert_eq!(progress_bar(50), format!("[{}{}]  50%", "#".repeat(10), "-".repeat(10)));
        assert_eq!(progress_bar(100), format!("[{}] 100%", "#".repeat(20)));
    }

    #[test]
    fn test_favorite_falls_back_to_url() {
        let fav = Favorite::new(7, "https://example.com", None).with_tags(vec![Tag {
            id: 1,
            name: "docs".to_string(),
        }]);
        let text = favorite(&fav, Some("Short"));
        assert_eq!(text, "https://example.com [7]\n  https://example.com\n  #docs\n  Short");
    }

    #[test]
    fn test_task_line() {
        let line = task(&Task::new("t1", "Summarize", TaskStatus::Running, 25));
        assert!(line.starts_with("running "));
        assert!(line.ends_with("Summarize (t1)"));
    }
}
