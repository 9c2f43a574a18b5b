// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! HTML pages.
//!
//! Every page embeds a [`PageContext`] as `page`; `header.html` reads the
//! application name, the signed-in user and the pending flashes from it.

use askama::Template;

use crate::notes::{MatchType, SearchResult, TreeRow};
use crate::security::Flash;
use crate::utils::format_size;

/// Fields shared by every page.
#[derive(Debug, Clone)]
pub struct PageContext {
    pub app_name: String,
    pub app_description: String,
    pub flashes: Vec<Flash>,
    pub user: Option<String>,
}

/// Percent-encode each segment of a relative note path for use in a URL.
pub fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// One row of the file tree as shown on the index page.
#[derive(Debug, Clone)]
pub struct TreeLink {
    pub indent: usize,
    pub name: String,
    pub href: String,
    pub is_dir: bool,
    pub size: String,
}

impl From<TreeRow> for TreeLink {
    fn from(row: TreeRow) -> Self {
        Self {
            indent: row.depth * 20,
            href: encode_path(&row.path),
            size: if row.is_dir { String::new() } else { format_size(row.size) },
            name: row.name,
            is_dir: row.is_dir,
        }
    }
}

/// A search hit with its link precomputed.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub name: String,
    pub path: String,
    pub href: String,
    pub is_content: bool,
    pub context: String,
    pub line: usize,
}

impl From<SearchResult> for SearchHit {
    fn from(result: SearchResult) -> Self {
        let (context, line) = match result.context {
            Some(ctx) => (ctx.text, ctx.line),
            None => (String::new(), 0),
        };
        Self {
            href: encode_path(&result.path),
            is_content: result.match_type == MatchType::Content,
            name: result.name,
            path: result.path,
            context,
            line,
        }
    }
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginPage {
    pub page: PageContext,
    pub username: String,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexPage {
    pub page: PageContext,
    pub rows: Vec<TreeLink>,
}

#[derive(Template)]
#[template(path = "viewer.html")]
pub struct ViewerPage {
    pub page: PageContext,
    pub name: String,
    pub path: String,
    pub href: String,
    /// Rendered Markdown; when `None`, `content` is shown as plain text.
    pub html: Option<String>,
    pub content: String,
}

#[derive(Template)]
#[template(path = "edit.html")]
pub struct EditPage {
    pub page: PageContext,
    /// Empty for a new note.
    pub path: String,
    pub href: String,
    pub filename: String,
    pub directory: String,
    pub content: String,
}

#[derive(Template)]
#[template(path = "search.html")]
pub struct SearchPage {
    pub page: PageContext,
    pub query: String,
    pub results: Vec<SearchHit>,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorPage {
    pub app_name: String,
    pub reference: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notes::MatchContext;

    fn page() -> PageContext {
        PageContext {
            app_name: "Notes".to_string(),
            app_description: "Test".to_string(),
            flashes: vec![Flash::success("File saved successfully")],
            user: Some("admin".to_string()),
        }
    }

    #[test]
    fn test_encode_path() {
        assert_eq!(encode_path("notes/a.md"), "notes/a.md");
        assert_eq!(encode_path("my notes/a b.md"), "my%20notes/a%20b.md");
    }

    #[test]
    fn test_header_shows_flashes_and_user() {
        let html = IndexPage { page: page(), rows: Vec::new() }.render().unwrap();
        assert!(html.contains("File saved successfully"));
        assert!(html.contains("admin"));
        assert!(html.contains("<title>Notes</title>"));
    }

    #[test]
    fn test_viewer_escapes_plain_text() {
        let html = ViewerPage {
            page: page(),
            name: "a.txt".to_string(),
            path: "a.txt".to_string(),
            href: "a.txt".to_string(),
            html: None,
            content: "<script>alert(1)</script>".to_string(),
        }
        .render()
        .unwrap();
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>alert"));
    }

    #[test]
    fn test_viewer_keeps_rendered_markdown() {
        let html = ViewerPage {
            page: page(),
            name: "a.md".to_string(),
            path: "a.md".to_string(),
            href: "a.md".to_string(),
            html: Some("<h1>Title</h1>".to_string()),
            content: "# Title".to_string(),
        }
        .render()
        .unwrap();
        assert!(html.contains("<h1>Title</h1>"));
    }

    #[test]
    fn test_search_hit_from_result() {
        let hit = SearchHit::from(SearchResult {
            path: "notes/a b.md".to_string(),
            name: "a b.md".to_string(),
            match_type: MatchType::Content,
            context: Some(MatchContext { text: "x\nneedle\ny".to_string(), line: 4 }),
        });
        assert!(hit.is_content);
        assert_eq!(hit.href, "notes/a%20b.md");
        assert_eq!(hit.line, 4);
    }

    #[test]
    fn test_tree_link_indent() {
        let link = TreeLink::from(TreeRow {
            depth: 2,
            name: "a.md".to_string(),
            path: "x/y/a.md".to_string(),
            is_dir: false,
            size: 2048,
        });
        assert_eq!(link.indent, 40);
        assert_eq!(link.size, "2.0 KB");
    }
}
