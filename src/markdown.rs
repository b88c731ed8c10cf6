//! Recursive block-to-markdown renderer (spec §4.4).

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::assets::AssetDownloader;
use crate::mapper::IdMapper;
use crate::model::{Block, BlockPayload};
use crate::types::{NodeId, RichTextSpan};

/// Tracks consecutive list context so list items get correct blank-line
/// framing and numbered items get the right counter.
#[derive(Debug, Default, Clone, Copy)]
struct ListState {
    in_bulleted: bool,
    in_numbered: bool,
    numbered_count: u32,
}

/// Binds the renderer to the node being materialized so media/icons can be
/// downloaded and child-page/database references resolved to local ids.
pub struct MarkdownRenderer<'a> {
    cancel: &'a CancellationToken,
    downloader: Option<Arc<AssetDownloader>>,
    owning_node_id: NodeId,
    mapper: Option<&'a IdMapper>,
}

impl<'a> MarkdownRenderer<'a> {
    pub fn new(
        cancel: &'a CancellationToken,
        downloader: Option<Arc<AssetDownloader>>,
        owning_node_id: NodeId,
        mapper: Option<&'a IdMapper>,
    ) -> Self {
        Self {
            cancel,
            downloader,
            owning_node_id,
            mapper,
        }
    }

    pub async fn render_blocks(&self, blocks: &[Block]) -> String {
        let mut out = String::new();
        let mut state = ListState::default();
        for block in blocks {
            self.render_block(block, 0, &mut state, &mut out).await;
        }
        out
    }

    async fn render_block(&self, block: &Block, depth: u32, state: &mut ListState, out: &mut String) {
        let indent = "  ".repeat(depth as usize);

        match &block.payload {
            BlockPayload::Paragraph(tb) => {
                reset_list_state(state);
                let text = render_rich_text(&tb.rich_text);
                if text.is_empty() {
                    out.push('\n');
                } else {
                    out.push_str(&text);
                    out.push_str("\n\n");
                }
            }
            BlockPayload::Heading1(tb) => {
                reset_list_state(state);
                out.push_str("# ");
                out.push_str(&render_rich_text(&tb.rich_text));
                out.push_str("\n\n");
            }
            BlockPayload::Heading2(tb) => {
                reset_list_state(state);
                out.push_str("## ");
                out.push_str(&render_rich_text(&tb.rich_text));
                out.push_str("\n\n");
            }
            BlockPayload::Heading3(tb) => {
                reset_list_state(state);
                out.push_str("### ");
                out.push_str(&render_rich_text(&tb.rich_text));
                out.push_str("\n\n");
            }
            BlockPayload::BulletedListItem(tb) => {
                if !state.in_bulleted {
                    out.push('\n');
                }
                state.in_bulleted = true;
                state.in_numbered = false;
                out.push_str(&indent);
                out.push_str("- ");
                out.push_str(&render_rich_text(&tb.rich_text));
                out.push('\n');
            }
            BlockPayload::NumberedListItem(tb) => {
                if !state.in_numbered {
                    out.push('\n');
                    state.numbered_count = 0;
                }
                state.in_numbered = true;
                state.in_bulleted = false;
                state.numbered_count += 1;
                out.push_str(&indent);
                out.push_str(&format!("{}. ", state.numbered_count));
                out.push_str(&render_rich_text(&tb.rich_text));
                out.push('\n');
            }
            BlockPayload::ToDo(td) => {
                reset_list_state(state);
                out.push_str(&indent);
                out.push_str(if td.checked { "- [x] " } else { "- [ ] " });
                out.push_str(&render_rich_text(&td.rich_text));
                out.push('\n');
            }
            BlockPayload::Toggle(tb) => {
                reset_list_state(state);
                out.push_str("<details><summary>");
                out.push_str(&render_rich_text(&tb.rich_text));
                out.push_str("</summary>\n\n");
                if block.has_children {
                    let rendered = Box::pin(self.render_children(&block.children)).await;
                    out.push_str(&rendered);
                }
                out.push_str("\n</details>\n\n");
            }
            BlockPayload::Code(code) => {
                reset_list_state(state);
                let language = code.language.as_deref().filter(|l| *l != "plain text").unwrap_or("");
                out.push_str("```");
                out.push_str(language);
                out.push('\n');
                for span in &code.rich_text {
                    out.push_str(&span.plain_text);
                }
                out.push_str("\n```\n\n");
            }
            BlockPayload::Quote(tb) => {
                reset_list_state(state);
                for line in render_rich_text(&tb.rich_text).lines() {
                    out.push_str("> ");
                    out.push_str(line);
                    out.push('\n');
                }
                out.push('\n');
            }
            BlockPayload::Callout(callout) => {
                reset_list_state(state);
                out.push_str("> ");
                if let Some(icon) = &callout.icon {
                    out.push_str(icon);
                    out.push(' ');
                }
                out.push_str(&render_rich_text(&callout.rich_text));
                out.push_str("\n\n");
            }
            BlockPayload::Divider => {
                reset_list_state(state);
                out.push_str("---\n\n");
            }
            BlockPayload::Image(media) => {
                reset_list_state(state);
                let url = self.resolve_media_url(&media.url).await;
                let caption = render_rich_text(&media.caption);
                let caption = if caption.is_empty() { "image".to_string() } else { caption };
                out.push_str(&format!("![{}]({})\n\n", caption, url));
            }
            BlockPayload::Video(media) => {
                reset_list_state(state);
                let url = self.resolve_media_url(&media.url).await;
                out.push_str(&format!("[Video]({})\n\n", url));
            }
            BlockPayload::File(media) | BlockPayload::Pdf(media) => {
                reset_list_state(state);
                let url = self.resolve_media_url(&media.url).await;
                out.push_str(&format!("[File]({})\n\n", url));
            }
            BlockPayload::Bookmark(link) | BlockPayload::Embed(link) | BlockPayload::LinkPreview(link) => {
                reset_list_state(state);
                let caption = render_rich_text(&link.caption);
                let caption = if caption.is_empty() { link.url.clone() } else { caption };
                out.push_str(&format!("[{}]({})\n\n", caption, link.url));
            }
            BlockPayload::Equation(eq) => {
                reset_list_state(state);
                out.push_str(&format!("$$ {} $$\n\n", eq.expression));
            }
            BlockPayload::Table(_) => {
                reset_list_state(state);
                out.push_str(&self.render_table(block).await);
            }
            BlockPayload::TableRow(_) => {
                // Rendered directly by render_table; standalone encounters are a no-op.
            }
            BlockPayload::ChildPage(cp) => {
                reset_list_state(state);
                out.push_str(&self.render_child_ref(cp, "📄"));
            }
            BlockPayload::ChildDatabase(cd) => {
                reset_list_state(state);
                out.push_str(&self.render_child_ref(cd, "🗃️"));
            }
            BlockPayload::TableOfContents => {
                reset_list_state(state);
                out.push_str("[TOC]\n\n");
            }
            BlockPayload::Breadcrumb
            | BlockPayload::ColumnList
            | BlockPayload::Column
            | BlockPayload::SyncedBlock(_)
            | BlockPayload::Unsupported(_) => {
                // No own markdown; children (if any) render below.
            }
        }

        let is_table = matches!(block.payload, BlockPayload::Table(_));
        if block.has_children && !is_table && !matches!(block.payload, BlockPayload::Toggle(_)) {
            let mut child_state = ListState::default();
            for child in &block.children {
                Box::pin(self.render_block(child, depth + 1, &mut child_state, out)).await;
            }
        }
    }

    async fn render_children(&self, blocks: &[Block]) -> String {
        let mut out = String::new();
        let mut state = ListState::default();
        for block in blocks {
            self.render_block(block, 0, &mut state, &mut out).await;
        }
        out
    }

    async fn render_table(&self, table: &Block) -> String {
        let has_header = matches!(&table.payload, BlockPayload::Table(t) if t.has_column_header);
        let mut out = String::new();
        for (i, row) in table.children.iter().enumerate() {
            let BlockPayload::TableRow(row_payload) = &row.payload else {
                continue;
            };
            let cells: Vec<String> = row_payload.cells.iter().map(|c| render_rich_text(c)).collect();
            out.push_str("| ");
            out.push_str(&cells.join(" | "));
            out.push_str(" |\n");
            if i == 0 && has_header {
                let separator = vec!["---"; cells.len()].join(" | ");
                out.push_str("| ");
                out.push_str(&separator);
                out.push_str(" |\n");
            }
        }
        out.push('\n');
        out
    }

    fn render_child_ref(&self, child: &crate::model::ChildRefBlock, emoji: &str) -> String {
        match self.mapper.and_then(|m| m.local_id_for(&child.notion_id)) {
            Some(local_id) => format!("{} [{}]({})\n\n", emoji, child.title, local_id),
            None => format!("{} {}\n\n", emoji, child.title),
        }
    }

    async fn resolve_media_url(&self, url: &str) -> String {
        match &self.downloader {
            Some(downloader) => downloader
                .process_media_block(self.cancel, self.owning_node_id, url)
                .await
                .unwrap_or_else(|_| url.to_string()),
            None => url.to_string(),
        }
    }
}

fn reset_list_state(state: &mut ListState) {
    state.in_bulleted = false;
    state.in_numbered = false;
    state.numbered_count = 0;
}

/// Renders a span sequence with annotations nested innermost→outermost as
/// code, bold, italic, strikethrough, underline, and a trailing `href` wrap.
pub fn render_rich_text(spans: &[RichTextSpan]) -> String {
    spans.iter().map(render_span).collect()
}

fn render_span(span: &RichTextSpan) -> String {
    let mut text = span.plain_text.clone();
    let a = &span.annotations;
    if a.code {
        text = format!("`{}`", text);
    }
    if a.bold {
        text = format!("**{}**", text);
    }
    if a.italic {
        text = format!("_{}_", text);
    }
    if a.strikethrough {
        text = format!("~~{}~~", text);
    }
    if a.underline {
        text = format!("<u>{}</u>", text);
    }
    if let Some(href) = &span.href {
        if !href.is_empty() {
            text = format!("[{}]({})", text, href);
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Annotations;

    #[test]
    fn renders_nested_annotations_in_fixed_order() {
        let span = RichTextSpan {
            plain_text: "hi".to_string(),
            href: None,
            annotations: Annotations {
                bold: true,
                italic: true,
                strikethrough: false,
                underline: false,
                code: true,
            },
        };
        assert_eq!(render_span(&span), "_**`hi`**_");
    }

    #[test]
    fn bold_italic_matches_documented_scenario() {
        let span = RichTextSpan {
            plain_text: "both".to_string(),
            href: None,
            annotations: Annotations {
                bold: true,
                italic: true,
                strikethrough: false,
                underline: false,
                code: false,
            },
        };
        assert_eq!(render_span(&span), "_**both**_");
    }

    #[test]
    fn wraps_href_around_fully_annotated_text() {
        let span = RichTextSpan {
            plain_text: "link".to_string(),
            href: Some("https://example.com".to_string()),
            annotations: Annotations::default(),
        };
        assert_eq!(render_span(&span), "[link](https://example.com)");
    }

    fn block(payload: BlockPayload) -> Block {
        Block {
            id: crate::types::BlockId::parse("550e8400e29b41d4a716446655440000").unwrap(),
            has_children: false,
            children: Vec::new(),
            payload,
        }
    }

    fn renderer(cancel: &CancellationToken) -> MarkdownRenderer<'_> {
        MarkdownRenderer::new(cancel, None, crate::types::NodeId::from_raw(1), None)
    }

    #[tokio::test]
    async fn single_paragraph_matches_documented_scenario() {
        let cancel = CancellationToken::new();
        let blocks = vec![block(BlockPayload::Paragraph(crate::model::TextBlock {
            rich_text: vec![RichTextSpan::plain("Hello World")],
        }))];
        let out = renderer(&cancel).render_blocks(&blocks).await;
        assert_eq!(out, "Hello World\n\n");
    }

    #[tokio::test]
    async fn checked_todo_matches_documented_scenario() {
        let cancel = CancellationToken::new();
        let blocks = vec![block(BlockPayload::ToDo(crate::model::ToDoBlock {
            rich_text: vec![RichTextSpan::plain("Checked")],
            checked: true,
        }))];
        let out = renderer(&cancel).render_blocks(&blocks).await;
        assert_eq!(out, "- [x] Checked\n");
    }

    #[tokio::test]
    async fn numbered_list_of_two_matches_documented_scenario() {
        let cancel = CancellationToken::new();
        let blocks = vec![
            block(BlockPayload::NumberedListItem(crate::model::TextBlock {
                rich_text: vec![RichTextSpan::plain("First")],
            })),
            block(BlockPayload::NumberedListItem(crate::model::TextBlock {
                rich_text: vec![RichTextSpan::plain("Second")],
            })),
        ];
        let out = renderer(&cancel).render_blocks(&blocks).await;
        assert_eq!(out, "\n1. First\n2. Second\n");
    }

    #[tokio::test]
    async fn switching_out_of_a_list_resets_numbering() {
        let cancel = CancellationToken::new();
        let blocks = vec![
            block(BlockPayload::NumberedListItem(crate::model::TextBlock {
                rich_text: vec![RichTextSpan::plain("First")],
            })),
            block(BlockPayload::Paragraph(crate::model::TextBlock {
                rich_text: vec![RichTextSpan::plain("Interrupt")],
            })),
            block(BlockPayload::NumberedListItem(crate::model::TextBlock {
                rich_text: vec![RichTextSpan::plain("Restarts")],
            })),
        ];
        let out = renderer(&cancel).render_blocks(&blocks).await;
        assert_eq!(out, "\n1. First\nInterrupt\n\n\n1. Restarts\n");
    }
}
