//! Integration coverage for the block-to-markdown converter across multiple
//! block kinds composed together, beyond the single-block unit scenarios
//! colocated in `src/markdown.rs`.

use notion_vault_extractor::{
    Block, BlockId, BlockPayload, CalloutBlock, CodeBlock, EquationBlock, MarkdownRenderer, NodeId,
    RichTextSpan, TableBlock, TableRowBlock, TextBlock, ToDoBlock,
};
use tokio_util::sync::CancellationToken;

fn leaf(payload: BlockPayload) -> Block {
    Block {
        id: BlockId::parse("550e8400e29b41d4a716446655440000").unwrap(),
        has_children: false,
        children: Vec::new(),
        payload,
    }
}

fn parent(payload: BlockPayload, children: Vec<Block>) -> Block {
    Block {
        id: BlockId::parse("660e8400e29b41d4a716446655440000").unwrap(),
        has_children: !children.is_empty(),
        children,
        payload,
    }
}

fn renderer(cancel: &CancellationToken) -> MarkdownRenderer<'_> {
    MarkdownRenderer::new(cancel, None, NodeId::from_raw(1), None)
}

#[tokio::test]
async fn renders_a_mixed_document_without_leaking_list_state_across_kinds() {
    let cancel = CancellationToken::new();
    let blocks = vec![
        leaf(BlockPayload::Heading1(TextBlock {
            rich_text: vec![RichTextSpan::plain("Title")],
        })),
        leaf(BlockPayload::Paragraph(TextBlock {
            rich_text: vec![RichTextSpan::plain("Intro paragraph.")],
        })),
        leaf(BlockPayload::BulletedListItem(TextBlock {
            rich_text: vec![RichTextSpan::plain("One")],
        })),
        leaf(BlockPayload::BulletedListItem(TextBlock {
            rich_text: vec![RichTextSpan::plain("Two")],
        })),
        leaf(BlockPayload::Divider),
        leaf(BlockPayload::ToDo(ToDoBlock {
            rich_text: vec![RichTextSpan::plain("Ship it")],
            checked: false,
        })),
    ];

    let out = renderer(&cancel).render_blocks(&blocks).await;

    assert_eq!(
        out,
        "# Title\n\n\
         Intro paragraph.\n\n\
         \n- One\n- Two\n\
         ---\n\n\
         - [ ] Ship it\n"
    );
}

#[tokio::test]
async fn code_block_suppresses_plain_text_language() {
    let cancel = CancellationToken::new();
    let blocks = vec![leaf(BlockPayload::Code(CodeBlock {
        rich_text: vec![RichTextSpan::plain("let x = 1;")],
        language: Some("plain text".to_string()),
    }))];

    let out = renderer(&cancel).render_blocks(&blocks).await;
    assert_eq!(out, "```\nlet x = 1;\n```\n\n");
}

#[tokio::test]
async fn toggle_renders_children_inside_details_summary() {
    let cancel = CancellationToken::new();
    let child = leaf(BlockPayload::Paragraph(TextBlock {
        rich_text: vec![RichTextSpan::plain("Hidden content")],
    }));
    let toggle = parent(
        BlockPayload::Toggle(TextBlock {
            rich_text: vec![RichTextSpan::plain("Click to expand")],
        }),
        vec![child],
    );

    let out = renderer(&cancel).render_blocks(&[toggle]).await;
    assert!(out.starts_with("<details><summary>Click to expand</summary>\n\n"));
    assert!(out.contains("Hidden content"));
    assert!(out.trim_end().ends_with("</details>"));
}

#[tokio::test]
async fn table_with_column_header_emits_a_separator_row() {
    let cancel = CancellationToken::new();
    let header_row = leaf(BlockPayload::TableRow(TableRowBlock {
        cells: vec![vec![RichTextSpan::plain("Name")], vec![RichTextSpan::plain("Status")]],
    }));
    let data_row = leaf(BlockPayload::TableRow(TableRowBlock {
        cells: vec![vec![RichTextSpan::plain("Alpha")], vec![RichTextSpan::plain("Done")]],
    }));
    let table = parent(
        BlockPayload::Table(TableBlock {
            table_width: 2,
            has_column_header: true,
            has_row_header: false,
        }),
        vec![header_row, data_row],
    );

    let out = renderer(&cancel).render_blocks(&[table]).await;
    assert_eq!(out, "| Name | Status |\n| --- | --- |\n| Alpha | Done |\n\n");
}

#[tokio::test]
async fn callout_prefixes_with_blockquote_and_icon() {
    let cancel = CancellationToken::new();
    let blocks = vec![leaf(BlockPayload::Callout(CalloutBlock {
        rich_text: vec![RichTextSpan::plain("Heads up")],
        icon: Some("💡".to_string()),
    }))];

    let out = renderer(&cancel).render_blocks(&blocks).await;
    assert_eq!(out, "> 💡 Heads up\n\n");
}

#[tokio::test]
async fn equation_renders_as_a_display_block() {
    let cancel = CancellationToken::new();
    let blocks = vec![leaf(BlockPayload::Equation(EquationBlock {
        expression: "E = mc^2".to_string(),
    }))];

    let out = renderer(&cancel).render_blocks(&blocks).await;
    assert_eq!(out, "$$ E = mc^2 $$\n\n");
}
