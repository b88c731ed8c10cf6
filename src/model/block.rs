//! The recursive block tree, Notion's native content representation.

use crate::types::{BlockId, NotionId, RichTextSpan};
use serde::{Deserialize, Serialize};

/// One node of the block tree: a discriminated payload plus any children
/// fetched for it. `children` is populated by
/// `get_block_children_recursive`; a block with `has_children == true` but
/// an empty `children` vec simply hasn't been expanded yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub has_children: bool,
    pub children: Vec<Block>,
    pub payload: BlockPayload,
}

impl Block {
    pub fn kind_name(&self) -> &'static str {
        self.payload.kind_name()
    }
}

/// Per-kind block payload. Every discriminator tag named in the block
/// converter's rendering table (spec §4.4) has a variant here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BlockPayload {
    Paragraph(TextBlock),
    Heading1(TextBlock),
    Heading2(TextBlock),
    Heading3(TextBlock),
    BulletedListItem(TextBlock),
    NumberedListItem(TextBlock),
    ToDo(ToDoBlock),
    Toggle(TextBlock),
    Code(CodeBlock),
    Quote(TextBlock),
    Callout(CalloutBlock),
    Divider,
    Image(MediaBlock),
    Video(MediaBlock),
    File(MediaBlock),
    Pdf(MediaBlock),
    Bookmark(LinkBlock),
    Embed(LinkBlock),
    LinkPreview(LinkBlock),
    Equation(EquationBlock),
    Table(TableBlock),
    TableRow(TableRowBlock),
    ChildPage(ChildRefBlock),
    ChildDatabase(ChildRefBlock),
    ColumnList,
    Column,
    SyncedBlock(SyncedBlockPayload),
    TableOfContents,
    Breadcrumb,
    /// A block type this client doesn't model explicitly yet; preserved so
    /// an extraction doesn't fail outright on an unrecognized Notion type.
    Unsupported(String),
}

impl BlockPayload {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Paragraph(_) => "paragraph",
            Self::Heading1(_) => "heading_1",
            Self::Heading2(_) => "heading_2",
            Self::Heading3(_) => "heading_3",
            Self::BulletedListItem(_) => "bulleted_list_item",
            Self::NumberedListItem(_) => "numbered_list_item",
            Self::ToDo(_) => "to_do",
            Self::Toggle(_) => "toggle",
            Self::Code(_) => "code",
            Self::Quote(_) => "quote",
            Self::Callout(_) => "callout",
            Self::Divider => "divider",
            Self::Image(_) => "image",
            Self::Video(_) => "video",
            Self::File(_) => "file",
            Self::Pdf(_) => "pdf",
            Self::Bookmark(_) => "bookmark",
            Self::Embed(_) => "embed",
            Self::LinkPreview(_) => "link_preview",
            Self::Equation(_) => "equation",
            Self::Table(_) => "table",
            Self::TableRow(_) => "table_row",
            Self::ChildPage(_) => "child_page",
            Self::ChildDatabase(_) => "child_database",
            Self::ColumnList => "column_list",
            Self::Column => "column",
            Self::SyncedBlock(_) => "synced_block",
            Self::TableOfContents => "table_of_contents",
            Self::Breadcrumb => "breadcrumb",
            Self::Unsupported(_) => "unsupported",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TextBlock {
    pub rich_text: Vec<RichTextSpan>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToDoBlock {
    pub rich_text: Vec<RichTextSpan>,
    pub checked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub rich_text: Vec<RichTextSpan>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalloutBlock {
    pub rich_text: Vec<RichTextSpan>,
    /// Emoji icon, when set; file/external icons are not modeled for callouts.
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaBlock {
    pub url: String,
    pub caption: Vec<RichTextSpan>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkBlock {
    pub url: String,
    pub caption: Vec<RichTextSpan>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquationBlock {
    pub expression: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableBlock {
    pub table_width: u32,
    pub has_column_header: bool,
    pub has_row_header: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRowBlock {
    pub cells: Vec<Vec<RichTextSpan>>,
}

/// `child_page` / `child_database` payload: the rendered title plus the
/// referenced object's own Notion ID, resolved to a local node link by the
/// markdown converter via the id mapper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildRefBlock {
    pub title: String,
    pub notion_id: NotionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncedBlockPayload {
    pub original_block_id: Option<NotionId>,
}
