//! Converts Notion's raw JSON response bodies into wire types and, for
//! blocks, directly into the recursive `Block` tree.

use crate::error::{AppError, NotionErrorCode};
use crate::model::*;
use crate::types::{Annotations, BlockId, NotionId, RichTextSpan};
use serde_json::Value;

use super::types::*;

/// Parses a Notion API response body, returning a typed error for non-2xx
/// status codes (spec §4.1: structured `{status, code, message}` error, or a
/// generic wrapper on parse failure).
pub fn parse_response<T>(status: u16, body: &str) -> Result<T, AppError>
where
    T: serde::de::DeserializeOwned,
{
    if (200..300).contains(&status) {
        serde_json::from_str(body).map_err(AppError::from)
    } else {
        match serde_json::from_str::<RawApiError>(body) {
            Ok(err) => Err(AppError::ApiError {
                status,
                code: NotionErrorCode::from_api_response(&err.code),
                message: err.message,
            }),
            Err(_) => Err(AppError::ApiError {
                status,
                code: NotionErrorCode::from_http_status(status),
                message: body.to_string(),
            }),
        }
    }
}

pub fn rich_text_spans(spans: &[RawRichText]) -> Vec<RichTextSpan> {
    spans
        .iter()
        .map(|s| RichTextSpan {
            plain_text: s.plain_text.clone(),
            href: s.href.clone(),
            annotations: Annotations {
                bold: s.annotations.bold,
                italic: s.annotations.italic,
                strikethrough: s.annotations.strikethrough,
                underline: s.annotations.underline,
                code: s.annotations.code,
            },
        })
        .collect()
}

/// Parses one raw block JSON value (as returned in a children listing) into
/// the domain `Block`, without recursing into children — the caller attaches
/// children separately once they've been fetched.
pub fn parse_raw_block(value: &Value) -> Result<Block, AppError> {
    let id_str = value
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("block missing id"))?;
    let id = BlockId::parse(id_str)?;

    let has_children = value
        .get("has_children")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("block missing type"))?;

    let payload_value = value.get(kind);

    let payload = parse_block_payload(kind, payload_value, id_str)?;

    Ok(Block {
        id,
        has_children,
        children: Vec::new(),
        payload,
    })
}

fn malformed(msg: &str) -> AppError {
    AppError::ApiError {
        status: 0,
        code: NotionErrorCode::InvalidJson,
        message: msg.to_string(),
    }
}

fn text_block(payload: Option<&Value>) -> Result<TextBlock, AppError> {
    let rich_text: Vec<RawRichText> = payload
        .and_then(|p| p.get("rich_text"))
        .cloned()
        .map(serde_json::from_value)
        .transpose()?
        .unwrap_or_default();
    Ok(TextBlock {
        rich_text: rich_text_spans(&rich_text),
    })
}

fn parse_block_payload(
    kind: &str,
    payload: Option<&Value>,
    block_id: &str,
) -> Result<BlockPayload, AppError> {
    Ok(match kind {
        "paragraph" => BlockPayload::Paragraph(text_block(payload)?),
        "heading_1" => BlockPayload::Heading1(text_block(payload)?),
        "heading_2" => BlockPayload::Heading2(text_block(payload)?),
        "heading_3" => BlockPayload::Heading3(text_block(payload)?),
        "bulleted_list_item" => BlockPayload::BulletedListItem(text_block(payload)?),
        "numbered_list_item" => BlockPayload::NumberedListItem(text_block(payload)?),
        "quote" => BlockPayload::Quote(text_block(payload)?),
        "toggle" => BlockPayload::Toggle(text_block(payload)?),
        "to_do" => {
            let tb = text_block(payload)?;
            let checked = payload
                .and_then(|p| p.get("checked"))
                .and_then(Value::as_bool)
                .unwrap_or(false);
            BlockPayload::ToDo(ToDoBlock {
                rich_text: tb.rich_text,
                checked,
            })
        }
        "code" => {
            let tb = text_block(payload)?;
            let language = payload
                .and_then(|p| p.get("language"))
                .and_then(Value::as_str)
                .map(|s| s.to_string());
            BlockPayload::Code(CodeBlock {
                rich_text: tb.rich_text,
                language,
            })
        }
        "callout" => {
            let tb = text_block(payload)?;
            let icon = payload
                .and_then(|p| p.get("icon"))
                .cloned()
                .and_then(|v| serde_json::from_value::<RawIcon>(v).ok())
                .and_then(|icon| icon.as_emoji().map(|e| e.to_string()));
            BlockPayload::Callout(CalloutBlock {
                rich_text: tb.rich_text,
                icon,
            })
        }
        "divider" => BlockPayload::Divider,
        "image" | "video" | "file" | "pdf" => {
            let raw_file: Option<RawFile> = payload.cloned().map(serde_json::from_value).transpose()?;
            let url = raw_file.map(|f| f.url().to_string()).unwrap_or_default();
            let caption: Vec<RawRichText> = payload
                .and_then(|p| p.get("caption"))
                .cloned()
                .map(serde_json::from_value)
                .transpose()?
                .unwrap_or_default();
            let media = MediaBlock {
                url,
                caption: rich_text_spans(&caption),
            };
            match kind {
                "image" => BlockPayload::Image(media),
                "video" => BlockPayload::Video(media),
                "file" => BlockPayload::File(media),
                _ => BlockPayload::Pdf(media),
            }
        }
        "bookmark" | "embed" | "link_preview" => {
            let url = payload
                .and_then(|p| p.get("url"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let caption: Vec<RawRichText> = payload
                .and_then(|p| p.get("caption"))
                .cloned()
                .map(serde_json::from_value)
                .transpose()?
                .unwrap_or_default();
            let link = LinkBlock {
                url,
                caption: rich_text_spans(&caption),
            };
            match kind {
                "bookmark" => BlockPayload::Bookmark(link),
                "embed" => BlockPayload::Embed(link),
                _ => BlockPayload::LinkPreview(link),
            }
        }
        "equation" => {
            let expression = payload
                .and_then(|p| p.get("expression"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            BlockPayload::Equation(EquationBlock { expression })
        }
        "table" => {
            let table_width = payload
                .and_then(|p| p.get("table_width"))
                .and_then(Value::as_u64)
                .unwrap_or(0) as u32;
            let has_column_header = payload
                .and_then(|p| p.get("has_column_header"))
                .and_then(Value::as_bool)
                .unwrap_or(false);
            let has_row_header = payload
                .and_then(|p| p.get("has_row_header"))
                .and_then(Value::as_bool)
                .unwrap_or(false);
            BlockPayload::Table(TableBlock {
                table_width,
                has_column_header,
                has_row_header,
            })
        }
        "table_row" => {
            let cells: Vec<Vec<RawRichText>> = payload
                .and_then(|p| p.get("cells"))
                .cloned()
                .map(serde_json::from_value)
                .transpose()?
                .unwrap_or_default();
            BlockPayload::TableRow(TableRowBlock {
                cells: cells.iter().map(|c| rich_text_spans(c)).collect(),
            })
        }
        "child_page" => {
            let title = payload
                .and_then(|p| p.get("title"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            BlockPayload::ChildPage(ChildRefBlock {
                title,
                notion_id: NotionId::parse(block_id)?,
            })
        }
        "child_database" => {
            let title = payload
                .and_then(|p| p.get("title"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            BlockPayload::ChildDatabase(ChildRefBlock {
                title,
                notion_id: NotionId::parse(block_id)?,
            })
        }
        "column_list" => BlockPayload::ColumnList,
        "column" => BlockPayload::Column,
        "synced_block" => {
            let original_block_id = payload
                .and_then(|p| p.get("synced_from"))
                .filter(|v| !v.is_null())
                .and_then(|v| v.get("block_id"))
                .and_then(Value::as_str)
                .and_then(|s| NotionId::parse(s).ok());
            BlockPayload::SyncedBlock(SyncedBlockPayload { original_block_id })
        }
        "table_of_contents" => BlockPayload::TableOfContents,
        "breadcrumb" => BlockPayload::Breadcrumb,
        other => BlockPayload::Unsupported(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_paragraph_block() {
        let value = json!({
            "id": "550e8400e29b41d4a716446655440000",
            "type": "paragraph",
            "has_children": false,
            "paragraph": {"rich_text": [{"plain_text": "Hi", "href": null, "annotations": {}}]},
        });
        let block = parse_raw_block(&value).unwrap();
        match block.payload {
            BlockPayload::Paragraph(tb) => assert_eq!(tb.rich_text[0].plain_text, "Hi"),
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn parses_child_page_block_id_as_notion_id() {
        let value = json!({
            "id": "550e8400e29b41d4a716446655440000",
            "type": "child_page",
            "has_children": false,
            "child_page": {"title": "Sub page"},
        });
        let block = parse_raw_block(&value).unwrap();
        match block.payload {
            BlockPayload::ChildPage(cp) => {
                assert_eq!(cp.title, "Sub page");
                assert_eq!(cp.notion_id.as_str(), "550e8400e29b41d4a716446655440000");
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }
}
