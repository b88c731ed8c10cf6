//! Generic cursor-pagination driver shared by search, database queries, and
//! block-children listings — each of which returns the same
//! `{results, has_more, next_cursor}` envelope shape.

use crate::error::AppError;
use std::future::Future;

/// Repeatedly calls `fetch_page(cursor)` and accumulates `results` until the
/// server reports `has_more == false` (or omits `next_cursor`).
pub async fn collect_all<T, F, Fut>(mut fetch_page: F) -> Result<Vec<T>, AppError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<(Vec<T>, bool, Option<String>), AppError>>,
{
    let mut all = Vec::new();
    let mut cursor = None;
    loop {
        let (mut page, has_more, next_cursor) = fetch_page(cursor).await?;
        all.append(&mut page);
        if !has_more || next_cursor.is_none() {
            break;
        }
        cursor = next_cursor;
    }
    Ok(all)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[tokio::test]
    async fn stops_when_has_more_is_false() {
        let pages: RefCell<Vec<(Vec<u32>, bool, Option<String>)>> = RefCell::new(vec![
            (vec![1, 2], true, Some("cursor-1".to_string())),
            (vec![3], false, None),
        ]);
        let result = collect_all(|_cursor| {
            let page = pages.borrow_mut().remove(0);
            async move { Ok(page) }
        })
        .await
        .unwrap();
        assert_eq!(result, vec![1, 2, 3]);
    }
}
