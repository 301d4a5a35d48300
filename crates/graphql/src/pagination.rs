//! Relay-style pagination.

use crate::error::{Error, Result};
use serde::Deserialize;

/// `{ edges: [{ node }], pageInfo }`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    #[serde(default = "Vec::new")]
    pub edges: Vec<Edge<T>>,
    #[serde(default)]
    pub page_info: PageInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Edge<T> {
    pub node: T,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub has_next_page: bool,
    #[serde(default)]
    pub end_cursor: Option<String>,
}

impl<T> Connection<T> {
    pub fn nodes(self) -> impl Iterator<Item = T> {
        self.edges.into_iter().map(|e| e.node)
    }
}

/// Fetch every page and collect the nodes
///
/// `fetch` receives the cursor to continue from (`None` for the first page).
pub fn paginate<T, F>(fetch: F) -> Result<Vec<T>>
where
    F: FnMut(Option<&str>) -> Result<Connection<T>>,
{
    paginate_filtered(fetch, |_| true)
}

/// Like [`paginate`] but keeps only nodes accepted by `keep`, applied per page
pub fn paginate_filtered<T, F, K>(mut fetch: F, keep: K) -> Result<Vec<T>>
where
    F: FnMut(Option<&str>) -> Result<Connection<T>>,
    K: Fn(&T) -> bool,
{
    let mut items = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = fetch(cursor.as_deref())?;
        pages += 1;
        let PageInfo {
            has_next_page,
            end_cursor,
        } = page.page_info.clone();
        items.extend(page.nodes().filter(|n| keep(n)));

        if !has_next_page {
            break;
        }
        match end_cursor {
            Some(next) if cursor.as_deref() != Some(next.as_str()) => cursor = Some(next),
            _ => {
                return Err(Error::Decode(format!(
                    "pagination cursor did not advance after page {pages}"
                )));
            }
        }
    }

    log::trace!("collected {} items over {pages} pages", items.len());
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page(nodes: &[i64], next: Option<&str>) -> Connection<i64> {
        serde_json::from_value(json!({
            "edges": nodes.iter().map(|n| json!({"node": n})).collect::<Vec<_>>(),
            "pageInfo": {"hasNextPage": next.is_some(), "endCursor": next}
        }))
        .unwrap()
    }

    #[test]
    fn test_paginate_follows_cursor() {
        let mut seen = Vec::new();
        let items = paginate(|cursor| {
            seen.push(cursor.map(str::to_string));
            Ok(match cursor {
                None => page(&[1, 2], Some("c1")),
                Some("c1") => page(&[3], Some("c2")),
                _ => page(&[4], None),
            })
        })
        .unwrap();
        assert_eq!(items, vec![1, 2, 3, 4]);
        assert_eq!(seen, vec![None, Some("c1".into()), Some("c2".into())]);
    }

    #[test]
    fn test_filtered() {
        let items = paginate_filtered(
            |cursor| Ok(if cursor.is_none() { page(&[1, 2], Some("c")) } else { page(&[3, 4], None) }),
            |n| n % 2 == 0,
        )
        .unwrap();
        assert_eq!(items, vec![2, 4]);
    }

    #[test]
    fn test_stuck_cursor_errors() {
        let result = paginate(|_| Ok(page(&[1], Some("same"))));
        assert!(matches!(result, Err(Error::Decode(_))));
    }

    #[test]
    fn test_missing_page_info_is_last_page() {
        let conn: Connection<i64> = serde_json::from_value(json!({"edges": [{"node": 7}]})).unwrap();
        assert_eq!(paginate(|_| Ok(conn.clone())).unwrap(), vec![7]);
    }
}
