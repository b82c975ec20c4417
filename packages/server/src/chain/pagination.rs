//! Cursor-driven page accumulation.
//!
//! The page source only knows how to fetch "the page starting at cursor";
//! the loop here owns accumulation and termination.

use std::future::Future;

use anyhow::Result;

/// One page of results plus the cursor the next page starts at.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<u64>,
}

/// Accumulated pages. `interrupted` carries the error that ended the loop
/// early, in which case `items` holds only the pages fetched before it.
#[derive(Debug, Clone)]
pub struct Collected<T> {
    pub items: Vec<T>,
    pub pages: usize,
    pub interrupted: Option<String>,
}

impl<T> Collected<T> {
    pub fn is_complete(&self) -> bool {
        self.interrupted.is_none()
    }
}

/// Fetch pages from `from` until the cursor stops advancing, disappears, or
/// passes `to` (inclusive). A failed page ends the loop without retry; pages
/// gathered so far are kept.
pub async fn collect_pages<T, F, Fut>(from: u64, to: u64, mut fetch_page: F) -> Collected<T>
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut items = Vec::new();
    let mut pages = 0;
    if from > to {
        return Collected {
            items,
            pages,
            interrupted: None,
        };
    }

    let mut cursor = from;
    loop {
        let page = match fetch_page(cursor).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(cursor, pages, error = %e, "page fetch failed, keeping partial results");
                return Collected {
                    items,
                    pages,
                    interrupted: Some(format!("{e:#}")),
                };
            }
        };
        pages += 1;
        items.extend(page.items);

        match page.next_cursor {
            Some(next) if next > cursor && next <= to => cursor = next,
            _ => break,
        }
    }

    Collected {
        items,
        pages,
        interrupted: None,
    }
}
