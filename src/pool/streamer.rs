//! Paged delivery of resolved pools
//!
//! A resolved roster can hold far more players than fit in one transport
//! message, so it is split into consecutive pages. Each page is a complete
//! `PlayerPool` carrying the original filters and final stats together with
//! its slice of the roster.

use crate::error::{MmLogicError, Result};
use crate::types::{PlayerPool, Roster};
use async_trait::async_trait;

/// Destination for streamed pages
#[async_trait]
pub trait PageSink: Send {
    async fn send_page(&mut self, page: PlayerPool) -> Result<()>;
}

/// Splits resolved pools into pages
#[derive(Debug, Clone, Copy)]
pub struct PoolStreamer {
    page_size: usize,
}

impl PoolStreamer {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of pages a roster of `players` players is split into
    pub fn page_count(&self, players: usize) -> usize {
        players.div_ceil(self.page_size).max(1)
    }

    /// Send every page of `pool` to `sink`, returning the number of pages sent.
    /// The first failed send stops the stream.
    pub async fn stream<S>(&self, mut pool: PlayerPool, sink: &mut S) -> Result<usize>
    where
        S: PageSink + ?Sized,
    {
        let players = pool.roster.take().map(|r| r.players).unwrap_or_default();
        let total = self.page_count(players.len());
        let partial_name = format!("{}.partialRoster", pool.name);

        let mut chunks: Vec<_> = players
            .chunks(self.page_size)
            .map(|chunk| chunk.to_vec())
            .collect();
        if chunks.is_empty() {
            chunks.push(Vec::new());
        }

        for (index, chunk) in chunks.into_iter().enumerate() {
            let page = PlayerPool {
                name: format!("{}.page{}/{}", pool.name, index + 1, total),
                filters: pool.filters.clone(),
                roster: Some(Roster {
                    name: partial_name.clone(),
                    players: chunk,
                }),
                stats: pool.stats,
            };
            sink.send_page(page).await.map_err(|err| {
                anyhow::Error::from(MmLogicError::TransportSendError {
                    message: err.to_string(),
                })
            })?;
        }

        Ok(total)
    }
}

/// Sink that keeps every page in memory, optionally failing after a number of sends
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub pages: Vec<PlayerPool>,
    fail_after: Option<usize>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `pages` pages, then fail every later send
    pub fn failing_after(pages: usize) -> Self {
        Self {
            pages: Vec::new(),
            fail_after: Some(pages),
        }
    }

    /// Player count of each received page
    pub fn page_sizes(&self) -> Vec<usize> {
        self.pages.iter().map(|page| page.players().len()).collect()
    }
}

#[async_trait]
impl PageSink for CollectingSink {
    async fn send_page(&mut self, page: PlayerPool) -> Result<()> {
        if self.fail_after.is_some_and(|limit| self.pages.len() >= limit) {
            return Err(anyhow::anyhow!("receiver closed"));
        }
        self.pages.push(page);
        Ok(())
    }
}
