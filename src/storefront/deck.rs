use serde::Serialize;
use std::collections::HashSet;

use crate::model::CatalogRow;

/// Deck navigation precomputed for the page script: the script only looks
/// indices up in these tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeckPlan {
    pub urls: Vec<String>,
    /// Index selected when the card thumbnail is clicked.
    pub start: usize,
    /// `next[i]` is the index after `i`.
    pub next: Vec<usize>,
    pub prev: Vec<usize>,
}

/// The ordered, de-duplicated images a product card can page through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageDeck {
    urls: Vec<String>,
    index: usize,
}

impl ImageDeck {
    pub fn new<I>(urls: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut seen = HashSet::new();
        let urls = urls
            .into_iter()
            .filter(|u| !u.trim().is_empty())
            .filter(|u| seen.insert(u.clone()))
            .collect();
        Self { urls, index: 0 }
    }

    /// Images first, then variants.
    pub fn from_row(row: &CatalogRow) -> Self {
        Self::new(
            row.images
                .iter()
                .map(|i| i.url.clone())
                .chain(row.variants.iter().map(|v| v.url.clone())),
        )
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> Option<&str> {
        self.urls.get(self.index).map(String::as_str)
    }

    /// Select `start` if it is in the deck, otherwise the first image.
    pub fn open(&mut self, start: Option<&str>) -> usize {
        self.index = start
            .and_then(|s| self.urls.iter().position(|u| u == s))
            .unwrap_or(0);
        self.index
    }

    pub fn next(&mut self) {
        if !self.urls.is_empty() {
            self.index = (self.index + 1) % self.urls.len();
        }
    }

    pub fn prev(&mut self) {
        if !self.urls.is_empty() {
            self.index = (self.index + self.urls.len() - 1) % self.urls.len();
        }
    }

    /// Thumbnail click. Out-of-range indices are ignored.
    pub fn jump(&mut self, index: usize) {
        if index < self.urls.len() {
            self.index = index;
        }
    }

    /// Same deck with every URL rewritten by `f`, de-duplicated again.
    pub fn map_urls<F>(&self, f: F) -> Self
    where
        F: Fn(&str) -> String,
    {
        Self::new(self.urls.iter().map(|u| f(u)))
    }

    /// Navigation tables for a deck opened on `start`.
    pub fn plan(&self, start: Option<&str>) -> DeckPlan {
        let step = |i: usize, forward: bool| {
            let mut deck = self.clone();
            deck.jump(i);
            if forward {
                deck.next();
            } else {
                deck.prev();
            }
            deck.index()
        };
        let mut opened = self.clone();
        DeckPlan {
            urls: self.urls.clone(),
            start: opened.open(start),
            next: (0..self.len()).map(|i| step(i, true)).collect(),
            prev: (0..self.len()).map(|i| step(i, false)).collect(),
        }
    }
}
