use anyhow::{Context, Result};
use reqwest::Url;
use tracing::{debug, trace};

use crate::model::pagination::PaginationInfo;

/// How many extra items each boundary hit reveals.
pub const WINDOW_STEP: usize = 20;

/// Query parameter names a window is persisted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowKeys {
    pub page: &'static str,
    pub size: &'static str,
}

impl WindowKeys {
    pub const MESSAGES: WindowKeys = WindowKeys {
        page: "messagePageNumber",
        size: "messagePageSize",
    };

    pub const CONVERSATIONS: WindowKeys = WindowKeys {
        page: "page",
        size: "pageSize",
    };
}

/// Which end of the list stays pinned while the window grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Newest-last lists (message history): growing reveals older items upward.
    Bottom,
    /// Newest-first lists (conversation list): growing reveals items downward.
    Top,
}

/// Navigable state the window size is persisted in, so a reload reproduces it.
pub trait QueryState {
    fn query_param(&self, key: &str) -> Option<String>;

    /// Overwrite the given params on the current entry without creating a new one.
    fn replace_query(&mut self, params: &[(&str, String)]);
}

/// [`QueryState`] backed by a URL with a history-entry counter.
#[derive(Debug, Clone)]
pub struct UrlLocation {
    url: Url,
    history_len: usize,
    replacements: usize,
}

impl UrlLocation {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            history_len: 1,
            replacements: 0,
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw).with_context(|| format!("invalid location url: {raw}"))?;
        Ok(Self::new(url))
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Navigate to a new entry.
    pub fn push(&mut self, url: Url) {
        self.url = url;
        self.history_len += 1;
    }

    pub fn history_len(&self) -> usize {
        self.history_len
    }

    pub fn replacements(&self) -> usize {
        self.replacements
    }
}

impl QueryState for UrlLocation {
    fn query_param(&self, key: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    fn replace_query(&mut self, params: &[(&str, String)]) {
        let retained: Vec<(String, String)> = self
            .url
            .query_pairs()
            .filter(|(k, _)| !params.iter().any(|(p, _)| k == p))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        {
            let mut query = self.url.query_pairs_mut();
            query.clear();
            for (k, v) in &retained {
                query.append_pair(k, v);
            }
            for (k, v) in params {
                query.append_pair(k, v);
            }
        }

        self.replacements += 1;
        trace!(url = self.url.as_str(), "location replaced");
    }
}

fn parse_positive(raw: Option<String>) -> Option<usize> {
    raw.and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|v| *v > 0)
}

/// Page number and size to request on load, taken from the location when present.
pub fn requested_window(
    location: &impl QueryState,
    keys: WindowKeys,
    default_size: usize,
) -> (usize, usize) {
    let page = parse_positive(location.query_param(keys.page)).unwrap_or(1);
    let size = parse_positive(location.query_param(keys.size)).unwrap_or(default_size);
    (page, size)
}

/// Decides how many of the sorted items are rendered and mirrors that number in
/// the location. The window never shrinks during one view.
#[derive(Debug, Clone)]
pub struct PaginationWindowController {
    keys: WindowKeys,
    anchor: Anchor,
    window_size: usize,
    total_items: usize,
    current_page: usize,
}

impl PaginationWindowController {
    pub fn new(keys: WindowKeys, anchor: Anchor) -> Self {
        Self {
            keys,
            anchor,
            window_size: 0,
            total_items: 0,
            current_page: 1,
        }
    }

    pub fn for_messages() -> Self {
        Self::new(WindowKeys::MESSAGES, Anchor::Bottom)
    }

    pub fn for_conversations() -> Self {
        Self::new(WindowKeys::CONVERSATIONS, Anchor::Top)
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn total_items(&self) -> usize {
        self.total_items
    }

    pub fn has_more(&self) -> bool {
        self.window_size < self.total_items
    }

    /// `loaded` is the number of items the page actually carried; it stands in
    /// for missing pagination fields.
    pub fn initialize(
        &mut self,
        info: &PaginationInfo,
        loaded: usize,
        location: &mut impl QueryState,
    ) {
        self.window_size = info
            .items_per_page
            .map(|n| n as usize)
            .filter(|n| *n > 0)
            .unwrap_or(loaded);
        self.total_items = info
            .total_items
            .map(|t| t as usize)
            .unwrap_or(0)
            .max(self.window_size)
            .max(loaded);
        self.current_page = info.current_page.map(|p| p as usize).filter(|p| *p > 0).unwrap_or(1);

        debug!(
            window_size = self.window_size,
            total_items = self.total_items,
            current_page = self.current_page,
            "pagination window initialized"
        );
        self.sync_location(location);
    }

    /// Called when the sentinel at the far end of the list becomes visible.
    ///
    /// Returns the new window size when it grew.
    pub fn on_near_boundary(&mut self, location: &mut impl QueryState) -> Option<usize> {
        let from_location = parse_positive(location.query_param(self.keys.size));
        let current = from_location.unwrap_or(self.window_size).max(self.window_size);
        let next = (current + WINDOW_STEP).min(self.total_items);

        if next <= current {
            trace!(
                window_size = current,
                total_items = self.total_items,
                "window already covers all items"
            );
            return None;
        }

        self.window_size = next;
        location.replace_query(&[
            (self.keys.page, self.current_page.to_string()),
            (self.keys.size, next.to_string()),
        ]);
        debug!(window_size = next, "pagination window grown");
        Some(next)
    }

    pub fn visible_slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        match self.anchor {
            Anchor::Bottom => &items[items.len().saturating_sub(self.window_size)..],
            Anchor::Top => &items[..self.window_size.min(items.len())],
        }
    }

    fn sync_location(&self, location: &mut impl QueryState) {
        if self.window_size == 0 {
            return;
        }
        let page = parse_positive(location.query_param(self.keys.page));
        let size = parse_positive(location.query_param(self.keys.size));
        if page == Some(self.current_page) && size == Some(self.window_size) {
            return;
        }
        location.replace_query(&[
            (self.keys.page, self.current_page.to_string()),
            (self.keys.size, self.window_size.to_string()),
        ]);
    }
}

/// Edge-triggered stand-in for an intersection observer on the sentinel element.
#[derive(Debug, Clone, Default)]
pub struct ScrollSentinel {
    visible: bool,
}

impl ScrollSentinel {
    /// Feed the latest intersection state; returns `true` only when the sentinel
    /// has just come into view.
    pub fn observe(&mut self, intersecting: bool) -> bool {
        let entered = intersecting && !self.visible;
        self.visible = intersecting;
        entered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(total: u64, per_page: u64) -> PaginationInfo {
        PaginationInfo {
            total_items: Some(total),
            items_per_page: Some(per_page),
            current_page: Some(1),
            ..Default::default()
        }
    }

    fn location() -> UrlLocation {
        UrlLocation::parse("https://app.example.com/chat/c1?tab=inbox").unwrap()
    }

    #[test]
    fn initialize_writes_missing_params_with_replace() {
        let mut loc = location();
        let mut window = PaginationWindowController::for_messages();
        window.initialize(&info(100, 20), 20, &mut loc);

        assert_eq!(window.window_size(), 20);
        assert_eq!(loc.query_param("messagePageNumber").as_deref(), Some("1"));
        assert_eq!(loc.query_param("messagePageSize").as_deref(), Some("20"));
        assert_eq!(loc.query_param("tab").as_deref(), Some("inbox"));
        assert_eq!(loc.history_len(), 1);
        assert_eq!(loc.replacements(), 1);
    }

    #[test]
    fn initialize_skips_replace_when_in_sync() {
        let mut loc = UrlLocation::parse(
            "https://app.example.com/chat/c1?messagePageNumber=1&messagePageSize=20",
        )
        .unwrap();
        let mut window = PaginationWindowController::for_messages();
        window.initialize(&info(100, 20), 20, &mut loc);
        assert_eq!(loc.replacements(), 0);
    }

    #[test]
    fn boundary_grows_by_step() {
        let mut loc = location();
        let mut window = PaginationWindowController::for_messages();
        window.initialize(&info(100, 20), 20, &mut loc);

        assert_eq!(window.on_near_boundary(&mut loc), Some(40));
        assert_eq!(loc.query_param("messagePageSize").as_deref(), Some("40"));
        assert_eq!(window.on_near_boundary(&mut loc), Some(60));
        assert_eq!(loc.history_len(), 1);
    }

    #[test]
    fn growth_caps_at_total_items() {
        let mut loc = UrlLocation::parse(
            "https://app.example.com/chat/c1?messagePageNumber=1&messagePageSize=40",
        )
        .unwrap();
        let mut window = PaginationWindowController::for_messages();
        window.initialize(&info(45, 40), 40, &mut loc);

        assert_eq!(window.on_near_boundary(&mut loc), Some(45));
        assert_eq!(window.window_size(), 45);
        assert_eq!(window.on_near_boundary(&mut loc), None);
        assert_eq!(window.window_size(), 45);
        assert!(!window.has_more());
    }

    #[test]
    fn growth_is_monotonic() {
        let mut loc = location();
        let mut window = PaginationWindowController::for_messages();
        window.initialize(&info(95, 20), 20, &mut loc);

        let mut last = window.window_size();
        for _ in 0..10 {
            window.on_near_boundary(&mut loc);
            assert!(window.window_size() >= last);
            assert!(window.window_size() <= 95);
            last = window.window_size();
        }
        assert_eq!(last, 95);
    }

    #[test]
    fn bottom_anchor_keeps_newest() {
        let items: Vec<u32> = (1..=10).collect();
        let mut loc = location();
        let mut window = PaginationWindowController::for_messages();
        window.initialize(&info(10, 3), 3, &mut loc);
        assert_eq!(window.visible_slice(&items), &[8, 9, 10]);

        window.initialize(&info(10, 30), 30, &mut loc);
        assert_eq!(window.visible_slice(&items).len(), 10);
    }

    #[test]
    fn top_anchor_keeps_first_items() {
        let items: Vec<u32> = (1..=10).collect();
        let mut loc = location();
        let mut window = PaginationWindowController::for_conversations();
        window.initialize(&info(10, 4), 4, &mut loc);
        assert_eq!(window.visible_slice(&items), &[1, 2, 3, 4]);
        assert_eq!(loc.query_param("pageSize").as_deref(), Some("4"));
    }

    #[test]
    fn missing_page_size_falls_back_to_loaded_items() {
        let mut loc = location();
        let mut window = PaginationWindowController::for_messages();
        let sparse = PaginationInfo {
            total_items: Some(12),
            ..Default::default()
        };
        window.initialize(&sparse, 5, &mut loc);

        let items: Vec<u32> = (1..=5).collect();
        assert_eq!(window.window_size(), 5);
        assert_eq!(window.visible_slice(&items).len(), 5);
        assert_eq!(loc.query_param("messagePageSize").as_deref(), Some("5"));
        assert_eq!(window.on_near_boundary(&mut loc), Some(12));
    }

    #[test]
    fn empty_page_never_persists_zero_size() {
        let mut loc = location();
        let mut window = PaginationWindowController::for_messages();
        window.initialize(&PaginationInfo::default(), 0, &mut loc);

        assert_eq!(window.window_size(), 0);
        assert_eq!(loc.query_param("messagePageSize"), None);
        assert_eq!(loc.replacements(), 0);
        assert_eq!(window.on_near_boundary(&mut loc), None);
    }

    #[test]
    fn requested_window_reads_location() {
        let loc = UrlLocation::parse(
            "https://app.example.com/chat/c1?messagePageNumber=2&messagePageSize=60",
        )
        .unwrap();
        assert_eq!(requested_window(&loc, WindowKeys::MESSAGES, 20), (2, 60));
        assert_eq!(requested_window(&loc, WindowKeys::CONVERSATIONS, 20), (1, 20));

        let garbage = UrlLocation::parse("https://app.example.com/?pageSize=abc&page=0").unwrap();
        assert_eq!(requested_window(&garbage, WindowKeys::CONVERSATIONS, 15), (1, 15));
    }

    #[test]
    fn sentinel_fires_once_per_entry() {
        let mut sentinel = ScrollSentinel::default();
        assert!(sentinel.observe(true));
        assert!(!sentinel.observe(true));
        assert!(!sentinel.observe(false));
        assert!(sentinel.observe(true));
    }
}
