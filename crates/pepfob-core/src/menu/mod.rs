// ── Menu engine ──
//
// A finite set of pages keyed by a caller-defined id. Navigation fires
// the outgoing page's closed hook before the incoming page's opened hook;
// going to the current page replays both, which is how data-driven pages
// are force-refreshed. The engine knows nothing about networking.

pub mod frame;
pub mod page;

use std::collections::HashMap;
use std::hash::Hash;

use tracing::{trace, warn};

pub use frame::{AuxText, Color, Frame, FrameItem, FrameLine};
pub use page::{MenuItem, MenuPage};

pub struct MenuEngine<P> {
    pages: HashMap<P, MenuPage<P>>,
    current: Option<P>,
    previous: Option<P>,
}

impl<P: Copy + Eq + Hash + std::fmt::Debug> Default for MenuEngine<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Copy + Eq + Hash + std::fmt::Debug> MenuEngine<P> {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            current: None,
            previous: None,
        }
    }

    pub fn add_page(&mut self, id: P, page: MenuPage<P>) {
        self.pages.insert(id, page);
    }

    pub fn current(&self) -> Option<P> {
        self.current
    }

    /// The page that was current before the last navigation.
    pub fn previous(&self) -> Option<P> {
        self.previous
    }

    pub fn page(&self, id: P) -> Option<&MenuPage<P>> {
        self.pages.get(&id)
    }

    pub fn page_mut(&mut self, id: P) -> Option<&mut MenuPage<P>> {
        self.pages.get_mut(&id)
    }

    pub fn current_page(&self) -> Option<&MenuPage<P>> {
        self.current.and_then(|id| self.pages.get(&id))
    }

    fn current_page_mut(&mut self) -> Option<&mut MenuPage<P>> {
        self.current.and_then(|id| self.pages.get_mut(&id))
    }

    /// Navigate to `id`. Unknown ids are ignored.
    pub fn go_to(&mut self, id: P) -> bool {
        if !self.pages.contains_key(&id) {
            warn!(page = ?id, "navigation to unknown page");
            return false;
        }

        if let Some(outgoing) = self.current_page_mut() {
            outgoing.fire_closed();
            if outgoing.dynamic {
                outgoing.clear_items();
            }
        }

        trace!(from = ?self.current, to = ?id, "page transition");
        self.previous = self.current;
        self.current = Some(id);

        if let Some(incoming) = self.pages.get_mut(&id) {
            incoming.fire_opened();
            if incoming.highlighted_index().is_none() && !incoming.items().is_empty() {
                incoming.set_highlight(0);
            }
            incoming.refresh_highlighted();
        }
        true
    }

    /// Highlight the next item, wrapping to the first.
    pub fn next(&mut self) {
        if let Some(page) = self.current_page_mut() {
            page.step(true);
        }
    }

    /// Highlight the previous item, wrapping to the last.
    pub fn prev(&mut self) {
        if let Some(page) = self.current_page_mut() {
            page.step(false);
        }
    }

    /// Run the highlighted item's activation hook. Returns `false` when
    /// there was nothing to activate.
    pub fn activate(&mut self) -> bool {
        let Some(page) = self.current_page() else {
            return false;
        };
        let Some(item) = page.highlighted_item() else {
            return false;
        };
        match &item.on_activate {
            Some(hook) => {
                hook(item);
                true
            }
            None => false,
        }
    }

    /// Compose the current page.
    ///
    /// Items are drawn from the highlighted one forward without wrapping,
    /// at most `max_items` of them, so the highlighted item is always the
    /// first visible line. Info-mode pages draw no items.
    pub fn render(&mut self, max_items: usize) -> Frame {
        let mut frame = Frame::default();
        let Some(page) = self.current_page_mut() else {
            return frame;
        };

        frame.title.clone_from(&page.title);
        page.fire_rendered(&mut frame);

        if !page.info_mode {
            let start = page.highlighted_index().unwrap_or(0);
            frame.items = page
                .items()
                .iter()
                .enumerate()
                .skip(start)
                .take(max_items)
                .map(|(i, item)| FrameItem {
                    text: item.text.clone(),
                    aux: item.aux.clone(),
                    highlighted: i == start,
                })
                .collect();
        }
        frame
    }
}
