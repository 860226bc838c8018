// ── Pages and items ──

use super::frame::{AuxText, Frame};

pub type ActivateHook = Box<dyn Fn(&MenuItem) + Send>;
pub type HighlightHook = Box<dyn Fn(&mut MenuItem) + Send>;
pub type PageHook<P> = Box<dyn FnMut(&mut MenuPage<P>) + Send>;
pub type RenderHook<P> = Box<dyn FnMut(&mut MenuPage<P>, &mut Frame) + Send>;

/// A selectable line on a page.
pub struct MenuItem {
    pub text: String,
    pub aux: Option<AuxText>,
    /// Caller-defined value (WAN id, SIM slot, scan index, ...).
    pub key: Option<u32>,
    pub(super) on_activate: Option<ActivateHook>,
    pub(super) on_highlight: Option<HighlightHook>,
}

impl std::fmt::Debug for MenuItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MenuItem")
            .field("text", &self.text)
            .field("aux", &self.aux)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl MenuItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            aux: None,
            key: None,
            on_activate: None,
            on_highlight: None,
        }
    }

    pub fn with_aux(mut self, aux: AuxText) -> Self {
        self.aux = Some(aux);
        self
    }

    pub fn with_key(mut self, key: u32) -> Self {
        self.key = Some(key);
        self
    }

    pub fn on_activate(mut self, hook: impl Fn(&MenuItem) + Send + 'static) -> Self {
        self.on_activate = Some(Box::new(hook));
        self
    }

    pub fn on_highlight(mut self, hook: impl Fn(&mut MenuItem) + Send + 'static) -> Self {
        self.on_highlight = Some(Box::new(hook));
        self
    }

    /// Run the highlight hook against this item.
    pub fn refresh(&mut self) {
        if let Some(hook) = self.on_highlight.take() {
            hook(self);
            self.on_highlight = Some(hook);
        }
    }
}

/// A page: ordered items, a highlight cursor and lifecycle hooks.
pub struct MenuPage<P> {
    pub title: String,
    items: Vec<MenuItem>,
    highlighted: Option<usize>,
    /// Draw only the title and whatever the render hook paints.
    pub info_mode: bool,
    /// Items are rebuilt on open and dropped on close.
    pub dynamic: bool,
    /// Where "back" leads from an item-less page.
    pub back: Option<P>,
    pub(super) on_opened: Option<PageHook<P>>,
    pub(super) on_closed: Option<PageHook<P>>,
    pub(super) on_rendered: Option<RenderHook<P>>,
}

impl<P: std::fmt::Debug> std::fmt::Debug for MenuPage<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MenuPage")
            .field("title", &self.title)
            .field("items", &self.items)
            .field("highlighted", &self.highlighted)
            .field("info_mode", &self.info_mode)
            .field("dynamic", &self.dynamic)
            .field("back", &self.back)
            .finish_non_exhaustive()
    }
}

impl<P> MenuPage<P> {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            items: Vec::new(),
            highlighted: None,
            info_mode: false,
            dynamic: false,
            back: None,
            on_opened: None,
            on_closed: None,
            on_rendered: None,
        }
    }

    /// An item-less page painted entirely by its render hook.
    pub fn info(title: impl Into<String>, back: Option<P>) -> Self {
        let mut page = Self::new(title);
        page.info_mode = true;
        page.back = back;
        page
    }

    pub fn back_to(mut self, page: P) -> Self {
        self.back = Some(page);
        self
    }

    pub fn dynamic(mut self) -> Self {
        self.dynamic = true;
        self
    }

    pub fn item(mut self, item: MenuItem) -> Self {
        self.push(item);
        self
    }

    pub fn on_opened(mut self, hook: impl FnMut(&mut MenuPage<P>) + Send + 'static) -> Self {
        self.on_opened = Some(Box::new(hook));
        self
    }

    pub fn on_closed(mut self, hook: impl FnMut(&mut MenuPage<P>) + Send + 'static) -> Self {
        self.on_closed = Some(Box::new(hook));
        self
    }

    pub fn on_rendered(
        mut self,
        hook: impl FnMut(&mut MenuPage<P>, &mut Frame) + Send + 'static,
    ) -> Self {
        self.on_rendered = Some(Box::new(hook));
        self
    }

    pub fn push(&mut self, item: MenuItem) {
        self.items.push(item);
        if self.highlighted.is_none() {
            self.highlighted = Some(0);
        }
    }

    pub fn clear_items(&mut self) {
        self.items.clear();
        self.highlighted = None;
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut [MenuItem] {
        &mut self.items
    }

    pub fn highlighted_index(&self) -> Option<usize> {
        self.highlighted
    }

    pub fn highlighted_item(&self) -> Option<&MenuItem> {
        self.highlighted.and_then(|i| self.items.get(i))
    }

    /// Move the cursor to `index` (clamped). No hook runs.
    pub fn set_highlight(&mut self, index: usize) {
        self.highlighted = if self.items.is_empty() {
            None
        } else {
            Some(index.min(self.items.len() - 1))
        };
    }

    /// Move the cursor onto the first item carrying `key`, if any.
    pub fn highlight_key(&mut self, key: u32) {
        if let Some(index) = self.items.iter().position(|i| i.key == Some(key)) {
            self.highlighted = Some(index);
        }
    }

    pub(super) fn step(&mut self, forward: bool) {
        let count = self.items.len();
        let Some(current) = self.highlighted.filter(|_| count > 0) else {
            return;
        };
        let next = if forward {
            (current + 1) % count
        } else if current == 0 {
            count - 1
        } else {
            current - 1
        };
        self.highlighted = Some(next);
        if let Some(item) = self.items.get_mut(next) {
            item.refresh();
        }
    }

    pub(super) fn refresh_highlighted(&mut self) {
        if let Some(item) = self.highlighted.and_then(|i| self.items.get_mut(i)) {
            item.refresh();
        }
    }

    pub(super) fn fire_opened(&mut self) {
        if let Some(mut hook) = self.on_opened.take() {
            hook(self);
            self.on_opened = Some(hook);
        }
    }

    pub(super) fn fire_closed(&mut self) {
        if let Some(mut hook) = self.on_closed.take() {
            hook(self);
            self.on_closed = Some(hook);
        }
    }

    pub(super) fn fire_rendered(&mut self, frame: &mut Frame) {
        if let Some(mut hook) = self.on_rendered.take() {
            hook(self, frame);
            self.on_rendered = Some(hook);
        }
    }
}
