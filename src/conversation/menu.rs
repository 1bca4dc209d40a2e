/// Where a click landed, relative to the per-message menus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickTarget {
    /// Inside the menu region (trigger or items) of the given message.
    Menu(String),
    Outside,
}

/// At most one per-message menu is open at a time.
#[derive(Debug, Clone, Default)]
pub struct MessageMenu {
    open: Option<String>,
}

impl MessageMenu {
    pub fn open_for(&self) -> Option<&str> {
        self.open.as_deref()
    }

    pub fn is_open(&self, message_id: &str) -> bool {
        self.open.as_deref() == Some(message_id)
    }

    pub fn toggle(&mut self, message_id: &str) {
        if self.is_open(message_id) {
            self.open = None;
        } else {
            self.open = Some(message_id.to_string());
        }
    }

    pub fn close(&mut self) {
        self.open = None;
    }

    /// Dismiss the open menu unless the click landed inside it.
    pub fn handle_click(&mut self, target: &ClickTarget) {
        match target {
            ClickTarget::Menu(id) if self.is_open(id) => {}
            _ => self.open = None,
        }
    }
}
