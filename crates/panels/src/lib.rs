pub mod date_selector;
pub mod sidebar;

pub use date_selector::{DateField, DateSelector, DateSelectorView};
pub use sidebar::{EventQuery, EventQueryError, EventSidebar, EventSummary, SidebarView};
