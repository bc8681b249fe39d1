//! The shared "selected country" cell.
//!
//! Exactly one [`SelectionDispatch`] writes; any number of
//! [`SelectionReader`]s observe. Single-threaded by construction.

use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Default)]
struct SelectionCell {
    country: Option<String>,
    version: u64,
}

/// The only writer of the selected country.
#[derive(Debug)]
pub struct SelectionDispatch {
    cell: Rc<RefCell<SelectionCell>>,
}

/// Read-only view of the selected country.
#[derive(Debug, Clone)]
pub struct SelectionReader {
    cell: Rc<RefCell<SelectionCell>>,
}

/// Create an empty selection cell and its two handles.
pub fn selected_country() -> (SelectionDispatch, SelectionReader) {
    let cell = Rc::new(RefCell::new(SelectionCell::default()));
    (
        SelectionDispatch {
            cell: Rc::clone(&cell),
        },
        SelectionReader { cell },
    )
}

/// Outcome of a [`SelectionDispatch::select`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionChange {
    pub previous: Option<String>,
    pub version: u64,
}

impl SelectionChange {
    /// The cell went from empty to a country.
    pub fn is_first(&self) -> bool {
        self.previous.is_none()
    }
}

impl SelectionDispatch {
    /// Select a country by display name. Every call bumps the version,
    /// re-selecting the same country included.
    pub fn select(&self, name: impl Into<String>) -> SelectionChange {
        let mut cell = self.cell.borrow_mut();
        cell.version += 1;
        let previous = cell.country.replace(name.into());
        SelectionChange {
            previous,
            version: cell.version,
        }
    }

    pub fn reader(&self) -> SelectionReader {
        SelectionReader {
            cell: Rc::clone(&self.cell),
        }
    }
}

impl SelectionReader {
    pub fn get(&self) -> Option<String> {
        self.cell.borrow().country.clone()
    }

    pub fn version(&self) -> u64 {
        self.cell.borrow().version
    }
}
