use std::collections::BTreeSet;

use crate::appointment::Appointment;
use crate::bucket::CellKey;
use crate::grid::GridView;

/// Per-view cap on appointments drawn directly in a cell before the
/// "+k more" affordance takes over. Fixed per view, not measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxVisible {
    pub day: usize,
    pub week: usize,
    pub month: usize,
}

impl Default for MaxVisible {
    fn default() -> Self {
        Self {
            day: 3,
            week: 3,
            month: 2,
        }
    }
}

impl MaxVisible {
    pub fn for_view(&self, view: GridView) -> usize {
        match view {
            GridView::Day => self.day,
            GridView::Week => self.week,
            GridView::Month => self.month,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StackResolution<'b, 'a> {
    pub visible: &'b [&'a Appointment],
    pub hidden_count: usize,
}

impl StackResolution<'_, '_> {
    pub fn len(&self) -> usize {
        self.visible.len() + self.hidden_count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_truncated(&self) -> bool {
        self.hidden_count > 0
    }
}

pub fn resolve_stack<'b, 'a>(
    bucket: &'b [&'a Appointment],
    max_visible: usize,
    expanded: bool,
) -> StackResolution<'b, 'a> {
    if expanded || bucket.len() <= max_visible {
        return StackResolution {
            visible: bucket,
            hidden_count: 0,
        };
    }

    StackResolution {
        visible: &bucket[..max_visible],
        hidden_count: bucket.len() - max_visible,
    }
}

/// Cells whose overlap stack the viewer has expanded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpandedCells {
    cells: BTreeSet<CellKey>,
}

impl ExpandedCells {
    pub fn contains(&self, key: &CellKey) -> bool {
        self.cells.contains(key)
    }

    pub fn expand(&mut self, key: CellKey) {
        self.cells.insert(key);
    }

    pub fn collapse(&mut self, key: &CellKey) {
        self.cells.remove(key);
    }

    /// Returns whether the cell is expanded after toggling.
    pub fn toggle(&mut self, key: CellKey) -> bool {
        if self.cells.remove(&key) {
            false
        } else {
            self.cells.insert(key);
            true
        }
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CellKey> {
        self.cells.iter()
    }
}

impl FromIterator<CellKey> for ExpandedCells {
    fn from_iter<I: IntoIterator<Item = CellKey>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}
