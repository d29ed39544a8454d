use crate::Fragment;

/// A piece of document content. `open_start` and `open_end` count how many
/// levels of nodes at each side are cut open rather than complete.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Slice {
    pub content: Fragment,
    pub open_start: usize,
    pub open_end: usize,
}

impl Slice {
    pub fn new(content: Fragment, open_start: usize, open_end: usize) -> Slice {
        Slice {
            content,
            open_start,
            open_end,
        }
    }

    pub fn empty() -> Slice {
        Slice::default()
    }

    /// Closed slice over a fragment
    pub fn closed(content: Fragment) -> Slice {
        Slice::new(content, 0, 0)
    }

    /// Size the slice adds to a document when inserted
    pub fn size(&self) -> usize {
        self.content
            .size()
            .saturating_sub(self.open_start + self.open_end)
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}
