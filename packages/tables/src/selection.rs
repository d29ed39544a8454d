//! Editor selections: a plain text range or a rectangle of table cells.

use serde::{Deserialize, Serialize};
use tabula_model::{Mapping, Node, ResolvedPos, Slice};

use crate::cell_selection::CellSelection;
use crate::errors::TableResult;
use crate::state::Transaction;
use crate::table_map::Direction;

#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Text(TextSelection),
    Cell(CellSelection),
}

/// Serialized selection, tagged by `kind`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SelectionJson {
    Text { anchor: usize, head: usize },
    Cell { anchor: usize, head: usize },
}

impl Selection {
    pub fn from(&self) -> usize {
        match self {
            Selection::Text(sel) => sel.from(),
            Selection::Cell(sel) => sel.from(),
        }
    }

    pub fn to(&self) -> usize {
        match self {
            Selection::Text(sel) => sel.to(),
            Selection::Cell(sel) => sel.to(),
        }
    }

    pub fn anchor(&self) -> usize {
        match self {
            Selection::Text(sel) => sel.anchor.pos,
            Selection::Cell(sel) => sel.anchor_cell().pos,
        }
    }

    pub fn head(&self) -> usize {
        match self {
            Selection::Text(sel) => sel.head.pos,
            Selection::Cell(sel) => sel.head_cell().pos,
        }
    }

    /// Resolved head of the selection
    pub fn head_pos(&self) -> ResolvedPos {
        match self {
            Selection::Text(sel) => sel.head.clone(),
            Selection::Cell(sel) => sel.head_cell().clone(),
        }
    }

    pub fn is_cell(&self) -> bool {
        matches!(self, Selection::Cell(_))
    }

    pub fn as_cell(&self) -> Option<&CellSelection> {
        match self {
            Selection::Cell(sel) => Some(sel),
            Selection::Text(_) => None,
        }
    }

    /// Translate the selection into `doc` through `mapping`
    pub fn map(&self, doc: &Node, mapping: &Mapping) -> TableResult<Selection> {
        match self {
            Selection::Text(sel) => sel.map(doc, mapping),
            Selection::Cell(sel) => sel.map(doc, mapping),
        }
    }

    pub fn content(&self) -> TableResult<Slice> {
        match self {
            Selection::Text(sel) => sel.content(),
            Selection::Cell(sel) => sel.content(),
        }
    }

    /// Replace the selected content in `tr` and move the selection after it
    pub fn replace(&self, tr: &mut Transaction, content: Slice) -> TableResult<()> {
        match self {
            Selection::Text(sel) => sel.replace(tr, content),
            Selection::Cell(sel) => sel.replace(tr, content),
        }
    }

    pub fn to_json(&self) -> SelectionJson {
        match self {
            Selection::Text(sel) => SelectionJson::Text {
                anchor: sel.anchor.pos,
                head: sel.head.pos,
            },
            Selection::Cell(sel) => SelectionJson::Cell {
                anchor: sel.anchor_cell().pos,
                head: sel.head_cell().pos,
            },
        }
    }

    pub fn from_json(doc: &Node, json: &SelectionJson) -> TableResult<Selection> {
        match *json {
            SelectionJson::Text { anchor, head } => {
                Ok(Selection::Text(TextSelection::create(doc, anchor, head)?))
            }
            SelectionJson::Cell { anchor, head } => {
                Ok(Selection::Cell(CellSelection::create(doc, anchor, head)?))
            }
        }
    }

    /// Text selection near the start of the document
    pub fn at_start(doc: &Node) -> TableResult<Selection> {
        let start = doc.resolve(0)?;
        Ok(Selection::Text(TextSelection::near(&start, Direction::Forward)?))
    }
}

impl From<TextSelection> for Selection {
    fn from(sel: TextSelection) -> Self {
        Selection::Text(sel)
    }
}

impl From<CellSelection> for Selection {
    fn from(sel: CellSelection) -> Self {
        Selection::Cell(sel)
    }
}

/// Range between two positions, normally inside textblocks
#[derive(Clone)]
pub struct TextSelection {
    pub anchor: ResolvedPos,
    pub head: ResolvedPos,
}

impl TextSelection {
    pub fn new(anchor: ResolvedPos, head: ResolvedPos) -> TextSelection {
        TextSelection { anchor, head }
    }

    pub fn cursor(pos: ResolvedPos) -> TextSelection {
        TextSelection::new(pos.clone(), pos)
    }

    pub fn create(doc: &Node, anchor: usize, head: usize) -> TableResult<TextSelection> {
        Ok(TextSelection::new(doc.resolve(anchor)?, doc.resolve(head)?))
    }

    pub fn from(&self) -> usize {
        self.anchor.pos.min(self.head.pos)
    }

    pub fn to(&self) -> usize {
        self.anchor.pos.max(self.head.pos)
    }

    pub fn is_empty(&self) -> bool {
        self.anchor.pos == self.head.pos
    }

    /// Selection between two positions, moving endpoints that are not inside
    /// a textblock to the nearest one. `bias` picks the search direction for
    /// a collapsed range.
    pub fn between(anchor: &ResolvedPos, head: &ResolvedPos, bias: Option<Direction>) -> TableResult<TextSelection> {
        let d_pos = anchor.pos as isize - head.pos as isize;
        let bias = match bias {
            Some(bias) if d_pos == 0 => bias,
            _ if d_pos >= 0 => Direction::Forward,
            _ => Direction::Backward,
        };
        let mut head = head.clone();
        if !head.parent().is_textblock() {
            match find_text_pos(&head, bias)?.or(find_text_pos(&head, reverse(bias))?) {
                Some(found) => head = found,
                None => return TextSelection::near(&head, bias),
            }
        }
        let mut anchor = anchor.clone();
        if !anchor.parent().is_textblock() {
            if d_pos == 0 {
                anchor = head.clone();
            } else {
                anchor = find_text_pos(&anchor, reverse(bias))?
                    .or(find_text_pos(&anchor, bias)?)
                    .unwrap_or_else(|| head.clone());
                if (anchor.pos < head.pos) != (d_pos < 0) {
                    anchor = head.clone();
                }
            }
        }
        Ok(TextSelection::new(anchor, head))
    }

    /// Cursor in the nearest textblock, searching in `dir` first. Falls back
    /// to a cursor at `pos` when the document has no textblock.
    pub fn near(pos: &ResolvedPos, dir: Direction) -> TableResult<TextSelection> {
        let found = match find_text_pos(pos, dir)? {
            Some(found) => Some(found),
            None => find_text_pos(pos, reverse(dir))?,
        };
        Ok(TextSelection::cursor(found.unwrap_or_else(|| pos.clone())))
    }

    fn map(&self, doc: &Node, mapping: &Mapping) -> TableResult<Selection> {
        let head = doc.resolve(mapping.map(self.head.pos))?;
        if !head.parent().is_textblock() {
            return Ok(TextSelection::near(&head, Direction::Forward)?.into());
        }
        let anchor = doc.resolve(mapping.map(self.anchor.pos))?;
        let anchor = if anchor.parent().is_textblock() {
            anchor
        } else {
            head.clone()
        };
        Ok(TextSelection::new(anchor, head).into())
    }

    fn content(&self) -> TableResult<Slice> {
        Ok(self.anchor.doc().slice(self.from(), self.to())?)
    }

    fn replace(&self, tr: &mut Transaction, content: Slice) -> TableResult<()> {
        let map_from = tr.steps().len();
        tr.replace(self.from(), self.to(), content)?;
        let end = tr.mapping().slice(map_from).map(self.to());
        let end = tr.doc().resolve(end)?;
        let sel = TextSelection::near(&end, Direction::Backward)?;
        tr.set_selection(sel.into());
        Ok(())
    }
}

impl PartialEq for TextSelection {
    fn eq(&self, other: &Self) -> bool {
        self.anchor.pos == other.anchor.pos && self.head.pos == other.head.pos
    }
}

impl std::fmt::Debug for TextSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TextSelection({}, {})", self.anchor.pos, self.head.pos)
    }
}

fn reverse(dir: Direction) -> Direction {
    match dir {
        Direction::Forward => Direction::Backward,
        Direction::Backward => Direction::Forward,
    }
}

/// First position inside a textblock reached from `pos` in direction `dir`
pub(crate) fn find_text_pos(pos: &ResolvedPos, dir: Direction) -> TableResult<Option<ResolvedPos>> {
    if pos.parent().is_textblock() {
        return Ok(Some(pos.clone()));
    }
    let doc = pos.doc();
    if let Some(found) = find_in(doc, pos.parent(), pos.pos, pos.index(pos.depth()), dir)? {
        return Ok(Some(found));
    }
    for depth in (0..pos.depth()).rev() {
        let found = match dir {
            Direction::Backward => find_in(doc, pos.node(depth), pos.before(depth + 1), pos.index(depth), dir)?,
            Direction::Forward => find_in(doc, pos.node(depth), pos.after(depth + 1), pos.index(depth) + 1, dir)?,
        };
        if found.is_some() {
            return Ok(found);
        }
    }
    Ok(None)
}

fn find_in(doc: &Node, node: &Node, pos: usize, index: usize, dir: Direction) -> TableResult<Option<ResolvedPos>> {
    if node.is_textblock() {
        return Ok(Some(doc.resolve(pos)?));
    }
    let mut pos = pos;
    match dir {
        Direction::Forward => {
            for child in node.content().iter().skip(index) {
                if !child.is_text() {
                    if let Some(found) = find_in(doc, child, pos + 1, 0, dir)? {
                        return Ok(Some(found));
                    }
                }
                pos += child.node_size();
            }
        }
        Direction::Backward => {
            for i in (0..index.min(node.child_count())).rev() {
                let child = node.child(i);
                if !child.is_text() {
                    if let Some(found) = find_in(doc, child, pos - 1, child.child_count(), dir)? {
                        return Ok(Some(found));
                    }
                }
                pos -= child.node_size();
            }
        }
    }
    Ok(None)
}
