use thiserror::Error;

/// 已排序（start <= end）的文字範圍，以位元組為單位。 / Ordered byte range inside the editor text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Selection {
    start: usize,
    end: usize,
}

impl Selection {
    /// 建立新的選取範圍，會自動將 start/end 排序。 / Creates a selection with automatically ordered bounds.
    pub fn new(a: usize, b: usize) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// 編輯器錯誤。 / Errors raised by cursor and selection edits.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditorError {
    #[error("offset {offset} is out of bounds for text of length {len}")]
    OutOfBounds { offset: usize, len: usize },
    #[error("offset {0} does not fall on a character boundary")]
    NotCharBoundary(usize),
}

/// Markdown 檢視使用的單游標編輯器。 / Single-cursor editor surface backing the markdown view.
///
/// Offsets are byte offsets and must sit on character boundaries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Editor {
    value: String,
    cursor: usize,
    selection: Option<Selection>,
}

impl Editor {
    /// 從給定文字建立編輯器，游標位於開頭。 / Creates an editor with the cursor at the start.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            value: text.into(),
            cursor: 0,
            selection: None,
        }
    }

    pub fn get_value(&self) -> &str {
        &self.value
    }

    /// 取代全部內容並將游標移到開頭。 / Replaces the whole text and resets the cursor.
    pub fn set_value(&mut self, text: impl Into<String>) {
        self.value = text.into();
        self.cursor = 0;
        self.selection = None;
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn set_cursor(&mut self, offset: usize) -> Result<(), EditorError> {
        self.check_offset(offset)?;
        self.cursor = offset;
        self.selection = None;
        Ok(())
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    /// 設定選取範圍；游標移至 `head`。 / Selects from `anchor` to `head`, leaving the cursor on `head`.
    pub fn set_selection(&mut self, anchor: usize, head: usize) -> Result<(), EditorError> {
        self.check_offset(anchor)?;
        self.check_offset(head)?;
        let selection = Selection::new(anchor, head);
        self.cursor = head;
        self.selection = (!selection.is_empty()).then_some(selection);
        Ok(())
    }

    pub fn select_all(&mut self) {
        let len = self.value.len();
        self.cursor = len;
        self.selection = (len > 0).then(|| Selection::new(0, len));
    }

    /// 目前選取的文字；沒有選取時為空字串。 / Currently selected text, empty when nothing is selected.
    pub fn get_selection(&self) -> &str {
        match self.selection {
            Some(selection) => &self.value[selection.start..selection.end],
            None => "",
        }
    }

    pub fn has_selection(&self) -> bool {
        self.selection.is_some()
    }

    /// 以文字取代選取範圍（或於游標處插入）。 / Replaces the selection, or inserts at the cursor.
    pub fn replace_selection(&mut self, text: &str) {
        let (start, end) = self.edit_range();
        self.value.replace_range(start..end, text);
        self.cursor = start + text.len();
        self.selection = None;
    }

    /// 模擬 Backspace。 / Deletes the selection or the character before the cursor.
    pub fn delete_backward(&mut self) {
        if self.selection.is_some() {
            self.replace_selection("");
            return;
        }
        if let Some(prev) = prev_char_boundary(&self.value, self.cursor) {
            self.value.replace_range(prev..self.cursor, "");
            self.cursor = prev;
        }
    }

    pub fn line_count(&self) -> usize {
        self.value.lines().count().max(1)
    }

    fn edit_range(&self) -> (usize, usize) {
        match self.selection {
            Some(selection) => (selection.start, selection.end),
            None => (self.cursor, self.cursor),
        }
    }

    fn check_offset(&self, offset: usize) -> Result<(), EditorError> {
        if offset > self.value.len() {
            return Err(EditorError::OutOfBounds {
                offset,
                len: self.value.len(),
            });
        }
        if !self.value.is_char_boundary(offset) {
            return Err(EditorError::NotCharBoundary(offset));
        }
        Ok(())
    }
}

fn prev_char_boundary(text: &str, index: usize) -> Option<usize> {
    if index == 0 || index > text.len() {
        return None;
    }
    text[..index].char_indices().last().map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_selection_moves_cursor_after_insert() {
        let mut editor = Editor::new("hello world");
        editor.set_selection(6, 11).unwrap();
        assert_eq!(editor.get_selection(), "world");
        editor.replace_selection("there");
        assert_eq!(editor.get_value(), "hello there");
        assert_eq!(editor.cursor(), 11);
        assert!(!editor.has_selection());
    }

    #[test]
    fn insert_at_cursor_without_selection() {
        let mut editor = Editor::new("ac");
        editor.set_cursor(1).unwrap();
        editor.replace_selection("b");
        assert_eq!(editor.get_value(), "abc");
        assert_eq!(editor.get_selection(), "");
    }

    #[test]
    fn offsets_are_validated() {
        let mut editor = Editor::new("你好");
        assert_eq!(
            editor.set_cursor(1),
            Err(EditorError::NotCharBoundary(1))
        );
        assert_eq!(
            editor.set_selection(0, 99),
            Err(EditorError::OutOfBounds { offset: 99, len: 6 })
        );
    }

    #[test]
    fn delete_backward_handles_utf8() {
        let mut editor = Editor::new("你好");
        editor.set_cursor("你好".len()).unwrap();
        editor.delete_backward();
        assert_eq!(editor.get_value(), "你");
        assert_eq!(editor.cursor(), "你".len());
    }

    #[test]
    fn set_value_resets_cursor() {
        let mut editor = Editor::new("abc");
        editor.select_all();
        assert_eq!(editor.get_selection(), "abc");
        editor.set_value("xyz\nline");
        assert_eq!(editor.cursor(), 0);
        assert!(editor.selection().is_none());
        assert_eq!(editor.line_count(), 2);
    }
}
