use super::ScriptError;

/// Maximum combined size of the main and alt stacks.
pub const MAX_STACK_SIZE: usize = 1000;
/// Maximum size of a single stack element.
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 520;

/// Evaluation stack.
///
/// Indexing with [`Stack::top`] counts from the top the way the opcode
/// descriptions do: `top(1)` is the topmost element.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Stack {
    items: Vec<Vec<u8>>,
}

impl Stack {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn from_items(items: Vec<Vec<u8>>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push(&mut self, data: Vec<u8>) {
        self.items.push(data);
    }

    pub fn pop(&mut self) -> Result<Vec<u8>, ScriptError> {
        self.items.pop().ok_or(ScriptError::InvalidStackOperation)
    }

    /// Element `depth` positions from the top, starting at 1.
    pub fn top(&self, depth: usize) -> Result<&Vec<u8>, ScriptError> {
        self.index_of(depth).map(|idx| &self.items[idx])
    }

    pub fn last(&self) -> Option<&Vec<u8>> {
        self.items.last()
    }

    /// Removes and returns the element `depth` positions from the top.
    pub fn remove(&mut self, depth: usize) -> Result<Vec<u8>, ScriptError> {
        let idx = self.index_of(depth)?;
        Ok(self.items.remove(idx))
    }

    /// Inserts `data` underneath the top `depth` elements.
    pub fn insert_below(&mut self, depth: usize, data: Vec<u8>) -> Result<(), ScriptError> {
        self.require(depth)?;
        let idx = self.items.len() - depth;
        self.items.insert(idx, data);
        Ok(())
    }

    pub fn swap(&mut self, a: usize, b: usize) -> Result<(), ScriptError> {
        let a = self.index_of(a)?;
        let b = self.index_of(b)?;
        self.items.swap(a, b);
        Ok(())
    }

    pub fn require(&self, count: usize) -> Result<(), ScriptError> {
        if self.items.len() < count {
            Err(ScriptError::InvalidStackOperation)
        } else {
            Ok(())
        }
    }

    pub fn truncate(&mut self, len: usize) {
        self.items.truncate(len);
    }

    pub fn drain_top(&mut self, count: usize) -> Result<Vec<Vec<u8>>, ScriptError> {
        self.require(count)?;
        let start = self.items.len() - count;
        Ok(self.items.drain(start..).collect())
    }

    fn index_of(&self, depth: usize) -> Result<usize, ScriptError> {
        if depth == 0 || depth > self.items.len() {
            return Err(ScriptError::InvalidStackOperation);
        }
        Ok(self.items.len() - depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack(values: &[u8]) -> Stack {
        Stack::from_items(values.iter().map(|v| vec![*v]).collect())
    }

    #[test]
    fn top_counts_from_one() {
        let s = stack(&[1, 2, 3]);
        assert_eq!(s.top(1).unwrap(), &vec![3]);
        assert_eq!(s.top(3).unwrap(), &vec![1]);
        assert_eq!(s.top(0), Err(ScriptError::InvalidStackOperation));
        assert_eq!(s.top(4), Err(ScriptError::InvalidStackOperation));
    }

    #[test]
    fn insert_below_top() {
        let mut s = stack(&[1, 2]);
        s.insert_below(1, vec![9]).unwrap();
        assert_eq!(s, stack(&[1, 9, 2]));
        s.insert_below(3, vec![8]).unwrap();
        assert_eq!(s, stack(&[8, 1, 9, 2]));
        assert!(s.insert_below(5, vec![7]).is_err());
    }

    #[test]
    fn remove_and_swap() {
        let mut s = stack(&[1, 2, 3, 4]);
        assert_eq!(s.remove(3).unwrap(), vec![2]);
        s.swap(1, 3).unwrap();
        assert_eq!(s, stack(&[4, 3, 1]));
    }

    #[test]
    fn drain_top_keeps_order() {
        let mut s = stack(&[1, 2, 3]);
        assert_eq!(s.drain_top(2).unwrap(), vec![vec![2], vec![3]]);
        assert_eq!(s, stack(&[1]));
        assert!(s.drain_top(2).is_err());
    }
}
