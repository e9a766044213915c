use crate::Statement;

/// An ordered sequence of statements.
#[derive(Debug, Clone, Default)]
pub struct Block(Vec<Statement>);

impl Block {
    #[must_use]
    pub fn new(statements: Vec<Statement>) -> Self {
        Self(statements)
    }

    #[must_use]
    pub fn statements(&self) -> &[Statement] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<Vec<Statement>> for Block {
    fn from(statements: Vec<Statement>) -> Self {
        Self(statements)
    }
}

impl IntoIterator for Block {
    type Item = Statement;
    type IntoIter = std::vec::IntoIter<Statement>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Block {
    type Item = &'a Statement;
    type IntoIter = std::slice::Iter<'a, Statement>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
