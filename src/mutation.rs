//! Table mutations produced from source records

/// A single cell write inside a row mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub family: String,
    pub qualifier: String,
    pub value: Vec<u8>,
}

impl Cell {
    pub fn new(family: impl Into<String>, qualifier: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            family: family.into(),
            qualifier: qualifier.into(),
            value,
        }
    }

    /// HBase column name, `family:qualifier`
    pub fn column(&self) -> String {
        format!("{}:{}", self.family, self.qualifier)
    }
}

/// One row's worth of writes: a row key and the cells to put under it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationSpec {
    pub row_key: Vec<u8>,
    pub cells: Vec<Cell>,
}

impl MutationSpec {
    pub fn new(row_key: impl Into<Vec<u8>>) -> Self {
        Self {
            row_key: row_key.into(),
            cells: Vec::new(),
        }
    }

    pub fn push(&mut self, cell: Cell) {
        self.cells.push(cell);
    }

    /// Find the cell written at a (family, qualifier) coordinate
    pub fn cell(&self, family: &str, qualifier: &str) -> Option<&Cell> {
        self.cells
            .iter()
            .find(|c| c.family == family && c.qualifier == qualifier)
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
