//! Column-oriented tabular container shared by the training pipeline and the API.
//!
//! Columns are either numeric (`f64`) or categorical (`String`). Column order is
//! significant and preserved by every operation.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Numeric(Vec<f64>),
    Categorical(Vec<String>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(values) => values.len(),
            Column::Categorical(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            Column::Numeric(_) => ColumnKind::Numeric,
            Column::Categorical(_) => ColumnKind::Categorical,
        }
    }

    pub fn as_numeric(&self) -> Option<&[f64]> {
        match self {
            Column::Numeric(values) => Some(values),
            Column::Categorical(_) => None,
        }
    }

    pub fn as_categorical(&self) -> Option<&[String]> {
        match self {
            Column::Categorical(values) => Some(values),
            Column::Numeric(_) => None,
        }
    }

    fn take(&self, indices: &[usize]) -> Column {
        match self {
            Column::Numeric(values) => Column::Numeric(indices.iter().map(|&i| values[i]).collect()),
            Column::Categorical(values) => {
                Column::Categorical(indices.iter().map(|&i| values[i].clone()).collect())
            }
        }
    }
}

/// Ordered set of equally long, uniquely named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataFrame {
    names: Vec<String>,
    columns: Vec<Column>,
}

impl DataFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_columns<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Column)>,
        S: Into<String>,
    {
        let mut frame = Self::new();
        for (name, column) in columns {
            frame.push_column(name, column)?;
        }
        Ok(frame)
    }

    pub fn push_column(&mut self, name: impl Into<String>, column: Column) -> Result<()> {
        let name = name.into();
        if self.has_column(&name) {
            return Err(CoreError::Schema(format!("duplicate column '{}'", name)));
        }
        if !self.columns.is_empty() && column.len() != self.height() {
            return Err(CoreError::Schema(format!(
                "column '{}' has {} rows, expected {}",
                name,
                column.len(),
                self.height()
            )));
        }
        self.names.push(name);
        self.columns.push(column);
        Ok(())
    }

    pub fn height(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.height(), self.width())
    }

    pub fn is_empty(&self) -> bool {
        self.height() == 0
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| &self.columns[idx])
    }

    /// Names from `required` that are not present in this frame, in the order given.
    pub fn missing_columns<S: AsRef<str>>(&self, required: &[S]) -> Vec<String> {
        required
            .iter()
            .map(AsRef::as_ref)
            .filter(|name| !self.has_column(name))
            .map(str::to_string)
            .collect()
    }

    /// Project onto `names`, in that order.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<DataFrame> {
        let missing = self.missing_columns(names);
        if !missing.is_empty() {
            return Err(CoreError::Schema(format!(
                "missing columns: {}",
                missing.join(", ")
            )));
        }
        let mut out = DataFrame::new();
        for name in names {
            let name = name.as_ref();
            if let Some(column) = self.column(name) {
                out.push_column(name, column.clone())?;
            }
        }
        Ok(out)
    }

    /// Borrow a numeric column, failing if it is absent or categorical.
    pub fn numeric(&self, name: &str) -> Result<&[f64]> {
        match self.column(name) {
            Some(Column::Numeric(values)) => Ok(values),
            Some(Column::Categorical(_)) => Err(CoreError::Schema(format!(
                "column '{}' is categorical, expected numeric",
                name
            ))),
            None => Err(CoreError::Schema(format!("missing column '{}'", name))),
        }
    }

    /// Rows at `indices`, in that order.
    pub fn take(&self, indices: &[usize]) -> Result<DataFrame> {
        let height = self.height();
        if let Some(bad) = indices.iter().find(|&&i| i >= height) {
            return Err(CoreError::InvalidData(format!(
                "row index {} out of bounds for {} rows",
                bad, height
            )));
        }
        Ok(DataFrame {
            names: self.names.clone(),
            columns: self.columns.iter().map(|c| c.take(indices)).collect(),
        })
    }

    pub fn read_csv(path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| {
            CoreError::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {}", path.display(), e),
            ))
        })?;
        Self::from_csv_reader(file)
    }

    /// Parse headered CSV. A column is numeric when every non-empty cell parses
    /// as a float (empty cells become NaN); otherwise it is categorical.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<DataFrame> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();

        let mut seen = HashSet::new();
        if let Some(dup) = headers.iter().find(|h| !seen.insert(h.as_str())) {
            return Err(CoreError::Schema(format!("duplicate column '{}'", dup)));
        }

        let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
        for record in rdr.records() {
            let record = record?;
            for (idx, value) in record.iter().enumerate() {
                cells[idx].push(value.to_string());
            }
        }

        let mut frame = DataFrame::new();
        for (name, raw) in headers.into_iter().zip(cells) {
            frame.push_column(name, infer_column(raw))?;
        }
        Ok(frame)
    }
}

fn infer_column(raw: Vec<String>) -> Column {
    let any_value = raw.iter().any(|v| !v.is_empty());
    let numeric: Option<Vec<f64>> = raw
        .iter()
        .map(|v| {
            if v.is_empty() {
                Some(f64::NAN)
            } else {
                v.parse::<f64>().ok()
            }
        })
        .collect();

    match numeric {
        Some(values) if any_value => Column::Numeric(values),
        _ => Column::Categorical(raw),
    }
}
