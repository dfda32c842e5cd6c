//! Small helpers to read and write the tab-delimited tables
//! used by the reconstruction models.

use std::collections::HashMap;
use std::io::BufRead;
use std::sync::Arc;

use globe::Pixelation;

use crate::model::ModelError;

/// Returns the pixelation for a table row: the given one (checking the
/// equator), or a new pixelation built from the equator of the table.
pub(crate) fn resolve_pixelation(
    pix: &mut Option<Arc<Pixelation>>,
    eq: usize,
    row: usize,
) -> Result<Arc<Pixelation>, ModelError> {
    match pix {
        Some(p) => {
            if p.equator() != eq {
                return Err(ModelError::PixelationMismatch {
                    row,
                    got: eq,
                    want: p.equator(),
                });
            }
            Ok(Arc::clone(p))
        }
        None => {
            let p = Arc::new(Pixelation::new(eq));
            *pix = Some(Arc::clone(&p));
            Ok(p)
        }
    }
}

/// A reader of tab-delimited rows that skips blank lines and `#`
/// comments, and locates columns by a lowercased header.
pub(crate) struct TsvReader<R: BufRead> {
    r: R,
    row: usize,
    fields: HashMap<String, usize>,
}

impl<R: BufRead> TsvReader<R> {
    /// Opens a table and reads its header, checking that all the
    /// required fields are present.
    pub(crate) fn new(r: R, required: &[&'static str]) -> Result<Self, ModelError> {
        let mut tsv = Self {
            r,
            row: 0,
            fields: HashMap::new(),
        };

        let head = match tsv.record()? {
            Some((_, head)) => head,
            None => return Err(ModelError::Empty),
        };
        for (i, h) in head.iter().enumerate() {
            tsv.fields.insert(h.to_lowercase(), i);
        }
        for &f in required {
            if !tsv.fields.contains_key(f) {
                return Err(ModelError::MissingField { field: f });
            }
        }
        Ok(tsv)
    }

    /// Returns the next data record with its row number,
    /// or `None` at the end of the input.
    pub(crate) fn record(&mut self) -> Result<Option<(usize, Vec<String>)>, ModelError> {
        loop {
            let mut ln = String::new();
            self.row += 1;
            if self.r.read_line(&mut ln)? == 0 {
                return Ok(None);
            }
            let ln = ln.trim_end_matches(['\n', '\r']);
            if ln.is_empty() || ln.starts_with('#') {
                continue;
            }
            let rec = ln.split('\t').map(|s| s.to_string()).collect();
            return Ok(Some((self.row, rec)));
        }
    }

    /// Returns the value of a named column in a record.
    pub(crate) fn field<'a>(
        &self,
        row: usize,
        rec: &'a [String],
        field: &'static str,
    ) -> Result<&'a str, ModelError> {
        let i = self.fields[field];
        rec.get(i)
            .map(|s| s.as_str())
            .ok_or_else(|| ModelError::Field {
                row,
                field,
                cause: "missing value".to_string(),
            })
    }

    /// Returns true if the header defines the named column.
    pub(crate) fn has_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Parses the value of a named column in a record.
    pub(crate) fn parse<T: std::str::FromStr>(
        &self,
        row: usize,
        rec: &[String],
        field: &'static str,
    ) -> Result<T, ModelError>
    where
        T::Err: std::fmt::Display,
    {
        let s = self.field(row, rec, field)?;
        s.parse().map_err(|e: T::Err| ModelError::Field {
            row,
            field,
            cause: e.to_string(),
        })
    }
}
