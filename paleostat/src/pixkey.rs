//! A key relating raster values in a landscape pixelation to labels
//! and a simple color table.

use std::collections::{BTreeMap, HashMap};
use std::io::{BufRead, Write};

use image::Rgb;
use thiserror::Error;

/// Errors from handling a pixel key table.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The input has no data rows.
    #[error("empty input table")]
    Empty,

    /// A required column is missing from the header.
    #[error("expecting field {field:?}")]
    MissingField {
        /// Name of the missing column.
        field: &'static str,
    },

    /// A column of a row could not be parsed.
    #[error("on row {row}: field {field:?}: {cause}")]
    Field {
        /// Row of the malformed value.
        row: usize,
        /// Name of the malformed column.
        field: &'static str,
        /// Description of the failure.
        cause: String,
    },

    /// A key value defined twice.
    #[error("on row {row}: key {key} already used")]
    DuplicateKey {
        /// Row of the repetition.
        row: usize,
        /// The repeated key.
        key: i32,
    },

    /// A label in use by another key.
    #[error("label {label:?} already in use")]
    DuplicateLabel {
        /// The repeated label.
        label: String,
    },

    /// The underlying reader or writer failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A key that stores the labels and color values
/// for the raster values of a pixelation.
///
/// Labels are case folded and whitespace normalized,
/// and must be unique across keys.
#[derive(Debug, Default)]
pub struct PixKey {
    values: HashMap<String, i32>,
    labels: BTreeMap<i32, String>,

    color: BTreeMap<i32, Rgb<u8>>,
    gray: BTreeMap<i32, u8>,
}

impl PixKey {
    /// Creates an empty key store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the color associated with a given value.
    pub fn color(&self, v: i32) -> Option<Rgb<u8>> {
        self.color.get(&v).copied()
    }

    /// Returns the gray color associated with a given value.
    pub fn gray(&self, v: i32) -> Option<Rgb<u8>> {
        self.gray.get(&v).map(|&g| Rgb([g, g, g]))
    }

    /// Returns true if a gray scale is defined for the keys.
    pub fn has_gray_scale(&self) -> bool {
        !self.gray.is_empty()
    }

    /// Returns the key value for a given label,
    /// or 0 if the label is not defined.
    pub fn key(&self, label: &str) -> i32 {
        let label = normalize_label(label);
        if label.is_empty() {
            return 0;
        }
        self.values.get(&label).copied().unwrap_or(0)
    }

    /// Returns the defined key values, in ascending order.
    pub fn keys(&self) -> Vec<i32> {
        self.color.keys().copied().collect()
    }

    /// Returns the label for a given key value.
    pub fn label(&self, v: i32) -> &str {
        self.labels.get(&v).map(|l| l.as_str()).unwrap_or_default()
    }

    /// Sets a color to be associated with a given value.
    pub fn set_color(&mut self, c: Rgb<u8>, v: i32) {
        self.color.insert(v, c);
    }

    /// Sets a gray level to be associated with a given value.
    pub fn set_gray(&mut self, gray: u8, v: i32) {
        self.gray.insert(v, gray);
    }

    /// Sets the label of a given key value. Empty labels and values
    /// without a color are ignored; a label used by another key is an
    /// error.
    pub fn set_label(&mut self, v: i32, label: &str) -> Result<(), KeyError> {
        let label = normalize_label(label);
        if label.is_empty() {
            return Ok(());
        }
        if !self.color.contains_key(&v) {
            return Ok(());
        }

        if let Some(l) = self.labels.get(&v) {
            if *l == label {
                return Ok(());
            }
        }
        if self.values.contains_key(&label) {
            return Err(KeyError::DuplicateLabel { label });
        }

        if let Some(old) = self.labels.insert(v, label.clone()) {
            self.values.remove(&old);
        }
        self.values.insert(label, v);
        Ok(())
    }

    /// Reads a key file used to define the colors for the raster values
    /// of a pixelation: a TSV table with the required columns `key` and
    /// `color` (an RGB triplet like "125, 132, 148"), and the optional
    /// columns `label` and `gray`. Any other column is ignored.
    pub fn read_tsv(r: impl BufRead) -> Result<Self, KeyError> {
        let mut lines = r.lines().enumerate();

        let mut fields: HashMap<String, usize> = HashMap::new();
        for (_, ln) in lines.by_ref() {
            let ln = ln?;
            if ln.trim().is_empty() || ln.starts_with('#') {
                continue;
            }
            for (i, h) in ln.split('\t').enumerate() {
                fields.insert(h.to_lowercase(), i);
            }
            break;
        }
        for f in ["key", "color"] {
            if !fields.contains_key(f) {
                return Err(KeyError::MissingField { field: f });
            }
        }

        let mut pk = Self::new();
        for (i, ln) in lines {
            let row = i + 1;
            let ln = ln?;
            if ln.trim().is_empty() || ln.starts_with('#') {
                continue;
            }
            let cols: Vec<&str> = ln.split('\t').collect();

            let k: i32 = get_field(&cols, &fields, row, "key")?
                .parse()
                .map_err(|e: std::num::ParseIntError| KeyError::Field {
                    row,
                    field: "key",
                    cause: e.to_string(),
                })?;
            if pk.color.contains_key(&k) {
                return Err(KeyError::DuplicateKey { row, key: k });
            }

            let c = parse_color(get_field(&cols, &fields, row, "color")?, row)?;
            pk.color.insert(k, c);

            let mut label = k.to_string();
            if fields.contains_key("label") {
                let l = normalize_label(get_field(&cols, &fields, row, "label")?);
                if !l.is_empty() {
                    label = l;
                }
            }
            if pk.values.contains_key(&label) {
                return Err(KeyError::DuplicateLabel { label });
            }
            pk.values.insert(label.clone(), k);
            pk.labels.insert(k, label);

            if let Some(&gc) = fields.get("gray") {
                let s = cols.get(gc).map(|s| s.trim()).unwrap_or_default();
                if s.is_empty() {
                    continue;
                }
                let gray: u16 = s.parse().map_err(|e: std::num::ParseIntError| {
                    KeyError::Field {
                        row,
                        field: "gray",
                        cause: e.to_string(),
                    }
                })?;
                if gray > 255 {
                    return Err(KeyError::Field {
                        row,
                        field: "gray",
                        cause: format!("invalid value {gray}"),
                    });
                }
                pk.gray.insert(k, gray as u8);
            }
        }

        if pk.color.is_empty() {
            return Err(KeyError::Empty);
        }
        Ok(pk)
    }

    /// Encodes the key as a TSV table, in ascending key order.
    pub fn write_tsv(&self, mut w: impl Write) -> Result<(), KeyError> {
        writeln!(w, "# pixelation value keys")?;
        if self.has_gray_scale() {
            writeln!(w, "key\tlabel\tcolor\tgray")?;
        } else {
            writeln!(w, "key\tlabel\tcolor")?;
        }

        for (k, c) in &self.color {
            let label = self.label(*k);
            let Rgb([r, g, b]) = *c;
            if self.has_gray_scale() {
                let gray = self
                    .gray
                    .get(k)
                    .map(|g| g.to_string())
                    .unwrap_or_default();
                writeln!(w, "{k}\t{label}\t{r}, {g}, {b}\t{gray}")?;
            } else {
                writeln!(w, "{k}\t{label}\t{r}, {g}, {b}")?;
            }
        }
        Ok(())
    }
}

/// Case folds and whitespace normalizes a label.
fn normalize_label(label: &str) -> String {
    label
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn get_field<'a>(
    cols: &'a [&str],
    fields: &HashMap<String, usize>,
    row: usize,
    field: &'static str,
) -> Result<&'a str, KeyError> {
    let i = fields[field];
    cols.get(i).copied().ok_or_else(|| KeyError::Field {
        row,
        field,
        cause: "missing value".to_string(),
    })
}

fn parse_color(s: &str, row: usize) -> Result<Rgb<u8>, KeyError> {
    let val: Vec<&str> = s.split(',').collect();
    if val.len() != 3 {
        return Err(KeyError::Field {
            row,
            field: "color",
            cause: format!("found {} values, want 3", val.len()),
        });
    }

    let mut rgb = [0u8; 3];
    for (channel, (v, name)) in val.iter().zip(["red", "green", "blue"]).enumerate() {
        let c: u16 = v
            .trim()
            .parse()
            .map_err(|e: std::num::ParseIntError| KeyError::Field {
                row,
                field: "color",
                cause: format!("{name} value: {e}"),
            })?;
        if c > 255 {
            return Err(KeyError::Field {
                row,
                field: "color",
                cause: format!("{name} value: invalid value {c}"),
            });
        }
        rgb[channel] = c as u8;
    }
    Ok(Rgb(rgb))
}
