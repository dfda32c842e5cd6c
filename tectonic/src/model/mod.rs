//! Paleogeographic reconstruction models over an equal area pixelation
//! and discrete time stages.
//!
//! There are different model types depending on how the reconstruction
//! will be used: [`Recons`] is the editable plate motion model, from
//! which the derived views [`Total`] and [`StageRot`] are projected;
//! [`TimePix`] stores raster values by time stage; and [`PixPlate`]
//! associates pixels with tectonic plates while rasterizing.

mod pixplate;
mod recons;
mod stage;
mod timepix;
mod total;

pub use pixplate::{PixAge, PixPlate};
pub use recons::Recons;
pub use stage::StageRot;
pub use timepix::TimePix;
pub use total::{PixRotation, Total};

use thiserror::Error;

/// Errors from reading the model TSV tables.
#[derive(Debug, Error)]
pub enum ModelError {
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

    /// A pixel ID is not valid for the pixelation.
    #[error("on row {row}: field {field:?}: invalid pixel value {value}")]
    InvalidPixel {
        /// Row of the offending value.
        row: usize,
        /// Name of the offending column.
        field: &'static str,
        /// The rejected pixel ID.
        value: usize,
    },

    /// The table equator does not match the given pixelation.
    #[error("on row {row}: field \"equator\": got {got}, want {want}")]
    PixelationMismatch {
        /// Row of the mismatch.
        row: usize,
        /// Equator found in the table.
        got: usize,
        /// Equator of the expected pixelation.
        want: usize,
    },

    /// A time range with its ends reversed.
    #[error("on row {row}: field {field:?}: end value must be less than {begin}")]
    ReversedRange {
        /// Row of the offending range.
        row: usize,
        /// Name of the offending column.
        field: &'static str,
        /// The begin value of the range.
        begin: i64,
    },

    /// The underlying reader or writer failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
