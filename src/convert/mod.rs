mod bin_to_intel;
mod error;
mod intel_to_bin;
mod padding;
mod summary;

pub use bin_to_intel::binary_to_intel;
pub use error::{ConvertError, Location};
pub use intel_to_bin::intel_to_binary;
pub use padding::PaddingMap;
pub use summary::{ConversionSummary, Direction, StartLinear};
