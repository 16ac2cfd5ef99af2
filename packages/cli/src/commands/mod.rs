pub mod check;
pub mod convert;
pub mod labels;
pub mod sanitize;

pub use check::{check, CheckArgs};
pub use convert::{convert, ConvertArgs};
pub use labels::{labels, LabelsArgs};
pub use sanitize::{sanitize, SanitizeArgs};
