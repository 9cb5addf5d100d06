mod bank;
mod charset;
mod handle;

pub use bank::{BankOptions, FontBank, FontEntry};
pub(crate) use bank::{blocked_by, font_stem};
pub use charset::{CharacterCache, CharacterSet, characters_of};
pub use handle::FontHandle;
