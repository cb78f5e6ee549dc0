pub(crate) const KIBIBYTE: u32 = 1024;
pub(crate) const MEBIBYTE: u32 = 1024 * KIBIBYTE;
pub(crate) const GIBIBYTE: u64 = 1024 * MEBIBYTE as u64;
