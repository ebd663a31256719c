pub mod lib_dbfs;
pub mod lib_fetch;
pub mod pacing;

#[cfg(test)]
pub(crate) mod fakes;
