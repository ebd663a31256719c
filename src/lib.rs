//! Lands the NYC TLC public taxi data (the zone lookup table and the monthly
//! yellow trip files) into a DBFS folder, skipping files that are already there.

pub mod db;
pub mod interval;
pub mod utils;
