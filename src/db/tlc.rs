pub mod lib_tlc;
pub mod taxi_zone_lookup;
pub mod yellow_tripdata;
