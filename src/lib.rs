pub mod error;
pub mod fetch;
pub mod realtime;
pub mod render;
pub mod topology;
pub mod view;

pub mod gtfs_rt {
    include!(concat!(env!("OUT_DIR"), "/transit_realtime.rs"));
}
