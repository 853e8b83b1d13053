pub mod error;
pub mod consts;
pub mod plate;
pub mod naming;
pub mod kw;
pub mod index_xml;
pub mod hyperstack;
pub mod process;
pub mod io;
pub mod measurement;
pub mod engine;
pub mod stitch;
pub mod backend;
pub mod metrics;
pub mod pipeline;
