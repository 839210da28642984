pub mod backbone_trimmer;
pub mod breakpoint_finder;
pub mod cli;
pub mod containers;
pub mod error_profile;
pub mod evidence;
pub mod ingester;
pub mod result_writer;
pub mod tig_splitter;
pub mod unitig_builder;
pub mod utils;
