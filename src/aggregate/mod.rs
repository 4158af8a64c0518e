pub mod aggregator;
pub mod dataset;
pub mod error;
pub mod grid;
pub mod pipeline;
pub mod reader;
mod writer;

#[cfg(test)]
pub(crate) mod testing;
