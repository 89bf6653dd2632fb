pub mod autodiscover;
pub mod graph;
pub mod service;

#[cfg(test)]
pub mod fake;
