#[cfg(test)]
mod common;


#[cfg(test)]
mod determinism_test;
