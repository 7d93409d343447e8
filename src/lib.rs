pub mod symbolic;

#[cfg(test)]
mod tests;
