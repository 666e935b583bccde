pub mod errors;
pub mod db;
pub mod measure;

#[cfg(test)]
mod tests;
